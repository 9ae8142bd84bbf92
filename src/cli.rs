use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "berth",
    version,
    about = "A terminal dashboard for listing, filtering, starting, stopping and deleting containers."
)]
pub struct CliArgs {
    /// Container runtime CLI to invoke (must accept docker-style ps/start/stop/rm)
    #[arg(long, default_value = "docker")]
    pub runtime: String,

    /// Delay before the automatic refresh that follows a lifecycle action
    #[arg(long, default_value_t = 2_000)]
    pub refresh_delay_ms: u64,

    /// YAML file overriding the default colors
    #[arg(long)]
    pub theme: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
