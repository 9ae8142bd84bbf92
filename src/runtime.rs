use anyhow::{Context, Result};
use std::fmt::{Display, Formatter};
use std::process::Stdio;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use crate::model::{ContainerRecord, parse_container_listing, short_id};

const LIST_ARGS: [&str; 4] = ["ps", "-a", "--format", "json"];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Delete,
}

impl LifecycleAction {
    pub fn progress_label(self) -> &'static str {
        match self {
            Self::Start => "Starting",
            Self::Stop => "Stopping",
            Self::Delete => "Deleting",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Delete => "delete",
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Self::Start => "started",
            Self::Stop => "stopped",
            Self::Delete => "deleted",
        }
    }
}

impl Display for LifecycleAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    fn from_result(action: LifecycleAction, id: &str, result: Result<String>) -> Self {
        let short = short_id(id);
        match result {
            Ok(_) => Self {
                success: true,
                message: format!("Container {short} {} successfully", action.past_tense()),
            },
            Err(error) => Self {
                success: false,
                message: format!(
                    "Failed to {} container {short}: {}",
                    action.verb(),
                    first_line(&format!("{error:#}"))
                ),
            },
        }
    }
}

/// Thin wrapper over the container runtime's CLI.
#[derive(Debug, Clone)]
pub struct RuntimeGateway {
    program: String,
}

impl RuntimeGateway {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub async fn list(&self) -> Result<Vec<ContainerRecord>> {
        let output = self
            .run(&LIST_ARGS)
            .await
            .with_context(|| format!("failed to list containers with {}", self.program))?;
        let records = parse_container_listing(&output);
        debug!("listed {} containers", records.len());
        Ok(records)
    }

    pub async fn start(&self, id: &str) -> ActionOutcome {
        let result = self.run(&["start", id]).await;
        ActionOutcome::from_result(LifecycleAction::Start, id, result)
    }

    pub async fn stop(&self, id: &str) -> ActionOutcome {
        let result = self.run(&["stop", id]).await;
        ActionOutcome::from_result(LifecycleAction::Stop, id, result)
    }

    pub async fn remove(&self, id: &str) -> ActionOutcome {
        // The container may already be stopped.
        if let Err(error) = self.run(&["stop", id]).await {
            debug!("stop before remove failed for {}: {error:#}", short_id(id));
        }
        let result = self.run(&["rm", id]).await;
        ActionOutcome::from_result(LifecycleAction::Delete, id, result)
    }

    pub async fn perform(&self, action: LifecycleAction, id: &str) -> ActionOutcome {
        match action {
            LifecycleAction::Start => self.start(id).await,
            LifecycleAction::Stop => self.stop(id).await,
            LifecycleAction::Delete => self.remove(id).await,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        info!("running {} {}", self.program, args.join(" "));
        let output = TokioCommand::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to execute {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                "{} {} exited with {}",
                self.program,
                args.join(" "),
                output.status
            );
            if stderr.trim().is_empty() {
                anyhow::bail!("{} exited with {}", self.program, output.status);
            }
            anyhow::bail!("{}", first_line(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn first_line(text: &str) -> String {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}
