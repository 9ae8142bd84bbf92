use anyhow::{Context, Result, anyhow};
use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::app::StatusKind;
use crate::model::StatusTone;

/// Styles handed to the renderer. Built once at startup.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Theme {
    pub title: Style,
    pub filter: Style,
    pub help: Style,
    pub header: Style,
    pub border: Style,
    pub selected: Style,
    pub running: Style,
    pub stopped: Style,
    pub paused: Style,
    pub success: Style,
    pub failure: Style,
    pub info: Style,
    pub error: Style,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default()
                .fg(Color::Indexed(86))
                .add_modifier(Modifier::BOLD),
            filter: Style::default()
                .fg(Color::Indexed(205))
                .add_modifier(Modifier::BOLD),
            help: Style::default().fg(Color::Indexed(241)),
            header: Style::default().add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Indexed(240)),
            selected: Style::default()
                .fg(Color::Indexed(229))
                .bg(Color::Indexed(57)),
            running: Style::default().fg(Color::Indexed(82)),
            stopped: Style::default().fg(Color::Indexed(196)),
            paused: Style::default().fg(Color::Indexed(226)),
            success: Style::default().fg(Color::Indexed(82)),
            failure: Style::default().fg(Color::Indexed(196)),
            info: Style::default().fg(Color::Indexed(226)),
            error: Style::default().fg(Color::Indexed(196)),
        }
    }
}

impl Theme {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read theme {}", path.display()))?;
        let parsed: ThemeFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse theme {}", path.display()))?;
        parsed
            .apply(Self::default())
            .with_context(|| format!("invalid color in theme {}", path.display()))
    }

    pub fn status_tone(&self, tone: StatusTone) -> Style {
        match tone {
            StatusTone::Running => self.running,
            StatusTone::Stopped => self.stopped,
            StatusTone::Paused => self.paused,
            StatusTone::Neutral => Style::default(),
        }
    }

    pub fn status_kind(&self, kind: StatusKind) -> Style {
        match kind {
            StatusKind::Success => self.success,
            StatusKind::Failure => self.failure,
            StatusKind::Info | StatusKind::Refreshing | StatusKind::Progress => self.info,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ThemeFile {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    filter: Option<String>,
    #[serde(default)]
    help: Option<String>,
    #[serde(default)]
    border: Option<String>,
    #[serde(default)]
    selected_fg: Option<String>,
    #[serde(default)]
    selected_bg: Option<String>,
    #[serde(default)]
    running: Option<String>,
    #[serde(default)]
    stopped: Option<String>,
    #[serde(default)]
    paused: Option<String>,
    #[serde(default)]
    success: Option<String>,
    #[serde(default)]
    failure: Option<String>,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ThemeFile {
    fn apply(self, mut theme: Theme) -> Result<Theme> {
        override_fg(&mut theme.title, self.title.as_deref())?;
        override_fg(&mut theme.filter, self.filter.as_deref())?;
        override_fg(&mut theme.help, self.help.as_deref())?;
        override_fg(&mut theme.border, self.border.as_deref())?;
        override_fg(&mut theme.selected, self.selected_fg.as_deref())?;
        if let Some(value) = self.selected_bg.as_deref() {
            theme.selected = theme.selected.bg(parse_color(value)?);
        }
        override_fg(&mut theme.running, self.running.as_deref())?;
        override_fg(&mut theme.stopped, self.stopped.as_deref())?;
        override_fg(&mut theme.paused, self.paused.as_deref())?;
        override_fg(&mut theme.success, self.success.as_deref())?;
        override_fg(&mut theme.failure, self.failure.as_deref())?;
        override_fg(&mut theme.info, self.info.as_deref())?;
        override_fg(&mut theme.error, self.error.as_deref())?;
        Ok(theme)
    }
}

fn override_fg(style: &mut Style, value: Option<&str>) -> Result<()> {
    if let Some(value) = value {
        *style = style.fg(parse_color(value)?);
    }
    Ok(())
}

fn parse_color(value: &str) -> Result<Color> {
    Color::from_str(value.trim()).map_err(|_| anyhow!("unrecognized color '{value}'"))
}
