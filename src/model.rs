use chrono::{DateTime, FixedOffset, Local};
use serde::Deserialize;
use tracing::debug;

pub const EMPTY_CELL: &str = "—";
const DEFAULT_BIND_PREFIX: &str = "0.0.0.0:";
const PORTS_MAX_WIDTH: usize = 25;
const SHORT_ID_LEN: usize = 12;

/// One line of `ps --format json` output.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize)]
pub struct ContainerRecord {
    #[serde(rename = "ID", default)]
    pub id: String,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "CreatedAt", default)]
    pub created: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Ports", default)]
    pub ports: String,
    #[serde(rename = "Names", default)]
    pub name: String,
    #[serde(rename = "State", default)]
    pub state: String,
}

impl ContainerRecord {
    pub fn display_name(&self) -> &str {
        self.name.strip_prefix('/').unwrap_or(&self.name)
    }

    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    pub fn matches_filter(&self, query_lower: &str) -> bool {
        [
            self.display_name(),
            self.image.as_str(),
            self.state.as_str(),
            self.id.as_str(),
            self.ports.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(query_lower))
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// Decodes newline-delimited JSON, dropping lines that fail to decode.
pub fn parse_container_listing(raw: &str) -> Vec<ContainerRecord> {
    raw.trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(
            |line| match serde_json::from_str::<ContainerRecord>(line) {
                Ok(record) => Some(record),
                Err(error) => {
                    debug!("skipping malformed container line: {error}");
                    None
                }
            },
        )
        .collect()
}

pub fn filter_records<'a>(records: &'a [ContainerRecord], query: &str) -> Vec<&'a ContainerRecord> {
    if query.is_empty() {
        return records.iter().collect();
    }

    let query_lower = query.to_lowercase();
    records
        .iter()
        .filter(|record| record.matches_filter(&query_lower))
        .collect()
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusTone {
    Running,
    Stopped,
    Paused,
    Neutral,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusBadge {
    pub label: String,
    pub tone: StatusTone,
}

impl StatusBadge {
    pub fn from_state(state: &str) -> Self {
        let (label, tone) = match state {
            "running" => ("RUNNING", StatusTone::Running),
            "exited" => ("STOPPED", StatusTone::Stopped),
            "paused" => ("PAUSED", StatusTone::Paused),
            "restarting" => ("RESTART", StatusTone::Paused),
            "removing" => ("REMOVING", StatusTone::Stopped),
            "dead" => ("DEAD", StatusTone::Stopped),
            "created" => ("CREATED", StatusTone::Paused),
            other => {
                return Self {
                    label: other.to_uppercase(),
                    tone: StatusTone::Neutral,
                };
            }
        };
        Self {
            label: label.to_string(),
            tone,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ColumnWidths {
    pub id: usize,
    pub name: usize,
    pub image: usize,
    pub status: usize,
    pub ports: usize,
}

impl ColumnWidths {
    /// Widths used until the first terminal size is known.
    pub const FALLBACK: Self = Self {
        id: 14,
        name: 25,
        image: 30,
        status: 16,
        ports: 25,
    };

    pub fn as_array(&self) -> [usize; 5] {
        [self.id, self.name, self.image, self.status, self.ports]
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContainerRow {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: StatusBadge,
    pub ports: String,
}

impl ContainerRow {
    pub fn project(record: &ContainerRecord, widths: &ColumnWidths) -> Self {
        Self {
            id: truncate(&record.id, widths.id),
            name: truncate(record.display_name(), widths.name),
            image: truncate(&record.image, widths.image),
            status: StatusBadge::from_state(&record.state),
            ports: truncate(&format_ports(&record.ports), widths.ports),
        }
    }
}

pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    if max < 3 {
        return ".".repeat(max);
    }

    let mut out = value.chars().take(max - 3).collect::<String>();
    out.push_str("...");
    out
}

pub fn format_ports(ports: &str) -> String {
    if ports.is_empty() {
        return EMPTY_CELL.to_string();
    }
    truncate(&ports.replace(DEFAULT_BIND_PREFIX, ""), PORTS_MAX_WIDTH)
}

pub fn format_age(created: &str, now: DateTime<Local>) -> String {
    if created.trim().is_empty() {
        return EMPTY_CELL.to_string();
    }

    let Some(parsed) = parse_created_at(created) else {
        return created.chars().take(10).collect();
    };

    let elapsed = now
        .fixed_offset()
        .signed_duration_since(parsed)
        .max(chrono::Duration::zero());
    if elapsed < chrono::Duration::hours(1) {
        format!("{}m", elapsed.num_minutes())
    } else if elapsed < chrono::Duration::days(1) {
        format!("{}h", elapsed.num_hours())
    } else {
        format!("{}d", elapsed.num_days())
    }
}

// Runtime timestamps look like `2024-01-15 10:30:00 +0000 UTC`; the trailing
// zone abbreviation is redundant with the offset.
fn parse_created_at(created: &str) -> Option<DateTime<FixedOffset>> {
    let mut parts = created.split_whitespace();
    let date = parts.next()?;
    let time = parts.next()?;
    let offset = parts.next()?;
    DateTime::parse_from_str(&format!("{date} {time} {offset}"), "%Y-%m-%d %H:%M:%S %z").ok()
}
