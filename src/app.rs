use crate::input::Action;
use crate::layout::TableLayout;
use crate::model::{ContainerRecord, ContainerRow, filter_records, short_id};
use crate::runtime::{ActionOutcome, LifecycleAction};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use tracing::debug;

pub const REFRESHING_STATUS: &str = "Refreshing containers...";
const FILTER_CHAR_LIMIT: usize = 50;
const DEFAULT_WIDTH: usize = 100;
const DEFAULT_HEIGHT: usize = 30;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Mode {
    Browsing,
    Filtering,
    /// Set once; the loop exits after the next draw.
    Terminating { error: Option<String> },
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum StatusKind {
    Info,
    Refreshing,
    Progress,
    Success,
    Failure,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh,
    Perform {
        action_id: u64,
        action: LifecycleAction,
        id: String,
    },
}

/// Results re-injected into the loop by background tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ContainersLoaded(Vec<ContainerRecord>),
    ListFailed(String),
    ActionFinished {
        action_id: u64,
        outcome: ActionOutcome,
    },
    RefreshDue {
        action_id: u64,
    },
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
struct InFlight {
    refreshes: usize,
    /// Dispatched lifecycle actions whose result has not arrived yet.
    actions: HashSet<u64>,
}

pub struct App {
    mode: Mode,
    records: Vec<ContainerRecord>,
    rows: Vec<ContainerRow>,
    filter: String,
    selected: usize,
    width: usize,
    height: usize,
    layout: Option<TableLayout>,
    status: Option<StatusLine>,
    in_flight: InFlight,
    next_action_id: u64,
    last_refreshed: Option<DateTime<Local>>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            mode: Mode::Browsing,
            records: Vec::new(),
            rows: Vec::new(),
            filter: String::new(),
            selected: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            layout: None,
            status: None,
            in_flight: InFlight::default(),
            next_action_id: 1,
            last_refreshed: None,
        }
    }

    pub fn running(&self) -> bool {
        !matches!(self.mode, Mode::Terminating { .. })
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn fatal_error(&self) -> Option<&str> {
        match &self.mode {
            Mode::Terminating { error } => error.as_deref(),
            _ => None,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.in_flight.refreshes > 0 || !self.in_flight.actions.is_empty()
    }

    pub fn records(&self) -> &[ContainerRecord] {
        &self.records
    }

    pub fn rows(&self) -> &[ContainerRow] {
        &self.rows
    }

    pub fn selected_index(&self) -> Option<usize> {
        if self.rows.is_empty() {
            None
        } else {
            Some(self.selected.min(self.rows.len() - 1))
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn layout(&self) -> TableLayout {
        self.layout.unwrap_or(TableLayout::FALLBACK)
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Local>> {
        self.last_refreshed
    }

    /// The record under the cursor within the filtered listing.
    pub fn selected_container(&self) -> Option<&ContainerRecord> {
        filter_records(&self.records, &self.filter)
            .get(self.selected)
            .copied()
    }

    /// First listing, issued before any input arrives.
    pub fn bootstrap(&mut self) -> AppCommand {
        self.in_flight.refreshes += 1;
        AppCommand::Refresh
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width as usize;
        self.height = height as usize;
        self.layout = Some(TableLayout::compute(self.width, self.height));
        self.reproject();
    }

    pub fn set_status(&mut self, kind: StatusKind, text: impl Into<String>) {
        self.status = Some(StatusLine {
            text: normalize_status_text(text.into()),
            kind,
        });
    }

    pub fn set_fatal(&mut self, error: impl Into<String>) {
        self.in_flight = InFlight::default();
        self.mode = Mode::Terminating {
            error: Some(error.into()),
        };
    }

    pub fn apply_action(&mut self, action: Action) -> AppCommand {
        if !self.running() {
            return AppCommand::None;
        }

        match action {
            Action::Quit => {
                self.mode = Mode::Terminating { error: None };
                AppCommand::None
            }
            Action::Down => {
                self.move_selection(1);
                AppCommand::None
            }
            Action::Up => {
                self.move_selection(-1);
                AppCommand::None
            }
            Action::PageDown => {
                self.move_selection(self.page_step());
                AppCommand::None
            }
            Action::PageUp => {
                self.move_selection(-self.page_step());
                AppCommand::None
            }
            Action::Top => {
                self.selected = 0;
                AppCommand::None
            }
            Action::Bottom => {
                self.selected = self.rows.len().saturating_sub(1);
                AppCommand::None
            }
            Action::StartFilter => {
                self.mode = Mode::Filtering;
                AppCommand::None
            }
            Action::Refresh => {
                self.set_status(StatusKind::Refreshing, REFRESHING_STATUS);
                self.in_flight.refreshes += 1;
                AppCommand::Refresh
            }
            Action::StartSelected => self.prepare_lifecycle(LifecycleAction::Start),
            Action::StopSelected => self.prepare_lifecycle(LifecycleAction::Stop),
            Action::DeleteSelected => self.prepare_lifecycle(LifecycleAction::Delete),
            Action::SubmitInput => {
                self.mode = Mode::Browsing;
                self.reproject();
                AppCommand::None
            }
            Action::CancelInput => {
                self.mode = Mode::Browsing;
                AppCommand::None
            }
            Action::Backspace => {
                self.filter.pop();
                self.reproject();
                AppCommand::None
            }
            Action::DeleteWord => {
                while self.filter.ends_with(' ') {
                    self.filter.pop();
                }
                while !self.filter.ends_with(' ') && !self.filter.is_empty() {
                    self.filter.pop();
                }
                self.reproject();
                AppCommand::None
            }
            Action::ClearInput => {
                self.filter.clear();
                self.reproject();
                AppCommand::None
            }
            Action::InputChar(c) => {
                if self.filter.chars().count() < FILTER_CHAR_LIMIT {
                    self.filter.push(c);
                    self.reproject();
                }
                AppCommand::None
            }
        }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> AppCommand {
        if !self.running() {
            return AppCommand::None;
        }

        match event {
            AppEvent::ContainersLoaded(records) => {
                self.records = records;
                self.last_refreshed = Some(Local::now());
                self.in_flight.refreshes = self.in_flight.refreshes.saturating_sub(1);
                self.reproject();
                if self
                    .status
                    .as_ref()
                    .is_some_and(|status| status.kind == StatusKind::Refreshing)
                {
                    self.status = None;
                }
                AppCommand::None
            }
            AppEvent::ListFailed(error) => {
                self.set_fatal(error);
                AppCommand::None
            }
            AppEvent::ActionFinished { action_id, outcome } => {
                if !self.in_flight.actions.remove(&action_id) {
                    debug!("result for unknown action {action_id}");
                }
                let kind = if outcome.success {
                    StatusKind::Success
                } else {
                    StatusKind::Failure
                };
                self.set_status(kind, outcome.message);
                AppCommand::None
            }
            AppEvent::RefreshDue { action_id } => {
                debug!("delayed refresh for action {action_id}");
                self.in_flight.refreshes += 1;
                AppCommand::Refresh
            }
        }
    }

    fn prepare_lifecycle(&mut self, action: LifecycleAction) -> AppCommand {
        let Some((id, running)) = self
            .selected_container()
            .map(|record| (record.id.clone(), record.is_running()))
        else {
            self.set_status(StatusKind::Info, "No container selected");
            return AppCommand::None;
        };

        match action {
            LifecycleAction::Start if running => {
                self.set_status(StatusKind::Info, "Container is already running");
                return AppCommand::None;
            }
            LifecycleAction::Stop if !running => {
                self.set_status(StatusKind::Info, "Container is not running");
                return AppCommand::None;
            }
            _ => {}
        }

        let action_id = self.next_action_id;
        self.next_action_id += 1;
        self.set_status(
            StatusKind::Progress,
            format!("{} {}...", action.progress_label(), short_id(&id)),
        );
        self.in_flight.actions.insert(action_id);
        AppCommand::Perform {
            action_id,
            action,
            id,
        }
    }

    fn reproject(&mut self) {
        let columns = self.layout().columns;
        self.rows = filter_records(&self.records, &self.filter)
            .into_iter()
            .map(|record| ContainerRow::project(record, &columns))
            .collect();
        self.selected = self.selected.min(self.rows.len().saturating_sub(1));
    }

    fn move_selection(&mut self, delta: isize) {
        if self.rows.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.rows.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    fn page_step(&self) -> isize {
        self.layout().table_height.max(1) as isize
    }
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}

#[cfg(test)]
mod tests {
    use super::{App, AppCommand, AppEvent, Mode, REFRESHING_STATUS, StatusKind};
    use crate::input::Action;
    use crate::model::{ContainerRecord, parse_container_listing};
    use crate::runtime::{ActionOutcome, LifecycleAction};

    fn record(id: &str, name: &str, image: &str, state: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            name: format!("/{name}"),
            image: image.to_string(),
            state: state.to_string(),
            ..ContainerRecord::default()
        }
    }

    fn loaded_app(records: Vec<ContainerRecord>) -> App {
        let mut app = App::new();
        app.bootstrap();
        app.handle_event(AppEvent::ContainersLoaded(records));
        app
    }

    fn type_filter(app: &mut App, text: &str) {
        app.apply_action(Action::StartFilter);
        for c in text.chars() {
            app.apply_action(Action::InputChar(c));
        }
    }

    #[test]
    fn starts_empty_and_requests_listing() {
        let mut app = App::new();
        assert!(app.records().is_empty());
        assert!(app.rows().is_empty());
        assert_eq!(app.selected_index(), None);
        assert_eq!(app.bootstrap(), AppCommand::Refresh);
        assert!(app.loading());
    }

    #[test]
    fn end_to_end_listing_start_guard_and_delete() {
        let mut app = App::new();
        app.bootstrap();
        let raw = "garbage\n{\"ID\":\"0123456789abcdef\",\"Names\":\"/web\",\"State\":\"running\"}\n{broken";
        app.handle_event(AppEvent::ContainersLoaded(parse_container_listing(raw)));
        assert_eq!(app.records().len(), 1);
        assert!(!app.loading());

        let command = app.apply_action(Action::StartSelected);
        assert_eq!(command, AppCommand::None);
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Container is already running")
        );
        assert!(!app.loading());

        let command = app.apply_action(Action::DeleteSelected);
        let AppCommand::Perform {
            action_id,
            action,
            id,
        } = command
        else {
            panic!("delete should dispatch");
        };
        assert_eq!(action, LifecycleAction::Delete);
        assert_eq!(id, "0123456789abcdef");
        assert!(app.loading());
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Deleting 0123456789ab...")
        );

        app.handle_event(AppEvent::ActionFinished {
            action_id,
            outcome: ActionOutcome {
                success: true,
                message: "Container 0123456789ab deleted successfully".to_string(),
            },
        });
        assert_eq!(
            app.handle_event(AppEvent::RefreshDue { action_id }),
            AppCommand::Refresh
        );
        app.handle_event(AppEvent::ContainersLoaded(Vec::new()));
        assert!(!app.loading());
        assert!(app.records().is_empty());
        assert_eq!(
            app.status().map(|status| status.kind),
            Some(StatusKind::Success)
        );
    }

    #[test]
    fn stop_requires_running_container() {
        let mut app = loaded_app(vec![record("aaa", "db", "postgres", "exited")]);
        assert_eq!(app.apply_action(Action::StopSelected), AppCommand::None);
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Container is not running")
        );

        let command = app.apply_action(Action::StartSelected);
        assert!(matches!(
            command,
            AppCommand::Perform {
                action: LifecycleAction::Start,
                ..
            }
        ));
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Starting aaa...")
        );
    }

    #[test]
    fn lifecycle_without_selection_does_nothing() {
        let mut app = loaded_app(Vec::new());
        assert_eq!(app.apply_action(Action::DeleteSelected), AppCommand::None);
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("No container selected")
        );
        assert!(!app.loading());
    }

    #[test]
    fn pending_action_does_not_block_the_next_one() {
        let mut app = loaded_app(vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
        ]);
        let AppCommand::Perform {
            action_id: stop_id, ..
        } = app.apply_action(Action::StopSelected)
        else {
            panic!("stop should dispatch");
        };

        // The delayed refresh completes while the stop is still hanging.
        app.handle_event(AppEvent::RefreshDue { action_id: stop_id });
        let same = app.records().to_vec();
        app.handle_event(AppEvent::ContainersLoaded(same));
        assert!(app.loading());

        app.apply_action(Action::Down);
        let AppCommand::Perform {
            action_id: delete_id,
            action,
            id,
        } = app.apply_action(Action::DeleteSelected)
        else {
            panic!("delete should dispatch while stop is pending");
        };
        assert_ne!(delete_id, stop_id);
        assert_eq!(action, LifecycleAction::Delete);
        assert_eq!(id, "bbb");
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Deleting bbb...")
        );

        app.handle_event(AppEvent::ActionFinished {
            action_id: delete_id,
            outcome: ActionOutcome {
                success: true,
                message: "Container bbb deleted successfully".to_string(),
            },
        });
        assert!(app.loading());

        app.handle_event(AppEvent::ActionFinished {
            action_id: stop_id,
            outcome: ActionOutcome {
                success: true,
                message: "Container aaa stopped successfully".to_string(),
            },
        });
        assert!(!app.loading());
    }

    #[test]
    fn failed_action_keeps_dashboard_interactive() {
        let mut app = loaded_app(vec![record("aaa", "web", "nginx", "exited")]);
        let AppCommand::Perform { action_id, .. } = app.apply_action(Action::StartSelected) else {
            panic!("start should dispatch");
        };
        app.handle_event(AppEvent::ActionFinished {
            action_id,
            outcome: ActionOutcome {
                success: false,
                message: "Failed to start container aaa: port is already allocated".to_string(),
            },
        });
        assert!(app.running());
        assert!(!app.loading());
        assert_eq!(
            app.status().map(|status| status.kind),
            Some(StatusKind::Failure)
        );
    }

    #[test]
    fn manual_refresh_clears_its_placeholder_only() {
        let mut app = loaded_app(vec![record("aaa", "web", "nginx", "running")]);
        assert_eq!(app.apply_action(Action::Refresh), AppCommand::Refresh);
        assert!(app.loading());
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some(REFRESHING_STATUS)
        );
        let same = app.records().to_vec();
        app.handle_event(AppEvent::ContainersLoaded(same.clone()));
        assert_eq!(app.status(), None);
        assert!(!app.loading());

        app.set_status(StatusKind::Success, "Container aaa stopped successfully");
        app.handle_event(AppEvent::RefreshDue { action_id: 1 });
        app.handle_event(AppEvent::ContainersLoaded(same));
        assert_eq!(
            app.status().map(|status| status.text.as_str()),
            Some("Container aaa stopped successfully")
        );
    }

    #[test]
    fn identical_listings_render_identical_rows() {
        let records = vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
        ];
        let mut app = loaded_app(records.clone());
        let first = app.rows().to_vec();
        app.handle_event(AppEvent::ContainersLoaded(records));
        assert_eq!(app.rows(), first.as_slice());
    }

    #[test]
    fn filter_applies_on_every_keystroke() {
        let mut app = loaded_app(vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
        ]);
        type_filter(&mut app, "POST");
        assert_eq!(app.mode(), &Mode::Filtering);
        assert_eq!(app.rows().len(), 1);
        assert_eq!(app.rows()[0].name, "db");

        app.apply_action(Action::Backspace);
        app.apply_action(Action::Backspace);
        app.apply_action(Action::Backspace);
        app.apply_action(Action::Backspace);
        assert_eq!(app.rows().len(), 2);
    }

    #[test]
    fn escape_and_enter_both_keep_filter_text() {
        let mut app = loaded_app(vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
        ]);
        type_filter(&mut app, "web");
        app.apply_action(Action::CancelInput);
        assert_eq!(app.mode(), &Mode::Browsing);
        assert_eq!(app.filter(), "web");
        assert_eq!(app.rows().len(), 1);

        type_filter(&mut app, "x");
        app.apply_action(Action::SubmitInput);
        assert_eq!(app.mode(), &Mode::Browsing);
        assert_eq!(app.filter(), "webx");
        assert!(app.rows().is_empty());
    }

    #[test]
    fn selection_indexes_filtered_listing() {
        let mut app = loaded_app(vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
            record("ccc", "cache", "redis", "exited"),
        ]);
        type_filter(&mut app, "exited");
        app.apply_action(Action::SubmitInput);
        app.apply_action(Action::Down);
        assert_eq!(
            app.selected_container().map(|record| record.id.as_str()),
            Some("ccc")
        );
    }

    #[test]
    fn selection_is_clamped_when_rows_shrink() {
        let mut app = loaded_app(vec![
            record("aaa", "web", "nginx", "running"),
            record("bbb", "db", "postgres", "exited"),
        ]);
        app.apply_action(Action::Bottom);
        assert_eq!(app.selected_index(), Some(1));
        app.handle_event(AppEvent::ContainersLoaded(vec![record(
            "aaa", "web", "nginx", "running",
        )]));
        assert_eq!(app.selected_index(), Some(0));
        app.apply_action(Action::Up);
        app.apply_action(Action::PageDown);
        assert_eq!(app.selected_index(), Some(0));
    }

    #[test]
    fn filter_text_is_capped() {
        let mut app = App::new();
        type_filter(&mut app, &"a".repeat(80));
        assert_eq!(app.filter().chars().count(), 50);
        app.apply_action(Action::ClearInput);
        assert_eq!(app.filter(), "");
    }

    #[test]
    fn delete_word_removes_last_word() {
        let mut app = App::new();
        type_filter(&mut app, "nginx run");
        app.apply_action(Action::DeleteWord);
        assert_eq!(app.filter(), "nginx ");
    }

    #[test]
    fn resize_reprojects_with_new_widths() {
        let long_image = "registry.example.com/platform/collector:1.2.3";
        let mut app = loaded_app(vec![record("aaa", "web", long_image, "running")]);
        assert_eq!(app.rows()[0].image.chars().count(), 30);

        app.resize(200, 50);
        assert_eq!(app.layout().columns.image, 53);
        assert_eq!(app.rows()[0].image, long_image);
        assert_eq!(app.layout().table_height, 40);
    }

    #[test]
    fn list_failure_is_terminal() {
        let mut app = App::new();
        app.bootstrap();
        app.handle_event(AppEvent::ListFailed("docker: command not found".to_string()));
        assert!(!app.running());
        assert!(!app.loading());
        assert_eq!(app.fatal_error(), Some("docker: command not found"));
        assert_eq!(app.apply_action(Action::Refresh), AppCommand::None);
    }

    #[test]
    fn quit_ends_without_error() {
        let mut app = App::new();
        app.apply_action(Action::Quit);
        assert!(!app.running());
        assert_eq!(app.fatal_error(), None);
    }
}
