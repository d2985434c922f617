use crate::analytics::{
  compute_stats, filter_by_quarter, filter_by_subject, month_calendar, quarter_percentages,
  safe_bunk_calculator, sort_by_date, strip_trailing_feedback_rows, subject_summaries, subjects,
  BunkProjection, MonthCalendar, Quarter, SortOrder, Stats, SubjectSummary,
};
use crate::cache::CacheSource;
use crate::commands::{self, Command};
use crate::config::Config;
use crate::error::SyncError;
use crate::event::{Event, EventHandler};
use crate::portal::client::PortalClient;
use crate::portal::types::AttendanceRecord;
use crate::quarters::QuarterStore;
use crate::sync::{RefreshOutcome, Subscription, SyncCoordinator, SyncEvent};
use crate::ui;
use chrono::{Datelike, Local};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info};

/// Minimum-percentage range offered by the `+`/`-` keys
const MIN_PERCENTAGE_RANGE: (f64, f64) = (75.0, 95.0);

/// How long a transient notice stays in the status line
const NOTICE_TTL: Duration = Duration::from_secs(4);

/// How long quitting waits for an in-flight refresh
const EXIT_GRACE: Duration = Duration::from_secs(2);

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  /// Waiting for y/N before wiping local data
  ConfirmReset,
}

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  Summary,
  Records { list_state: ListState, order: SortOrder },
  Calendar { year: i32, month: u32 },
}

impl ViewState {
  pub fn records() -> Self {
    ViewState::Records {
      list_state: ListState::default(),
      order: SortOrder::default(),
    }
  }

  pub fn calendar_now() -> Self {
    let today = Local::now().date_naive();
    ViewState::Calendar {
      year: today.year(),
      month: today.month(),
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      ViewState::Summary => "Summary",
      ViewState::Records { .. } => "Records",
      ViewState::Calendar { .. } => "Calendar",
    }
  }
}

/// Foreground operation to run on the next loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
  Load,
  Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Warn,
}

#[derive(Debug, Clone)]
pub struct Notice {
  pub text: String,
  pub level: NoticeLevel,
  shown_at: Instant,
}

/// Everything the summary view shows, derived from the scoped records
pub struct SummaryData {
  pub overall: Stats,
  pub subjects: Vec<SubjectSummary>,
  pub bunk: BunkProjection,
  pub quarter_percentages: Vec<String>,
}

/// Main application state
pub struct App {
  view: ViewState,
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,
  selected_suggestion: usize,

  config: Config,
  host: String,
  sync: SyncCoordinator<PortalClient>,
  sync_events: Subscription,

  quarter_store: QuarterStore,
  quarters_rx: watch::Receiver<Vec<Quarter>>,
  quarters: Vec<Quarter>,

  /// 0 is the whole year, n is quarter n
  scope: usize,
  /// Index into the subject list, `None` for all subjects
  subject_filter: Option<usize>,
  min_percentage: f64,

  pending: Option<Pending>,
  loading: bool,
  load_error: Option<SyncError>,
  notice: Option<Notice>,

  should_quit: bool,
}

impl App {
  pub fn new(
    config: Config,
    mut sync: SyncCoordinator<PortalClient>,
    host: String,
    quarter_store: QuarterStore,
  ) -> Self {
    let sync_events = sync.subscribe();
    let quarters_rx = quarter_store.subscribe();
    let quarters = quarter_store.quarters();
    let min_percentage = config.attendance.min_percentage;

    Self {
      view: ViewState::Summary,
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      config,
      host,
      sync,
      sync_events,
      quarter_store,
      quarters_rx,
      quarters,
      scope: 0,
      subject_filter: None,
      min_percentage,
      pending: Some(Pending::Load),
      loading: false,
      load_error: None,
      notice: None,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;
    self.sync.unsubscribe(self.sync_events.id);

    // Let a running refresh finish its cache write, but don't hang on it
    if self.is_refreshing()
      && tokio::time::timeout(EXIT_GRACE, self.sync.settle())
        .await
        .is_err()
    {
      debug!("Refresh still running at exit, abandoning it");
    }

    // Cleanup terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      if let Some(pending) = self.pending.take() {
        self.loading = true;
        terminal.draw(|frame| ui::draw(frame, self))?;
        self.run_pending(pending).await;
        self.loading = false;
      }

      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  async fn run_pending(&mut self, pending: Pending) {
    let result = match pending {
      Pending::Load => self.sync.load_initial().await,
      Pending::Reset => {
        info!("Full reset requested from the UI");
        self.sync.full_reset().await
      }
    };

    // Foreground results are reported below, not as "Updated"
    while self.sync_events.receiver.try_recv().is_ok() {}

    match result {
      Ok(loaded) => {
        self.load_error = None;
        match loaded.source {
          CacheSource::Offline => self.notify(NoticeLevel::Warn, "Offline, showing saved attendance"),
          CacheSource::Cache => self.notify(NoticeLevel::Info, "Showing saved attendance"),
          _ => {}
        }
      }
      Err(e) => self.load_error = Some(e),
    }
    self.clamp_filters();
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {}
      Event::Tick => self.tick(),
    }
  }

  fn tick(&mut self) {
    if self.sync.poll() {
      self.clamp_filters();
    }

    while let Ok(event) = self.sync_events.receiver.try_recv() {
      self.handle_sync_event(event);
    }

    // Quarters may be edited from the CLI while the UI runs
    self.quarter_store.reload_if_modified();
    if self.quarters_rx.has_changed().unwrap_or(false) {
      self.quarters = self.quarters_rx.borrow_and_update().clone();
      debug!("Quarters changed, {} defined", self.quarters.len());
      self.clamp_filters();
    }

    if self
      .notice
      .as_ref()
      .is_some_and(|n| n.shown_at.elapsed() > NOTICE_TTL)
    {
      self.notice = None;
    }
  }

  fn handle_sync_event(&mut self, event: SyncEvent) {
    match event {
      SyncEvent::Updated(snapshot) => {
        if snapshot.logged_in {
          self.load_error = None;
          self.notify(NoticeLevel::Info, "Updated");
        }
      }
      SyncEvent::Stale { .. } => {
        self.notify(NoticeLevel::Warn, "Refresh failed, showing saved attendance");
      }
      SyncEvent::Coalesced => self.notify(NoticeLevel::Info, "Already refreshing"),
      // The countdown itself is rendered live from the coordinator
      SyncEvent::CooldownRejected { .. } => {}
    }
  }

  fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
    self.notice = Some(Notice {
      text: text.into(),
      level,
      shown_at: Instant::now(),
    });
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::ConfirmReset => self.handle_confirm_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }

      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('1') => self.view = ViewState::Summary,
      KeyCode::Char('2') => self.view = ViewState::records(),
      KeyCode::Char('3') => self.view = ViewState::calendar_now(),
      KeyCode::Tab => self.cycle_view(),

      KeyCode::Char(']') => self.cycle_scope(1),
      KeyCode::Char('[') => self.cycle_scope(-1),
      KeyCode::Char('s') => self.cycle_subject(),
      KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_min_percentage(1.0),
      KeyCode::Char('-') => self.adjust_min_percentage(-1.0),

      _ => self.handle_view_key(key),
    }
  }

  /// Keys that only mean something in the current view
  fn handle_view_key(&mut self, key: KeyEvent) {
    let len = self.visible_records().len();
    match &mut self.view {
      ViewState::Records { list_state, order } => match key.code {
        KeyCode::Down | KeyCode::Char('j') => list_state.select_next(),
        KeyCode::Up | KeyCode::Char('k') => list_state.select_previous(),
        KeyCode::Home | KeyCode::Char('g') => list_state.select_first(),
        KeyCode::End | KeyCode::Char('G') if len > 0 => list_state.select(Some(len - 1)),
        KeyCode::Char('o') => {
          *order = order.toggle();
          list_state.select_first();
        }
        _ => {}
      },
      ViewState::Calendar { year, month } => match key.code {
        KeyCode::Left | KeyCode::Char('h') => {
          (*year, *month) = shift_month(*year, *month, -1);
        }
        KeyCode::Right | KeyCode::Char('l') => {
          (*year, *month) = shift_month(*year, *month, 1);
        }
        _ => {}
      },
      ViewState::Summary => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.mode = Mode::Normal;
        self.execute_command();
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let count = commands::get_suggestions(&self.command_input).len();
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let count = commands::get_suggestions(&self.command_input).len();
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
  }

  fn handle_confirm_key(&mut self, key: KeyEvent) {
    self.mode = Mode::Normal;
    if matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y')) {
      self.pending = Some(Pending::Reset);
    } else {
      self.notify(NoticeLevel::Info, "Reset cancelled");
    }
  }

  fn execute_command(&mut self) {
    let suggestions = commands::get_suggestions(&self.command_input);
    let cmd = match suggestions.get(self.selected_suggestion) {
      Some(cmd) => cmd.name.to_string(),
      None => self.command_input.trim().to_lowercase(),
    };
    self.command_input.clear();

    match cmd.as_str() {
      "summary" => self.view = ViewState::Summary,
      "records" => self.view = ViewState::records(),
      "calendar" => self.view = ViewState::calendar_now(),
      "refresh" => self.refresh(),
      "retry" => self.pending = Some(Pending::Load),
      "reset" => self.mode = Mode::ConfirmReset,
      "quit" => self.should_quit = true,
      other => self.notify(NoticeLevel::Warn, format!("Unknown command: {}", other)),
    }
  }

  fn refresh(&mut self) {
    match self.sync.refresh() {
      RefreshOutcome::Started => self.notify(NoticeLevel::Info, "Refreshing..."),
      RefreshOutcome::CoolingDown { seconds_remaining } => self.notify(
        NoticeLevel::Warn,
        format!("Please wait {} seconds", seconds_remaining),
      ),
      // Notice comes through the subscription
      RefreshOutcome::Coalesced => {}
    }
  }

  fn cycle_view(&mut self) {
    self.view = match self.view {
      ViewState::Summary => ViewState::records(),
      ViewState::Records { .. } => ViewState::calendar_now(),
      ViewState::Calendar { .. } => ViewState::Summary,
    };
  }

  fn cycle_scope(&mut self, delta: isize) {
    let options = self.quarters.len() as isize + 1;
    self.scope = (self.scope as isize + delta).rem_euclid(options) as usize;
    self.reset_selection();
  }

  fn cycle_subject(&mut self) {
    let count = self.subjects().len();
    self.subject_filter = match self.subject_filter {
      None if count > 0 => Some(0),
      Some(i) if i + 1 < count => Some(i + 1),
      _ => None,
    };
    self.reset_selection();
  }

  fn adjust_min_percentage(&mut self, delta: f64) {
    let (lo, hi) = MIN_PERCENTAGE_RANGE;
    self.min_percentage = (self.min_percentage + delta).clamp(lo, hi);
  }

  fn reset_selection(&mut self) {
    if let ViewState::Records { list_state, .. } = &mut self.view {
      list_state.select_first();
    }
  }

  /// Keep scope and subject indices valid after data or quarters change
  fn clamp_filters(&mut self) {
    if self.scope > self.quarters.len() {
      self.scope = 0;
    }
    if self
      .subject_filter
      .is_some_and(|i| i >= self.subjects().len())
    {
      self.subject_filter = None;
    }
  }

  // Derived data

  /// Records with the survey rows removed, scoped to the selected quarter
  fn scoped_records(&self) -> Vec<AttendanceRecord> {
    let records = strip_trailing_feedback_rows(
      self.sync.records().to_vec(),
      &self.config.attendance.feedback_labels,
    );
    match self.selected_quarter() {
      Some(quarter) => filter_by_quarter(&records, quarter),
      None => records,
    }
  }

  /// Scoped records further narrowed to the selected subject
  pub fn visible_records(&self) -> Vec<AttendanceRecord> {
    let records = self.scoped_records();
    match self.selected_subject() {
      Some(subject) => filter_by_subject(&records, &subject),
      None => records,
    }
  }

  fn subjects(&self) -> Vec<String> {
    subjects(&self.scoped_records())
  }

  pub fn selected_subject(&self) -> Option<String> {
    self
      .subject_filter
      .and_then(|i| self.subjects().into_iter().nth(i))
  }

  fn selected_quarter(&self) -> Option<&Quarter> {
    self.scope.checked_sub(1).and_then(|i| self.quarters.get(i))
  }

  pub fn scope_label(&self) -> String {
    match self.selected_quarter() {
      Some(q) => format!("Quarter {} ({})", self.scope, q),
      None => "Whole Year".to_string(),
    }
  }

  pub fn summary(&self) -> SummaryData {
    let records = self.visible_records();
    let overall = compute_stats(&records);
    let bunk = safe_bunk_calculator(
      overall.total,
      overall.present,
      overall.leave,
      self.min_percentage,
    );

    let all = strip_trailing_feedback_rows(
      self.sync.records().to_vec(),
      &self.config.attendance.feedback_labels,
    );

    SummaryData {
      overall,
      subjects: subject_summaries(&records),
      bunk,
      quarter_percentages: quarter_percentages(&all, &self.quarters),
    }
  }

  pub fn sorted_records(&self) -> Vec<AttendanceRecord> {
    let order = match &self.view {
      ViewState::Records { order, .. } => *order,
      _ => SortOrder::default(),
    };
    sort_by_date(self.visible_records(), order)
  }

  pub fn calendar(&self) -> Option<MonthCalendar> {
    match self.view {
      ViewState::Calendar { year, month } => month_calendar(&self.visible_records(), year, month),
      _ => None,
    }
  }

  // Accessors for UI rendering

  pub fn view(&self) -> &ViewState {
    &self.view
  }

  pub fn records_list_state(&mut self) -> Option<&mut ListState> {
    match &mut self.view {
      ViewState::Records { list_state, .. } => Some(list_state),
      _ => None,
    }
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }

  pub fn title(&self) -> &str {
    self.config.title.as_deref().unwrap_or(&self.host)
  }

  pub fn min_percentage(&self) -> f64 {
    self.min_percentage
  }

  pub fn quarters(&self) -> &[Quarter] {
    &self.quarters
  }

  /// Nothing at all to show, before any scoping
  pub fn current_records_empty(&self) -> bool {
    self.sync.records().is_empty()
  }

  pub fn is_loading(&self) -> bool {
    self.loading
  }

  pub fn is_refreshing(&self) -> bool {
    self.sync.state().background_fetch_in_progress
  }

  pub fn logged_in(&self) -> bool {
    self.sync.state().logged_in
  }

  pub fn data_source(&self) -> Option<CacheSource> {
    self.sync.current().map(|c| c.source)
  }

  pub fn load_error(&self) -> Option<&SyncError> {
    self.load_error.as_ref()
  }

  pub fn cooldown_remaining(&self) -> Option<u64> {
    self.sync.cooldown_remaining(Instant::now())
  }

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }
}

/// Move `delta` months from `year`/`month`, wrapping across years
fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
  let index = year * 12 + month as i32 - 1 + delta;
  (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
