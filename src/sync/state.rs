use std::time::Instant;

/// Where the coordinator is in its load cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
  #[default]
  Idle,
  /// Foreground load awaiting its result
  Loading,
  /// Showing a cached snapshot, nothing in flight
  ServingCached,
  /// Showing the current snapshot while a refresh runs
  FetchingBackground,
}

/// Session flags owned by the coordinator. Only its handlers mutate these.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
  pub logged_in: bool,
  pub background_fetch_in_progress: bool,
  /// Last refresh that passed the cooldown check
  pub last_manual_refresh_at: Option<Instant>,
  pub first_load_done: bool,
  pub phase: Phase,
  /// Bumped by every operation that produces a snapshot; a completion
  /// carrying an older number is ignored.
  pub latest_request: u64,
}

impl SyncState {
  pub fn next_request(&mut self) -> u64 {
    self.latest_request += 1;
    self.latest_request
  }
}
