use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheLayer, CacheResult, CacheSource, Policy};
use crate::error::SyncError;
use crate::portal::client::AttendanceSource;
use crate::portal::types::{AttendanceRecord, AttendanceSnapshot};

use super::notify::{SubscriberId, Subscribers, Subscription, SyncEvent};
use super::state::{Phase, SyncState};

/// What a `refresh()` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
  /// A background fetch was spawned
  Started,
  /// Inside the cooldown window; nothing was fetched
  CoolingDown { seconds_remaining: u64 },
  /// A fetch was already in flight; its result will serve this call too
  Coalesced,
}

/// Result of a spawned background fetch.
struct Completion {
  request: u64,
  result: Result<AttendanceSnapshot, SyncError>,
}

/// Drives loads and refreshes for one attendance source.
///
/// All state is owned here and only changed through `&mut self` handlers.
/// Background fetches run on spawned tasks and report back over a channel;
/// their results are applied by `poll()` or `settle()`.
pub struct SyncCoordinator<S: AttendanceSource> {
  source: S,
  cache: CacheLayer,
  cooldown: Duration,
  state: SyncState,
  current: Option<CacheResult<AttendanceSnapshot>>,
  /// Request number of the background fetch in flight
  in_flight: Option<u64>,
  subscribers: Subscribers,
  completions_tx: mpsc::UnboundedSender<Completion>,
  completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<S: AttendanceSource> SyncCoordinator<S> {
  pub fn new(source: S, cache: CacheLayer, cooldown: Duration) -> Self {
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    Self {
      source,
      cache,
      cooldown,
      state: SyncState::default(),
      current: None,
      in_flight: None,
      subscribers: Subscribers::default(),
      completions_tx,
      completions_rx,
    }
  }

  pub fn state(&self) -> &SyncState {
    &self.state
  }

  /// The snapshot currently considered authoritative, with its provenance.
  pub fn current(&self) -> Option<&CacheResult<AttendanceSnapshot>> {
    self.current.as_ref()
  }

  pub fn records(&self) -> &[AttendanceRecord] {
    self
      .current
      .as_ref()
      .map(|c| c.data.records.as_slice())
      .unwrap_or_default()
  }

  pub fn subscribe(&mut self) -> Subscription {
    let subscription = self.subscribers.subscribe();
    debug!(
      "Subscriber {} registered ({} total)",
      subscription.id,
      self.subscribers.count()
    );
    subscription
  }

  pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
    self.subscribers.unsubscribe(id)
  }

  /// Manual refreshes revalidate in the background; loads go to the network
  /// once per session and to the cache after that.
  fn policy(&self, manual: bool) -> Policy {
    if manual {
      Policy::StaleWhileRevalidate
    } else if self.state.first_load_done {
      Policy::CacheFirst
    } else {
      Policy::NetworkFirst
    }
  }

  fn cache_key(&self) -> CacheKey {
    CacheKey::normalize(&self.source.locator(false))
  }

  /// Load attendance for display.
  ///
  /// The first load of a session goes to the network and falls back to the
  /// cache; later loads are served from the cache when it has a snapshot.
  /// Only a failed fetch with nothing cached is an `Err`; the coordinator
  /// then holds an empty logged-out snapshot so there is still something
  /// to render.
  pub async fn load_initial(&mut self) -> Result<CacheResult<AttendanceSnapshot>, SyncError> {
    self.state.phase = Phase::Loading;
    // Supersedes any background fetch still in flight
    self.state.next_request();
    let key = self.cache_key();
    let policy = self.policy(false);
    let source = &self.source;
    debug!("Loading attendance ({:?})", policy);

    let loaded = match policy {
      Policy::CacheFirst => {
        self
          .cache
          .cache_first(&key, || source.fetch_attendance(false))
          .await
      }
      Policy::NetworkFirst | Policy::StaleWhileRevalidate => {
        let result = self
          .cache
          .network_first(&key, || source.fetch_attendance(false))
          .await;
        match (result.source, result.error.clone()) {
          (CacheSource::Fallback, Some(error)) => Err(error),
          _ => Ok(result),
        }
      }
    };

    self.state.first_load_done = true;

    match loaded {
      Ok(result) => {
        let result = self.keep_prior_records_when_logged_out(result);
        self.state.phase = if result.source.is_cached() {
          Phase::ServingCached
        } else {
          Phase::Idle
        };
        self.apply(result.clone());
        Ok(result)
      }
      Err(error) => {
        warn!("Foreground load failed with nothing cached: {}", error);
        self.state.phase = Phase::Idle;
        if self.current.is_none() {
          self.state.logged_in = false;
          self.current = Some(CacheResult::fallback(
            AttendanceSnapshot::logged_out(),
            error.clone(),
          ));
        }
        Err(error)
      }
    }
  }

  /// A lapsed session still shows whatever was on screen or in the cache.
  fn keep_prior_records_when_logged_out(
    &self,
    result: CacheResult<AttendanceSnapshot>,
  ) -> CacheResult<AttendanceSnapshot> {
    if result.data.logged_in {
      return result;
    }

    let prior = self
      .current
      .clone()
      .or_else(|| self.cache.cached::<AttendanceSnapshot>(&self.cache_key()));

    match prior {
      Some(prior) if !prior.data.records.is_empty() => {
        info!("Portal session lapsed, keeping {} prior records", prior.data.records.len());
        CacheResult {
          data: AttendanceSnapshot {
            logged_in: false,
            records: prior.data.records,
          },
          source: CacheSource::Cache,
          cached_at: prior.cached_at,
          error: result.error,
        }
      }
      _ => result,
    }
  }

  fn apply(&mut self, result: CacheResult<AttendanceSnapshot>) {
    self.state.logged_in = result.data.logged_in;
    let snapshot = result.data.clone();
    self.current = Some(result);
    self.subscribers.publish(SyncEvent::Updated(snapshot));
  }

  /// Seconds left before another refresh is accepted, rounded up.
  pub fn cooldown_remaining(&self, now: Instant) -> Option<u64> {
    let last = self.state.last_manual_refresh_at?;
    let elapsed = now.saturating_duration_since(last);
    let remaining = self.cooldown.checked_sub(elapsed)?;
    if remaining.is_zero() {
      return None;
    }
    Some(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
  }

  pub fn refresh(&mut self) -> RefreshOutcome {
    self.refresh_at(Instant::now())
  }

  /// Manual refresh. Rejected inside the cooldown window, coalesced while a
  /// fetch is in flight, otherwise revalidates in the background.
  pub fn refresh_at(&mut self, now: Instant) -> RefreshOutcome {
    if let Some(seconds_remaining) = self.cooldown_remaining(now) {
      debug!("Refresh rejected, {}s of cooldown left", seconds_remaining);
      self
        .subscribers
        .publish(SyncEvent::CooldownRejected { seconds_remaining });
      return RefreshOutcome::CoolingDown { seconds_remaining };
    }

    // A fetch started before the last load or reset will be ignored, so it
    // cannot serve this call
    if self.in_flight == Some(self.state.latest_request) {
      debug!("Refresh coalesced into in-flight fetch");
      self.subscribers.publish(SyncEvent::Coalesced);
      return RefreshOutcome::Coalesced;
    }

    self.state.last_manual_refresh_at = Some(now);
    let request = self.state.next_request();
    self.in_flight = Some(request);
    self.state.background_fetch_in_progress = true;
    self.state.phase = Phase::FetchingBackground;

    let source = self.source.clone();
    let revalidating = self
      .cache
      .stale_while_revalidate(&self.cache_key(), move || async move {
        source.fetch_attendance(true).await
      });

    if self.current.is_none() {
      if let Some(cached) = revalidating.cached {
        self.apply(cached);
      }
    }

    let tx = self.completions_tx.clone();
    let refresh = revalidating.refresh;
    tokio::spawn(async move {
      let result = refresh.await;
      // Receiver lives as long as the coordinator
      let _ = tx.send(Completion { request, result });
    });

    info!("Background refresh {} started ({:?})", request, self.policy(true));
    RefreshOutcome::Started
  }

  /// Apply any finished background fetches without blocking.
  /// Returns whether the visible snapshot changed.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(completion) = self.completions_rx.try_recv() {
      changed |= self.complete(completion);
    }
    changed
  }

  /// Wait for the in-flight background fetch, if any, and apply it.
  pub async fn settle(&mut self) -> bool {
    let mut changed = false;
    while self.in_flight.is_some() {
      match self.completions_rx.recv().await {
        Some(completion) => changed |= self.complete(completion),
        None => break,
      }
    }
    changed
  }

  fn complete(&mut self, completion: Completion) -> bool {
    if self.in_flight == Some(completion.request) {
      self.in_flight = None;
      self.state.background_fetch_in_progress = false;
      if self.state.phase == Phase::FetchingBackground {
        self.state.phase = Phase::Idle;
      }
    }

    if completion.request != self.state.latest_request {
      debug!("Ignoring superseded fetch {}", completion.request);
      return false;
    }

    match completion.result {
      Ok(snapshot) => {
        self.cache.commit(&self.cache_key(), &snapshot);
        let result = self.keep_prior_records_when_logged_out(CacheResult::from_network(snapshot));
        self.apply(result);
        true
      }
      Err(error) => {
        // Background failures never surface; the current snapshot stays
        debug!("Background refresh failed: {}", error);
        self.subscribers.publish(SyncEvent::Stale {
          reason: error.to_string(),
        });
        false
      }
    }
  }

  /// Drop every cached entry and session flag, then load from scratch.
  pub async fn full_reset(&mut self) -> Result<CacheResult<AttendanceSnapshot>, SyncError> {
    match self.cache.clear() {
      Ok(removed) => info!("Full reset: removed {} cache entries", removed),
      Err(e) => warn!("Full reset could not clear the cache: {}", e),
    }

    self.current = None;
    self.state = SyncState {
      background_fetch_in_progress: self.in_flight.is_some(),
      latest_request: self.state.latest_request,
      ..SyncState::default()
    };

    self.load_initial().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analytics::fixtures::records_with;
  use crate::cache::{NoopStorage, SqliteStorage};
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::{Arc, Mutex};
  use url::Url;

  /// Source that replays scripted responses in call order.
  #[derive(Clone, Default)]
  struct FakeSource {
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Result<AttendanceSnapshot, SyncError>>>>,
  }

  impl FakeSource {
    fn push(&self, response: Result<AttendanceSnapshot, SyncError>) {
      self.script.lock().unwrap().push_back(response);
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl AttendanceSource for FakeSource {
    fn locator(&self, force: bool) -> Url {
      let mut url = Url::parse("https://proxy.example.edu/api/data").unwrap();
      if force {
        url.query_pairs_mut().append_pair("refresh", "1");
      }
      url
    }

    async fn fetch_attendance(&self, _force: bool) -> Result<AttendanceSnapshot, SyncError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      let next = self.script.lock().unwrap().pop_front();
      next.unwrap_or_else(|| Err(SyncError::Network("no scripted response".into())))
    }
  }

  fn snapshot(statuses: &[&str]) -> AttendanceSnapshot {
    AttendanceSnapshot {
      logged_in: true,
      records: records_with("Anatomy", statuses),
    }
  }

  fn offline() -> SyncError {
    SyncError::Network("connection refused".into())
  }

  fn coordinator(source: &FakeSource) -> SyncCoordinator<FakeSource> {
    SyncCoordinator::new(
      source.clone(),
      CacheLayer::new(SqliteStorage::in_memory().unwrap()),
      Duration::from_secs(60),
    )
  }

  #[tokio::test]
  async fn test_first_load_prefers_network() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present", "absent"])));
    let mut coordinator = coordinator(&source);

    let result = coordinator.load_initial().await.unwrap();

    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(result.data.records.len(), 2);
    assert!(coordinator.state().logged_in);
    assert!(coordinator.state().first_load_done);
    assert_eq!(source.calls(), 1);
  }

  #[tokio::test]
  async fn test_repeat_load_is_served_from_cache() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    let mut coordinator = coordinator(&source);

    coordinator.load_initial().await.unwrap();
    let second = coordinator.load_initial().await.unwrap();

    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(coordinator.state().phase, Phase::ServingCached);
    assert_eq!(source.calls(), 1);
  }

  #[tokio::test]
  async fn test_network_failure_with_empty_cache() {
    let source = FakeSource::default();
    source.push(Err(offline()));
    let mut coordinator = coordinator(&source);

    let result = coordinator.load_initial().await;

    assert_eq!(result.unwrap_err(), offline());
    let current = coordinator.current().unwrap();
    assert_eq!(current.data, AttendanceSnapshot::logged_out());
    assert_eq!(current.source, CacheSource::Fallback);
    assert!(coordinator.records().is_empty());
  }

  #[tokio::test]
  async fn test_network_failure_falls_back_to_cache() {
    let source = FakeSource::default();
    let cache = CacheLayer::new(SqliteStorage::in_memory().unwrap());
    let key = CacheKey::normalize(&source.locator(false));
    cache.store(&key, &snapshot(&["present", "leave"])).unwrap();
    source.push(Err(offline()));

    let mut coordinator = SyncCoordinator::new(source.clone(), cache, Duration::from_secs(60));
    let result = coordinator.load_initial().await.unwrap();

    assert_eq!(result.source, CacheSource::Offline);
    assert_eq!(result.data.records.len(), 2);
    assert_eq!(result.error, Some(offline()));
  }

  #[tokio::test]
  async fn test_works_without_persistent_cache() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    source.push(Ok(snapshot(&["present", "present"])));
    let mut coordinator =
      SyncCoordinator::new(source.clone(), CacheLayer::new(NoopStorage), Duration::from_secs(60));

    coordinator.load_initial().await.unwrap();
    let second = coordinator.load_initial().await.unwrap();

    // Nothing is ever cached, so every load hits the network
    assert_eq!(second.source, CacheSource::Network);
    assert_eq!(source.calls(), 2);
  }

  #[tokio::test]
  async fn test_refresh_inside_cooldown_is_rejected() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    let mut coordinator = coordinator(&source);
    let mut events = coordinator.subscribe();

    let t0 = Instant::now();
    assert_eq!(coordinator.refresh_at(t0), RefreshOutcome::Started);
    coordinator.settle().await;

    let second = coordinator.refresh_at(t0 + Duration::from_secs(10));
    assert_eq!(
      second,
      RefreshOutcome::CoolingDown {
        seconds_remaining: 50
      }
    );
    coordinator.settle().await;
    assert_eq!(source.calls(), 1);

    let mut saw_rejection = false;
    while let Ok(event) = events.receiver.try_recv() {
      if event == (SyncEvent::CooldownRejected { seconds_remaining: 50 }) {
        saw_rejection = true;
      }
    }
    assert!(saw_rejection);
  }

  #[tokio::test]
  async fn test_cooldown_expires() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    source.push(Ok(snapshot(&["present", "absent"])));
    let mut coordinator = coordinator(&source);

    let t0 = Instant::now();
    coordinator.refresh_at(t0);
    coordinator.settle().await;

    assert_eq!(coordinator.cooldown_remaining(t0 + Duration::from_millis(59_500)), Some(1));
    assert_eq!(coordinator.cooldown_remaining(t0 + Duration::from_secs(60)), None);
    assert_eq!(
      coordinator.refresh_at(t0 + Duration::from_secs(61)),
      RefreshOutcome::Started
    );
    coordinator.settle().await;
    assert_eq!(coordinator.records().len(), 2);
  }

  #[tokio::test]
  async fn test_refresh_while_in_flight_is_coalesced() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    let mut coordinator =
      SyncCoordinator::new(source.clone(), CacheLayer::new(NoopStorage), Duration::ZERO);

    let t0 = Instant::now();
    assert_eq!(coordinator.refresh_at(t0), RefreshOutcome::Started);
    assert!(coordinator.state().background_fetch_in_progress);
    assert_eq!(
      coordinator.refresh_at(t0 + Duration::from_secs(1)),
      RefreshOutcome::Coalesced
    );

    assert!(coordinator.settle().await);
    assert_eq!(source.calls(), 1);
    assert!(!coordinator.state().background_fetch_in_progress);
    assert_eq!(coordinator.state().phase, Phase::Idle);
  }

  #[tokio::test]
  async fn test_refresh_updates_cache_and_notifies() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    source.push(Ok(snapshot(&["present", "absent", "leave"])));
    let mut coordinator = coordinator(&source);
    coordinator.load_initial().await.unwrap();
    let mut events = coordinator.subscribe();

    coordinator.refresh_at(Instant::now());
    assert!(coordinator.settle().await);

    assert_eq!(coordinator.records().len(), 3);
    match events.receiver.try_recv().unwrap() {
      SyncEvent::Updated(snapshot) => assert_eq!(snapshot.records.len(), 3),
      other => panic!("unexpected event {:?}", other),
    }

    // Next load in this session comes from the refreshed cache
    assert_eq!(coordinator.load_initial().await.unwrap().data.records.len(), 3);
    assert_eq!(source.calls(), 2);
  }

  #[tokio::test]
  async fn test_background_failure_is_absorbed() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present", "present"])));
    source.push(Err(offline()));
    let mut coordinator = coordinator(&source);
    coordinator.load_initial().await.unwrap();
    let mut events = coordinator.subscribe();

    coordinator.refresh_at(Instant::now());
    assert!(!coordinator.settle().await);

    assert_eq!(coordinator.records().len(), 2);
    assert_eq!(coordinator.state().phase, Phase::Idle);
    assert!(matches!(
      events.receiver.try_recv().unwrap(),
      SyncEvent::Stale { .. }
    ));
  }

  #[tokio::test]
  async fn test_superseded_fetch_is_ignored() {
    let source = FakeSource::default();
    // The foreground load runs before the spawned refresh gets polled
    source.push(Ok(snapshot(&["present", "present", "present"])));
    source.push(Ok(snapshot(&["absent"])));
    let mut coordinator = coordinator(&source);

    coordinator.refresh_at(Instant::now());
    coordinator.load_initial().await.unwrap();
    assert!(!coordinator.settle().await);

    assert_eq!(source.calls(), 2);
    assert_eq!(coordinator.records().len(), 3);
    assert!(!coordinator.state().background_fetch_in_progress);
  }

  #[tokio::test]
  async fn test_lapsed_session_keeps_prior_records() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present", "absent"])));
    source.push(Ok(AttendanceSnapshot::logged_out()));
    let mut coordinator = coordinator(&source);
    coordinator.load_initial().await.unwrap();

    coordinator.refresh_at(Instant::now());
    coordinator.settle().await;

    assert!(!coordinator.state().logged_in);
    assert_eq!(coordinator.records().len(), 2);

    // The lapsed response never overwrote the cache
    let key = CacheKey::normalize(&source.locator(false));
    let cached = coordinator.cache.cached::<AttendanceSnapshot>(&key).unwrap();
    assert!(cached.data.logged_in);
  }

  #[tokio::test]
  async fn test_full_reset_clears_cache_and_refetches() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present"])));
    source.push(Err(offline()));
    source.push(Err(offline()));
    let mut coordinator = coordinator(&source);
    coordinator.load_initial().await.unwrap();
    coordinator.refresh_at(Instant::now());
    coordinator.settle().await;

    let result = coordinator.full_reset().await;

    // Cache is gone, so the failed fetch has nothing to fall back to
    assert_eq!(result.unwrap_err(), offline());
    assert!(coordinator.records().is_empty());
    assert_eq!(coordinator.state().last_manual_refresh_at, None);
    assert_eq!(coordinator.cooldown_remaining(Instant::now()), None);
    assert_eq!(source.calls(), 3);
  }

  #[tokio::test]
  async fn test_refresh_after_load_does_not_join_superseded_fetch() {
    let source = FakeSource::default();
    // The load runs before either spawned refresh gets polled
    source.push(Ok(snapshot(&["present", "present", "present"])));
    source.push(Ok(snapshot(&["present", "absent", "leave", "present", "present"])));
    source.push(Ok(snapshot(&["present", "absent", "leave", "present", "present"])));
    let mut coordinator = coordinator(&source);

    let t0 = Instant::now();
    coordinator.refresh_at(t0);
    coordinator.load_initial().await.unwrap();

    assert_eq!(
      coordinator.refresh_at(t0 + Duration::from_secs(61)),
      RefreshOutcome::Started
    );
    assert!(coordinator.settle().await);

    assert_eq!(source.calls(), 3);
    assert_eq!(coordinator.records().len(), 5);
    assert!(!coordinator.state().background_fetch_in_progress);
  }

  #[tokio::test]
  async fn test_fetch_started_before_reset_does_not_refill_cache() {
    let source = FakeSource::default();
    source.push(Ok(snapshot(&["present", "absent"])));
    // Reset's load runs before the spawned refresh gets polled
    source.push(Err(offline()));
    source.push(Ok(snapshot(&["present", "absent"])));
    let mut coordinator = coordinator(&source);
    coordinator.load_initial().await.unwrap();

    coordinator.refresh_at(Instant::now());
    assert!(coordinator.full_reset().await.is_err());
    assert!(!coordinator.settle().await);

    let key = CacheKey::normalize(&source.locator(false));
    assert!(coordinator.cache.cached::<AttendanceSnapshot>(&key).is_none());
    assert!(coordinator.records().is_empty());
    assert_eq!(source.calls(), 3);
  }
}
