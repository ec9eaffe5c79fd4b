//! # Debounced Mutation Coordinator
//!
//! Watches a value, compares it against the last saved snapshot and
//! schedules one delayed save per burst of changes.
//!
//! ```text
//! notify_changed(v) ─┬─ v == baseline ───→ cancel timer, Dirty → Idle
//!                    └─ changed ─────────→ Dirty, restart timer
//! timer fires ──────────────────────────→ Saving, save(newest value)
//! save ok ──────────────────────────────→ Saved ─(saved_display)→ Idle
//! save failed ──────────────────────────→ Error (sticky)
//! ```
//!
//! The baseline is the value of the save in flight, if any, and otherwise
//! the last saved value.
//!
//! Every restart bumps a generation counter; a timer whose generation is no
//! longer current does nothing. Saves run in their own task, so a save that
//! already started survives `dispose` and a panic inside it is contained.

use crate::state::SaveStatus;
use bio_common::{ServiceError, ServiceResult};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceConfig {
    /// Quiet period after the last change before saving
    pub delay: Duration,
    /// How long `Saved` is shown before returning to `Idle`
    pub saved_display: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1200),
            saved_display: Duration::from_millis(2000),
        }
    }
}

struct Shared<T> {
    last_saved: T,
    /// Generation and value of the save currently running
    in_flight: Option<(u64, T)>,
    enabled: bool,
    generation: u64,
    timer: Option<JoinHandle<()>>,
    display: Option<JoinHandle<()>>,
}

impl<T> Shared<T> {
    fn cancel_timers(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(display) = self.display.take() {
            display.abort();
        }
    }
}

struct Inner<T, F> {
    config: DebounceConfig,
    save: F,
    shared: Mutex<Shared<T>>,
    status: watch::Sender<SaveStatus>,
}

impl<T, F> Inner<T, F> {
    fn shared(&self) -> MutexGuard<'_, Shared<T>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: SaveStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "Save status changed");
        }
    }

    fn status(&self) -> SaveStatus {
        *self.status.borrow()
    }
}

pub struct DebouncedSaver<T, F> {
    inner: Arc<Inner<T, F>>,
}

impl<T, F, Fut> DebouncedSaver<T, F>
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<()>> + Send + 'static,
{
    pub fn new(initial: T, config: DebounceConfig, save: F) -> Self {
        let (status, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                save,
                shared: Mutex::new(Shared {
                    last_saved: initial,
                    in_flight: None,
                    enabled: true,
                    generation: 0,
                    timer: None,
                    display: None,
                }),
                status,
            }),
        }
    }

    /// Report the current value. Must be called from within a tokio runtime.
    ///
    /// Returns whether a save was scheduled.
    pub fn notify_changed(&self, value: T) -> bool {
        let mut shared = self.inner.shared();
        if !shared.enabled {
            return false;
        }

        let unchanged = match &shared.in_flight {
            Some((_, saving)) => value == *saving,
            None => value == shared.last_saved,
        };
        if unchanged {
            shared.generation += 1;
            if let Some(timer) = shared.timer.take() {
                timer.abort();
            }
            if self.inner.status() == SaveStatus::Dirty {
                let settled = if shared.in_flight.is_some() {
                    SaveStatus::Saving
                } else {
                    SaveStatus::Idle
                };
                self.inner.set_status(settled);
            }
            return false;
        }

        shared.generation += 1;
        shared.cancel_timers();
        self.inner.set_status(SaveStatus::Dirty);

        let generation = shared.generation;
        let inner = Arc::clone(&self.inner);
        shared.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(inner.config.delay).await;
            fire(inner, generation, value).await;
        }));
        true
    }

    /// Latest value that was saved successfully
    pub fn last_saved(&self) -> T {
        self.inner.shared().last_saved.clone()
    }

    /// Record a value persisted outside the debounce cycle. A pending timer
    /// is dropped and `Dirty` settles to `Idle`.
    pub fn mark_saved(&self, value: T) {
        let mut shared = self.inner.shared();
        shared.last_saved = value;
        shared.generation += 1;
        if let Some(timer) = shared.timer.take() {
            timer.abort();
        }
        if self.inner.status() == SaveStatus::Dirty {
            self.inner.set_status(SaveStatus::Idle);
        }
    }
}

impl<T, F> DebouncedSaver<T, F> {
    pub fn status(&self) -> SaveStatus {
        self.inner.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.inner.status.subscribe()
    }

    /// Disabling cancels any pending timer; changes are ignored until
    /// re-enabled
    pub fn set_enabled(&self, enabled: bool) {
        let mut shared = self.inner.shared();
        shared.enabled = enabled;
        if !enabled {
            shared.generation += 1;
            shared.cancel_timers();
        }
    }

    pub fn dispose(&self) {
        self.set_enabled(false);
    }

    pub fn has_pending_timer(&self) -> bool {
        self.inner
            .shared()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }
}

impl<T, F> Drop for DebouncedSaver<T, F> {
    fn drop(&mut self) {
        self.inner.shared().cancel_timers();
    }
}

async fn fire<T, F, Fut>(inner: Arc<Inner<T, F>>, generation: u64, value: T)
where
    T: Clone + PartialEq + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<()>> + Send + 'static,
{
    {
        let mut shared = inner.shared();
        if shared.generation != generation || !shared.enabled {
            return;
        }
        // detach: the save must outlive later restarts
        drop(shared.timer.take());
        shared.in_flight = Some((generation, value.clone()));
    }

    inner.set_status(SaveStatus::Saving);
    let result = match tokio::spawn((inner.save)(value.clone())).await {
        Ok(result) => result,
        Err(join) if join.is_panic() => {
            error!("Save task panicked");
            Err(ServiceError::Unexpected("save task panicked".to_string()))
        }
        Err(_) => Err(ServiceError::Unexpected("save task cancelled".to_string())),
    };

    let mut shared = inner.shared();
    if shared
        .in_flight
        .as_ref()
        .is_some_and(|(running, _)| *running == generation)
    {
        shared.in_flight = None;
    }
    match result {
        Ok(()) => {
            shared.last_saved = value;
            if shared.generation != generation && inner.status() == SaveStatus::Dirty {
                debug!("Newer changes pending, staying dirty");
                return;
            }
            inner.set_status(SaveStatus::Saved);

            let current = shared.generation;
            let display = Arc::clone(&inner);
            shared.display = Some(tokio::spawn(async move {
                tokio::time::sleep(display.config.saved_display).await;
                let shared = display.shared();
                if shared.generation == current && display.status() == SaveStatus::Saved {
                    display.set_status(SaveStatus::Idle);
                }
            }));
        }
        Err(error) => {
            warn!(%error, "Autosave failed");
            inner.set_status(SaveStatus::Error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    type Log = Arc<Mutex<Vec<(Duration, i32)>>>;

    fn recording_saver(
        log: &Log,
        start: Instant,
    ) -> DebouncedSaver<i32, impl Fn(i32) -> std::future::Ready<ServiceResult<()>>> {
        let log = Arc::clone(log);
        DebouncedSaver::new(0, DebounceConfig::default(), move |value| {
            log.lock().unwrap().push((start.elapsed(), value));
            std::future::ready(Ok(()))
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_changes_coalesce_into_one_save() {
        let log: Log = Arc::default();
        let start = Instant::now();
        let saver = recording_saver(&log, start);

        saver.notify_changed(1);
        sleep(Duration::from_millis(200)).await;
        saver.notify_changed(2);
        sleep(Duration::from_millis(200)).await;
        saver.notify_changed(3);
        assert_eq!(saver.status(), SaveStatus::Dirty);

        sleep(Duration::from_millis(1100)).await;
        assert!(log.lock().unwrap().is_empty());

        sleep(Duration::from_millis(500)).await;
        let saves = log.lock().unwrap().clone();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1, 3);
        assert!(saves[0].0 >= Duration::from_millis(1600));
        assert_eq!(saver.last_saved(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saved_then_idle() {
        let log: Log = Arc::default();
        let saver = recording_saver(&log, Instant::now());

        saver.notify_changed(7);
        sleep(Duration::from_millis(1300)).await;
        assert_eq!(saver.status(), SaveStatus::Saved);

        sleep(Duration::from_millis(2100)).await;
        assert_eq!(saver.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_to_saved_value_cancels() {
        let log: Log = Arc::default();
        let saver = recording_saver(&log, Instant::now());

        saver.notify_changed(1);
        assert_eq!(saver.status(), SaveStatus::Dirty);
        saver.notify_changed(0);
        assert_eq!(saver.status(), SaveStatus::Idle);

        sleep(Duration::from_secs(5)).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_timer() {
        let log: Log = Arc::default();
        let saver = recording_saver(&log, Instant::now());

        saver.notify_changed(1);
        assert!(saver.has_pending_timer());
        saver.dispose();
        assert!(!saver.has_pending_timer());

        saver.notify_changed(2);
        sleep(Duration::from_secs(5)).await;
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_sticky() {
        let saver = DebouncedSaver::new(0, DebounceConfig::default(), |_value: i32| async {
            Err::<(), _>(ServiceError::Network("offline".into()))
        });
        let mut rx = saver.subscribe();

        saver.notify_changed(1);
        sleep(Duration::from_secs(10)).await;
        assert_eq!(saver.status(), SaveStatus::Error);
        assert_eq!(*rx.borrow_and_update(), SaveStatus::Error);
        assert_eq!(saver.last_saved(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_save_reports_error() {
        let saver = DebouncedSaver::new(0, DebounceConfig::default(), |value: i32| async move {
            if value > 0 {
                panic!("serializer blew up");
            }
            Ok::<(), ServiceError>(())
        });

        saver.notify_changed(1);
        sleep(Duration::from_secs(2)).await;
        assert_eq!(saver.status(), SaveStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_during_save_keep_dirty() {
        let log: Log = Arc::default();
        let start = Instant::now();
        let inner_log = Arc::clone(&log);
        let saver = DebouncedSaver::new(0, DebounceConfig::default(), move |value: i32| {
            let log = Arc::clone(&inner_log);
            async move {
                sleep(Duration::from_millis(500)).await;
                log.lock().unwrap().push((start.elapsed(), value));
                Ok(())
            }
        });

        saver.notify_changed(1);
        sleep(Duration::from_millis(1300)).await;
        assert_eq!(saver.status(), SaveStatus::Saving);

        saver.notify_changed(2);
        sleep(Duration::from_millis(500)).await;
        assert_eq!(saver.status(), SaveStatus::Dirty);
        assert_eq!(saver.last_saved(), 1);

        sleep(Duration::from_secs(3)).await;
        let values: Vec<i32> = log.lock().unwrap().iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(saver.last_saved(), 2);
    }

    type SlowSave = std::pin::Pin<Box<dyn Future<Output = ServiceResult<()>> + Send>>;

    /// Saver whose saves take 500ms
    fn slow_saver(log: &Log, start: Instant) -> DebouncedSaver<i32, impl Fn(i32) -> SlowSave> {
        let log = Arc::clone(log);
        DebouncedSaver::new(0, DebounceConfig::default(), move |value: i32| -> SlowSave {
            let log = Arc::clone(&log);
            Box::pin(async move {
                sleep(Duration::from_millis(500)).await;
                log.lock().unwrap().push((start.elapsed(), value));
                Ok(())
            })
        })
    }

    fn saved_values(log: &Log) -> Vec<i32> {
        log.lock().unwrap().iter().map(|(_, v)| *v).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_during_save_is_saved() {
        let log: Log = Arc::default();
        let saver = slow_saver(&log, Instant::now());

        saver.notify_changed(1);
        sleep(Duration::from_millis(1300)).await;
        assert_eq!(saver.status(), SaveStatus::Saving);

        // back to the last saved value while 1 is still being written
        assert!(saver.notify_changed(0));
        assert_eq!(saver.status(), SaveStatus::Dirty);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(saved_values(&log), vec![1, 0]);
        assert_eq!(saver.last_saved(), 0);
        assert_eq!(saver.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_return_to_in_flight_value_skips_second_save() {
        let log: Log = Arc::default();
        let saver = slow_saver(&log, Instant::now());

        saver.notify_changed(1);
        sleep(Duration::from_millis(1300)).await;
        saver.notify_changed(2);
        assert_eq!(saver.status(), SaveStatus::Dirty);
        assert!(!saver.notify_changed(1));
        assert_eq!(saver.status(), SaveStatus::Saving);
        assert!(!saver.has_pending_timer());

        sleep(Duration::from_secs(10)).await;
        assert_eq!(saved_values(&log), vec![1]);
        assert_eq!(saver.last_saved(), 1);
        assert_eq!(saver.status(), SaveStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_saved_moves_baseline() {
        let log: Log = Arc::default();
        let saver = recording_saver(&log, Instant::now());

        saver.notify_changed(4);
        saver.mark_saved(4);
        assert_eq!(saver.status(), SaveStatus::Idle);
        assert!(!saver.has_pending_timer());

        saver.notify_changed(4);
        sleep(Duration::from_secs(5)).await;
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(saver.last_saved(), 4);
    }
}
