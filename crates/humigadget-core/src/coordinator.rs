//! Periodic polling with cached data.
//!
//! One [`PollCoordinator`] exists per configured device. It owns the
//! device record, runs the refresh callable on a fixed interval, and
//! keeps serving the previous readings when a poll cycle fails.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use humigadget_types::HumigadgetDevice;

use crate::error::{Error, Result};

/// Default interval between poll cycles.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// The refresh callable a coordinator drives.
///
/// Mutates the device record in place on success; on failure the record
/// must be left as it was.
pub type UpdateFn =
    Box<dyn for<'a> Fn(&'a mut HumigadgetDevice) -> BoxFuture<'a, Result<()>> + Send + Sync>;

struct Inner {
    device: HumigadgetDevice,
    last_success: Option<OffsetDateTime>,
    last_error: Option<String>,
    last_update_ok: bool,
}

/// Owns one device record and refreshes it on a fixed interval.
pub struct PollCoordinator {
    name: String,
    interval: Duration,
    update_fn: UpdateFn,
    inner: RwLock<Inner>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for PollCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCoordinator")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl PollCoordinator {
    /// Create a coordinator around an initialized device record.
    ///
    /// The coordinator does not poll until [`PollCoordinator::spawn`] is
    /// called; run [`PollCoordinator::refresh`] first for the initial data.
    pub fn new(
        name: impl Into<String>,
        device: HumigadgetDevice,
        interval: Duration,
        update_fn: UpdateFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            interval,
            update_fn,
            inner: RwLock::new(Inner {
                device,
                last_success: None,
                last_error: None,
                last_update_ok: false,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// The coordinator name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The configured poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one poll cycle now.
    ///
    /// On failure the cached record is untouched and the error surfaces
    /// as [`Error::UpdateFailed`]; readings go stale rather than blank.
    pub async fn refresh(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        match (self.update_fn)(&mut inner.device).await {
            Ok(()) => {
                inner.last_success = Some(OffsetDateTime::now_utc());
                inner.last_error = None;
                inner.last_update_ok = true;
                debug!(name = %self.name, "Poll cycle succeeded");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                inner.last_error = Some(message.clone());
                inner.last_update_ok = false;
                warn!(name = %self.name, error = %message, "Poll cycle failed, keeping previous data");
                Err(Error::update_failed(message))
            }
        }
    }

    /// Start the background poll loop.
    ///
    /// The loop runs until [`PollCoordinator::shutdown`] is called. The
    /// immediate first tick of the interval is skipped; callers are
    /// expected to have refreshed once during setup.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = coordinator.cancel.cancelled() => {
                        debug!(name = %coordinator.name, "Poll loop stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let _ = coordinator.refresh().await;
                    }
                }
            }
        })
    }

    /// Snapshot of the cached device record.
    pub async fn data(&self) -> HumigadgetDevice {
        self.inner.read().await.device.clone()
    }

    /// Whether the most recent poll cycle succeeded.
    pub async fn last_update_success(&self) -> bool {
        self.inner.read().await.last_update_ok
    }

    /// When the last successful poll cycle finished.
    pub async fn last_success(&self) -> Option<OffsetDateTime> {
        self.inner.read().await.last_success
    }

    /// The error message of the most recent failed poll cycle, if the
    /// coordinator is currently in a failed state.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.read().await.last_error.clone()
    }

    /// Stop the background poll loop.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether [`PollCoordinator::shutdown`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use humigadget_types::{CHANNEL_TEMPERATURE, SensorValue};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Route poll-loop logs through the test writer; RUST_LOG selects levels.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn counting_update_fn(counter: Arc<AtomicU32>, fail: Arc<AtomicBool>) -> UpdateFn {
        Box::new(move |device| {
            let counter = Arc::clone(&counter);
            let fail = Arc::clone(&fail);
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if fail.load(Ordering::SeqCst) {
                    Err(Error::NotConnected)
                } else {
                    device.set_sensor(CHANNEL_TEMPERATURE, SensorValue::Float(20.0 + count as f32));
                    Ok(())
                }
            }
            .boxed()
        })
    }

    fn test_coordinator(
        counter: Arc<AtomicU32>,
        fail: Arc<AtomicBool>,
        interval: Duration,
    ) -> Arc<PollCoordinator> {
        PollCoordinator::new(
            "humigadget AA:BB:CC:DD:EE:FF",
            HumigadgetDevice::new(),
            interval,
            counting_update_fn(counter, fail),
        )
    }

    #[tokio::test]
    async fn test_refresh_success_updates_cache() {
        let counter = Arc::new(AtomicU32::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let coordinator = test_coordinator(counter.clone(), fail, DEFAULT_POLL_INTERVAL);

        assert!(!coordinator.last_update_success().await);
        coordinator.refresh().await.unwrap();

        assert!(coordinator.last_update_success().await);
        assert!(coordinator.last_success().await.is_some());
        assert_eq!(coordinator.last_error().await, None);
        assert_eq!(
            coordinator.data().await.sensor(CHANNEL_TEMPERATURE),
            Some(SensorValue::Float(20.0))
        );
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_stale_data() {
        init_tracing();
        let counter = Arc::new(AtomicU32::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let coordinator = test_coordinator(counter.clone(), fail.clone(), DEFAULT_POLL_INTERVAL);

        coordinator.refresh().await.unwrap();
        let before = coordinator.data().await;

        fail.store(true, Ordering::SeqCst);
        let err = coordinator.refresh().await.unwrap_err();
        assert!(matches!(err, Error::UpdateFailed { .. }));
        assert!(err.to_string().starts_with("Unable to fetch data:"));

        // Previous readings survive the failed cycle.
        assert_eq!(coordinator.data().await, before);
        assert!(!coordinator.last_update_success().await);
        assert!(coordinator.last_error().await.is_some());

        // The next good cycle clears the failed state.
        fail.store(false, Ordering::SeqCst);
        coordinator.refresh().await.unwrap();
        assert!(coordinator.last_update_success().await);
        assert_eq!(coordinator.last_error().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_polls_on_interval() {
        init_tracing();
        let counter = Arc::new(AtomicU32::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let coordinator =
            test_coordinator(counter.clone(), fail, Duration::from_secs(60));

        coordinator.refresh().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let handle = coordinator.spawn();

        // Two intervals elapse, two poll cycles run.
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        coordinator.shutdown();
        handle.await.unwrap();
        assert!(coordinator.is_cancelled());

        // No further polls after shutdown.
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_survives_failed_cycles() {
        let counter = Arc::new(AtomicU32::new(0));
        let fail = Arc::new(AtomicBool::new(true));
        let coordinator = test_coordinator(counter.clone(), fail.clone(), Duration::from_secs(60));

        let handle = coordinator.spawn();
        tokio::time::sleep(Duration::from_secs(125)).await;

        // Cycles keep running despite failures.
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(!coordinator.last_update_success().await);

        coordinator.shutdown();
        handle.await.unwrap();
    }
}
