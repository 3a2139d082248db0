use std::sync::Arc;

use anyhow::bail;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    StateUpdateSender,
    location::{
        Authorization, Location, LocationService, LocationUpdate, LocationUpdateRx,
    },
    prelude::*,
    settings::UpdateOptions,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, specta::Type)]
pub enum ProviderStatus {
    Stopped,
    Updating,
}

/// Keeps track of the most recent fix from a [LocationService].
///
/// The service pushes [LocationUpdate]s into a channel, a single task drains it and
/// overwrites the stored location. Readers only ever see the latest fix, no history is kept.
pub struct LocationProvider<L: LocationService, S: StateUpdateSender> {
    service: L,
    state_update_sender: Arc<S>,
    latest: Arc<watch::Sender<Option<Location>>>,
    running: Mutex<Option<RunningUpdates>>,
}

/// Present while updating
struct RunningUpdates {
    /// Cancelling this ends `task`
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl<L: LocationService, S: StateUpdateSender> LocationProvider<L, S> {
    pub fn new(service: L, state_update_sender: Arc<S>) -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            service,
            state_update_sender,
            latest: Arc::new(latest),
            running: Mutex::new(None),
        }
    }

    /// Request authorization and begin receiving fixes, does nothing if already updating
    pub async fn start(&self, options: &UpdateOptions) -> Result {
        if self.running.lock().await.is_some() {
            debug!("Location updates already running");
            return Ok(());
        }

        // May block on a permission prompt, don't hold the lock while it's up
        let authorization = self
            .service
            .request_authorization()
            .context("Failed to request location authorization")?;

        if authorization == Authorization::Denied {
            bail!("Location permission was denied");
        }

        let mut running = self.running.lock().await;

        if running.is_some() {
            debug!("Location updates were started while requesting authorization");
            return Ok(());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.service
            .start_updates(options, tx)
            .context("Failed to start location updates")?;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(update_loop(
            rx,
            cancel.clone(),
            self.latest.clone(),
            self.state_update_sender.clone(),
        ));
        *running = Some(RunningUpdates { cancel, task });

        info!("Started location updates ({authorization:?})");

        Ok(())
    }

    /// Stop receiving fixes, the last known location is kept. Once this returns no more
    /// fixes will be stored.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;

        if let Some(RunningUpdates { cancel, task }) = running.take() {
            cancel.cancel();
            if let Err(why) = self.service.stop_updates() {
                error!("Failed to stop location updates: {why:?}");
            }
            if let Err(why) = task.await {
                error!("Location update task failed: {why:?}");
            }
            info!("Stopped location updates");
        }
    }

    pub async fn status(&self) -> ProviderStatus {
        if self.running.lock().await.is_some() {
            ProviderStatus::Updating
        } else {
            ProviderStatus::Stopped
        }
    }

    pub fn latest(&self) -> Option<Location> {
        *self.latest.borrow()
    }

    /// Get notified whenever a new fix comes in
    pub fn subscribe(&self) -> watch::Receiver<Option<Location>> {
        self.latest.subscribe()
    }
}

impl<L: LocationService, S: StateUpdateSender> Drop for LocationProvider<L, S> {
    fn drop(&mut self) {
        if let Some(RunningUpdates { cancel, .. }) = self.running.get_mut().take() {
            cancel.cancel();
            if let Err(why) = self.service.stop_updates() {
                error!("Failed to stop location updates on drop: {why:?}");
            }
        }
    }
}

async fn update_loop<S: StateUpdateSender>(
    mut rx: LocationUpdateRx,
    cancel: CancellationToken,
    latest: Arc<watch::Sender<Option<Location>>>,
    state_update_sender: Arc<S>,
) {
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                break;
            }

            update = rx.recv() => match update {
                Some(LocationUpdate::Position(location)) => {
                    debug!(
                        "Got location fix {:?} (±{}m)",
                        location.coordinate, location.accuracy
                    );
                    if cancel.is_cancelled() {
                        break;
                    }
                    latest.send_replace(Some(location));
                    state_update_sender.send_update();
                }
                Some(LocationUpdate::Error(why)) => {
                    warn!("Location service error: {why}");
                }
                None => {
                    warn!("Location service dropped its update channel");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::tests::{CountingSender, MockLocation, settle};
    use tokio::test;

    type TestProvider = LocationProvider<MockLocation, CountingSender>;

    fn mk_provider(service: &MockLocation) -> (TestProvider, CountingSender) {
        let sender = CountingSender::default();
        let provider = TestProvider::new(service.clone(), Arc::new(sender.clone()));
        (provider, sender)
    }

    #[test]
    async fn test_starts_stopped_and_empty() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);

        assert_eq!(provider.status().await, ProviderStatus::Stopped);
        assert_eq!(provider.latest(), None);
        assert_eq!(service.starts(), 0);
    }

    #[test]
    async fn test_latest_is_overwritten() {
        let service = MockLocation::granted();
        let (provider, sender) = mk_provider(&service);
        let mut fixes = provider.subscribe();

        provider
            .start(&UpdateOptions::default())
            .await
            .expect("Failed to start");
        assert_eq!(provider.status().await, ProviderStatus::Updating);

        assert!(service.push(10.0, 20.0));
        fixes.changed().await.expect("Provider dropped");
        let first = provider.latest().expect("No location");
        assert_eq!(first.coordinate.lat, 10.0);
        assert_eq!(first.coordinate.long, 20.0);

        assert!(service.push(-5.0, 7.5));
        fixes.changed().await.expect("Provider dropped");
        let second = provider.latest().expect("No location");
        assert_eq!(second.coordinate.lat, -5.0);
        assert_eq!(second.coordinate.long, 7.5);

        assert_eq!(sender.count(), 2);
    }

    #[test]
    async fn test_start_twice_starts_once() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);

        provider.start(&UpdateOptions::default()).await.unwrap();
        provider.start(&UpdateOptions::default()).await.unwrap();

        assert_eq!(service.starts(), 1);
        assert_eq!(service.authorization_requests(), 1);
    }

    #[test]
    async fn test_prompt_still_starts() {
        let service = MockLocation::new(Authorization::Prompt);
        let (provider, _) = mk_provider(&service);

        provider.start(&UpdateOptions::default()).await.unwrap();

        assert_eq!(provider.status().await, ProviderStatus::Updating);
        assert_eq!(service.starts(), 1);
    }

    #[test]
    async fn test_denied_stays_stopped() {
        let service = MockLocation::new(Authorization::Denied);
        let (provider, _) = mk_provider(&service);

        let res = provider.start(&UpdateOptions::default()).await;

        assert!(res.is_err());
        assert_eq!(provider.status().await, ProviderStatus::Stopped);
        assert_eq!(service.starts(), 0);
    }

    #[test]
    async fn test_ignores_updates_after_stop() {
        let service = MockLocation::granted();
        let (provider, sender) = mk_provider(&service);
        let mut fixes = provider.subscribe();

        provider.start(&UpdateOptions::default()).await.unwrap();
        service.push(1.0, 2.0);
        fixes.changed().await.unwrap();

        provider.stop().await;
        assert_eq!(provider.status().await, ProviderStatus::Stopped);
        assert_eq!(service.stops(), 1);

        service.push(3.0, 4.0);
        settle().await;

        let latest = provider.latest().expect("Last fix should be kept");
        assert_eq!(latest.coordinate.lat, 1.0);
        assert_eq!(sender.count(), 1);
    }

    #[test]
    async fn test_stop_when_stopped_is_noop() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);

        provider.stop().await;

        assert_eq!(service.stops(), 0);
    }

    #[test]
    async fn test_restart_after_stop() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);
        let mut fixes = provider.subscribe();

        provider.start(&UpdateOptions::default()).await.unwrap();
        provider.stop().await;
        provider.start(&UpdateOptions::default()).await.unwrap();

        service.push(33.0, 44.0);
        fixes.changed().await.unwrap();

        assert_eq!(service.starts(), 2);
        assert_eq!(provider.latest().unwrap().coordinate.long, 44.0);
    }

    #[test]
    async fn test_service_errors_are_skipped() {
        let service = MockLocation::granted();
        let (provider, sender) = mk_provider(&service);
        let mut fixes = provider.subscribe();

        provider.start(&UpdateOptions::default()).await.unwrap();
        service.push_error("No GPS signal");
        service.push(5.0, 6.0);
        fixes.changed().await.unwrap();

        assert_eq!(provider.latest().unwrap().coordinate.lat, 5.0);
        assert_eq!(sender.count(), 1);
    }

    #[test]
    async fn test_options_passed_to_service() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);
        let options = UpdateOptions {
            high_accuracy: false,
            maximum_age_ms: 0,
            timeout_ms: 500,
        };

        provider.start(&options).await.unwrap();

        assert_eq!(service.last_options(), Some(options));
    }

    #[test]
    async fn test_drop_stops_service() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);

        provider.start(&UpdateOptions::default()).await.unwrap();
        drop(provider);

        assert_eq!(service.stops(), 1);
    }

    #[test]
    async fn test_drop_when_stopped_leaves_service() {
        let service = MockLocation::granted();
        let (provider, _) = mk_provider(&service);

        drop(provider);

        assert_eq!(service.stops(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_no_fix_stored_once_stopped() {
        let service = MockLocation::granted();
        let (provider, sender) = mk_provider(&service);

        for _ in 0..50 {
            provider.start(&UpdateOptions::default()).await.unwrap();
            let pusher = {
                let service = service.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        service.push(f64::from(i) / 10.0, 0.0);
                    }
                })
            };
            provider.stop().await;
            let stored = provider.latest();
            let notified = sender.count();

            pusher.join().unwrap();
            settle().await;

            assert_eq!(provider.latest(), stored);
            assert_eq!(sender.count(), notified);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_status_readable_during_permission_prompt() {
        let service = MockLocation::granted();
        let answer = service.hold_authorization();
        let (provider, _) = mk_provider(&service);
        let provider = Arc::new(provider);

        let starting = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.start(&UpdateOptions::default()).await })
        };

        while service.authorization_requests() == 0 {
            tokio::task::yield_now().await;
        }

        let status = tokio::time::timeout(Duration::from_secs(5), provider.status())
            .await
            .expect("Status blocked on the permission prompt");
        assert_eq!(status, ProviderStatus::Stopped);

        answer.send(()).unwrap();
        starting.await.unwrap().unwrap();

        assert_eq!(provider.status().await, ProviderStatus::Updating);
    }
}
