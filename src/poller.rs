//! Periodic fetch of real-time data.
//!
//! The latest good snapshot stays visible until a newer one replaces it. A failed fetch only
//! clears the availability flag, so readers keep getting stale data until the next success.

use crate::api::{self, Error};
use crate::model::{Api, RawSnapshot};

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

pub const MIN_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct PollState {
    snapshot: Option<Arc<RawSnapshot>>,
    available: bool,
    /// Timestamp of last successful fetch
    last_success: Option<Instant>,
}

#[derive(Debug)]
pub struct Poller {
    api: Api,
    interval: Duration,
    state: RwLock<PollState>,
}

impl Poller {
    /// `interval` is clamped to `MIN_INTERVAL..=MAX_INTERVAL`.
    pub fn new(api: Api, interval: Duration) -> Self {
        Poller {
            api,
            interval: interval.max(MIN_INTERVAL).min(MAX_INTERVAL),
            state: RwLock::new(PollState::default()),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch once. On success the new snapshot replaces the old one; on failure the old one is
    /// kept and the poller reports itself unavailable.
    pub async fn refresh(&self) -> Result<Arc<RawSnapshot>, Error> {
        let result = api::real_time_data(&self.api).await.map(Arc::new);

        match self.state.write() {
            Ok(mut state) => match &result {
                Ok(snapshot) => {
                    state.snapshot = Some(Arc::clone(snapshot));
                    state.available = true;
                    state.last_success = Some(Instant::now());
                }
                Err(e) => {
                    state.available = false;
                    log::warn!("update failed, keeping previous snapshot: {}", e);
                }
            },
            Err(_) => {
                log::error!("poll state lock poisoned, snapshot not updated");
                return Err(Error::InternalError);
            }
        }

        result
    }

    /// Latest snapshot, fresh or stale. `None` until the first successful fetch.
    pub fn snapshot(&self) -> Option<Arc<RawSnapshot>> {
        self.state.read().ok().and_then(|state| state.snapshot.clone())
    }

    /// Latest snapshot or `Error::NoData`.
    pub fn require_snapshot(&self) -> Result<Arc<RawSnapshot>, Error> {
        self.snapshot().ok_or(Error::NoData)
    }

    /// Whether the most recent fetch succeeded.
    pub fn is_available(&self) -> bool {
        self.state
            .read()
            .map(|state| state.available)
            .unwrap_or(false)
    }

    pub fn last_success(&self) -> Option<Instant> {
        self.state.read().ok().and_then(|state| state.last_success)
    }

    /// Poll forever, once per interval. Failures are logged and retried on the next tick.
    pub async fn run(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!(
            "polling {} every {}s",
            self.api.api_url,
            self.interval.as_secs()
        );

        loop {
            ticker.tick().await;
            if self.refresh().await.is_ok() {
                log::debug!("snapshot refreshed");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mockito::Server;

    fn poller(url: &str, interval: Duration) -> Poller {
        let api = api::api(url, String::from("secret"), Duration::from_secs(5)).unwrap();
        Poller::new(api, interval)
    }

    #[test]
    fn interval_is_bounded() {
        let url = "http://127.0.0.1:1";
        assert_eq!(MIN_INTERVAL, poller(url, Duration::from_secs(1)).interval());
        assert_eq!(MAX_INTERVAL, poller(url, Duration::from_secs(600)).interval());
        assert_eq!(
            Duration::from_secs(6),
            poller(url, Duration::from_secs(6)).interval()
        );
    }

    #[tokio::test]
    async fn no_data_before_first_fetch() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .create_async()
            .await;

        let poller = poller(&server.url(), Duration::from_secs(6));
        assert!(poller.refresh().await.is_err());
        assert!(!poller.is_available());
        assert!(poller.snapshot().is_none());
        assert!(poller.last_success().is_none());
        assert!(matches!(poller.require_snapshot(), Err(Error::NoData)));
    }

    #[tokio::test]
    async fn stale_snapshot_kept_on_failure() {
        let mut server = Server::new_async().await;
        let ok = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"ver":"3.008.10","Data":[2301,0,0],"Information":[10.0]}"#)
            .create_async()
            .await;

        let poller = poller(&server.url(), Duration::from_secs(6));
        let first = poller.refresh().await.unwrap();
        assert!(poller.is_available());
        assert!(poller.last_success().is_some());
        assert_eq!(Some(2301), first.register(0));
        assert_eq!(3, first.data.len());

        ok.remove_async().await;
        let _failing = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        assert!(matches!(
            poller.refresh().await,
            Err(Error::InvalidResponse(_, _))
        ));
        assert!(!poller.is_available());
        let stale = poller.snapshot().unwrap();
        assert!(Arc::ptr_eq(&first, &stale));
    }

    #[tokio::test]
    async fn snapshot_replaced_on_success() {
        let mut server = Server::new_async().await;
        let first_mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"Data":[1]}"#)
            .create_async()
            .await;

        let poller = poller(&server.url(), Duration::from_secs(6));
        let first = poller.refresh().await.unwrap();

        first_mock.remove_async().await;
        let _second_mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"Data":[2]}"#)
            .create_async()
            .await;

        let second = poller.refresh().await.unwrap();
        assert_eq!(Some(1), first.register(0));
        assert_eq!(Some(2), poller.snapshot().unwrap().register(0));
        assert!(Arc::ptr_eq(&second, &poller.snapshot().unwrap()));
    }
}
