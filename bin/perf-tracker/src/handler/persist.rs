use anyhow::Context;
use perf_tracker_db::cache::HotCache;
use perf_tracker_db::model::UserPerformance;
use perf_tracker_db::PerformanceStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// A write that must not hold up the request that produced it.
#[derive(Debug)]
pub enum PersistJob {
    Cache {
        key: String,
        value: String,
        ttl: Duration,
    },
    Performance(Box<UserPerformance>),
}

/// Sending half of the background persistence channel. Every method returns
/// immediately.
#[derive(Debug, Clone)]
pub struct Persister {
    tx_channel: UnboundedSender<PersistJob>,
}

impl Persister {
    pub fn new(tx_channel: UnboundedSender<PersistJob>) -> Self {
        Self { tx_channel }
    }

    /// Queue a hot-cache write of `value` serialized as JSON.
    pub fn cache<T: Serialize + ?Sized>(&self, key: String, value: &T, ttl: Duration) {
        let value = match serde_json::to_string(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to serialize value for {key}, not caching: {e:?}");
                return;
            }
        };
        self.send(PersistJob::Cache { key, value, ttl });
    }

    /// Queue an upsert of the durable performance snapshot.
    pub fn store(&self, data: UserPerformance) {
        self.send(PersistJob::Performance(Box::new(data)));
    }

    fn send(&self, job: PersistJob) {
        if let Err(e) = self.tx_channel.send(job) {
            warn!("Persistence handler is not running, dropping {:?}", e.0);
        }
    }
}

/// Receives [`PersistJob`]s and runs each one as a detached task bounded by
/// `write_timeout`. Failures are logged and go no further.
pub struct PersistHandler {
    hot: Arc<dyn HotCache>,
    store: Arc<dyn PerformanceStore>,
    rx_channel: UnboundedReceiver<PersistJob>,
    write_timeout: Duration,
}

impl PersistHandler {
    pub fn new(
        hot: Arc<dyn HotCache>,
        store: Arc<dyn PerformanceStore>,
        rx_channel: UnboundedReceiver<PersistJob>,
        write_timeout: Duration,
    ) -> Self {
        Self {
            hot,
            store,
            rx_channel,
            write_timeout,
        }
    }

    /// Iterate on trying to receive jobs from [`Self::rx_channel`] until every
    /// [`Persister`] has been dropped.
    #[tracing::instrument(skip_all)]
    pub async fn start(mut self) {
        while let Some(job) = self.rx_channel.recv().await {
            let hot = self.hot.clone();
            let store = self.store.clone();
            let write_timeout = self.write_timeout;
            tokio::task::spawn(async move {
                if let Err(e) = run(job, hot.as_ref(), store.as_ref(), write_timeout).await {
                    warn!("Background write failed: {e:?}");
                }
            });
        }
        debug!("Persistence channel closed, stopping handler");
    }
}

async fn run(
    job: PersistJob,
    hot: &dyn HotCache,
    store: &dyn PerformanceStore,
    write_timeout: Duration,
) -> anyhow::Result<()> {
    match job {
        PersistJob::Cache { key, value, ttl } => {
            tokio::time::timeout(write_timeout, hot.set(&key, value, ttl))
                .await
                .with_context(|| format!("Timed out caching {key}"))??;
            debug!("Cached {key}");
        }
        PersistJob::Performance(data) => {
            tokio::time::timeout(write_timeout, store.upsert_user_performance(&data))
                .await
                .with_context(|| format!("Timed out storing performance of {}", data.puuid))??;
            debug!(
                "Stored {} matches for {} in {}",
                data.matches.len(),
                data.puuid,
                data.region
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use perf_tracker_db::cache::MemoryCache;
    use perf_tracker_db::error::Error;
    use tokio::sync::mpsc::unbounded_channel;

    struct StalledStore;

    #[async_trait]
    impl PerformanceStore for StalledStore {
        async fn get_user_performance(
            &self,
            _puuid: &str,
            _region: &str,
        ) -> Result<Option<UserPerformance>, Error> {
            Ok(None)
        }

        async fn upsert_user_performance(&self, _data: &UserPerformance) -> Result<(), Error> {
            std::future::pending().await
        }

        async fn popular_item_ids(&self, _limit: u32) -> Result<Vec<i32>, Error> {
            Ok(Vec::new())
        }
    }

    struct BrokenCache;

    #[async_trait]
    impl HotCache for BrokenCache {
        async fn get(&self, key: &str) -> Result<Option<String>, Error> {
            Err(Error::Timeout(key.to_owned()))
        }

        async fn set(&self, key: &str, _value: String, _ttl: Duration) -> Result<(), Error> {
            Err(Error::Timeout(key.to_owned()))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        stored: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PerformanceStore for RecordingStore {
        async fn get_user_performance(
            &self,
            _puuid: &str,
            _region: &str,
        ) -> Result<Option<UserPerformance>, Error> {
            Ok(None)
        }

        async fn upsert_user_performance(&self, data: &UserPerformance) -> Result<(), Error> {
            self.stored.lock().unwrap().push(data.puuid.clone());
            Ok(())
        }

        async fn popular_item_ids(&self, _limit: u32) -> Result<Vec<i32>, Error> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_cache_write_does_not_stop_handler() {
        let store = Arc::new(RecordingStore::default());
        let (tx, rx) = unbounded_channel();
        let handler =
            PersistHandler::new(Arc::new(BrokenCache), store.clone(), rx, Duration::from_secs(5));
        let handle = tokio::task::spawn(handler.start());

        let persister = Persister::new(tx);
        persister.cache("key".into(), "value", Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(10)).await;
        persister.store(UserPerformance {
            puuid: "puuid-1".into(),
            ..Default::default()
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(*store.stored.lock().unwrap(), vec!["puuid-1".to_owned()]);
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_does_not_block_others() {
        let hot = Arc::new(MemoryCache::new(10));
        let (tx, rx) = unbounded_channel();
        let handler = PersistHandler::new(
            hot.clone(),
            Arc::new(StalledStore),
            rx,
            Duration::from_secs(5),
        );
        let handle = tokio::task::spawn(handler.start());

        let persister = Persister::new(tx);
        persister.store(UserPerformance::default());
        persister.cache("key".into(), &vec!["NA1_1"], Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            hot.get("key").await.unwrap().as_deref(),
            Some("[\"NA1_1\"]")
        );

        drop(persister);
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(handle.is_finished());
    }

    #[test]
    fn send_without_handler_is_harmless() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let persister = Persister::new(tx);
        persister.cache("key".into(), "value", Duration::from_secs(1));
        persister.store(UserPerformance::default());
    }
}
