use crate::handler::persist::Persister;
use crate::riot_api::account::AccountRequester;
use crate::riot_api::match_data::MatchDataRequester;
use crate::riot_api::match_ids::{MatchIdsRequester, MAX_MATCHES};
use crate::riot_api::model::MatchRecord;
use crate::riot_api::{GetMatchIdsQuery, Origin, OriginError, Routing};
use perf_tracker_db::cache::{get_json, keys, HotCache, TimeoutCache};
use perf_tracker_db::model::{MatchStats, UserPerformance};
use perf_tracker_db::PerformanceStore;
use perf_tracker_stats::{IncrementalStats, RecentGamesSummary};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

const HOUR: Duration = Duration::from_secs(60 * 60);

/// Number of items in the popular items list
pub const POPULAR_ITEMS_LIMIT: u32 = 50;

/// Cache lifetimes, concurrency and time bounds of the pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    pub identity_ttl: Duration,
    pub match_ids_ttl: Duration,
    pub match_detail_ttl: Duration,
    pub performance_ttl: Duration,
    pub popular_items_ttl: Duration,
    pub match_fetch_concurrency: usize,
    /// Bound on each background cache or store write
    pub write_timeout: Duration,
    /// Bound on each hot-cache read or write
    pub cache_timeout: Duration,
    /// Per-match allowance of the request deadline
    pub base_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            identity_ttl: 24 * HOUR,
            match_ids_ttl: HOUR,
            match_detail_ttl: 7 * 24 * HOUR,
            performance_ttl: Duration::from_secs(30 * 60),
            popular_items_ttl: 24 * HOUR,
            match_fetch_concurrency: crate::config::DEFAULT_MATCH_FETCH_CONCURRENCY,
            write_timeout: Duration::from_secs(5),
            cache_timeout: Duration::from_secs(2),
            base_timeout: Duration::from_secs(10),
        }
    }
}

impl Settings {
    /// Overall time budget of a request for `count` matches.
    pub fn deadline_for(&self, count: u32) -> Duration {
        self.base_timeout.saturating_mul(count.saturating_add(5))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no account found for {0}")]
    IdentityNotFound(String),
    #[error("failed to resolve identity: {0}")]
    Identity(#[source] OriginError),
    #[error("failed to list match IDs: {0}")]
    MatchIds(#[source] OriginError),
    #[error("match {0} not found")]
    MatchNotFound(String),
    #[error("failed to fetch match: {0}")]
    MatchDetail(#[source] OriginError),
    #[error("request deadline exceeded")]
    Deadline,
    #[error("failed to read from store: {0}")]
    Store(#[source] perf_tracker_db::error::Error),
}

/// A validated request for a player's recent matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceQuery {
    /// Platform region, e.g. `na1`
    pub region: String,
    pub game_name: String,
    pub tag_line: String,
    pub count: u32,
    /// 0 for every queue
    pub queue_id: u16,
}

impl PerformanceQuery {
    pub fn new(region: &str, game_name: &str, tag_line: &str, count: u32, queue_id: u16) -> Self {
        Self {
            region: region.to_lowercase(),
            game_name: game_name.to_owned(),
            tag_line: tag_line.to_owned(),
            count,
            queue_id,
        }
    }

    pub fn riot_id(&self) -> String {
        format!("{}#{}", self.game_name, self.tag_line)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
    pub has_more: bool,
}

/// One page of a player's match history. Only the first page carries the
/// full summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub summary: Option<RecentGamesSummary>,
    pub matches: Vec<MatchStats>,
    pub pagination: Pagination,
    pub incremental_stats: IncrementalStats,
}

/// Answers performance queries by walking the hot cache, then the durable
/// store, then the origin. Every collaborator is injected so that fakes can be
/// swapped in.
pub struct Pipeline {
    hot: Arc<dyn HotCache>,
    store: Arc<dyn PerformanceStore>,
    persister: Persister,
    accounts: AccountRequester,
    match_ids: MatchIdsRequester,
    match_data: MatchDataRequester,
    settings: Settings,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        origin: Arc<dyn Origin>,
        hot: Arc<dyn HotCache>,
        store: Arc<dyn PerformanceStore>,
        persister: Persister,
        settings: Settings,
    ) -> Self {
        let hot: Arc<dyn HotCache> = Arc::new(TimeoutCache::new(hot, settings.cache_timeout));
        let accounts = AccountRequester::new(
            origin.clone(),
            hot.clone(),
            persister.clone(),
            settings.identity_ttl,
        );
        let match_ids = MatchIdsRequester::new(
            origin.clone(),
            hot.clone(),
            persister.clone(),
            settings.match_ids_ttl,
        );
        let match_data = MatchDataRequester::new(
            origin,
            hot.clone(),
            persister.clone(),
            settings.match_detail_ttl,
        );
        Self {
            hot,
            store,
            persister,
            accounts,
            match_ids,
            match_data,
            settings,
        }
    }

    /// Get the `count` most recent matches of a player, newest first.
    #[tracing::instrument(skip(self), fields(riot_id = %query.riot_id()))]
    pub async fn user_performance(
        &self,
        query: &PerformanceQuery,
    ) -> Result<UserPerformance, PipelineError> {
        let deadline = Instant::now() + self.settings.deadline_for(query.count);
        let routing = Routing::from_region(&query.region);
        let count = query.count as usize;

        let puuid = timeout_at(
            deadline,
            self.accounts.get_puuid(routing, &query.game_name, &query.tag_line),
        )
        .await
        .map_err(|_| PipelineError::Deadline)?
        .map_err(PipelineError::Identity)?
        .ok_or_else(|| PipelineError::IdentityNotFound(query.riot_id()))?;

        let hot_key = keys::user_performance(&query.region, &puuid, query.queue_id);
        let cached = self.load_hot::<UserPerformance>(&hot_key, deadline).await;
        if let Some(cached) = &cached {
            if cached.matches.len() >= count {
                debug!("Performance of {puuid} served from hot cache");
                return Ok(cached.trimmed(count));
            }
            debug!(
                "Hot cache holds {} of {count} matches for {puuid}, looking further",
                cached.matches.len()
            );
        }

        let stored = self.load_stored(&puuid, query, deadline).await;
        let now = chrono::Utc::now().timestamp();
        let ttl_secs = i64::try_from(self.settings.performance_ttl.as_secs()).unwrap_or(i64::MAX);
        if let Some(stored) = &stored {
            if stored.is_fresh_for(count, now, ttl_secs) {
                debug!("Performance of {puuid} served from store");
                self.persister.cache(hot_key, stored, self.settings.performance_ttl);
                return Ok(stored.trimmed(count));
            }
        }

        info!("Fetching fresh match data for {} ({puuid})", query.riot_id());
        let ids_query = GetMatchIdsQuery {
            puuid: puuid.clone(),
            count: query.count,
            queue_id: query.queue_id,
            start_time: 0,
        };
        let match_ids = timeout_at(deadline, self.match_ids.get_match_ids(routing, &ids_query))
            .await
            .map_err(|_| PipelineError::Deadline)?
            .map_err(PipelineError::MatchIds)?;

        if match_ids.is_empty() {
            info!(
                "No match IDs found for {puuid} in {} with queue {}",
                query.region, query.queue_id
            );
            let performance = match stored.or(cached) {
                Some(mut prior) => {
                    prior.updated_at = now;
                    prior.trimmed(count)
                }
                None => UserPerformance::empty(
                    &puuid,
                    &query.region,
                    &query.riot_id(),
                    query.queue_id,
                    now,
                ),
            };
            return Ok(performance);
        }

        let matches = self
            .match_data
            .fetch_all(
                routing,
                &match_ids,
                &puuid,
                deadline,
                self.settings.match_fetch_concurrency,
            )
            .await;
        let performance = UserPerformance {
            puuid,
            region: query.region.clone(),
            riot_id: query.riot_id(),
            queue_id: query.queue_id,
            matches,
            updated_at: chrono::Utc::now().timestamp(),
        };

        self.persister.cache(hot_key, &performance, self.settings.performance_ttl);
        self.persister.store(performance.clone());
        Ok(performance)
    }

    /// Hot-cache read bounded by `deadline`. Overrunning it counts as a miss.
    async fn load_hot<T: DeserializeOwned>(&self, key: &str, deadline: Instant) -> Option<T> {
        match timeout_at(deadline, get_json::<T>(self.hot.as_ref(), key)).await {
            Ok(value) => value,
            Err(_) => {
                warn!("Timed out reading {key} from hot cache, treating as a miss");
                None
            }
        }
    }

    /// Stored snapshot for the query's region and queue filter. Store failures
    /// are logged and treated as a miss.
    async fn load_stored(
        &self,
        puuid: &str,
        query: &PerformanceQuery,
        deadline: Instant,
    ) -> Option<UserPerformance> {
        let stored = match timeout_at(
            deadline,
            self.store.get_user_performance(puuid, &query.region),
        )
        .await
        {
            Ok(Ok(stored)) => stored?,
            Ok(Err(e)) => {
                warn!("Failed to read stored performance of {puuid}, will fetch: {e:?}");
                return None;
            }
            Err(_) => {
                warn!("Timed out reading stored performance of {puuid}, will fetch");
                return None;
            }
        };

        if stored.queue_id != query.queue_id {
            debug!(
                "Stored performance of {puuid} is for queue {}, not {}",
                stored.queue_id, query.queue_id
            );
            return None;
        }
        Some(stored)
    }

    /// Summarize the `count` most recent matches of a player.
    pub async fn recent_games_summary(
        &self,
        query: &PerformanceQuery,
    ) -> Result<RecentGamesSummary, PipelineError> {
        let performance = self.user_performance(query).await?;
        Ok(RecentGamesSummary::new(&performance))
    }

    /// Get one page of `query.count` matches starting at `offset`. The summary
    /// is only computed for the first page.
    pub async fn dashboard(
        &self,
        query: &PerformanceQuery,
        offset: u32,
    ) -> Result<Dashboard, PipelineError> {
        let window = offset
            .saturating_add(query.count)
            .saturating_add(1)
            .min(MAX_MATCHES);
        let performance = self
            .user_performance(&PerformanceQuery {
                count: window,
                ..query.clone()
            })
            .await?;

        let page = performance.window(offset as usize, query.count as usize);
        let has_more = performance.matches.len() > offset as usize + page.len();
        let summary = (offset == 0)
            .then(|| RecentGamesSummary::new(&performance.trimmed(query.count as usize)));

        Ok(Dashboard {
            summary,
            matches: page.to_vec(),
            pagination: Pagination {
                offset,
                limit: query.count,
                has_more,
            },
            incremental_stats: IncrementalStats::new(page),
        })
    }

    /// Get the most used item IDs across every stored match, most used first.
    /// A non-empty list is cached for [`Settings::popular_items_ttl`].
    pub async fn popular_items(&self) -> Result<Vec<i32>, PipelineError> {
        let deadline = Instant::now() + self.settings.base_timeout;
        let key = keys::popular_items();
        if let Some(item_ids) = self.load_hot::<Vec<i32>>(&key, deadline).await {
            debug!("Popular items served from hot cache");
            return Ok(item_ids);
        }

        let item_ids = timeout_at(deadline, self.store.popular_item_ids(POPULAR_ITEMS_LIMIT))
            .await
            .map_err(|_| PipelineError::Deadline)?
            .map_err(PipelineError::Store)?;
        if !item_ids.is_empty() {
            self.persister.cache(key, &item_ids, self.settings.popular_items_ttl);
        }
        Ok(item_ids)
    }

    /// Get the full record of a single match.
    pub async fn match_detail(
        &self,
        region: &str,
        match_id: &str,
    ) -> Result<MatchRecord, PipelineError> {
        let routing = Routing::from_region(region);
        let deadline = Instant::now() + self.settings.deadline_for(1);
        timeout_at(deadline, self.match_data.get_match(routing, match_id))
            .await
            .map_err(|_| PipelineError::Deadline)?
            .map_err(PipelineError::MatchDetail)?
            .ok_or_else(|| PipelineError::MatchNotFound(match_id.to_owned()))
    }
}
