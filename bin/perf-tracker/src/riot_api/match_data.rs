use super::model::MatchRecord;
use super::{Origin, OriginError, Routing};
use crate::handler::persist::Persister;
use futures::stream::{self, StreamExt};
use perf_tracker_db::cache::{get_json, keys, HotCache};
use perf_tracker_db::model::MatchStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

/// Requester for match details, going through the hot cache first.
pub struct MatchDataRequester {
    origin: Arc<dyn Origin>,
    hot: Arc<dyn HotCache>,
    persister: Persister,
    ttl: Duration,
}

impl std::fmt::Debug for MatchDataRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchDataRequester")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MatchDataRequester {
    pub fn new(
        origin: Arc<dyn Origin>,
        hot: Arc<dyn HotCache>,
        persister: Persister,
        ttl: Duration,
    ) -> Self {
        Self {
            origin,
            hot,
            persister,
            ttl,
        }
    }

    /// Fetch a [`MatchRecord`] given a match ID. Returns [`None`] if the
    /// provider does not have it.
    pub async fn get_match(
        &self,
        routing: Routing,
        match_id: &str,
    ) -> Result<Option<MatchRecord>, OriginError> {
        let key = keys::match_details(routing.as_str(), match_id);
        if let Some(record) = get_json::<MatchRecord>(self.hot.as_ref(), &key).await {
            return Ok(Some(record));
        }

        let Some(record) = self.origin.fetch_match(routing, match_id).await? else {
            return Ok(None);
        };
        self.persister.cache(key, &record, self.ttl);
        Ok(Some(record))
    }

    /// Fetch every match in `match_ids` with at most `concurrency` requests in
    /// flight, and flatten out the stats of `puuid`.
    ///
    /// Matches that are missing, fail to fetch, or do not include the player
    /// are dropped. Once `deadline` passes, outstanding fetches are cancelled
    /// and whatever completed is kept. The result is sorted newest first.
    pub async fn fetch_all(
        &self,
        routing: Routing,
        match_ids: &[String],
        puuid: &str,
        deadline: Instant,
        concurrency: usize,
    ) -> Vec<MatchStats> {
        // Items must be owned for the returned future to be `Send` in axum handlers
        let mut fetches = stream::iter(match_ids.iter().cloned())
            .map(|match_id| async move {
                let result = self.get_match(routing, &match_id).await;
                (match_id, result)
            })
            .buffer_unordered(concurrency.max(1));

        let mut matches = Vec::with_capacity(match_ids.len());
        loop {
            match timeout_at(deadline, fetches.next()).await {
                Ok(Some((match_id, Ok(Some(record))))) => match record.player_stats(puuid) {
                    Some(stats) => matches.push(stats),
                    None => warn!("Player {puuid} is not a participant of {match_id}, skipping"),
                },
                Ok(Some((match_id, Ok(None)))) => debug!("Match {match_id} not found, skipping"),
                Ok(Some((match_id, Err(e)))) => {
                    warn!("Failed to fetch match {match_id}, skipping: {e:?}")
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        "Deadline passed with {} of {} matches fetched",
                        matches.len(),
                        match_ids.len()
                    );
                    break;
                }
            }
        }

        matches.sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
        matches
    }
}
