use super::{GetMatchIdsQuery, Origin, OriginError, Routing};
use crate::handler::persist::Persister;
use perf_tracker_db::cache::{get_json, keys, HotCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// Max value that Riot API accepts for getting match IDs
pub const MAX_MATCHES: u32 = 100;

/// Requester for match ID listings, going through the hot cache first.
pub struct MatchIdsRequester {
    origin: Arc<dyn Origin>,
    hot: Arc<dyn HotCache>,
    persister: Persister,
    ttl: Duration,
}

impl std::fmt::Debug for MatchIdsRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchIdsRequester")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl MatchIdsRequester {
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

    /// Get match IDs, newest first, for a [`GetMatchIdsQuery`]. The count is
    /// capped at [`MAX_MATCHES`].
    pub async fn get_match_ids(
        &self,
        routing: Routing,
        query: &GetMatchIdsQuery,
    ) -> Result<Vec<String>, OriginError> {
        let query = GetMatchIdsQuery {
            count: query.count.min(MAX_MATCHES),
            ..query.clone()
        };
        let key = keys::match_ids(
            routing.as_str(),
            &query.puuid,
            query.count,
            query.queue_id,
            query.start_time,
        );
        if let Some(match_ids) = get_json::<Vec<String>>(self.hot.as_ref(), &key).await {
            debug!("Match IDs cache hit for {key}");
            return Ok(match_ids);
        }

        let match_ids = self.origin.list_match_ids(routing, &query).await?;
        debug!("Got {} match IDs for {}", match_ids.len(), query.puuid);
        self.persister.cache(key, &match_ids, self.ttl);
        Ok(match_ids)
    }
}
