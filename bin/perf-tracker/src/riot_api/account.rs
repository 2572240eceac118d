use super::{Origin, OriginError, Routing};
use crate::handler::persist::Persister;
use perf_tracker_db::cache::{get_json, keys, HotCache};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Requester for resolving Riot IDs to PUUIDs, going through the hot cache
/// first.
pub struct AccountRequester {
    origin: Arc<dyn Origin>,
    hot: Arc<dyn HotCache>,
    persister: Persister,
    ttl: Duration,
}

impl std::fmt::Debug for AccountRequester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRequester")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl AccountRequester {
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

    /// Get the PUUID of a Riot ID. Returns [`None`] if the provider does not
    /// know the account.
    pub async fn get_puuid(
        &self,
        routing: Routing,
        game_name: &str,
        tag_line: &str,
    ) -> Result<Option<String>, OriginError> {
        let key = keys::puuid(routing.as_str(), game_name, tag_line);
        if let Some(puuid) = get_json::<String>(self.hot.as_ref(), &key).await {
            debug!("PUUID cache hit for {game_name}#{tag_line}");
            return Ok(Some(puuid));
        }

        let Some(puuid) = self
            .origin
            .resolve_identity(routing, game_name, tag_line)
            .await?
        else {
            debug!("No account found for {game_name}#{tag_line}");
            return Ok(None);
        };

        self.persister.cache(key, &puuid, self.ttl);
        Ok(Some(puuid))
    }
}
