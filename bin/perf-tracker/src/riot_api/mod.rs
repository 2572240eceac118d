use async_trait::async_trait;
use model::MatchRecord;
use riven::consts::{Queue, RegionalRoute};
use riven::RiotApi;
use thiserror::Error;
use tracing::warn;

pub mod account;
pub mod match_data;
pub mod match_ids;
pub mod model;

/// Regional routing group a platform region's match data lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routing {
    Americas,
    Asia,
    Europe,
    Sea,
}

impl Routing {
    pub fn from_region(region: &str) -> Self {
        let region = region.to_lowercase();
        let starts_with_any = |prefixes: &[&str]| prefixes.iter().any(|p| region.starts_with(p));

        if starts_with_any(&["na", "br", "la", "oc"]) {
            Routing::Americas
        } else if starts_with_any(&["kr", "jp"]) {
            Routing::Asia
        } else if starts_with_any(&["eun", "euw", "tr", "ru", "me"]) {
            Routing::Europe
        } else if starts_with_any(&["sg", "ph", "th", "vn", "tw"]) {
            Routing::Sea
        } else {
            warn!("Unknown region {region:?}, routing to americas");
            Routing::Americas
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Routing::Americas => "americas",
            Routing::Asia => "asia",
            Routing::Europe => "europe",
            Routing::Sea => "sea",
        }
    }
}

impl From<Routing> for RegionalRoute {
    fn from(routing: Routing) -> Self {
        match routing {
            Routing::Americas => RegionalRoute::AMERICAS,
            Routing::Asia => RegionalRoute::ASIA,
            Routing::Europe => RegionalRoute::EUROPE,
            Routing::Sea => RegionalRoute::SEA,
        }
    }
}

#[derive(Debug, Error)]
pub enum OriginError {
    #[error(transparent)]
    RiotApiError(#[from] riven::RiotApiError),
    #[error("failed to decode origin payload: {0}")]
    DecodeError(#[from] serde_json::Error),
}

/// Parameters of a match ID listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetMatchIdsQuery {
    pub puuid: String,
    pub count: u32,
    /// 0 for every queue
    pub queue_id: u16,
    /// Epoch seconds, 0 for no lower bound
    pub start_time: i64,
}

/// The external match-data provider. `Ok(None)` means the provider answered
/// "not found"; any other failure is an [`OriginError`].
#[async_trait]
pub trait Origin: Send + Sync {
    /// Resolve a Riot ID to its PUUID.
    async fn resolve_identity(
        &self,
        routing: Routing,
        game_name: &str,
        tag_line: &str,
    ) -> Result<Option<String>, OriginError>;

    async fn list_match_ids(
        &self,
        routing: Routing,
        query: &GetMatchIdsQuery,
    ) -> Result<Vec<String>, OriginError>;

    async fn fetch_match(
        &self,
        routing: Routing,
        match_id: &str,
    ) -> Result<Option<MatchRecord>, OriginError>;
}

#[async_trait]
impl Origin for RiotApi {
    async fn resolve_identity(
        &self,
        routing: Routing,
        game_name: &str,
        tag_line: &str,
    ) -> Result<Option<String>, OriginError> {
        let account = self
            .account_v1()
            .get_by_riot_id(routing.into(), game_name, tag_line)
            .await?;
        Ok(account.map(|account| account.puuid))
    }

    async fn list_match_ids(
        &self,
        routing: Routing,
        query: &GetMatchIdsQuery,
    ) -> Result<Vec<String>, OriginError> {
        let queue = (query.queue_id != 0).then(|| Queue::from(query.queue_id));
        let start_time = (query.start_time > 0).then_some(query.start_time);
        let count = i32::try_from(query.count).unwrap_or(i32::MAX);

        let match_ids = self
            .match_v5()
            .get_match_ids_by_puuid(
                routing.into(),
                &query.puuid,
                Some(count),
                None,
                queue,
                start_time,
                None,
                None,
            )
            .await?;
        Ok(match_ids)
    }

    async fn fetch_match(
        &self,
        routing: Routing,
        match_id: &str,
    ) -> Result<Option<MatchRecord>, OriginError> {
        let Some(data) = self.match_v5().get_match(routing.into(), match_id).await? else {
            return Ok(None);
        };
        Ok(Some(MatchRecord::from_riven(&data)?))
    }
}
