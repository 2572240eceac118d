use crate::pipeline::{Dashboard, PerformanceQuery, Pipeline, PipelineError};
use crate::riot_api::model::MatchRecord;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use perf_tracker_db::model::UserPerformance;
use perf_tracker_stats::RecentGamesSummary;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_COUNT: u32 = 25;
const MAX_COUNT: u32 = 100;
const MAX_GAME_NAME_LEN: usize = 50;
const MAX_TAG_LINE_LEN: usize = 20;
const MAX_MATCH_ID_LEN: usize = 50;

const REGIONS: &[&str] = &[
    "na1", "euw1", "eun1", "kr", "br1", "la1", "la2", "oc1", "tr1", "ru", "jp1", "me1", "ph2",
    "sg2", "th2", "tw2", "vn2", "pbe1",
];

pub type AppState = Arc<Pipeline>;

pub fn router(pipeline: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/player/:region/:game_name/:tag_line/matches",
            get(player_matches),
        )
        .route(
            "/api/player/:region/:game_name/:tag_line/summary",
            get(player_summary),
        )
        .route(
            "/api/player/:region/:game_name/:tag_line/dashboard",
            get(player_dashboard),
        )
        .route("/api/match/:region/:match_id", get(match_detail))
        .route("/api/popular-items", get(popular_items))
        .with_state(pipeline)
}

/// Request failure, rendered as a status code and a JSON body.
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Pipeline(
                e @ (PipelineError::IdentityNotFound(_) | PipelineError::MatchNotFound(_)),
            ) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Pipeline(e) => {
                error!("Request failed: {e:?}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: i64,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: chrono::Utc::now().timestamp(),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerParams {
    pub count: Option<u32>,
    pub queue_id: Option<u16>,
    pub offset: Option<u32>,
}

async fn player_matches(
    State(pipeline): State<AppState>,
    Path((region, game_name, tag_line)): Path<(String, String, String)>,
    Query(params): Query<PlayerParams>,
) -> Result<Json<UserPerformance>, ApiError> {
    let query = validate_player(&region, &game_name, &tag_line, &params)?;
    info!("Matches requested for {} in {}", query.riot_id(), query.region);
    Ok(Json(pipeline.user_performance(&query).await?))
}

async fn player_summary(
    State(pipeline): State<AppState>,
    Path((region, game_name, tag_line)): Path<(String, String, String)>,
    Query(params): Query<PlayerParams>,
) -> Result<Json<RecentGamesSummary>, ApiError> {
    let query = validate_player(&region, &game_name, &tag_line, &params)?;
    info!("Summary requested for {} in {}", query.riot_id(), query.region);
    Ok(Json(pipeline.recent_games_summary(&query).await?))
}

async fn player_dashboard(
    State(pipeline): State<AppState>,
    Path((region, game_name, tag_line)): Path<(String, String, String)>,
    Query(params): Query<PlayerParams>,
) -> Result<Json<Dashboard>, ApiError> {
    let query = validate_player(&region, &game_name, &tag_line, &params)?;
    let offset = params.offset.unwrap_or_default();
    info!(
        "Dashboard page at {offset} requested for {} in {}",
        query.riot_id(),
        query.region
    );
    Ok(Json(pipeline.dashboard(&query, offset).await?))
}

async fn match_detail(
    State(pipeline): State<AppState>,
    Path((region, match_id)): Path<(String, String)>,
) -> Result<Json<MatchRecord>, ApiError> {
    let region = validate_region(&region)?;
    validate_match_id(&match_id)?;
    Ok(Json(pipeline.match_detail(&region, &match_id).await?))
}

async fn popular_items(State(pipeline): State<AppState>) -> Result<Json<Vec<i32>>, ApiError> {
    Ok(Json(pipeline.popular_items().await?))
}

fn validate_player(
    region: &str,
    game_name: &str,
    tag_line: &str,
    params: &PlayerParams,
) -> Result<PerformanceQuery, ApiError> {
    let region = validate_region(region)?;

    let game_name_ok = !game_name.is_empty()
        && game_name.len() <= MAX_GAME_NAME_LEN
        && game_name.trim() == game_name
        && !game_name.contains("  ")
        && game_name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.'));
    if !game_name_ok {
        return Err(ApiError::Validation(format!("invalid game name {game_name:?}")));
    }

    let tag_line_ok = !tag_line.is_empty()
        && tag_line.len() <= MAX_TAG_LINE_LEN
        && tag_line
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-'));
    if !tag_line_ok {
        return Err(ApiError::Validation(format!("invalid tag line {tag_line:?}")));
    }

    let count = params.count.unwrap_or(DEFAULT_COUNT);
    if !(1..=MAX_COUNT).contains(&count) {
        return Err(ApiError::Validation(format!(
            "count must be between 1 and {MAX_COUNT}"
        )));
    }

    Ok(PerformanceQuery::new(
        &region,
        game_name,
        tag_line,
        count,
        params.queue_id.unwrap_or_default(),
    ))
}

fn validate_region(region: &str) -> Result<String, ApiError> {
    let region = region.to_lowercase();
    if REGIONS.contains(&region.as_str()) {
        Ok(region)
    } else {
        Err(ApiError::Validation(format!("invalid region {region:?}")))
    }
}

fn validate_match_id(match_id: &str) -> Result<(), ApiError> {
    let ok = !match_id.is_empty()
        && match_id.len() <= MAX_MATCH_ID_LEN
        && match_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(ApiError::Validation(format!("invalid match ID {match_id:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::persist::Persister;
    use crate::pipeline::Settings;
    use crate::riot_api::Routing;
    use perf_tracker_db::cache::MemoryCache;
    use perf_tracker_db::error::Error as StoreError;
    use perf_tracker_db::{DbHandler, SqlitePoolOptions};
    use riven::RiotApi;
    use tokio::sync::mpsc::unbounded_channel;

    fn params(count: Option<u32>) -> PlayerParams {
        PlayerParams {
            count,
            ..Default::default()
        }
    }

    #[test]
    fn player_defaults() {
        let query = validate_player("NA1", "Hide on bush", "KR1", &params(None)).unwrap();
        assert_eq!(query.region, "na1");
        assert_eq!(query.count, DEFAULT_COUNT);
        assert_eq!(query.queue_id, 0);
    }

    #[test]
    fn rejects_bad_player_input() {
        assert!(validate_player("xx9", "Name", "TAG", &params(None)).is_err());
        assert!(validate_player("na1", "", "TAG", &params(None)).is_err());
        assert!(validate_player("na1", " Name", "TAG", &params(None)).is_err());
        assert!(validate_player("na1", "Na  me", "TAG", &params(None)).is_err());
        assert!(validate_player("na1", "Name", "T G", &params(None)).is_err());
        assert!(validate_player("na1", "{\"$gt\":\"\"}", "TAG", &params(None)).is_err());
        assert!(validate_player("na1", "Name", "TAG", &params(Some(0))).is_err());
        assert!(validate_player("na1", "Name", "TAG", &params(Some(101))).is_err());
        assert!(validate_player("na1", "Name", "TAG", &params(Some(100))).is_ok());
    }

    #[test]
    fn every_platform_region_is_accepted() {
        for region in REGIONS {
            assert!(validate_region(region).is_ok(), "{region}");
        }
        assert_eq!(validate_region("ME1").unwrap(), "me1");
        assert_eq!(Routing::from_region("me1"), Routing::Europe);
    }

    async fn app_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let db_handler = Arc::new(DbHandler::new(pool));
        db_handler.migrate().await.unwrap();

        let (tx, _rx) = unbounded_channel();
        Arc::new(Pipeline::new(
            Arc::new(RiotApi::new("RGAPI-00000000-0000-0000-0000-000000000000")),
            Arc::new(MemoryCache::new(10)),
            db_handler,
            Persister::new(tx),
            Settings::default(),
        ))
    }

    #[tokio::test]
    async fn router_serves_real_pipeline() {
        let state = app_state().await;
        let _router: Router = router(state.clone());

        let Json(item_ids) = popular_items(State(state.clone())).await.unwrap();
        assert!(item_ids.is_empty());

        let err = player_matches(
            State(state.clone()),
            Path(("xx9".into(), "Name".into(), "TAG".into())),
            Query(PlayerParams::default()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = match_detail(State(state), Path(("na1".into(), "NA1 1".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn match_ids() {
        assert!(validate_match_id("NA1_5000000001").is_ok());
        assert!(validate_match_id("NA1 500").is_err());
        assert!(validate_match_id("").is_err());
    }

    #[test]
    fn errors_map_to_status() {
        let status = |e: ApiError| e.into_response().status();
        assert_eq!(
            status(ApiError::Validation("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(PipelineError::IdentityNotFound("a#b".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(PipelineError::MatchNotFound("NA1_1".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(PipelineError::Deadline.into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(PipelineError::Store(StoreError::InvalidRow("row".into())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
