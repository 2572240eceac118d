use perf_tracker_db::cache::{get_json, HotCache, MemoryCache};
use perf_tracker_db::model::{MatchStats, UserPerformance};
use perf_tracker_db::{DbHandler, PerformanceStore, SqlitePoolOptions};
use std::time::Duration;

async fn db_handler() -> DbHandler {
    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db_handler = DbHandler::new(pool);
    db_handler.migrate().await.unwrap();
    db_handler
}

fn performance(region: &str, match_ids: &[&str], updated_at: i64) -> UserPerformance {
    UserPerformance {
        puuid: "puuid".into(),
        region: region.into(),
        riot_id: "Name#TAG".into(),
        queue_id: 0,
        matches: match_ids
            .iter()
            .map(|id| MatchStats {
                match_id: id.to_string(),
                kills: 3,
                items: vec![1055, 0, 0, 0, 0, 0, 3340],
                ..Default::default()
            })
            .collect(),
        updated_at,
    }
}

#[tokio::test]
async fn test_missing_performance() {
    let db_handler = db_handler().await;
    let stored = db_handler.get_user_performance("puuid", "na1").await.unwrap();
    assert!(stored.is_none());
}

#[tokio::test]
async fn test_upsert_last_write_wins() {
    let db_handler = db_handler().await;
    let first = performance("na1", &["NA1_1"], 100);
    let second = performance("na1", &["NA1_3", "NA1_2"], 200);

    db_handler.upsert_user_performance(&first).await.unwrap();
    db_handler.upsert_user_performance(&second).await.unwrap();

    let stored = db_handler
        .get_user_performance("puuid", "na1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, second);
}

#[tokio::test]
async fn test_regions_are_stored_separately() {
    let db_handler = db_handler().await;
    let na = performance("na1", &["NA1_1"], 100);
    let euw = performance("euw1", &["EUW1_1", "EUW1_2"], 100);

    PerformanceStore::upsert_user_performance(&db_handler, &na)
        .await
        .unwrap();
    PerformanceStore::upsert_user_performance(&db_handler, &euw)
        .await
        .unwrap();

    let stored = PerformanceStore::get_user_performance(&db_handler, "puuid", "na1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.matches.len(), 1);
    let stored = PerformanceStore::get_user_performance(&db_handler, "puuid", "euw1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.matches.len(), 2);
}

fn with_items(region: &str, items: &[&[i32]]) -> UserPerformance {
    let mut performance = performance(region, &[], 100);
    performance.matches = items
        .iter()
        .enumerate()
        .map(|(i, items)| MatchStats {
            match_id: format!("{}_{i}", region.to_uppercase()),
            items: items.to_vec(),
            ..Default::default()
        })
        .collect();
    performance
}

#[tokio::test]
async fn test_popular_item_ids() {
    let db_handler = db_handler().await;
    assert!(db_handler.popular_item_ids(50).await.unwrap().is_empty());

    db_handler
        .upsert_user_performance(&with_items("na1", &[&[3340, 1055, 0, 0], &[3340, 6655, 0]]))
        .await
        .unwrap();
    db_handler
        .upsert_user_performance(&with_items("euw1", &[&[3340, 6655, 1055, 0], &[2003]]))
        .await
        .unwrap();

    // Ties go to the lower item ID, empty slots are skipped
    assert_eq!(
        db_handler.popular_item_ids(50).await.unwrap(),
        vec![3340, 1055, 6655, 2003]
    );
    assert_eq!(
        PerformanceStore::popular_item_ids(&db_handler, 2).await.unwrap(),
        vec![3340, 1055]
    );
}

#[tokio::test]
async fn test_memory_cache_round_trip() {
    let cache = MemoryCache::new(100);
    let data = performance("na1", &["NA1_1"], 100);
    cache
        .set(
            "userperformance:na1_puuid:q0",
            serde_json::to_string(&data).unwrap(),
            Duration::from_secs(60),
        )
        .await
        .unwrap();

    let cached: Option<UserPerformance> = get_json(&cache, "userperformance:na1_puuid:q0").await;
    assert_eq!(cached, Some(data));
    let missing: Option<UserPerformance> = get_json(&cache, "userperformance:euw1_puuid:q0").await;
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_malformed_cache_entry_is_a_miss() {
    let cache = MemoryCache::new(100);
    cache
        .set("puuid:americas:name:tag", "not json".into(), Duration::from_secs(60))
        .await
        .unwrap();

    let cached: Option<Vec<String>> = get_json(&cache, "puuid:americas:name:tag").await;
    assert!(cached.is_none());
}
