use crate::role::Role;
use crate::tally::Tally;
use crate::kda;
use perf_tracker_db::model::{MatchStats, UserPerformance};
use serde::Serialize;
use std::collections::BTreeMap;

// Starting bounds for best/worst single-match KDA, tightened by every match
const BEST_KDA_FLOOR: f64 = -1.0;
const WORST_KDA_CEILING: f64 = 999_999.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    #[serde(rename = "overallKDA")]
    pub overall_kda: f64,
    pub avg_game_duration: f64,
    pub total_game_time: i64,
    pub avg_vision_score: f64,
    #[serde(rename = "avgCSPerMin")]
    pub avg_cs_per_min: f64,
    pub avg_gold_per_min: f64,
    pub avg_damage_to_champions: f64,
    pub avg_kill_participation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleStats {
    pub role: Role,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    #[serde(rename = "roleKDA")]
    pub role_kda: f64,
    pub avg_vision_score: f64,
    #[serde(rename = "avgCSPerMin")]
    pub avg_cs_per_min: f64,
    pub avg_gold_per_min: f64,
    pub avg_damage_to_champions: f64,
    pub avg_kill_participation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionStats {
    pub champion_name: String,
    pub champion_id: i32,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
    pub avg_kills: f64,
    pub avg_deaths: f64,
    pub avg_assists: f64,
    #[serde(rename = "championKDA")]
    pub champion_kda: f64,
    #[serde(rename = "bestKDA")]
    pub best_kda: f64,
    #[serde(rename = "worstKDA")]
    pub worst_kda: f64,
    pub avg_vision_score: f64,
    #[serde(rename = "avgCSPerMin")]
    pub avg_cs_per_min: f64,
    pub avg_gold_per_min: f64,
    pub avg_damage_to_champions: f64,
    pub avg_kill_participation: f64,
    /// Creation time of the most recent game on this champion
    pub last_played: i64,
}

/// Derived view of a [`UserPerformance`] snapshot. Always recomputed from the
/// match list, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentGamesSummary {
    pub puuid: String,
    pub region: String,
    pub riot_id: String,
    pub total_matches: usize,
    pub overall_stats: OverallStats,
    pub role_stats: BTreeMap<String, RoleStats>,
    pub champion_stats: BTreeMap<String, ChampionStats>,
    pub recent_matches: Vec<MatchStats>,
    pub last_updated: i64,
}

/// Lightweight rollup of a single page of matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncrementalStats {
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: f64,
    pub total_kills: i64,
    pub total_deaths: i64,
    pub total_assists: i64,
    pub kda: f64,
}

impl RecentGamesSummary {
    pub fn new(performance: &UserPerformance) -> Self {
        let matches = &performance.matches;
        Self {
            puuid: performance.puuid.clone(),
            region: performance.region.clone(),
            riot_id: performance.riot_id.clone(),
            total_matches: matches.len(),
            overall_stats: overall_stats(matches),
            role_stats: role_stats(matches),
            champion_stats: champion_stats(matches),
            recent_matches: matches.clone(),
            last_updated: performance.updated_at,
        }
    }
}

impl IncrementalStats {
    pub fn new(matches: &[MatchStats]) -> Self {
        let tally = Tally::from_matches(matches);
        Self {
            games_played: tally.games,
            wins: tally.wins,
            losses: tally.losses(),
            win_rate: tally.win_rate(),
            total_kills: tally.kills,
            total_deaths: tally.deaths,
            total_assists: tally.assists,
            kda: tally.kda(),
        }
    }
}

pub fn overall_stats(matches: &[MatchStats]) -> OverallStats {
    if matches.is_empty() {
        return OverallStats::default();
    }

    let tally = Tally::from_matches(matches);
    OverallStats {
        wins: tally.wins,
        losses: tally.losses(),
        win_rate: tally.win_rate(),
        total_kills: tally.kills,
        total_deaths: tally.deaths,
        total_assists: tally.assists,
        avg_kills: tally.average(tally.kills as f64),
        avg_deaths: tally.average(tally.deaths as f64),
        avg_assists: tally.average(tally.assists as f64),
        overall_kda: tally.kda(),
        avg_game_duration: tally.average(tally.game_time as f64),
        total_game_time: tally.game_time,
        avg_vision_score: tally.average(tally.vision_score as f64),
        avg_cs_per_min: tally.cs_per_min(),
        avg_gold_per_min: tally.gold_per_min(),
        avg_damage_to_champions: tally.average(tally.damage_to_champions as f64),
        avg_kill_participation: tally.average(tally.kill_participation),
    }
}

/// Group matches by normalized role, keyed by the role's display name.
/// Roles sharing a display name, such as an empty position and a reported
/// `Unknown`, fall into one group labelled with the first role seen.
pub fn role_stats(matches: &[MatchStats]) -> BTreeMap<String, RoleStats> {
    let mut groups: BTreeMap<String, (Role, Tally)> = BTreeMap::new();
    for match_stats in matches {
        let role = Role::new(&match_stats.team_position, &match_stats.game_mode);
        groups
            .entry(role.to_string())
            .or_insert_with(|| (role, Tally::default()))
            .1
            .add(match_stats);
    }

    groups
        .into_iter()
        .map(|(name, (role, tally))| {
            let stats = RoleStats {
                role,
                games_played: tally.games,
                wins: tally.wins,
                losses: tally.losses(),
                win_rate: tally.win_rate(),
                total_kills: tally.kills,
                total_deaths: tally.deaths,
                total_assists: tally.assists,
                avg_kills: tally.average(tally.kills as f64),
                avg_deaths: tally.average(tally.deaths as f64),
                avg_assists: tally.average(tally.assists as f64),
                role_kda: tally.kda(),
                avg_vision_score: tally.average(tally.vision_score as f64),
                avg_cs_per_min: tally.cs_per_min(),
                avg_gold_per_min: tally.gold_per_min(),
                avg_damage_to_champions: tally.average(tally.damage_to_champions as f64),
                avg_kill_participation: tally.average(tally.kill_participation),
            };
            (name, stats)
        })
        .collect()
}

#[derive(Debug)]
struct ChampionGroup {
    champion_id: i32,
    tally: Tally,
    best_kda: f64,
    worst_kda: f64,
    last_played: i64,
}

/// Group matches by champion name, with single-match KDA extremes and the
/// most recent time each champion was played.
pub fn champion_stats(matches: &[MatchStats]) -> BTreeMap<String, ChampionStats> {
    let mut groups: BTreeMap<&str, ChampionGroup> = BTreeMap::new();
    for match_stats in matches {
        let group = groups
            .entry(match_stats.champion_name.as_str())
            .or_insert_with(|| ChampionGroup {
                champion_id: match_stats.champion_id,
                tally: Tally::default(),
                best_kda: BEST_KDA_FLOOR,
                worst_kda: WORST_KDA_CEILING,
                last_played: match_stats.game_creation,
            });

        group.tally.add(match_stats);
        let match_kda = kda(
            match_stats.kills.into(),
            match_stats.deaths.into(),
            match_stats.assists.into(),
        );
        group.best_kda = group.best_kda.max(match_kda);
        group.worst_kda = group.worst_kda.min(match_kda);
        group.last_played = group.last_played.max(match_stats.game_creation);
    }

    groups
        .into_iter()
        .map(|(name, group)| {
            let tally = &group.tally;
            let stats = ChampionStats {
                champion_name: name.to_owned(),
                champion_id: group.champion_id,
                games_played: tally.games,
                wins: tally.wins,
                losses: tally.losses(),
                win_rate: tally.win_rate(),
                total_kills: tally.kills,
                total_deaths: tally.deaths,
                total_assists: tally.assists,
                avg_kills: tally.average(tally.kills as f64),
                avg_deaths: tally.average(tally.deaths as f64),
                avg_assists: tally.average(tally.assists as f64),
                champion_kda: tally.kda(),
                best_kda: group.best_kda,
                worst_kda: group.worst_kda,
                avg_vision_score: tally.average(tally.vision_score as f64),
                avg_cs_per_min: tally.cs_per_min(),
                avg_gold_per_min: tally.gold_per_min(),
                avg_damage_to_champions: tally.average(tally.damage_to_champions as f64),
                avg_kill_participation: tally.average(tally.kill_participation),
                last_played: group.last_played,
            };
            (name.to_owned(), stats)
        })
        .collect()
}
