//! Rollups of a player's recent matches: overall, per role and per champion.
//!
//! Everything here is a pure function of the match list it is given.

pub mod role;
mod summary;
mod tally;

pub use summary::{
    champion_stats, overall_stats, role_stats, ChampionStats, IncrementalStats, OverallStats,
    RecentGamesSummary, RoleStats,
};
pub use tally::is_classic;

/// `(kills + assists) / deaths`, or `kills + assists` for a deathless line.
pub fn kda(kills: i64, deaths: i64, assists: i64) -> f64 {
    let takedowns = (kills + assists) as f64;
    if deaths > 0 {
        takedowns / deaths as f64
    } else {
        takedowns
    }
}
