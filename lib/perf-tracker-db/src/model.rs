use crate::error::Error;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// One player's line from a single match, flattened out of the provider's
/// match payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchStats {
    pub match_id: String,
    pub game_mode: String,
    /// Epoch milliseconds
    pub game_creation: i64,
    /// Seconds
    pub game_duration: i64,
    pub champion_name: String,
    pub champion_id: i32,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub kda: f64,
    pub kill_participation: f64,
    /// Lane minions plus neutral monsters
    pub total_minions_killed: i32,
    pub vision_score: i32,
    pub gold_earned: i32,
    pub team_position: String,
    /// Item slots 0 through 5, then the trinket
    pub items: Vec<i32>,
    pub summoner_spells: Vec<i32>,
    pub primary_rune: i32,
    pub secondary_style: i32,
    pub champ_level: i32,
    pub damage_to_turrets: i32,
    pub damage_to_objectives: i32,
    pub damage_to_champions: i32,
    pub total_damage_taken: i32,
    pub team_id: i32,
    pub queue_id: i32,
}

/// A player's recent matches for a single region, newest first.
///
/// Refreshed wholesale; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPerformance {
    pub puuid: String,
    pub region: String,
    pub riot_id: String,
    /// Queue filter the matches were fetched with, 0 for all queues
    #[serde(default)]
    pub queue_id: u16,
    pub matches: Vec<MatchStats>,
    /// Epoch seconds
    pub updated_at: i64,
}

impl UserPerformance {
    /// Snapshot with no matches, used when the player has no recent games.
    pub fn empty(puuid: &str, region: &str, riot_id: &str, queue_id: u16, now: i64) -> Self {
        Self {
            puuid: puuid.to_owned(),
            region: region.to_owned(),
            riot_id: riot_id.to_owned(),
            queue_id,
            matches: Vec::new(),
            updated_at: now,
        }
    }

    /// Order matches by game creation time, newest first.
    pub fn sort_matches(&mut self) {
        self.matches
            .sort_by(|a, b| b.game_creation.cmp(&a.game_creation));
    }

    /// Up to `count` matches starting at `offset`.
    pub fn window(&self, offset: usize, count: usize) -> &[MatchStats] {
        let start = offset.min(self.matches.len());
        let end = start.saturating_add(count).min(self.matches.len());
        &self.matches[start..end]
    }

    /// Copy of this snapshot holding at most the `count` most recent matches.
    /// The original is left untouched.
    pub fn trimmed(&self, count: usize) -> Self {
        Self {
            puuid: self.puuid.clone(),
            region: self.region.clone(),
            riot_id: self.riot_id.clone(),
            queue_id: self.queue_id,
            matches: self.window(0, count).to_vec(),
            updated_at: self.updated_at,
        }
    }

    /// Whether this snapshot can answer a request for `count` matches without
    /// going back to the provider. It must hold enough matches and be younger
    /// than half of `ttl_secs`.
    pub fn is_fresh_for(&self, count: usize, now: i64, ttl_secs: i64) -> bool {
        self.matches.len() >= count && now - self.updated_at < ttl_secs / 2
    }
}

/// Row layout of the `user_performance` table. The match list is stored as a
/// JSON document.
#[derive(Debug, FromRow)]
pub struct UserPerformanceRow {
    pub puuid: String,
    pub region: String,
    pub riot_id: String,
    pub queue_id: i64,
    pub matches: String,
    pub updated_at: i64,
}

impl TryFrom<UserPerformanceRow> for UserPerformance {
    type Error = Error;

    fn try_from(row: UserPerformanceRow) -> Result<Self, Self::Error> {
        let queue_id = u16::try_from(row.queue_id).map_err(|_| {
            Error::InvalidRow(format!(
                "queue {} of {} is out of range",
                row.queue_id, row.puuid
            ))
        })?;

        Ok(Self {
            puuid: row.puuid,
            region: row.region,
            riot_id: row.riot_id,
            queue_id,
            matches: serde_json::from_str(&row.matches)?,
            updated_at: row.updated_at,
        })
    }
}
