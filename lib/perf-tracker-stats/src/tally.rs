use crate::kda;
use perf_tracker_db::model::MatchStats;

/// Game mode of the standard 5v5 map, the only mode with a comparable economy
const CLASSIC_MODE: &str = "CLASSIC";

pub fn is_classic(game_mode: &str) -> bool {
    game_mode.eq_ignore_ascii_case(CLASSIC_MODE)
}

/// Running sums over a group of matches.
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct Tally {
    pub games: u32,
    pub wins: u32,
    pub kills: i64,
    pub deaths: i64,
    pub assists: i64,
    pub game_time: i64,
    pub vision_score: i64,
    pub damage_to_champions: i64,
    pub kill_participation: f64,
    // CS and gold rates only count classic games
    classic_game_time: i64,
    classic_cs: i64,
    classic_gold: i64,
}

impl Tally {
    pub fn from_matches<'a>(matches: impl IntoIterator<Item = &'a MatchStats>) -> Self {
        let mut tally = Self::default();
        for match_stats in matches {
            tally.add(match_stats);
        }
        tally
    }

    pub fn add(&mut self, match_stats: &MatchStats) {
        self.games += 1;
        if match_stats.win {
            self.wins += 1;
        }
        self.kills += i64::from(match_stats.kills);
        self.deaths += i64::from(match_stats.deaths);
        self.assists += i64::from(match_stats.assists);
        self.game_time += match_stats.game_duration;
        self.vision_score += i64::from(match_stats.vision_score);
        self.damage_to_champions += i64::from(match_stats.damage_to_champions);
        self.kill_participation += match_stats.kill_participation;

        if is_classic(&match_stats.game_mode) {
            self.classic_game_time += match_stats.game_duration;
            self.classic_cs += i64::from(match_stats.total_minions_killed);
            self.classic_gold += i64::from(match_stats.gold_earned);
        }
    }

    pub fn losses(&self) -> u32 {
        self.games - self.wins
    }

    /// Percentage of games won.
    pub fn win_rate(&self) -> f64 {
        self.average(f64::from(self.wins)) * 100.0
    }

    pub fn kda(&self) -> f64 {
        kda(self.kills, self.deaths, self.assists)
    }

    /// Per-game mean of `total`.
    pub fn average(&self, total: f64) -> f64 {
        if self.games == 0 {
            return 0.0;
        }
        total / f64::from(self.games)
    }

    pub fn cs_per_min(&self) -> f64 {
        self.per_classic_minute(self.classic_cs)
    }

    pub fn gold_per_min(&self) -> f64 {
        self.per_classic_minute(self.classic_gold)
    }

    fn per_classic_minute(&self, total: i64) -> f64 {
        if self.classic_game_time <= 0 {
            return 0.0;
        }
        total as f64 / self.classic_game_time as f64 * 60.0
    }
}
