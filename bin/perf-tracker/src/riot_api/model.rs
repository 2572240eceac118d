use perf_tracker_db::model::MatchStats;
use perf_tracker_stats::kda;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The parts of a Match-V5 payload the tracker uses. Field names follow the
/// provider's JSON, so a record can be read straight out of a provider
/// response or out of the hot cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchRecord {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchMetadata {
    pub match_id: String,
    /// PUUIDs
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchInfo {
    pub game_creation: i64,
    pub game_duration: i64,
    pub game_mode: String,
    pub queue_id: i32,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    pub puuid: String,
    pub champion_id: i32,
    pub champion_name: String,
    pub team_id: i32,
    pub win: bool,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub total_minions_killed: i32,
    pub neutral_minions_killed: i32,
    pub vision_score: i32,
    pub gold_earned: i32,
    pub team_position: String,
    pub item0: i32,
    pub item1: i32,
    pub item2: i32,
    pub item3: i32,
    pub item4: i32,
    pub item5: i32,
    pub item6: i32,
    pub summoner1_id: i32,
    pub summoner2_id: i32,
    pub champ_level: i32,
    pub damage_dealt_to_turrets: i32,
    pub damage_dealt_to_objectives: i32,
    pub total_damage_dealt_to_champions: i32,
    pub total_damage_taken: i32,
    pub challenges: Option<Challenges>,
    pub perks: Option<Perks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Challenges {
    pub kill_participation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Perks {
    pub styles: Vec<PerkStyle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerkStyle {
    /// `primaryStyle` or `subStyle`
    pub description: String,
    pub selections: Vec<PerkSelection>,
    /// Rune tree ID
    pub style: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerkSelection {
    pub perk: i32,
}

impl MatchRecord {
    /// Narrow a full riven [`riven::models::match_v5::Match`] down to a record,
    /// going through the provider's JSON shape.
    pub fn from_riven(data: &riven::models::match_v5::Match) -> Result<Self, serde_json::Error> {
        let mut value = serde_json::to_value(data)?;
        strip_nulls(&mut value);
        serde_json::from_value(value)
    }

    /// Flatten the participant with the given PUUID into [`MatchStats`].
    /// Returns [`None`] if they did not play in this match.
    pub fn player_stats(&self, puuid: &str) -> Option<MatchStats> {
        let player = self.info.participants.iter().find(|p| p.puuid == puuid)?;

        let mut primary_rune = 0;
        let mut secondary_style = 0;
        for style in player.perks.iter().flat_map(|perks| &perks.styles) {
            match style.description.as_str() {
                "primaryStyle" => {
                    if let Some(selection) = style.selections.first() {
                        primary_rune = selection.perk;
                    }
                }
                "subStyle" => secondary_style = style.style,
                _ => {}
            }
        }

        Some(MatchStats {
            match_id: self.metadata.match_id.clone(),
            game_mode: self.info.game_mode.clone(),
            game_creation: self.info.game_creation,
            game_duration: self.info.game_duration,
            champion_name: player.champion_name.clone(),
            champion_id: player.champion_id,
            win: player.win,
            kills: player.kills,
            deaths: player.deaths,
            assists: player.assists,
            kda: kda(player.kills.into(), player.deaths.into(), player.assists.into()),
            kill_participation: player
                .challenges
                .as_ref()
                .and_then(|c| c.kill_participation)
                .unwrap_or_default(),
            total_minions_killed: player.total_minions_killed + player.neutral_minions_killed,
            vision_score: player.vision_score,
            gold_earned: player.gold_earned,
            team_position: player.team_position.clone(),
            items: vec![
                player.item0,
                player.item1,
                player.item2,
                player.item3,
                player.item4,
                player.item5,
                player.item6,
            ],
            summoner_spells: vec![player.summoner1_id, player.summoner2_id],
            primary_rune,
            secondary_style,
            champ_level: player.champ_level,
            damage_to_turrets: player.damage_dealt_to_turrets,
            damage_to_objectives: player.damage_dealt_to_objectives,
            damage_to_champions: player.total_damage_dealt_to_champions,
            total_damage_taken: player.total_damage_taken,
            team_id: player.team_id,
            queue_id: self.info.queue_id,
        })
    }
}

// Absent optional fields serialize as null; dropping them lets `default` apply
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider_payload() -> serde_json::Value {
        json!({
            "metadata": {
                "dataVersion": "2",
                "matchId": "NA1_5000000001",
                "participants": ["me", "other"]
            },
            "info": {
                "gameCreation": 1_700_000_000_000_i64,
                "gameDuration": 1500,
                "gameMode": "CLASSIC",
                "queueId": 420,
                "participants": [
                    {
                        "puuid": "other",
                        "championId": 1,
                        "championName": "Annie",
                        "kills": 9
                    },
                    {
                        "puuid": "me",
                        "championId": 103,
                        "championName": "Ahri",
                        "teamId": 100,
                        "win": true,
                        "kills": 5,
                        "deaths": 2,
                        "assists": 3,
                        "totalMinionsKilled": 140,
                        "neutralMinionsKilled": 10,
                        "visionScore": 21,
                        "goldEarned": 9000,
                        "teamPosition": "MIDDLE",
                        "item0": 6655, "item1": 3020, "item2": 0,
                        "item3": 0, "item4": 0, "item5": 0, "item6": 3340,
                        "summoner1Id": 4, "summoner2Id": 14,
                        "champLevel": 15,
                        "totalDamageDealtToChampions": 18000,
                        "challenges": { "killParticipation": 0.5, "kda": 4.0 },
                        "perks": {
                            "statPerks": { "defense": 5001, "flex": 5008, "offense": 5005 },
                            "styles": [
                                {
                                    "description": "primaryStyle",
                                    "selections": [{ "perk": 8112, "var1": 0 }, { "perk": 8139 }],
                                    "style": 8100
                                },
                                {
                                    "description": "subStyle",
                                    "selections": [{ "perk": 8226 }],
                                    "style": 8200
                                }
                            ]
                        }
                    }
                ]
            }
        })
    }

    #[test]
    fn extracts_requesting_player() {
        let record: MatchRecord = serde_json::from_value(provider_payload()).unwrap();
        let stats = record.player_stats("me").unwrap();

        assert_eq!(stats.match_id, "NA1_5000000001");
        assert_eq!(stats.champion_name, "Ahri");
        assert_eq!(stats.champion_id, 103);
        assert!(stats.win);
        assert_eq!(stats.kda, 4.0);
        assert_eq!(stats.kill_participation, 0.5);
        assert_eq!(stats.total_minions_killed, 150);
        assert_eq!(stats.items, vec![6655, 3020, 0, 0, 0, 0, 3340]);
        assert_eq!(stats.summoner_spells, vec![4, 14]);
        assert_eq!(stats.primary_rune, 8112);
        assert_eq!(stats.secondary_style, 8200);
        assert_eq!(stats.queue_id, 420);
        assert_eq!(stats.game_duration, 1500);
    }

    #[test]
    fn missing_blocks_fall_back_to_zero() {
        let record: MatchRecord = serde_json::from_value(provider_payload()).unwrap();
        let stats = record.player_stats("other").unwrap();
        assert_eq!(stats.kill_participation, 0.0);
        assert_eq!(stats.primary_rune, 0);
        assert_eq!(stats.secondary_style, 0);
        // Deathless line counts raw takedowns
        assert_eq!(stats.kda, 9.0);
    }

    #[test]
    fn null_fields_fall_back_to_default() {
        let mut payload = provider_payload();
        payload["info"]["participants"][1]["teamPosition"] = Value::Null;
        payload["info"]["participants"][1]["challenges"]["killParticipation"] = Value::Null;
        strip_nulls(&mut payload);

        let record: MatchRecord = serde_json::from_value(payload).unwrap();
        let stats = record.player_stats("me").unwrap();
        assert_eq!(stats.team_position, "");
        assert_eq!(stats.kill_participation, 0.0);
    }

    #[test]
    fn absent_player_is_none() {
        let record: MatchRecord = serde_json::from_value(provider_payload()).unwrap();
        assert!(record.player_stats("stranger").is_none());
    }
}
