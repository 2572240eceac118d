use serde::{Serialize, Serializer};
use std::fmt;

/// Role a match is grouped under. Queue-specific modes without lanes take the
/// place of a role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Aram,
    Arena,
    Top,
    Jungle,
    Mid,
    Bot,
    Support,
    Unknown,
    /// Team position the provider reported that has no known mapping
    Other(String),
}

impl Role {
    pub fn new(team_position: &str, game_mode: &str) -> Self {
        match game_mode.to_uppercase().as_str() {
            "ARAM" => return Role::Aram,
            "CHERRY" => return Role::Arena,
            _ => {}
        }

        // Match to values from Riot API
        match team_position.to_uppercase().as_str() {
            "TOP" => Role::Top,
            "JUNGLE" => Role::Jungle,
            "MIDDLE" | "MID" => Role::Mid,
            "BOTTOM" | "BOT" => Role::Bot,
            "UTILITY" | "SUPPORT" => Role::Support,
            "" => Role::Unknown,
            _ => Role::Other(team_position.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Aram => "ARAM",
            Role::Arena => "Arena",
            Role::Top => "Top",
            Role::Jungle => "Jungle",
            Role::Mid => "Mid",
            Role::Bot => "Bot",
            Role::Support => "Support",
            Role::Unknown => "Unknown",
            Role::Other(position) => position,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn positions_map_to_roles() {
        assert_eq!(Role::new("TOP", "CLASSIC"), Role::Top);
        assert_eq!(Role::new("JUNGLE", "CLASSIC"), Role::Jungle);
        assert_eq!(Role::new("MIDDLE", "CLASSIC"), Role::Mid);
        assert_eq!(Role::new("mid", "CLASSIC"), Role::Mid);
        assert_eq!(Role::new("BOTTOM", "CLASSIC"), Role::Bot);
        assert_eq!(Role::new("BOT", "CLASSIC"), Role::Bot);
        assert_eq!(Role::new("UTILITY", "CLASSIC"), Role::Support);
        assert_eq!(Role::new("SUPPORT", "CLASSIC"), Role::Support);
        assert_eq!(Role::new("", "CLASSIC"), Role::Unknown);
    }

    #[test]
    fn modes_override_position() {
        assert_eq!(Role::new("MIDDLE", "ARAM"), Role::Aram);
        assert_eq!(Role::new("", "CHERRY"), Role::Arena);
        assert_eq!(Role::new("", "cherry").to_string(), "Arena");
    }

    #[test]
    fn unmapped_position_passes_through() {
        let role = Role::new("Invalid", "CLASSIC");
        assert_eq!(role, Role::Other("Invalid".into()));
        assert_eq!(role.as_str(), "Invalid");
    }
}
