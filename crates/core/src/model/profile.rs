use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ids::UserId;

/// Level assigned to profiles that have no level of their own.
pub const DEFAULT_LEVEL: u32 = 1;

//
// ─── CHARACTER TYPE ───────────────────────────────────────────────────────────
//

/// Avatar archetype chosen by the user.
///
/// Unknown or missing persisted values read as `Citizen`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterType {
    #[default]
    Citizen,
    Scholar,
    Guardian,
    Advocate,
}

impl CharacterType {
    pub const ALL: [CharacterType; 4] = [
        CharacterType::Citizen,
        CharacterType::Scholar,
        CharacterType::Guardian,
        CharacterType::Advocate,
    ];

    /// Lenient parse used when reading stored rows.
    #[must_use]
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("scholar") => Self::Scholar,
            Some("guardian") => Self::Guardian,
            Some("advocate") => Self::Advocate,
            _ => Self::Citizen,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CharacterType::Citizen => "citizen",
            CharacterType::Scholar => "scholar",
            CharacterType::Guardian => "guardian",
            CharacterType::Advocate => "advocate",
        }
    }

    /// Human readable title shown next to the display name.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            CharacterType::Citizen => "Constitutional Citizen",
            CharacterType::Scholar => "Legal Scholar",
            CharacterType::Guardian => "Rights Guardian",
            CharacterType::Advocate => "Justice Advocate",
        }
    }
}

impl fmt::Display for CharacterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── PROFILE ──────────────────────────────────────────────────────────────────
//

/// Per-user aggregate record: points, level and character.
///
/// `total_points` only ever grows under normal flow; nothing spends points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub level: u32,
    pub total_points: u64,
    pub character_type: CharacterType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Fresh profile with zero points at the default level.
    #[must_use]
    pub fn new(user_id: UserId, display_name: Option<String>, now: DateTime<Utc>) -> Self {
        let display_name = display_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty());
        Self {
            user_id,
            display_name,
            username: None,
            level: DEFAULT_LEVEL,
            total_points: 0,
            character_type: CharacterType::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Name to greet the user with, falling back to the given default.
    #[must_use]
    pub fn greeting_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.display_name.as_deref().unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn unknown_character_reads_as_citizen() {
        assert_eq!(CharacterType::from_stored(None), CharacterType::Citizen);
        assert_eq!(
            CharacterType::from_stored(Some("wizard")),
            CharacterType::Citizen
        );
        assert_eq!(
            CharacterType::from_stored(Some("guardian")),
            CharacterType::Guardian
        );
    }

    #[test]
    fn stored_names_round_trip() {
        for ty in CharacterType::ALL {
            assert_eq!(CharacterType::from_stored(Some(ty.as_str())), ty);
        }
    }

    #[test]
    fn new_profile_starts_at_zero_points() {
        let profile = Profile::new(UserId::random(), Some("  Asha ".into()), fixed_now());
        assert_eq!(profile.total_points, 0);
        assert_eq!(profile.level, DEFAULT_LEVEL);
        assert_eq!(profile.display_name.as_deref(), Some("Asha"));
    }

    #[test]
    fn blank_display_name_is_dropped() {
        let profile = Profile::new(UserId::random(), Some("   ".into()), fixed_now());
        assert_eq!(profile.display_name, None);
        assert_eq!(profile.greeting_name("Scholar"), "Scholar");
    }
}
