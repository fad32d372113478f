use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::race::constants::{manager, pathfinding};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read difficulty file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed difficulty table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Difficulty levels exposed to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [Self::Easy, Self::Medium, Self::Hard];

    /// One level easier, clamped at Easy
    pub fn easier(self) -> Self {
        match self {
            Self::Easy | Self::Medium => Self::Easy,
            Self::Hard => Self::Medium,
        }
    }

    /// One level harder, clamped at Hard
    pub fn harder(self) -> Self {
        match self {
            Self::Easy => Self::Medium,
            Self::Medium | Self::Hard => Self::Hard,
        }
    }
}

impl std::str::FromStr for DifficultyLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ConfigError::Invalid(format!("unknown difficulty '{}'", other))),
        }
    }
}

/// Tuning for one difficulty level, as supplied by the balance layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Decision latency in seconds
    pub reaction_time: f32,
    /// Base top speed
    pub max_speed: f32,
    /// Starting aggressiveness (0.0-1.0)
    pub aggressiveness: f32,
    /// Expected mistakes per second
    pub mistake_frequency: f32,
    /// Rubber-band strength (0.0-1.0)
    pub rubberband_strength: f32,
}

impl DifficultySettings {
    fn validate(&self, level: DifficultyLevel) -> Result<(), ConfigError> {
        let bad = |what: &str| {
            Err(ConfigError::Invalid(format!("{:?}: {}", level, what)))
        };
        if !(self.reaction_time >= 0.0 && self.reaction_time <= 5.0) {
            return bad("reaction_time must be within 0-5 seconds");
        }
        if !(self.max_speed > 0.0 && self.max_speed.is_finite()) {
            return bad("max_speed must be positive");
        }
        if !(0.0..=1.0).contains(&self.aggressiveness) {
            return bad("aggressiveness must be within 0-1");
        }
        if !(self.mistake_frequency >= 0.0 && self.mistake_frequency.is_finite()) {
            return bad("mistake_frequency must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.rubberband_strength) {
            return bad("rubberband_strength must be within 0-1");
        }
        Ok(())
    }
}

/// Difficulty settings for every level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyTable {
    pub easy: DifficultySettings,
    pub medium: DifficultySettings,
    pub hard: DifficultySettings,
}

impl Default for DifficultyTable {
    fn default() -> Self {
        Self {
            easy: DifficultySettings {
                reaction_time: 0.5,
                max_speed: 80.0,
                aggressiveness: 0.3,
                mistake_frequency: 0.3,
                rubberband_strength: 0.3,
            },
            medium: DifficultySettings {
                reaction_time: 0.3,
                max_speed: 100.0,
                aggressiveness: 0.5,
                mistake_frequency: 0.15,
                rubberband_strength: 0.2,
            },
            hard: DifficultySettings {
                reaction_time: 0.15,
                max_speed: 120.0,
                aggressiveness: 0.7,
                mistake_frequency: 0.05,
                rubberband_strength: 0.1,
            },
        }
    }
}

impl DifficultyTable {
    pub fn get(&self, level: DifficultyLevel) -> &DifficultySettings {
        match level {
            DifficultyLevel::Easy => &self.easy,
            DifficultyLevel::Medium => &self.medium,
            DifficultyLevel::Hard => &self.hard,
        }
    }

    /// Parse a table exported by the balance tooling
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for level in DifficultyLevel::ALL {
            self.get(level).validate(level)?;
        }
        Ok(())
    }
}

/// Racing line query tuning
#[derive(Debug, Clone, PartialEq)]
pub struct PathfindingConfig {
    /// Tracks narrower than this refuse overtakes
    pub overtake_min_width: f32,
    /// Corners tighter than this refuse overtakes
    pub overtake_min_corner_radius: f32,
    /// Clearance from obstacles for avoidance paths
    pub avoidance_distance: f32,
    /// Path cache lifetime in milliseconds
    pub cache_ttl_ms: u64,
}

impl Default for PathfindingConfig {
    fn default() -> Self {
        Self {
            overtake_min_width: pathfinding::OVERTAKE_MIN_WIDTH,
            overtake_min_corner_radius: pathfinding::OVERTAKE_MIN_CORNER_RADIUS,
            avoidance_distance: pathfinding::DEFAULT_AVOIDANCE_DISTANCE,
            cache_ttl_ms: pathfinding::CACHE_TTL_MS,
        }
    }
}

/// Roster and frame budget configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    /// Hard cap on opponents per race
    pub max_opponents: usize,
    /// Opponents that get full processing each frame
    pub max_active: usize,
    /// Opponents beyond this distance from the player are simplified
    pub culling_distance: f32,
    /// AI time budget per frame in milliseconds
    pub frame_budget_ms: f32,
    /// Let the budget monitor shrink `max_active` under load
    pub adaptive_budget: bool,
    /// Seed for spawn and behavior randomness (random when None)
    pub seed: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_opponents: manager::MAX_OPPONENTS,
            max_active: manager::MAX_ACTIVE,
            culling_distance: manager::CULLING_DISTANCE,
            frame_budget_ms: manager::FRAME_BUDGET_MS,
            adaptive_budget: true,
            seed: None,
        }
    }
}

/// Complete AI configuration
#[derive(Debug, Clone, Default)]
pub struct AiConfig {
    pub manager: ManagerConfig,
    pub pathfinding: PathfindingConfig,
    pub difficulty: DifficultyTable,
}

impl AiConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("AI_MAX_OPPONENTS") {
            match val.parse::<usize>() {
                Ok(parsed) if (1..=manager::MAX_OPPONENTS).contains(&parsed) => {
                    config.manager.max_opponents = parsed;
                }
                _ => tracing::warn!(
                    "AI_MAX_OPPONENTS must be 1-{}, using default",
                    manager::MAX_OPPONENTS
                ),
            }
        }

        if let Ok(val) = std::env::var("AI_MAX_ACTIVE") {
            match val.parse::<usize>() {
                Ok(parsed) if parsed > 0 => config.manager.max_active = parsed,
                _ => tracing::warn!("Invalid AI_MAX_ACTIVE '{}', using default", val),
            }
        }

        if let Ok(val) = std::env::var("AI_CULLING_DISTANCE") {
            match val.parse::<f32>() {
                Ok(parsed) if parsed > 0.0 => config.manager.culling_distance = parsed,
                _ => tracing::warn!("Invalid AI_CULLING_DISTANCE '{}', using default", val),
            }
        }

        if let Ok(val) = std::env::var("AI_FRAME_BUDGET_MS") {
            match val.parse::<f32>() {
                Ok(parsed) if parsed > 0.0 => config.manager.frame_budget_ms = parsed,
                _ => tracing::warn!("Invalid AI_FRAME_BUDGET_MS '{}', using default", val),
            }
        }

        if let Ok(val) = std::env::var("AI_ADAPTIVE_BUDGET") {
            config.manager.adaptive_budget = val.parse().unwrap_or(true);
        }

        if let Ok(val) = std::env::var("AI_SEED") {
            match val.parse::<u64>() {
                Ok(parsed) => config.manager.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid AI_SEED '{}', using random seed", val),
            }
        }

        if let Ok(path) = std::env::var("AI_DIFFICULTY_FILE") {
            match DifficultyTable::load(Path::new(&path)) {
                Ok(table) => config.difficulty = table,
                Err(e) => tracing::warn!("Ignoring AI_DIFFICULTY_FILE '{}': {}", path, e),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.max_opponents == 0 || self.manager.max_opponents > manager::MAX_OPPONENTS {
            return Err(ConfigError::Invalid(format!(
                "max_opponents must be 1-{}",
                manager::MAX_OPPONENTS
            )));
        }
        if self.manager.max_active == 0 {
            return Err(ConfigError::Invalid("max_active must be at least 1".to_string()));
        }
        if !(self.manager.culling_distance > 0.0) {
            return Err(ConfigError::Invalid("culling_distance must be positive".to_string()));
        }
        if !(self.manager.frame_budget_ms > 0.0) {
            return Err(ConfigError::Invalid("frame_budget_ms must be positive".to_string()));
        }
        if self.pathfinding.cache_ttl_ms == 0 {
            return Err(ConfigError::Invalid("cache_ttl_ms must be positive".to_string()));
        }
        self.difficulty.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AiConfig::default();
        assert_eq!(config.manager.max_opponents, 7);
        assert_eq!(config.manager.max_active, 4);
        assert_eq!(config.manager.culling_distance, 1000.0);
        assert_eq!(config.pathfinding.overtake_min_width, 20.0);
        assert_eq!(config.pathfinding.overtake_min_corner_radius, 30.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = AiConfig::load_or_default();
        assert!(config.manager.max_active > 0);
    }

    #[test]
    fn test_difficulty_steps_clamp() {
        assert_eq!(DifficultyLevel::Easy.easier(), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::Medium.easier(), DifficultyLevel::Easy);
        assert_eq!(DifficultyLevel::Medium.harder(), DifficultyLevel::Hard);
        assert_eq!(DifficultyLevel::Hard.harder(), DifficultyLevel::Hard);
    }

    #[test]
    fn test_difficulty_from_str() {
        assert_eq!("Medium".parse::<DifficultyLevel>().unwrap(), DifficultyLevel::Medium);
        assert!("insane".parse::<DifficultyLevel>().is_err());
    }

    #[test]
    fn test_difficulty_table_json() {
        let json = serde_json::to_string(&DifficultyTable::default()).unwrap();
        let table = DifficultyTable::from_json(&json).unwrap();
        assert_eq!(table, DifficultyTable::default());
        assert!(table.get(DifficultyLevel::Hard).max_speed > table.get(DifficultyLevel::Easy).max_speed);
    }

    #[test]
    fn test_difficulty_table_rejects_out_of_range() {
        let mut table = DifficultyTable::default();
        table.medium.aggressiveness = 1.5;
        let json = serde_json::to_string(&table).unwrap();
        assert!(matches!(DifficultyTable::from_json(&json), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_difficulty_table_rejects_garbage() {
        assert!(matches!(DifficultyTable::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_active() {
        let mut config = AiConfig::default();
        config.manager.max_active = 0;
        assert!(config.validate().is_err());
    }
}
