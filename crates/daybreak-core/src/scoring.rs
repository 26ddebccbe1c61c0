//! Weighted habit scoring.
//!
//! Maps a day's habit-completion set to a deterministic 0-100 score under
//! fixed weights, and bands the score into a motivational message. Pure
//! functions only; malformed input (missing flags) deserializes to `false`,
//! never an error.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The four daily habits.
///
/// Every flag is `#[serde(default)]` so a record missing a flag reads back
/// as not-completed rather than failing deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HabitFlags {
    #[serde(default)]
    pub drink_water: bool,
    #[serde(default)]
    pub no_social_media: bool,
    #[serde(default)]
    pub sunlight: bool,
    #[serde(default)]
    pub elephant_task: bool,
}

impl HabitFlags {
    /// Number of completed habits.
    pub fn completed_count(&self) -> usize {
        [
            self.drink_water,
            self.no_social_media,
            self.sunlight,
            self.elephant_task,
        ]
        .iter()
        .filter(|&&done| done)
        .count()
    }
}

/// Weight for each habit's contribution to the daily score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HabitWeights {
    /// Weight for drinking water
    pub drink_water: f64,
    /// Weight for staying off social media (highest)
    pub no_social_media: f64,
    /// Weight for sunlight exposure
    pub sunlight: f64,
    /// Weight for the day's most important task (highest)
    pub elephant_task: f64,
}

impl HabitWeights {
    /// Check that each weight is in [0, 1] and the weights sum to 1.0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let weights = [
            ("drink_water", self.drink_water),
            ("no_social_media", self.no_social_media),
            ("sunlight", self.sunlight),
            ("elephant_task", self.elephant_task),
        ];
        for (key, w) in weights {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("weight {w} is outside [0.0, 1.0]"),
                });
            }
        }
        let sum: f64 = weights.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::InvalidValue {
                key: "weights".to_string(),
                message: format!("weights sum to {sum}, expected 1.0"),
            });
        }
        Ok(())
    }

    /// Weighted score for a completion set, rounded to an integer percent.
    pub fn score(&self, flags: &HabitFlags) -> u8 {
        let mut total = 0.0;
        if flags.drink_water {
            total += self.drink_water;
        }
        if flags.no_social_media {
            total += self.no_social_media;
        }
        if flags.sunlight {
            total += self.sunlight;
        }
        if flags.elephant_task {
            total += self.elephant_task;
        }
        (total * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

impl Default for HabitWeights {
    fn default() -> Self {
        Self {
            drink_water: 0.20,
            no_social_media: 0.30,
            sunlight: 0.20,
            elephant_task: 0.30,
        }
    }
}

/// Score a completion set under the default weights.
pub fn score(flags: &HabitFlags) -> u8 {
    HabitWeights::default().score(flags)
}

/// Motivational message for a score, banded deterministically.
pub fn motivational_message(score: u8) -> &'static str {
    if score >= 90 {
        "CRUSHING IT! You're unstoppable!"
    } else if score >= 75 {
        "STRONG performance! Keep building momentum!"
    } else if score >= 50 {
        "SOLID effort! Tomorrow's your chance to level up!"
    } else if score >= 30 {
        "PROGRESS over perfection! You're building something great!"
    } else {
        "Every CHAMPION has off days. Ready to bounce back?"
    }
}
