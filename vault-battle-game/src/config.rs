//! Battle and mini-game configuration.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BATTLE_COUNTDOWN_SECS, COMPLETION_DISPLAY_DELAY_MS, INITIAL_OBSTACLE_X, INITIAL_SPEED,
    JUMP_LOCKOUT_MS, MAX_SPEED, MINIGAME_DURATION_MS, OFFSCREEN_THRESHOLD, PLAYER_HITBOX_PADDING,
    PLAYER_WIDTH, PLAYER_X, PLAYFIELD_WIDTH, SLIDE_LOCKOUT_MS, SPAWN_INTERVAL_MAX_MS,
    SPAWN_INTERVAL_MIN_MS, SPEED_ACCELERATION, START_COUNTDOWN_STEP_MS, START_COUNTDOWN_STEPS,
};
use crate::numbers::ms_to_secs;
use crate::result::{RewardPolicy, RoiStubConfig};

const DEFAULT_BATTLE_DATA: &str = include_str!("../data/battle.json");

/// Errors raised when battle configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum BattleConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("{field} minimum {min:.2} exceeds maximum {max:.2}")]
    Inverted {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("hitbox padding {padding:.2} leaves no hitbox on a {width:.2}px runner")]
    HitboxCollapsed { padding: f32, width: f32 },
}

/// Tuning for the obstacle-avoidance mini-game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiniGameConfig {
    pub duration_ms: u32,
    pub countdown_steps: u8,
    pub countdown_step_ms: u32,
    pub initial_speed: f32,
    /// Speed gained per elapsed second.
    pub acceleration: f32,
    pub max_speed: f32,
    pub spawn_interval_min_ms: f32,
    pub spawn_interval_max_ms: f32,
    pub jump_lockout_ms: u32,
    pub slide_lockout_ms: u32,
    pub completion_delay_ms: u32,
    pub playfield_width: f32,
    pub player_x: f32,
    pub player_width: f32,
    pub hitbox_padding: f32,
    pub offscreen_threshold: f32,
    pub initial_obstacle_x: f32,
    /// Label attached to winning completion events.
    pub win_reward_label: Option<String>,
}

impl Default for MiniGameConfig {
    fn default() -> Self {
        Self {
            duration_ms: MINIGAME_DURATION_MS,
            countdown_steps: START_COUNTDOWN_STEPS,
            countdown_step_ms: START_COUNTDOWN_STEP_MS,
            initial_speed: INITIAL_SPEED,
            acceleration: SPEED_ACCELERATION,
            max_speed: MAX_SPEED,
            spawn_interval_min_ms: SPAWN_INTERVAL_MIN_MS,
            spawn_interval_max_ms: SPAWN_INTERVAL_MAX_MS,
            jump_lockout_ms: JUMP_LOCKOUT_MS,
            slide_lockout_ms: SLIDE_LOCKOUT_MS,
            completion_delay_ms: COMPLETION_DISPLAY_DELAY_MS,
            playfield_width: PLAYFIELD_WIDTH,
            player_x: PLAYER_X,
            player_width: PLAYER_WIDTH,
            hitbox_padding: PLAYER_HITBOX_PADDING,
            offscreen_threshold: OFFSCREEN_THRESHOLD,
            initial_obstacle_x: INITIAL_OBSTACLE_X,
            win_reward_label: None,
        }
    }
}

impl MiniGameConfig {
    /// Scroll speed after `elapsed_ms` of survival, capped at `max_speed`.
    #[must_use]
    pub fn speed_at(&self, elapsed_ms: u32) -> f32 {
        (self.initial_speed + ms_to_secs(elapsed_ms) * self.acceleration).min(self.max_speed)
    }

    /// Spawn-interval bounds shrunk in proportion to the speed increase.
    #[must_use]
    pub fn spawn_bounds(&self, speed: f32) -> (f32, f32) {
        let scale = if speed > 0.0 {
            self.initial_speed / speed
        } else {
            1.0
        };
        (
            self.spawn_interval_min_ms * scale,
            self.spawn_interval_max_ms * scale,
        )
    }

    /// Runner hitbox as a half-open `[left, right)` span.
    #[must_use]
    pub fn hitbox(&self) -> (f32, f32) {
        (
            self.player_x + self.hitbox_padding,
            self.player_x + self.player_width - self.hitbox_padding,
        )
    }

    /// Check invariants the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BattleConfigError> {
        for (field, value) in [
            ("duration_ms", self.duration_ms),
            ("countdown_step_ms", self.countdown_step_ms),
        ] {
            if value == 0 {
                return Err(BattleConfigError::Zero { field });
            }
        }
        if self.initial_speed <= 0.0 {
            return Err(BattleConfigError::Zero {
                field: "initial_speed",
            });
        }
        if self.acceleration < 0.0 {
            return Err(BattleConfigError::MinViolation {
                field: "acceleration",
                min: 0.0,
                value: f64::from(self.acceleration),
            });
        }
        if self.max_speed < self.initial_speed {
            return Err(BattleConfigError::Inverted {
                field: "speed",
                min: f64::from(self.initial_speed),
                max: f64::from(self.max_speed),
            });
        }
        if self.spawn_interval_min_ms <= 0.0 {
            return Err(BattleConfigError::Zero {
                field: "spawn_interval_min_ms",
            });
        }
        if self.spawn_interval_min_ms > self.spawn_interval_max_ms {
            return Err(BattleConfigError::Inverted {
                field: "spawn_interval_ms",
                min: f64::from(self.spawn_interval_min_ms),
                max: f64::from(self.spawn_interval_max_ms),
            });
        }
        if self.hitbox_padding * 2.0 >= self.player_width {
            return Err(BattleConfigError::HitboxCollapsed {
                padding: self.hitbox_padding,
                width: self.player_width,
            });
        }
        if self.initial_obstacle_x <= self.player_x + self.player_width
            || self.initial_obstacle_x > self.playfield_width
        {
            return Err(BattleConfigError::RangeViolation {
                field: "initial_obstacle_x",
                min: f64::from(self.player_x + self.player_width),
                max: f64::from(self.playfield_width),
                value: f64::from(self.initial_obstacle_x),
            });
        }
        if self.offscreen_threshold >= self.player_x {
            return Err(BattleConfigError::Inverted {
                field: "offscreen_threshold/player_x",
                min: f64::from(self.offscreen_threshold),
                max: f64::from(self.player_x),
            });
        }
        Ok(())
    }
}

/// Complete configuration of one battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default = "BattleConfig::default_countdown_secs")]
    pub countdown_secs: u32,
    #[serde(default)]
    pub mini_game: MiniGameConfig,
    #[serde(default)]
    pub reward: RewardPolicy,
    #[serde(default)]
    pub roi_stub: RoiStubConfig,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            countdown_secs: Self::default_countdown_secs(),
            mini_game: MiniGameConfig::default(),
            reward: RewardPolicy::default(),
            roi_stub: RoiStubConfig::default(),
        }
    }
}

impl BattleConfig {
    const fn default_countdown_secs() -> u32 {
        BATTLE_COUNTDOWN_SECS
    }

    /// Parse a configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not match the configuration shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load the bundled configuration, falling back to compiled defaults.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_BATTLE_DATA)
            .ok()
            .filter(|cfg| cfg.validate().is_ok())
            .unwrap_or_default()
    }

    /// Check every nested invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BattleConfigError> {
        if self.countdown_secs == 0 {
            return Err(BattleConfigError::Zero {
                field: "countdown_secs",
            });
        }
        self.mini_game.validate()?;
        self.roi_stub.validate()
    }
}
