//! Centralized balance and tuning constants for the battle core.
//!
//! Configuration structs default to these values; JSON overrides are
//! validated against the same invariants.

// Logging keys -------------------------------------------------------------
pub(crate) const LOG_TARGET_MINIGAME: &str = "vault_battle::minigame";
pub(crate) const LOG_TARGET_SESSION: &str = "vault_battle::session";

// Mini-game timing ---------------------------------------------------------
pub const MINIGAME_DURATION_MS: u32 = 60_000;
pub const START_COUNTDOWN_STEPS: u8 = 3;
pub const START_COUNTDOWN_STEP_MS: u32 = 1_000;
pub const JUMP_LOCKOUT_MS: u32 = 600;
pub const SLIDE_LOCKOUT_MS: u32 = 600;
pub const COMPLETION_DISPLAY_DELAY_MS: u32 = 2_500;

// Mini-game speed ----------------------------------------------------------
pub const INITIAL_SPEED: f32 = 6.0;
pub const MAX_SPEED: f32 = 15.0;
/// Speed gained per elapsed second of survival.
pub const SPEED_ACCELERATION: f32 = 0.15;

// Spawning -----------------------------------------------------------------
pub const SPAWN_INTERVAL_MIN_MS: f32 = 900.0;
pub const SPAWN_INTERVAL_MAX_MS: f32 = 1_800.0;

// Playfield geometry -------------------------------------------------------
pub const PLAYFIELD_WIDTH: f32 = 800.0;
pub const PLAYER_X: f32 = 100.0;
pub const PLAYER_WIDTH: f32 = 50.0;
pub const PLAYER_HITBOX_PADDING: f32 = 10.0;
pub const OFFSCREEN_THRESHOLD: f32 = -50.0;
pub const INITIAL_OBSTACLE_X: f32 = 500.0;

// Obstacle table -----------------------------------------------------------
pub const HOLE_WIDTH: f32 = 70.0;
pub const CACTUS_WIDTH: f32 = 40.0;
pub const LOW_OBSTACLE_WIDTH: f32 = 50.0;
pub const ROCK_WIDTH: f32 = 60.0;
pub const HOLE_WEIGHT: u32 = 30;
pub const CACTUS_WEIGHT: u32 = 30;
pub const LOW_OBSTACLE_WEIGHT: u32 = 20;
pub const ROCK_WEIGHT: u32 = 20;

// Battle session -----------------------------------------------------------
pub const BATTLE_COUNTDOWN_SECS: u32 = 60;
pub const BATTLE_TICK_MS: u32 = 1_000;

// Rewards ------------------------------------------------------------------
pub const REWARD_FULL_WIN: u64 = 20;
pub const REWARD_INVESTMENT_ONLY: u64 = 10;
pub const REWARD_LOSS: u64 = 0;

// ROI stub -----------------------------------------------------------------
pub const ROI_STUB_WIN_PROBABILITY: f64 = 0.5;
pub const ROI_STUB_MIN_PCT: f64 = -25.0;
pub const ROI_STUB_MAX_PCT: f64 = 45.0;
pub const ROI_STUB_MIN_MARGIN_PCT: f64 = 0.5;
pub const ROI_STUB_MAX_MARGIN_PCT: f64 = 12.0;
