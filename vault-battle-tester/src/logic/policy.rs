use std::fmt;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use vault_battle_game::{MiniGameConfig, Playfield};

/// Input an autopilot sends to the mini-game on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerAction {
    Wait,
    Jump,
    Slide,
}

/// Policy interface for automated mini-game play.
pub trait AutopilotPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Decide the input for the next frame from the visible playfield.
    fn decide(&mut self, field: &Playfield, cfg: &MiniGameConfig) -> RunnerAction;
}

/// Built-in autopilot strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AutopilotStrategy {
    Idle,
    Reflex,
    Random,
}

impl AutopilotStrategy {
    pub const ALL: [Self; 3] = [Self::Idle, Self::Reflex, Self::Random];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Reflex => "reflex",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Idle => "Never presses a button; crashes into the first obstacle",
            Self::Reflex => "Jumps or slides when the nearest obstacle is about to hit",
            Self::Random => "Seeded button mashing",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn AutopilotPolicy + Send> {
        match self {
            Self::Idle => Box::new(IdlePolicy),
            Self::Reflex => Box::new(ReflexPolicy::default()),
            Self::Random => Box::new(RandomPolicy::new(seed)),
        }
    }
}

impl fmt::Display for AutopilotStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for AutopilotStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown policy '{s}'"))
    }
}

struct IdlePolicy;

/// Reacts to the closest obstacle that has not yet passed the hitbox.
struct ReflexPolicy {
    lookahead_frames: f32,
}

impl Default for ReflexPolicy {
    fn default() -> Self {
        Self {
            lookahead_frames: 4.0,
        }
    }
}

struct RandomPolicy {
    rng: ChaCha20Rng,
    press_chance: f64,
}

impl RandomPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            press_chance: 0.05,
        }
    }
}

impl AutopilotPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn decide(&mut self, _field: &Playfield, _cfg: &MiniGameConfig) -> RunnerAction {
        RunnerAction::Wait
    }
}

impl AutopilotPolicy for ReflexPolicy {
    fn name(&self) -> &'static str {
        "Reflex"
    }

    fn decide(&mut self, field: &Playfield, cfg: &MiniGameConfig) -> RunnerAction {
        if field.player.is_locked_out() {
            return RunnerAction::Wait;
        }
        let (left, right) = cfg.hitbox();
        let reach = field.speed * self.lookahead_frames;
        let threat = field
            .obstacles
            .iter()
            .filter(|obstacle| obstacle.trailing_edge() > left)
            .min_by(|a, b| a.x.total_cmp(&b.x))
            .filter(|obstacle| obstacle.x - right < reach);

        match threat {
            Some(obstacle) if obstacle.kind.cleared_by_jump() => RunnerAction::Jump,
            Some(_) => RunnerAction::Slide,
            None => RunnerAction::Wait,
        }
    }
}

impl AutopilotPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "Random"
    }

    fn decide(&mut self, _field: &Playfield, _cfg: &MiniGameConfig) -> RunnerAction {
        if !self.rng.gen_bool(self.press_chance) {
            return RunnerAction::Wait;
        }
        if self.rng.gen_bool(0.5) {
            RunnerAction::Jump
        } else {
            RunnerAction::Slide
        }
    }
}
