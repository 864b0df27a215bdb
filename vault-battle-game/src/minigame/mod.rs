//! Obstacle-avoidance mini-game played during a battle countdown.
//!
//! The engine owns its playfield exclusively. Hosts drive it with
//! [`MiniGameEngine::advance`] at whatever frame cadence they have and may only
//! read state or call the documented actions.
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::config::MiniGameConfig;
use crate::constants::LOG_TARGET_MINIGAME;
use crate::rng::CountingRng;

pub mod obstacle;
pub mod physics;
pub mod player;

pub use obstacle::{Obstacle, ObstacleKind};
pub use physics::{Playfield, StepOutcome, StepReport, collides, step};
pub use player::{PlayerState, Stance};

/// Lifecycle of one mini-game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameStatus {
    Idle,
    Countdown { remaining_steps: u8 },
    Running,
    Won,
    Lost,
    /// Cancelled by the host; never emits a completion event.
    Stopped,
}

impl MiniGameStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Verdict carried by a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniGameResult {
    UserWin,
    AiWin,
    Draw,
}

impl MiniGameResult {
    #[must_use]
    pub const fn user_won(self) -> bool {
        matches!(self, Self::UserWin)
    }
}

impl std::fmt::Display for MiniGameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserWin => write!(f, "user_win"),
            Self::AiWin => write!(f, "ai_win"),
            Self::Draw => write!(f, "draw"),
        }
    }
}

/// Emitted once per playthrough after the display delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub result: MiniGameResult,
    pub user_cleared_count: u32,
    /// The opponent has no runner of its own, so this is always 0.
    pub ai_cleared_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<String>,
}

#[derive(Debug, Clone)]
struct PendingCompletion {
    remaining_ms: u32,
    event: CompletionEvent,
}

/// Real-time survival simulation with an injectable random source.
#[derive(Debug, Clone)]
pub struct MiniGameEngine<R = CountingRng<SmallRng>> {
    cfg: MiniGameConfig,
    rng: R,
    field: Playfield,
    status: MiniGameStatus,
    countdown_timer_ms: u32,
    /// Start-countdown overshoot folded into the first running frame.
    carry_ms: u32,
    pending: Option<PendingCompletion>,
    crash: Option<ObstacleKind>,
}

impl MiniGameEngine<CountingRng<SmallRng>> {
    /// Build an engine over a freshly seeded stream.
    #[must_use]
    pub fn from_seed(cfg: MiniGameConfig, seed: u64) -> Self {
        Self::new(cfg, CountingRng::new(seed))
    }
}

impl<R: Rng> MiniGameEngine<R> {
    #[must_use]
    pub fn new(cfg: MiniGameConfig, rng: R) -> Self {
        let field = Playfield::initial(&cfg);
        Self {
            cfg,
            rng,
            field,
            status: MiniGameStatus::Idle,
            countdown_timer_ms: 0,
            carry_ms: 0,
            pending: None,
            crash: None,
        }
    }

    /// Begin the start countdown. Only valid from idle.
    pub fn start(&mut self) -> bool {
        if self.status != MiniGameStatus::Idle {
            return false;
        }
        self.enter_countdown();
        true
    }

    /// Return to the pre-start state without starting.
    pub fn reset(&mut self) {
        self.field = Playfield::initial(&self.cfg);
        self.pending = None;
        self.crash = None;
        self.countdown_timer_ms = 0;
        self.carry_ms = 0;
        self.status = MiniGameStatus::Idle;
    }

    /// Reset everything and re-enter the start countdown.
    pub fn retry(&mut self) {
        log::debug!(target: LOG_TARGET_MINIGAME, "retry from {:?}", self.status);
        self.enter_countdown();
    }

    /// Cancel the playthrough. No later call mutates the playfield and no
    /// completion event is emitted.
    pub fn stop(&mut self) {
        self.status = MiniGameStatus::Stopped;
        self.pending = None;
    }

    /// End the playthrough now and hand out its completion event without
    /// waiting for the display delay. A runner still on its feet has survived;
    /// a run still in its start countdown is lost. Returns `None` if the event
    /// was already emitted or there is no playthrough.
    pub fn conclude(&mut self) -> Option<CompletionEvent> {
        match self.status {
            MiniGameStatus::Running => self.finish(MiniGameStatus::Won, MiniGameResult::UserWin),
            MiniGameStatus::Countdown { .. } => {
                self.finish(MiniGameStatus::Lost, MiniGameResult::AiWin);
            }
            _ => {}
        }
        self.pending.take().map(|pending| pending.event)
    }

    /// Start a jump. Ignored unless running with no active lockout.
    pub fn jump(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.field.player.stance = Stance::Jumping {
            remaining_ms: self.cfg.jump_lockout_ms,
        };
        true
    }

    /// Start a slide. Ignored unless running with no active lockout.
    pub fn slide(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.field.player.stance = Stance::Sliding {
            remaining_ms: self.cfg.slide_lockout_ms,
        };
        true
    }

    /// Host-facing driver: runs the start countdown, physics and the
    /// completion delay. Returns the completion event on the frame it fires.
    pub fn advance(&mut self, delta_ms: u32) -> Option<CompletionEvent> {
        match self.status {
            MiniGameStatus::Countdown { remaining_steps } => {
                self.advance_countdown(remaining_steps, delta_ms);
                None
            }
            MiniGameStatus::Running => {
                let delta_ms = delta_ms.saturating_add(std::mem::take(&mut self.carry_ms));
                self.tick(delta_ms);
                self.take_due_completion(0)
            }
            MiniGameStatus::Won | MiniGameStatus::Lost => self.take_due_completion(delta_ms),
            MiniGameStatus::Idle | MiniGameStatus::Stopped => None,
        }
    }

    /// One physics frame. A no-op unless running.
    pub fn tick(&mut self, delta_ms: u32) -> Option<StepReport> {
        if self.status != MiniGameStatus::Running {
            return None;
        }
        let (next, report) = step(&self.field, &self.cfg, delta_ms, &mut self.rng);
        self.field = next;

        if let Some(kind) = report.spawned {
            log::debug!(
                target: LOG_TARGET_MINIGAME,
                "spawned {kind} at {}ms (speed {:.2})",
                self.field.player.elapsed_ms,
                self.field.speed
            );
        }

        match report.outcome {
            StepOutcome::Continue => {}
            StepOutcome::Survived => self.finish(MiniGameStatus::Won, MiniGameResult::UserWin),
            StepOutcome::Crashed { obstacle_id, kind } => {
                log::debug!(
                    target: LOG_TARGET_MINIGAME,
                    "crashed into {kind} #{obstacle_id} after clearing {}",
                    self.field.player.score
                );
                self.crash = Some(kind);
                self.finish(MiniGameStatus::Lost, MiniGameResult::AiWin);
            }
        }
        Some(report)
    }

    fn accepts_input(&self) -> bool {
        self.status == MiniGameStatus::Running && !self.field.player.is_locked_out()
    }

    fn enter_countdown(&mut self) {
        self.reset();
        self.status = if self.cfg.countdown_steps == 0 {
            MiniGameStatus::Running
        } else {
            MiniGameStatus::Countdown {
                remaining_steps: self.cfg.countdown_steps,
            }
        };
    }

    fn advance_countdown(&mut self, mut remaining_steps: u8, delta_ms: u32) {
        self.countdown_timer_ms = self.countdown_timer_ms.saturating_add(delta_ms);
        while remaining_steps > 0 && self.countdown_timer_ms >= self.cfg.countdown_step_ms {
            self.countdown_timer_ms -= self.cfg.countdown_step_ms;
            remaining_steps -= 1;
        }
        if remaining_steps == 0 {
            self.carry_ms = std::mem::take(&mut self.countdown_timer_ms);
            self.status = MiniGameStatus::Running;
            log::debug!(target: LOG_TARGET_MINIGAME, "run started");
        } else {
            self.status = MiniGameStatus::Countdown { remaining_steps };
        }
    }

    fn finish(&mut self, status: MiniGameStatus, result: MiniGameResult) {
        self.status = status;
        let reward = if result.user_won() {
            self.cfg.win_reward_label.clone()
        } else {
            None
        };
        self.pending = Some(PendingCompletion {
            remaining_ms: self.cfg.completion_delay_ms,
            event: CompletionEvent {
                result,
                user_cleared_count: self.field.player.score,
                ai_cleared_count: 0,
                reward,
            },
        });
    }

    fn take_due_completion(&mut self, delta_ms: u32) -> Option<CompletionEvent> {
        let pending = self.pending.as_mut()?;
        pending.remaining_ms = pending.remaining_ms.saturating_sub(delta_ms);
        if pending.remaining_ms > 0 {
            return None;
        }
        self.pending.take().map(|pending| pending.event)
    }
}

impl<R> MiniGameEngine<R> {
    #[must_use]
    pub const fn status(&self) -> MiniGameStatus {
        self.status
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == MiniGameStatus::Running
    }

    /// Terminal verdict, available as soon as the run ends.
    #[must_use]
    pub const fn verdict(&self) -> Option<MiniGameResult> {
        match self.status {
            MiniGameStatus::Won => Some(MiniGameResult::UserWin),
            MiniGameStatus::Lost => Some(MiniGameResult::AiWin),
            _ => None,
        }
    }

    /// Obstacle kind that ended a lost run.
    #[must_use]
    pub const fn crash(&self) -> Option<ObstacleKind> {
        self.crash
    }

    #[must_use]
    pub const fn playfield(&self) -> &Playfield {
        &self.field
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerState {
        &self.field.player
    }

    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.field.obstacles
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.field.player.score
    }

    #[must_use]
    pub const fn elapsed_ms(&self) -> u32 {
        self.field.player.elapsed_ms
    }

    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.field.speed
    }

    #[must_use]
    pub const fn config(&self) -> &MiniGameConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }
}
