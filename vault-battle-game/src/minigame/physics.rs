//! Pure per-frame update over an explicit playfield snapshot.
//!
//! [`step`] reads one snapshot and returns the next; nothing observes a
//! half-updated obstacle list.
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::obstacle::{Obstacle, ObstacleKind};
use super::player::PlayerState;
use crate::config::MiniGameConfig;
use crate::numbers::ms_to_f32;

/// Everything the simulation mutates between frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playfield {
    pub obstacles: Vec<Obstacle>,
    pub player: PlayerState,
    pub speed: f32,
    pub spawn_timer_ms: f32,
    pub next_spawn_ms: f32,
    pub next_obstacle_id: u32,
}

impl Playfield {
    /// Pre-start state: one fixed obstacle already on screen.
    #[must_use]
    pub fn initial(cfg: &MiniGameConfig) -> Self {
        Self {
            obstacles: vec![Obstacle::new(0, cfg.initial_obstacle_x, ObstacleKind::Cactus)],
            player: PlayerState::default(),
            speed: cfg.initial_speed,
            spawn_timer_ms: 0.0,
            next_spawn_ms: cfg.spawn_interval_max_ms,
            next_obstacle_id: 1,
        }
    }
}

/// How a frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    /// Survival duration reached.
    Survived,
    /// The runner hit an obstacle.
    Crashed { obstacle_id: u32, kind: ObstacleKind },
}

/// Side effects observed while producing the next snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub spawned: Option<ObstacleKind>,
    pub cleared: u32,
}

/// Whether `obstacle` hits a runner in the given stance.
#[must_use]
pub const fn collides(kind: ObstacleKind, player: &PlayerState) -> bool {
    if kind.cleared_by_jump() {
        !player.is_jumping()
    } else {
        !player.is_sliding()
    }
}

/// Advance `field` by `delta_ms`, producing the next snapshot.
pub fn step<R: Rng + ?Sized>(
    field: &Playfield,
    cfg: &MiniGameConfig,
    delta_ms: u32,
    rng: &mut R,
) -> (Playfield, StepReport) {
    let mut player = field.player;
    player.elapsed_ms = player.elapsed_ms.saturating_add(delta_ms);

    if player.elapsed_ms >= cfg.duration_ms {
        let next = Playfield {
            player,
            ..field.clone()
        };
        return (
            next,
            StepReport {
                outcome: StepOutcome::Survived,
                spawned: None,
                cleared: 0,
            },
        );
    }

    let speed = cfg.speed_at(player.elapsed_ms).max(field.speed);

    let mut spawn_timer_ms = field.spawn_timer_ms + ms_to_f32(delta_ms);
    let mut next_spawn_ms = field.next_spawn_ms;
    let mut next_obstacle_id = field.next_obstacle_id;
    let mut obstacles = Vec::with_capacity(field.obstacles.len() + 1);
    obstacles.extend(field.obstacles.iter().cloned());

    let mut spawned = None;
    if spawn_timer_ms > next_spawn_ms {
        let kind = ObstacleKind::draw(rng);
        obstacles.push(Obstacle::new(next_obstacle_id, cfg.playfield_width, kind));
        next_obstacle_id = next_obstacle_id.wrapping_add(1);
        spawn_timer_ms = 0.0;
        let (min, max) = cfg.spawn_bounds(speed);
        next_spawn_ms = if max > min {
            rng.gen_range(min..max)
        } else {
            min
        };
        spawned = Some(kind);
    }

    let mut cleared = 0;
    for obstacle in &mut obstacles {
        obstacle.x -= speed;
        if !obstacle.cleared && obstacle.trailing_edge() < cfg.player_x {
            obstacle.cleared = true;
            cleared += 1;
        }
    }
    obstacles.retain(|obstacle| obstacle.trailing_edge() >= cfg.offscreen_threshold);
    player.score = player.score.saturating_add(cleared);

    let (left, right) = cfg.hitbox();
    let outcome = obstacles
        .iter()
        .find(|obstacle| obstacle.overlaps(left, right) && collides(obstacle.kind, &player))
        .map_or(StepOutcome::Continue, |obstacle| StepOutcome::Crashed {
            obstacle_id: obstacle.id,
            kind: obstacle.kind,
        });

    if outcome == StepOutcome::Continue {
        player.stance = player.stance.drained(delta_ms);
    }

    let next = Playfield {
        obstacles,
        player,
        speed,
        spawn_timer_ms,
        next_spawn_ms,
        next_obstacle_id,
    };
    (
        next,
        StepReport {
            outcome,
            spawned,
            cleared,
        },
    )
}
