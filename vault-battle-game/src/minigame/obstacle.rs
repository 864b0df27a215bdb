use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CACTUS_WEIGHT, CACTUS_WIDTH, HOLE_WEIGHT, HOLE_WIDTH, LOW_OBSTACLE_WEIGHT, LOW_OBSTACLE_WIDTH,
    ROCK_WEIGHT, ROCK_WIDTH,
};

/// Obstacle varieties scrolling toward the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Hole,
    LowObstacle,
    Cactus,
    Rock,
}

impl ObstacleKind {
    pub const ALL: [Self; 4] = [Self::Hole, Self::Cactus, Self::LowObstacle, Self::Rock];

    #[must_use]
    pub const fn width(self) -> f32 {
        match self {
            Self::Hole => HOLE_WIDTH,
            Self::LowObstacle => LOW_OBSTACLE_WIDTH,
            Self::Cactus => CACTUS_WIDTH,
            Self::Rock => ROCK_WIDTH,
        }
    }

    /// Relative spawn weight out of 100.
    #[must_use]
    pub const fn spawn_weight(self) -> u32 {
        match self {
            Self::Hole => HOLE_WEIGHT,
            Self::LowObstacle => LOW_OBSTACLE_WEIGHT,
            Self::Cactus => CACTUS_WEIGHT,
            Self::Rock => ROCK_WEIGHT,
        }
    }

    /// Ground hazards are cleared by jumping; rocks hang overhead and need a slide.
    #[must_use]
    pub const fn cleared_by_jump(self) -> bool {
        !matches!(self, Self::Rock)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hole => "hole",
            Self::LowObstacle => "low_obstacle",
            Self::Cactus => "cactus",
            Self::Rock => "rock",
        }
    }

    /// Weighted draw across [`ObstacleKind::ALL`].
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let total: u32 = Self::ALL.iter().map(|kind| kind.spawn_weight()).sum();
        let mut roll = rng.gen_range(0..total);
        for kind in Self::ALL {
            let weight = kind.spawn_weight();
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        Self::Rock
    }
}

impl std::fmt::Display for ObstacleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A single obstacle on the playfield.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    /// Left edge in playfield pixels.
    pub x: f32,
    pub kind: ObstacleKind,
    pub width: f32,
    /// Set once the trailing edge has passed the runner.
    #[serde(default)]
    pub cleared: bool,
}

impl Obstacle {
    #[must_use]
    pub const fn new(id: u32, x: f32, kind: ObstacleKind) -> Self {
        Self {
            id,
            x,
            kind,
            width: kind.width(),
            cleared: false,
        }
    }

    #[must_use]
    pub fn trailing_edge(&self) -> f32 {
        self.x + self.width
    }

    /// Horizontal overlap with the half-open span `[left, right)`.
    #[must_use]
    pub fn overlaps(&self, left: f32, right: f32) -> bool {
        self.x < right && self.trailing_edge() > left
    }
}
