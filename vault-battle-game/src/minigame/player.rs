use serde::{Deserialize, Serialize};

/// Runner posture. Jumping and sliding lock out every other action until the
/// remaining lockout drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    #[default]
    Running,
    Jumping { remaining_ms: u32 },
    Sliding { remaining_ms: u32 },
}

impl Stance {
    /// Drain `delta_ms` of lockout, returning to [`Stance::Running`] once spent.
    #[must_use]
    pub const fn drained(self, delta_ms: u32) -> Self {
        match self {
            Self::Running => Self::Running,
            Self::Jumping { remaining_ms } => {
                if remaining_ms > delta_ms {
                    Self::Jumping {
                        remaining_ms: remaining_ms - delta_ms,
                    }
                } else {
                    Self::Running
                }
            }
            Self::Sliding { remaining_ms } => {
                if remaining_ms > delta_ms {
                    Self::Sliding {
                        remaining_ms: remaining_ms - delta_ms,
                    }
                } else {
                    Self::Running
                }
            }
        }
    }
}

/// Player-facing state of one playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerState {
    pub stance: Stance,
    /// Obstacles cleared so far.
    pub score: u32,
    pub elapsed_ms: u32,
}

impl PlayerState {
    #[must_use]
    pub const fn is_jumping(&self) -> bool {
        matches!(self.stance, Stance::Jumping { .. })
    }

    #[must_use]
    pub const fn is_sliding(&self) -> bool {
        matches!(self.stance, Stance::Sliding { .. })
    }

    #[must_use]
    pub const fn is_locked_out(&self) -> bool {
        !matches!(self.stance, Stance::Running)
    }
}
