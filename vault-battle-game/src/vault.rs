//! Vaults and AI opponents as seen by the battle core.
use serde::{Deserialize, Serialize};

const DEFAULT_OPPONENT_DATA: &str = include_str!("../data/opponents.json");

/// A user's strategy portfolio. Opaque beyond identity and display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRef {
    pub id: String,
    pub name: String,
    /// Last reported performance, if the backend supplied one.
    #[serde(default)]
    pub roi_pct: Option<f64>,
}

impl VaultRef {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            roi_pct: None,
        }
    }
}

/// One leg of an AI strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenWeight {
    pub symbol: String,
    pub weight_pct: u8,
}

/// Platform-defined opposing portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub tokens: Vec<TokenWeight>,
}

impl Opponent {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            desc: String::new(),
            tokens: Vec::new(),
        }
    }
}

/// Ordered set of AI opponents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpponentCatalog(pub Vec<Opponent>);

impl OpponentCatalog {
    #[must_use]
    pub const fn empty() -> Self {
        Self(vec![])
    }

    /// Load opponents from a JSON array.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into opponent data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self)
    }

    /// Bundled opponent roster, or an empty catalogue if it fails to parse.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_OPPONENT_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Opponent> {
        self.0.iter().find(|opponent| opponent.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Opponent> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
