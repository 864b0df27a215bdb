//! Vault Battle Engine
//!
//! Platform-agnostic core of the vault-versus-AI battle: the obstacle-avoidance
//! mini-game, the battle session state machine, and result aggregation.
//! This crate provides all battle mechanics without UI, wallet, or network
//! dependencies.

pub mod config;
pub mod constants;
pub mod minigame;
pub mod numbers;
pub mod result;
pub mod rng;
pub mod seed;
pub mod session;
pub mod vault;

// Re-export commonly used types
pub use config::{BattleConfig, BattleConfigError, MiniGameConfig};
pub use minigame::{
    CompletionEvent, MiniGameEngine, MiniGameResult, MiniGameStatus, Obstacle, ObstacleKind,
    Playfield, PlayerState, Stance,
};
pub use result::{
    BattleResult, InvestmentOutcome, MiniGameVerdict, ResultAggregator, RewardPolicy, RoiOracle,
    RoiStubConfig, StubRoiOracle,
};
pub use rng::{CountingRng, RngStreams};
pub use seed::{decode_to_seed, encode_friendly};
pub use session::{BattlePhase, BattleSession, SessionTick};
pub use vault::{Opponent, OpponentCatalog, TokenWeight, VaultRef};

use anyhow::Context;

/// Wallet-connection precondition for entering the battle flow.
/// Platform-specific implementations should provide this
pub trait WalletGate {
    fn is_connected(&self) -> bool;

    /// Ask the host to show its connect prompt.
    fn request_connect(&self);
}

/// Trait for abstracting vault and opponent lookup
/// Platform-specific implementations should provide this
pub trait StrategySource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Vaults the connected user may battle with
    ///
    /// # Errors
    ///
    /// Returns an error if the vaults cannot be loaded.
    fn vaults(&self) -> Result<Vec<VaultRef>, Self::Error>;

    /// AI opponents currently on offer
    ///
    /// # Errors
    ///
    /// Returns an error if the opponents cannot be loaded.
    fn opponents(&self) -> Result<OpponentCatalog, Self::Error>;
}

/// Main battle engine binding a strategy source and wallet gate to sessions
pub struct BattleEngine<S, W>
where
    S: StrategySource,
    W: WalletGate,
{
    source: S,
    gate: W,
    cfg: BattleConfig,
}

impl<S, W> BattleEngine<S, W>
where
    S: StrategySource,
    W: WalletGate,
{
    /// Create a new engine with the provided collaborators and configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration violates an invariant.
    pub fn new(source: S, gate: W, cfg: BattleConfig) -> Result<Self, BattleConfigError> {
        cfg.validate()?;
        Ok(Self { source, gate, cfg })
    }

    /// Create a fresh idle session for `seed`
    #[must_use]
    pub fn create_session(&self, seed: u64) -> BattleSession {
        // Validated in `new`.
        BattleSession::seeded(&self.cfg, seed)
    }

    /// Create a session from a `VB-` replay code
    #[must_use]
    pub fn create_session_from_code(&self, code: &str) -> Option<BattleSession> {
        decode_to_seed(code).map(|seed| self.create_session(seed))
    }

    /// Enter vault selection, prompting for a wallet connection if needed
    pub fn enter(&self, session: &mut BattleSession) -> bool {
        session.enter(&self.gate)
    }

    /// Select a vault by id
    ///
    /// Unknown ids are refused like any other invalid transition.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy source fails.
    pub fn select_vault(&self, session: &mut BattleSession, vault_id: &str) -> anyhow::Result<bool> {
        let vaults = self.source.vaults().context("loading vaults")?;
        Ok(vaults
            .into_iter()
            .find(|vault| vault.id == vault_id)
            .is_some_and(|vault| session.select_vault(vault)))
    }

    /// Select an AI opponent by id
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy source fails.
    pub fn select_opponent(
        &self,
        session: &mut BattleSession,
        opponent_id: &str,
    ) -> anyhow::Result<bool> {
        let catalog = self.source.opponents().context("loading opponents")?;
        Ok(catalog
            .get_by_id(opponent_id)
            .cloned()
            .is_some_and(|opponent| session.select_opponent(opponent)))
    }

    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    #[derive(Clone, Default)]
    struct FixtureSource;

    impl StrategySource for FixtureSource {
        type Error = Infallible;

        fn vaults(&self) -> Result<Vec<VaultRef>, Self::Error> {
            Ok(vec![
                VaultRef::new("frog-fund", "Frog Fund"),
                VaultRef::new("whale-pod", "Whale Pod"),
            ])
        }

        fn opponents(&self) -> Result<OpponentCatalog, Self::Error> {
            Ok(OpponentCatalog::load_from_static())
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("backend offline")]
    struct Offline;

    struct OfflineSource;

    impl StrategySource for OfflineSource {
        type Error = Offline;

        fn vaults(&self) -> Result<Vec<VaultRef>, Self::Error> {
            Err(Offline)
        }

        fn opponents(&self) -> Result<OpponentCatalog, Self::Error> {
            Err(Offline)
        }
    }

    #[derive(Default)]
    struct ToggleGate {
        connected: Cell<bool>,
        prompts: Cell<u32>,
    }

    impl WalletGate for ToggleGate {
        fn is_connected(&self) -> bool {
            self.connected.get()
        }

        fn request_connect(&self) {
            self.prompts.set(self.prompts.get() + 1);
            self.connected.set(true);
        }
    }

    #[test]
    fn engine_walks_selection_by_id() {
        let engine =
            BattleEngine::new(FixtureSource, ToggleGate::default(), BattleConfig::default())
                .unwrap();
        let mut session = engine.create_session(0xBEEF);
        assert!(!engine.enter(&mut session));
        assert!(engine.enter(&mut session));
        assert!(!engine.select_vault(&mut session, "missing").unwrap());
        assert!(engine.select_vault(&mut session, "whale-pod").unwrap());
        assert!(engine.select_opponent(&mut session, "frog-basket").unwrap());
        assert_eq!(session.phase(), BattlePhase::ReadyToStart);
        assert!(session.start_battle());
    }

    #[test]
    fn source_errors_carry_context() {
        let engine =
            BattleEngine::new(OfflineSource, ToggleGate::default(), BattleConfig::default())
                .unwrap();
        let mut session = engine.create_session(1);
        let err = engine.select_vault(&mut session, "any").unwrap_err();
        assert_eq!(format!("{err:#}"), "loading vaults: backend offline");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = BattleConfig::default();
        cfg.mini_game.duration_ms = 0;
        assert!(BattleEngine::new(FixtureSource, ToggleGate::default(), cfg).is_err());
    }

    #[test]
    fn replay_codes_reproduce_sessions() {
        let engine =
            BattleEngine::new(FixtureSource, ToggleGate::default(), BattleConfig::default())
                .unwrap();
        assert!(engine.create_session_from_code("XX-NOPE00").is_none());
        assert!(engine.create_session_from_code("VB-Dé1").is_none());
        let a = engine.create_session_from_code("VB-PEPE07").unwrap();
        let b = engine.create_session_from_code("vb-pepe07").unwrap();
        assert_eq!(a.mini_game().playfield(), b.mini_game().playfield());
    }
}
