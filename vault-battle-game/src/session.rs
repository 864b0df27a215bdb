//! Battle lifecycle: vault and opponent selection, the timed battle, and
//! resolution into a [`BattleResult`].
use rand::Rng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::WalletGate;
use crate::config::{BattleConfig, BattleConfigError};
use crate::constants::{BATTLE_TICK_MS, LOG_TARGET_SESSION};
use crate::minigame::{CompletionEvent, MiniGameEngine, MiniGameResult};
use crate::result::{BattleResult, MiniGameVerdict, ResultAggregator, RoiOracle, StubRoiOracle};
use crate::rng::{CountingRng, RngStreams};
use crate::vault::{Opponent, VaultRef};

/// Countdown values reported by one `advance` call, inline for typical frames.
pub type CountdownSteps = SmallVec<[u32; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattlePhase {
    Idle,
    SelectingVault,
    SelectingOpponent,
    ReadyToStart,
    Countdown,
    Result,
}

/// Everything observed during one [`BattleSession::advance`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTick {
    /// Remaining seconds after each countdown decrement, in order.
    pub countdown: CountdownSteps,
    pub completion: Option<CompletionEvent>,
    /// Set on the call that moved the session into [`BattlePhase::Result`].
    pub result: Option<BattleResult>,
}

/// Default RNG stream type used by seeded sessions.
pub type SessionRng = CountingRng<SmallRng>;

/// One client's battle flow. Refused transitions return `false` and leave the
/// phase untouched.
#[derive(Debug, Clone)]
pub struct BattleSession<O = StubRoiOracle<SessionRng>, R = SessionRng> {
    phase: BattlePhase,
    selected_vault: Option<VaultRef>,
    selected_opponent: Option<Opponent>,
    countdown_secs: u32,
    countdown_remaining: u32,
    countdown_timer_ms: u32,
    result: Option<BattleResult>,
    mini_game_won: bool,
    last_completion: Option<CompletionEvent>,
    mini_game: MiniGameEngine<R>,
    aggregator: ResultAggregator<O>,
}

impl BattleSession {
    /// Seeded session using the stub ROI oracle.
    ///
    /// # Errors
    ///
    /// Returns the first invariant `cfg` violates.
    pub fn new(cfg: &BattleConfig, seed: u64) -> Result<Self, BattleConfigError> {
        cfg.validate()?;
        Ok(Self::seeded(cfg, seed))
    }

    /// Seeded session over a configuration that has already been validated.
    pub(crate) fn seeded(cfg: &BattleConfig, seed: u64) -> Self {
        let RngStreams { spawn, roi } = RngStreams::from_user_seed(seed);
        Self::assemble(
            cfg,
            MiniGameEngine::new(cfg.mini_game.clone(), spawn),
            ResultAggregator::new(
                StubRoiOracle::new(cfg.roi_stub.clone(), roi),
                cfg.reward.clone(),
            ),
        )
    }
}

impl<O: RoiOracle, R: Rng> BattleSession<O, R> {
    /// Assemble a session from an explicit engine and aggregator.
    ///
    /// # Errors
    ///
    /// Returns the first invariant `cfg` violates.
    pub fn with_parts(
        cfg: &BattleConfig,
        mini_game: MiniGameEngine<R>,
        aggregator: ResultAggregator<O>,
    ) -> Result<Self, BattleConfigError> {
        cfg.validate()?;
        Ok(Self::assemble(cfg, mini_game, aggregator))
    }

    fn assemble(
        cfg: &BattleConfig,
        mini_game: MiniGameEngine<R>,
        aggregator: ResultAggregator<O>,
    ) -> Self {
        Self {
            phase: BattlePhase::Idle,
            selected_vault: None,
            selected_opponent: None,
            countdown_secs: cfg.countdown_secs,
            countdown_remaining: cfg.countdown_secs,
            countdown_timer_ms: 0,
            result: None,
            mini_game_won: false,
            last_completion: None,
            mini_game,
            aggregator,
        }
    }

    /// Leave idle for vault selection once the wallet is connected. A
    /// disconnected wallet gets a connect prompt instead.
    pub fn enter<G: WalletGate + ?Sized>(&mut self, gate: &G) -> bool {
        if self.phase != BattlePhase::Idle {
            return false;
        }
        if !gate.is_connected() {
            log::debug!(target: LOG_TARGET_SESSION, "wallet not connected, prompting");
            gate.request_connect();
            return false;
        }
        self.transition(BattlePhase::SelectingVault);
        true
    }

    pub fn select_vault(&mut self, vault: VaultRef) -> bool {
        if self.phase != BattlePhase::SelectingVault {
            return false;
        }
        self.selected_vault = Some(vault);
        self.transition(BattlePhase::SelectingOpponent);
        true
    }

    /// Go back from opponent selection to pick a different vault.
    pub fn back_to_vaults(&mut self) -> bool {
        if self.phase != BattlePhase::SelectingOpponent {
            return false;
        }
        self.selected_vault = None;
        self.transition(BattlePhase::SelectingVault);
        true
    }

    pub fn select_opponent(&mut self, opponent: Opponent) -> bool {
        if self.phase != BattlePhase::SelectingOpponent {
            return false;
        }
        self.selected_opponent = Some(opponent);
        self.transition(BattlePhase::ReadyToStart);
        true
    }

    /// Start the battle countdown and the mini-game alongside it.
    pub fn start_battle(&mut self) -> bool {
        if self.phase != BattlePhase::ReadyToStart
            || self.selected_vault.is_none()
            || self.selected_opponent.is_none()
        {
            return false;
        }
        self.countdown_remaining = self.countdown_secs;
        self.countdown_timer_ms = 0;
        self.mini_game_won = false;
        self.last_completion = None;
        self.mini_game.reset();
        self.mini_game.start();
        self.transition(BattlePhase::Countdown);
        true
    }

    /// Advance the battle clock and the mini-game by `delta_ms`.
    pub fn advance(&mut self, delta_ms: u32) -> SessionTick {
        let mut tick = SessionTick::default();
        if self.phase != BattlePhase::Countdown {
            return tick;
        }

        if let Some(event) = self.mini_game.advance(delta_ms) {
            self.mini_game_won = event.result.user_won();
            self.last_completion = Some(event.clone());
            tick.completion = Some(event);
        }

        self.countdown_timer_ms = self.countdown_timer_ms.saturating_add(delta_ms);
        while self.countdown_remaining > 0 && self.countdown_timer_ms >= BATTLE_TICK_MS {
            self.countdown_timer_ms -= BATTLE_TICK_MS;
            self.countdown_remaining -= 1;
            tick.countdown.push(self.countdown_remaining);
        }

        if self.countdown_remaining == 0 {
            self.resolve(&mut tick);
        }
        tick
    }

    pub fn jump(&mut self) -> bool {
        self.phase == BattlePhase::Countdown && self.mini_game.jump()
    }

    pub fn slide(&mut self) -> bool {
        self.phase == BattlePhase::Countdown && self.mini_game.slide()
    }

    /// Restart the mini-game; the battle clock keeps running.
    pub fn retry_mini_game(&mut self) -> bool {
        if self.phase != BattlePhase::Countdown {
            return false;
        }
        self.mini_game.retry();
        true
    }

    /// Try again / return home: back to idle from any phase.
    pub fn reset(&mut self) {
        self.mini_game.reset();
        self.selected_vault = None;
        self.selected_opponent = None;
        self.countdown_remaining = self.countdown_secs;
        self.countdown_timer_ms = 0;
        self.result = None;
        self.mini_game_won = false;
        self.last_completion = None;
        self.transition(BattlePhase::Idle);
    }

    /// The bell: conclude the playthrough, flushing its completion event if
    /// it has not fired yet, then aggregate the result.
    fn resolve(&mut self, tick: &mut SessionTick) {
        let (Some(vault), Some(opponent)) = (&self.selected_vault, &self.selected_opponent) else {
            return;
        };
        if let Some(event) = self.mini_game.conclude() {
            self.last_completion = Some(event.clone());
            tick.completion = Some(event);
        }
        let won = self
            .mini_game
            .verdict()
            .is_some_and(MiniGameResult::user_won);
        let verdict = MiniGameVerdict {
            won,
            score: self.mini_game.score(),
        };
        self.mini_game.stop();
        self.mini_game_won = won;

        let result = self.aggregator.resolve(vault, opponent, verdict);
        self.result = Some(result.clone());
        tick.result = Some(result);
        self.transition(BattlePhase::Result);
    }

    fn transition(&mut self, next: BattlePhase) {
        log::debug!(target: LOG_TARGET_SESSION, "{:?} -> {next:?}", self.phase);
        self.phase = next;
    }
}

impl<O, R> BattleSession<O, R> {
    #[must_use]
    pub const fn phase(&self) -> BattlePhase {
        self.phase
    }

    #[must_use]
    pub const fn selected_vault(&self) -> Option<&VaultRef> {
        self.selected_vault.as_ref()
    }

    #[must_use]
    pub const fn selected_opponent(&self) -> Option<&Opponent> {
        self.selected_opponent.as_ref()
    }

    #[must_use]
    pub const fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    #[must_use]
    pub const fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub const fn mini_game_won(&self) -> bool {
        self.mini_game_won
    }

    #[must_use]
    pub const fn last_completion(&self) -> Option<&CompletionEvent> {
        self.last_completion.as_ref()
    }

    #[must_use]
    pub const fn mini_game(&self) -> &MiniGameEngine<R> {
        &self.mini_game
    }

    #[must_use]
    pub const fn aggregator(&self) -> &ResultAggregator<O> {
        &self.aggregator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minigame::{MiniGameResult, MiniGameStatus};
    use crate::result::{InvestmentOutcome, RewardPolicy};
    use std::cell::Cell;

    struct Gate {
        connected: bool,
        prompts: Cell<u32>,
    }

    impl Gate {
        fn new(connected: bool) -> Self {
            Self {
                connected,
                prompts: Cell::new(0),
            }
        }
    }

    impl WalletGate for Gate {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn request_connect(&self) {
            self.prompts.set(self.prompts.get() + 1);
        }
    }

    struct AlwaysWin;

    impl RoiOracle for AlwaysWin {
        fn investment_outcome(&mut self, _: &VaultRef, _: &Opponent) -> InvestmentOutcome {
            InvestmentOutcome {
                player_won: true,
                player_roi_pct: 18.0,
                opponent_roi_pct: 3.0,
            }
        }
    }

    fn ready_session(seed: u64) -> BattleSession {
        let mut session = BattleSession::new(&BattleConfig::default(), seed).unwrap();
        assert!(session.enter(&Gate::new(true)));
        assert!(session.select_vault(VaultRef::new("v1", "Frog Fund")));
        assert!(session.select_opponent(Opponent::new("doge-maxi", "Doge Maximalist")));
        session
    }

    fn winning_session(cfg: &BattleConfig, seed: u64) -> BattleSession<AlwaysWin> {
        BattleSession::with_parts(
            cfg,
            MiniGameEngine::new(cfg.mini_game.clone(), CountingRng::new(seed)),
            ResultAggregator::new(AlwaysWin, RewardPolicy::default()),
        )
        .unwrap()
    }

    fn started_winning_session(cfg: &BattleConfig, seed: u64) -> BattleSession<AlwaysWin> {
        let mut session = winning_session(cfg, seed);
        assert!(session.enter(&Gate::new(true)));
        assert!(session.select_vault(VaultRef::new("v1", "Frog Fund")));
        assert!(session.select_opponent(Opponent::new("o", "O")));
        assert!(session.start_battle());
        session
    }

    /// Drive to the bell, returning every completion seen and the result.
    fn play_to_bell(
        session: &mut BattleSession<AlwaysWin>,
    ) -> (Vec<CompletionEvent>, Option<BattleResult>) {
        let mut completions = Vec::new();
        while session.phase() == BattlePhase::Countdown {
            let tick = session.advance(16);
            completions.extend(tick.completion);
            if tick.result.is_some() {
                return (completions, tick.result);
            }
        }
        (completions, None)
    }

    #[test]
    fn disconnected_wallet_stays_idle_and_prompts() {
        let mut session = BattleSession::new(&BattleConfig::default(), 1).unwrap();
        let gate = Gate::new(false);
        assert!(!session.enter(&gate));
        assert_eq!(session.phase(), BattlePhase::Idle);
        assert_eq!(gate.prompts.get(), 1);
    }

    #[test]
    fn selection_flow_and_back_transition() {
        let mut session = BattleSession::new(&BattleConfig::default(), 1).unwrap();
        assert!(!session.select_vault(VaultRef::new("v1", "Frog Fund")));
        assert!(session.enter(&Gate::new(true)));
        assert!(!session.enter(&Gate::new(true)));
        assert!(!session.select_opponent(Opponent::new("o", "O")));
        assert!(session.select_vault(VaultRef::new("v1", "Frog Fund")));
        assert_eq!(session.phase(), BattlePhase::SelectingOpponent);
        assert!(session.back_to_vaults());
        assert_eq!(session.phase(), BattlePhase::SelectingVault);
        assert!(session.selected_vault().is_none());
        assert!(session.select_vault(VaultRef::new("v2", "Whale Pod")));
        assert!(!session.start_battle());
        assert!(session.select_opponent(Opponent::new("o", "O")));
        assert_eq!(session.phase(), BattlePhase::ReadyToStart);
        assert_eq!(session.selected_vault().map(|v| v.id.as_str()), Some("v2"));
    }

    #[test]
    fn countdown_steps_once_per_second_then_resolves() {
        let mut session = ready_session(3);
        assert!(!session.jump());
        assert!(session.start_battle());
        assert_eq!(session.phase(), BattlePhase::Countdown);
        assert_eq!(session.countdown_remaining(), 60);

        let mut seen = Vec::new();
        let mut result = None;
        for _ in 0..(60 * 4) {
            let tick = session.advance(250);
            seen.extend(tick.countdown.iter().copied());
            if tick.result.is_some() {
                result = tick.result;
                break;
            }
        }
        let expected: Vec<u32> = (0..60).rev().collect();
        assert_eq!(seen, expected);
        assert_eq!(session.phase(), BattlePhase::Result);
        let result = result.expect("resolved at zero");
        assert_eq!(session.result(), Some(&result));
        assert!(session.advance(1_000).countdown.is_empty());
    }

    #[test]
    fn large_frame_reports_each_step() {
        let mut session = ready_session(4);
        session.start_battle();
        let tick = session.advance(2_500);
        assert_eq!(tick.countdown.as_slice(), &[59, 58]);
        let tick = session.advance(500);
        assert_eq!(tick.countdown.as_slice(), &[57]);
    }

    #[test]
    fn crash_yields_investment_only_reward() {
        let cfg = BattleConfig::default();
        let mut session = winning_session(&cfg, 5);
        session.enter(&Gate::new(true));
        session.select_vault(VaultRef::new("v1", "Frog Fund"));
        session.select_opponent(Opponent::new("o", "O"));
        session.start_battle();

        let mut completion = None;
        let mut result = None;
        while result.is_none() {
            let tick = session.advance(16);
            if tick.completion.is_some() {
                completion = tick.completion;
            }
            result = tick.result;
        }
        assert_eq!(completion.map(|c| c.result), Some(MiniGameResult::AiWin));
        let result = result.unwrap();
        assert!(!session.mini_game_won());
        assert!(result.player_won());
        assert_eq!(result.reward_amount(), 10);
    }

    #[test]
    fn surviving_until_the_bell_counts_as_a_win() {
        let mut cfg = BattleConfig::default();
        cfg.countdown_secs = 4;
        cfg.mini_game.initial_obstacle_x = 790.0;
        // Three seconds of start countdown, then one second of running before the cactus arrives.
        let mut session = started_winning_session(&cfg, 6);
        let (completions, result) = play_to_bell(&mut session);
        let result = result.expect("bell rang");
        assert!(result.mini_game_won());
        assert_eq!(result.reward_amount(), 20);
        assert_eq!(session.mini_game().status(), MiniGameStatus::Stopped);

        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].result, MiniGameResult::UserWin);
        assert_eq!(session.last_completion(), completions.first());
        assert!(session.mini_game_won());
    }

    #[test]
    fn crash_inside_the_display_delay_is_flushed_at_the_bell() {
        let mut cfg = BattleConfig::default();
        // The opening cactus lands about four seconds in; its event would fire after the bell.
        cfg.countdown_secs = 5;
        let mut session = started_winning_session(&cfg, 7);
        let (completions, result) = play_to_bell(&mut session);
        let result = result.expect("bell rang");
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].result, MiniGameResult::AiWin);
        assert!(!result.mini_game_won());
        assert_eq!(result.reward_amount(), 10);
        assert_eq!(session.last_completion(), completions.first());
    }

    #[test]
    fn bell_during_start_countdown_reports_a_loss() {
        let mut cfg = BattleConfig::default();
        cfg.countdown_secs = 2;
        let mut session = started_winning_session(&cfg, 8);
        let (completions, result) = play_to_bell(&mut session);
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].result, MiniGameResult::AiWin);
        assert!(!result.expect("bell rang").mini_game_won());
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut cfg = BattleConfig::default();
        cfg.roi_stub.max_roi_pct = cfg.roi_stub.min_roi_pct;
        assert!(matches!(
            BattleSession::new(&cfg, 1),
            Err(BattleConfigError::Inverted { field: "roi_pct", .. })
        ));
        let parts = BattleSession::with_parts(
            &cfg,
            MiniGameEngine::new(cfg.mini_game.clone(), CountingRng::new(1)),
            ResultAggregator::new(AlwaysWin, RewardPolicy::default()),
        );
        assert!(parts.is_err());
    }

    #[test]
    fn reset_returns_to_idle_from_any_phase() {
        let mut session = ready_session(7);
        session.start_battle();
        for _ in 0..300 {
            session.advance(16);
        }
        session.reset();
        assert_eq!(session.phase(), BattlePhase::Idle);
        assert!(session.selected_vault().is_none());
        assert!(session.selected_opponent().is_none());
        assert!(session.result().is_none());
        assert_eq!(session.countdown_remaining(), 60);
        let fresh = BattleSession::new(&BattleConfig::default(), 7).unwrap();
        assert_eq!(session.mini_game().playfield(), fresh.mini_game().playfield());
        assert_eq!(session.mini_game().status(), MiniGameStatus::Idle);
        assert!(session.advance(5_000).countdown.is_empty());
    }

    #[test]
    fn mini_game_inputs_forward_only_during_countdown() {
        let mut session = ready_session(8);
        assert!(!session.retry_mini_game());
        session.start_battle();
        assert!(!session.jump());
        session.advance(3_000);
        assert!(session.mini_game().is_running());
        assert!(session.jump());
        assert!(!session.slide());
        assert!(session.retry_mini_game());
        assert_eq!(session.mini_game().score(), 0);
        assert_eq!(session.countdown_remaining(), 57);
    }
}
