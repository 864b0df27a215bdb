use std::hash::Hasher;

use anyhow::{Context, Result, bail, ensure};
use twox_hash::XxHash64;
use vault_battle_game::{
    BattleConfig, BattlePhase, BattleResult, BattleSession, CompletionEvent, ObstacleKind,
    OpponentCatalog, VaultRef, WalletGate, encode_friendly,
};

use crate::logic::policy::{AutopilotStrategy, RunnerAction};

/// Fixed frame step used when none is given, roughly 60 fps.
pub const DEFAULT_FRAME_MS: u32 = 16;

/// Configuration for one autopilot battle.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub seed: u64,
    pub strategy: AutopilotStrategy,
    pub frame_ms: u32,
    pub battle: BattleConfig,
}

impl SimulationConfig {
    #[must_use]
    pub fn new(strategy: AutopilotStrategy, seed: u64) -> Self {
        Self {
            seed,
            strategy,
            frame_ms: DEFAULT_FRAME_MS,
            battle: BattleConfig::load_from_static(),
        }
    }

    #[must_use]
    pub fn with_frame_ms(mut self, frame_ms: u32) -> Self {
        self.frame_ms = frame_ms.max(1);
        self
    }

    #[must_use]
    pub fn with_battle(mut self, battle: BattleConfig) -> Self {
        self.battle = battle;
        self
    }
}

/// Everything observed while driving one battle to its result.
#[derive(Debug, Clone)]
pub struct BattleSummary {
    pub code: String,
    pub opponent_id: String,
    pub frames: u32,
    pub inputs_accepted: u32,
    pub countdown_steps: Vec<u32>,
    pub completion: Option<CompletionEvent>,
    pub result: Option<BattleResult>,
    pub crash: Option<ObstacleKind>,
    pub top_speed: f32,
    pub violations: Vec<String>,
    /// XxHash64 over the per-frame playfield transcript.
    pub fingerprint: u64,
}

impl BattleSummary {
    #[must_use]
    pub fn mini_game_won(&self) -> bool {
        self.result.as_ref().is_some_and(BattleResult::mini_game_won)
    }

    #[must_use]
    pub fn reward(&self) -> u64 {
        self.result.as_ref().map_or(0, BattleResult::reward_amount)
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.result.as_ref().map_or(0, BattleResult::mini_game_score)
    }
}

/// The tester always plays with a connected wallet.
struct ConnectedWallet;

impl WalletGate for ConnectedWallet {
    fn is_connected(&self) -> bool {
        true
    }

    fn request_connect(&self) {}
}

/// Drive a whole battle at a fixed frame step, checking invariants as it runs.
///
/// # Errors
///
/// Returns an error if the battle cannot be set up or the transcript cannot
/// be serialized.
pub fn run_battle(config: &SimulationConfig) -> Result<BattleSummary> {
    ensure!(config.frame_ms > 0, "frame step must be positive");
    let catalog = OpponentCatalog::load_from_static();
    if catalog.is_empty() {
        bail!("opponent catalogue is empty");
    }
    let index = usize::try_from(config.seed % catalog.len() as u64).unwrap_or(0);
    let opponent = catalog
        .iter()
        .nth(index)
        .cloned()
        .context("picking an opponent")?;

    let mut session =
        BattleSession::new(&config.battle, config.seed).context("invalid battle config")?;
    ensure!(session.enter(&ConnectedWallet), "session refused entry");
    ensure!(
        session.select_vault(VaultRef::new("autopilot", "Autopilot Vault")),
        "vault selection refused"
    );
    let opponent_id = opponent.id.clone();
    ensure!(
        session.select_opponent(opponent),
        "opponent selection refused"
    );
    ensure!(session.start_battle(), "battle did not start");

    let code = encode_friendly(config.seed).unwrap_or_else(|| config.seed.to_string());
    let mut policy = config.strategy.create_policy(config.seed);
    log::debug!(
        "{} autopilot vs {opponent_id} on {} ({}ms frames)",
        policy.name(),
        code,
        config.frame_ms
    );
    let mut hasher = XxHash64::with_seed(config.seed);
    let max_speed = config.battle.mini_game.max_speed;
    let frame_budget = config.battle.countdown_secs.saturating_mul(1_000) / config.frame_ms + 2;

    let mut summary = BattleSummary {
        code,
        opponent_id,
        frames: 0,
        inputs_accepted: 0,
        countdown_steps: Vec::new(),
        completion: None,
        result: None,
        crash: None,
        top_speed: session.mini_game().speed(),
        violations: Vec::new(),
        fingerprint: 0,
    };

    while session.phase() == BattlePhase::Countdown && summary.frames < frame_budget {
        if session.mini_game().is_running() {
            let action =
                policy.decide(session.mini_game().playfield(), session.mini_game().config());
            let accepted = match action {
                RunnerAction::Wait => false,
                RunnerAction::Jump => session.jump(),
                RunnerAction::Slide => session.slide(),
            };
            if accepted {
                summary.inputs_accepted += 1;
            }
        }

        let prev_speed = session.mini_game().speed();
        let prev_score = session.mini_game().score();
        let tick = session.advance(config.frame_ms);
        summary.frames += 1;

        let speed = session.mini_game().speed();
        if speed < prev_speed {
            summary.violations.push(format!(
                "frame {}: speed dropped from {prev_speed:.3} to {speed:.3}",
                summary.frames
            ));
        }
        if speed > max_speed {
            summary.violations.push(format!(
                "frame {}: speed {speed:.3} above cap {max_speed:.3}",
                summary.frames
            ));
        }
        summary.top_speed = summary.top_speed.max(speed);
        if session.mini_game().score() < prev_score {
            summary
                .violations
                .push(format!("frame {}: score went backwards", summary.frames));
        }

        for remaining in &tick.countdown {
            let expected = summary
                .countdown_steps
                .last()
                .map_or(config.battle.countdown_secs, |last| *last)
                .saturating_sub(1);
            if *remaining != expected {
                summary.violations.push(format!(
                    "frame {}: countdown reported {remaining}, expected {expected}",
                    summary.frames
                ));
            }
            summary.countdown_steps.push(*remaining);
            hasher.write_u32(*remaining);
        }

        if let Some(event) = tick.completion {
            if summary.completion.is_some() {
                summary
                    .violations
                    .push(format!("frame {}: second completion event", summary.frames));
            }
            summary.completion = Some(event);
        }
        if let Some(result) = tick.result {
            summary.result = Some(result);
        }

        let snapshot = serde_json::to_vec(session.mini_game().playfield())
            .context("serializing playfield")?;
        hasher.write(&snapshot);
    }

    summary.crash = session.mini_game().crash();
    summary.fingerprint = hasher.finish();
    check_resolution(&session, config, &mut summary);
    Ok(summary)
}

fn check_resolution(
    session: &BattleSession,
    config: &SimulationConfig,
    summary: &mut BattleSummary,
) {
    if session.phase() != BattlePhase::Result {
        summary.violations.push(format!(
            "battle still in {:?} after {} frames",
            session.phase(),
            summary.frames
        ));
        return;
    }
    let Some(result) = summary.result.clone() else {
        summary
            .violations
            .push("result phase reached without a result".to_string());
        return;
    };

    let expected_steps: Vec<u32> = (0..config.battle.countdown_secs).rev().collect();
    if summary.countdown_steps != expected_steps {
        summary.violations.push(format!(
            "countdown emitted {} steps, expected {}",
            summary.countdown_steps.len(),
            expected_steps.len()
        ));
    }

    let reward = config
        .battle
        .reward
        .reward_for(result.player_won(), result.mini_game_won());
    if result.reward_amount() != reward {
        summary.violations.push(format!(
            "reward {} does not match table value {reward}",
            result.reward_amount()
        ));
    }

    let roi_lead = result.player_roi_pct() > result.opponent_roi_pct();
    if roi_lead != result.player_won() {
        summary.violations.push(format!(
            "player_won={} contradicts ROI {:.1}% vs {:.1}%",
            result.player_won(),
            result.player_roi_pct(),
            result.opponent_roi_pct()
        ));
    }

    let Some(event) = &summary.completion else {
        summary
            .violations
            .push("battle resolved without a completion event".to_string());
        return;
    };
    if event.result.user_won() != result.mini_game_won() {
        summary.violations.push(format!(
            "completion said {} but result recorded mini_game_won={}",
            event.result,
            result.mini_game_won()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_battle_resolves_with_a_crash() {
        let summary = run_battle(&SimulationConfig::new(AutopilotStrategy::Idle, 42)).unwrap();
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.crash, Some(ObstacleKind::Cactus));
        assert_eq!(summary.inputs_accepted, 0);
        assert!(!summary.mini_game_won());
        assert_eq!(summary.countdown_steps.len(), 60);
        assert_eq!(summary.countdown_steps.first(), Some(&59));
        assert_eq!(summary.countdown_steps.last(), Some(&0));
        let result = summary.result.as_ref().unwrap();
        assert_eq!(result.reward_amount(), if result.player_won() { 10 } else { 0 });
    }

    #[test]
    fn reflex_battle_is_deterministic() {
        let config = SimulationConfig::new(AutopilotStrategy::Reflex, 7);
        let first = run_battle(&config).unwrap();
        let second = run_battle(&config).unwrap();
        assert!(first.violations.is_empty(), "{:?}", first.violations);
        assert!(first.inputs_accepted > 0);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.result, second.result);
    }

    #[test]
    fn short_battles_respect_frame_budget() {
        let mut battle = BattleConfig::default();
        battle.countdown_secs = 5;
        let config = SimulationConfig::new(AutopilotStrategy::Random, 3)
            .with_battle(battle)
            .with_frame_ms(100);
        let summary = run_battle(&config).unwrap();
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.frames, 50);
        assert_eq!(summary.countdown_steps, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn invalid_battle_config_is_an_error() {
        let mut battle = BattleConfig::default();
        battle.roi_stub.min_roi_pct = battle.roi_stub.max_roi_pct;
        let config = SimulationConfig::new(AutopilotStrategy::Idle, 1).with_battle(battle);
        let err = run_battle(&config).unwrap_err();
        assert!(format!("{err:#}").starts_with("invalid battle config"));
    }

    #[test]
    fn reflex_survivor_gets_its_completion_at_the_bell() {
        let mut battle = BattleConfig::default();
        battle.countdown_secs = 4;
        battle.mini_game.initial_obstacle_x = 790.0;
        let config = SimulationConfig::new(AutopilotStrategy::Reflex, 5).with_battle(battle);
        let summary = run_battle(&config).unwrap();
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert!(summary.mini_game_won());
        assert_eq!(
            summary.completion.map(|event| event.result),
            Some(vault_battle_game::MiniGameResult::UserWin)
        );
    }

    #[test]
    fn opponent_follows_seed() {
        let a = run_battle(&SimulationConfig::new(AutopilotStrategy::Idle, 0)).unwrap();
        let b = run_battle(&SimulationConfig::new(AutopilotStrategy::Idle, 1)).unwrap();
        assert_ne!(a.opponent_id, b.opponent_id);
        assert_eq!(a.code, "VB-DOGE00");
    }
}
