//! Battle resolution: investment outcome plus mini-game verdict.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BattleConfigError;
use crate::constants::{
    LOG_TARGET_SESSION, REWARD_FULL_WIN, REWARD_INVESTMENT_ONLY, REWARD_LOSS,
    ROI_STUB_MAX_MARGIN_PCT, ROI_STUB_MAX_PCT, ROI_STUB_MIN_MARGIN_PCT, ROI_STUB_MIN_PCT,
    ROI_STUB_WIN_PROBABILITY,
};
use crate::numbers::round_to_tenth;
use crate::vault::{Opponent, VaultRef};

/// Reward table keyed on investment and mini-game outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Investment won and mini-game won.
    pub full_win: u64,
    /// Investment won, mini-game lost or drawn.
    pub investment_only: u64,
    /// Investment lost.
    pub loss: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            full_win: REWARD_FULL_WIN,
            investment_only: REWARD_INVESTMENT_ONLY,
            loss: REWARD_LOSS,
        }
    }
}

impl RewardPolicy {
    #[must_use]
    pub const fn reward_for(&self, investment_won: bool, mini_game_won: bool) -> u64 {
        match (investment_won, mini_game_won) {
            (true, true) => self.full_win,
            (true, false) => self.investment_only,
            (false, _) => self.loss,
        }
    }
}

/// Investment performance of the two sides, before rewards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvestmentOutcome {
    pub player_won: bool,
    pub player_roi_pct: f64,
    pub opponent_roi_pct: f64,
}

impl InvestmentOutcome {
    /// Whether `player_won` agrees with the ROI ordering.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.player_won == (self.player_roi_pct > self.opponent_roi_pct)
    }

    /// Round both ROIs to one decimal, widening a collapsed gap so the
    /// winner's rounded ROI stays strictly ahead.
    #[must_use]
    pub fn rounded(self) -> Self {
        let player = round_to_tenth(self.player_roi_pct);
        let mut opponent = round_to_tenth(self.opponent_roi_pct);
        if self.player_won && opponent >= player {
            opponent = round_to_tenth(player - 0.1);
        } else if !self.player_won && opponent <= player {
            opponent = round_to_tenth(player + 0.1);
        }
        Self {
            player_won: self.player_won,
            player_roi_pct: player,
            opponent_roi_pct: opponent,
        }
    }
}

/// Source of investment outcomes for a vault/opponent pairing.
pub trait RoiOracle {
    fn investment_outcome(&mut self, vault: &VaultRef, opponent: &Opponent) -> InvestmentOutcome;
}

/// Tunables for [`StubRoiOracle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiStubConfig {
    pub win_probability: f64,
    pub min_roi_pct: f64,
    pub max_roi_pct: f64,
    pub min_margin_pct: f64,
    pub max_margin_pct: f64,
}

impl Default for RoiStubConfig {
    fn default() -> Self {
        Self {
            win_probability: ROI_STUB_WIN_PROBABILITY,
            min_roi_pct: ROI_STUB_MIN_PCT,
            max_roi_pct: ROI_STUB_MAX_PCT,
            min_margin_pct: ROI_STUB_MIN_MARGIN_PCT,
            max_margin_pct: ROI_STUB_MAX_MARGIN_PCT,
        }
    }
}

impl RoiStubConfig {
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), BattleConfigError> {
        if !(0.0..=1.0).contains(&self.win_probability) {
            return Err(BattleConfigError::RangeViolation {
                field: "win_probability",
                min: 0.0,
                max: 1.0,
                value: self.win_probability,
            });
        }
        if self.min_roi_pct >= self.max_roi_pct {
            return Err(BattleConfigError::Inverted {
                field: "roi_pct",
                min: self.min_roi_pct,
                max: self.max_roi_pct,
            });
        }
        if self.min_margin_pct < 0.1 {
            return Err(BattleConfigError::MinViolation {
                field: "min_margin_pct",
                min: 0.1,
                value: self.min_margin_pct,
            });
        }
        if self.min_margin_pct >= self.max_margin_pct {
            return Err(BattleConfigError::Inverted {
                field: "margin_pct",
                min: self.min_margin_pct,
                max: self.max_margin_pct,
            });
        }
        Ok(())
    }
}

/// Placeholder investment outcome until strategy performance comes from the
/// vault backend. Nothing downstream should rely on its distribution.
#[derive(Debug, Clone)]
pub struct StubRoiOracle<R> {
    cfg: RoiStubConfig,
    rng: R,
}

impl<R: Rng> StubRoiOracle<R> {
    #[must_use]
    pub const fn new(cfg: RoiStubConfig, rng: R) -> Self {
        Self { cfg, rng }
    }

    #[must_use]
    pub const fn rng(&self) -> &R {
        &self.rng
    }
}

/// Uniform draw from `[min, max)`, or `min` when the range is empty.
fn draw_between<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max > min {
        rng.gen_range(min..max)
    } else {
        min
    }
}

impl<R: Rng> RoiOracle for StubRoiOracle<R> {
    fn investment_outcome(&mut self, _vault: &VaultRef, _opponent: &Opponent) -> InvestmentOutcome {
        let player_won = self.rng.gen_bool(self.cfg.win_probability.clamp(0.0, 1.0));
        let player_roi_pct = draw_between(&mut self.rng, self.cfg.min_roi_pct, self.cfg.max_roi_pct);
        let margin = draw_between(
            &mut self.rng,
            self.cfg.min_margin_pct,
            self.cfg.max_margin_pct,
        );
        let opponent_roi_pct = if player_won {
            player_roi_pct - margin
        } else {
            player_roi_pct + margin
        };
        InvestmentOutcome {
            player_won,
            player_roi_pct,
            opponent_roi_pct,
        }
        .rounded()
    }
}

/// Final, immutable outcome of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    player_won: bool,
    player_roi_pct: f64,
    opponent_roi_pct: f64,
    reward_amount: u64,
    mini_game_won: bool,
    mini_game_score: u32,
}

impl BattleResult {
    #[must_use]
    pub const fn player_won(&self) -> bool {
        self.player_won
    }

    #[must_use]
    pub const fn player_roi_pct(&self) -> f64 {
        self.player_roi_pct
    }

    #[must_use]
    pub const fn opponent_roi_pct(&self) -> f64 {
        self.opponent_roi_pct
    }

    #[must_use]
    pub const fn reward_amount(&self) -> u64 {
        self.reward_amount
    }

    #[must_use]
    pub const fn mini_game_won(&self) -> bool {
        self.mini_game_won
    }

    #[must_use]
    pub const fn mini_game_score(&self) -> u32 {
        self.mini_game_score
    }
}

/// Mini-game facts the aggregator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MiniGameVerdict {
    pub won: bool,
    pub score: u32,
}

/// Combines the investment outcome with the mini-game verdict.
#[derive(Debug, Clone)]
pub struct ResultAggregator<O> {
    oracle: O,
    policy: RewardPolicy,
}

impl<O: RoiOracle> ResultAggregator<O> {
    #[must_use]
    pub const fn new(oracle: O, policy: RewardPolicy) -> Self {
        Self { oracle, policy }
    }

    /// Produce the battle result. ROIs are drawn exactly once here.
    ///
    /// ROIs are reported to one decimal. The oracle's `player_won` is
    /// authoritative: if the rounded ROIs disagree with it, the opponent's ROI
    /// is moved 0.1 past the player's and a warning is logged.
    pub fn resolve(
        &mut self,
        vault: &VaultRef,
        opponent: &Opponent,
        verdict: MiniGameVerdict,
    ) -> BattleResult {
        let raw = self.oracle.investment_outcome(vault, opponent);
        let plain = InvestmentOutcome {
            player_roi_pct: round_to_tenth(raw.player_roi_pct),
            opponent_roi_pct: round_to_tenth(raw.opponent_roi_pct),
            ..raw
        };
        let investment = raw.rounded();
        if !plain.is_consistent() {
            log::warn!(
                target: LOG_TARGET_SESSION,
                "oracle says player_won={} but ROIs are {:.1}% vs {:.1}%; opponent ROI reported as {:.1}%",
                raw.player_won,
                plain.player_roi_pct,
                plain.opponent_roi_pct,
                investment.opponent_roi_pct,
            );
        }
        let reward_amount = self.policy.reward_for(investment.player_won, verdict.won);
        log::info!(
            target: LOG_TARGET_SESSION,
            "battle {} vs {}: roi {:.1}% vs {:.1}%, mini-game {}, reward {reward_amount}",
            vault.id,
            opponent.id,
            investment.player_roi_pct,
            investment.opponent_roi_pct,
            if verdict.won { "won" } else { "lost" },
        );
        BattleResult {
            player_won: investment.player_won,
            player_roi_pct: investment.player_roi_pct,
            opponent_roi_pct: investment.opponent_roi_pct,
            reward_amount,
            mini_game_won: verdict.won,
            mini_game_score: verdict.score,
        }
    }

    #[must_use]
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    #[must_use]
    pub const fn policy(&self) -> &RewardPolicy {
        &self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::RngStreams;

    struct FixedOracle(InvestmentOutcome);

    impl RoiOracle for FixedOracle {
        fn investment_outcome(&mut self, _: &VaultRef, _: &Opponent) -> InvestmentOutcome {
            self.0
        }
    }

    fn pairing() -> (VaultRef, Opponent) {
        (
            VaultRef::new("v1", "Frog Fund"),
            Opponent::new("doge-maxi", "Doge Maximalist"),
        )
    }

    fn fixed(player_won: bool) -> FixedOracle {
        FixedOracle(InvestmentOutcome {
            player_won,
            player_roi_pct: if player_won { 12.34 } else { -3.21 },
            opponent_roi_pct: if player_won { 4.56 } else { 7.89 },
        })
    }

    #[test]
    fn reward_table_is_exact() {
        let (vault, opponent) = pairing();
        let cases = [
            (true, true, 20),
            (true, false, 10),
            (false, true, 0),
            (false, false, 0),
        ];
        for (investment_won, mini_game_won, expected) in cases {
            let mut aggregator = ResultAggregator::new(fixed(investment_won), RewardPolicy::default());
            let result = aggregator.resolve(
                &vault,
                &opponent,
                MiniGameVerdict {
                    won: mini_game_won,
                    score: 7,
                },
            );
            assert_eq!(result.reward_amount(), expected);
            assert_eq!(result.player_won(), investment_won);
            assert_eq!(result.mini_game_won(), mini_game_won);
            assert_eq!(result.mini_game_score(), 7);
        }
    }

    #[test]
    fn rois_round_to_one_decimal() {
        let (vault, opponent) = pairing();
        let mut aggregator = ResultAggregator::new(fixed(true), RewardPolicy::default());
        let result = aggregator.resolve(&vault, &opponent, MiniGameVerdict::default());
        assert!((result.player_roi_pct() - 12.3).abs() < 1e-9);
        assert!((result.opponent_roi_pct() - 4.6).abs() < 1e-9);
    }

    #[test]
    fn rounding_never_flips_the_winner() {
        let tie = InvestmentOutcome {
            player_won: true,
            player_roi_pct: 5.04,
            opponent_roi_pct: 5.01,
        }
        .rounded();
        assert!(tie.player_roi_pct > tie.opponent_roi_pct);

        let tie = InvestmentOutcome {
            player_won: false,
            player_roi_pct: 5.04,
            opponent_roi_pct: 5.01,
        }
        .rounded();
        assert!(tie.player_roi_pct < tie.opponent_roi_pct);
    }

    #[test]
    fn stub_outcomes_are_consistent_and_seeded() {
        let (vault, opponent) = pairing();
        let cfg = RoiStubConfig::default();
        let mut first = StubRoiOracle::new(cfg.clone(), RngStreams::from_user_seed(11).roi);
        let mut second = StubRoiOracle::new(cfg.clone(), RngStreams::from_user_seed(11).roi);
        let mut wins = 0;
        for _ in 0..500 {
            let a = first.investment_outcome(&vault, &opponent);
            let b = second.investment_outcome(&vault, &opponent);
            assert_eq!(a, b);
            assert_eq!(a.player_won, a.player_roi_pct > a.opponent_roi_pct);
            assert!(a.player_roi_pct >= cfg.min_roi_pct && a.player_roi_pct <= cfg.max_roi_pct);
            if a.player_won {
                wins += 1;
            }
        }
        assert!((150..350).contains(&wins), "wins {wins}");
        assert!(first.rng().draws() >= 1_500);
    }

    #[test]
    fn contradicting_oracle_keeps_its_winner() {
        let (vault, opponent) = pairing();
        let contradiction = InvestmentOutcome {
            player_won: true,
            player_roi_pct: 2.0,
            opponent_roi_pct: 9.0,
        };
        assert!(!contradiction.is_consistent());
        let mut aggregator =
            ResultAggregator::new(FixedOracle(contradiction), RewardPolicy::default());
        let result = aggregator.resolve(&vault, &opponent, MiniGameVerdict::default());
        assert!(result.player_won());
        assert!((result.player_roi_pct() - 2.0).abs() < 1e-9);
        assert!((result.opponent_roi_pct() - 1.9).abs() < 1e-9);
        assert_eq!(result.reward_amount(), 10);
    }

    #[test]
    fn stub_tolerates_collapsed_ranges() {
        let (vault, opponent) = pairing();
        let cfg = RoiStubConfig {
            min_roi_pct: 5.0,
            max_roi_pct: 5.0,
            min_margin_pct: 1.0,
            max_margin_pct: 1.0,
            ..RoiStubConfig::default()
        };
        assert!(cfg.validate().is_err());
        let mut stub = StubRoiOracle::new(cfg, RngStreams::from_user_seed(3).roi);
        let outcome = stub.investment_outcome(&vault, &opponent);
        assert!((outcome.player_roi_pct - 5.0).abs() < 1e-9);
        assert!(outcome.is_consistent());
        assert!((outcome.opponent_roi_pct - outcome.player_roi_pct).abs() > 0.9);
    }

    #[test]
    fn custom_policy_is_honoured() {
        let (vault, opponent) = pairing();
        let policy = RewardPolicy {
            full_win: 50,
            investment_only: 5,
            loss: 1,
        };
        let mut aggregator = ResultAggregator::new(fixed(false), policy);
        let result = aggregator.resolve(&vault, &opponent, MiniGameVerdict::default());
        assert_eq!(result.reward_amount(), 1);
    }

    #[test]
    fn stub_config_validation() {
        let mut cfg = RoiStubConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.min_margin_pct = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(BattleConfigError::MinViolation { .. })
        ));
    }
}
