use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use vault_battle_game::{BattleConfig, ObstacleKind};

use crate::logic::policy::AutopilotStrategy;
use crate::logic::seeds::SeedInfo;
use crate::logic::simulation::{BattleSummary, SimulationConfig, run_battle};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub policy: String,
    pub seed_code: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub mini_game_wins: usize,
    pub total_reward: u64,
    pub mean_score: f64,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

/// Runs autopilot battles for every policy/seed pair and judges them.
pub struct LogicTester {
    verbose: bool,
    frame_ms: u32,
    battle: BattleConfig,
}

impl LogicTester {
    #[must_use]
    pub fn new(verbose: bool, frame_ms: u32) -> Self {
        Self {
            verbose,
            frame_ms,
            battle: BattleConfig::load_from_static(),
        }
    }

    pub fn run_policy(
        &self,
        strategy: AutopilotStrategy,
        seeds: &[SeedInfo],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing policy: {} (seed: {})",
                        strategy.key().bright_white(),
                        seed.display_code()
                    );
                }
                self.run_single(strategy, seed, iterations)
            })
            .collect()
    }

    fn run_single(
        &self,
        strategy: AutopilotStrategy,
        seed: &SeedInfo,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut mini_game_wins = 0;
        let mut total_reward = 0;
        let mut total_score = 0u64;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed
                .seed
                .wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let config = SimulationConfig::new(strategy, iteration_seed)
                .with_frame_ms(self.frame_ms)
                .with_battle(self.battle.clone());

            match judge_iteration(&config) {
                Ok(summary) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if summary.mini_game_won() {
                        mini_game_wins += 1;
                    }
                    total_reward += summary.reward();
                    total_score += u64::from(summary.score());
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) {} vs {} score:{} inputs:{} top speed:{:.2} reward:{}",
                            i + 1,
                            iterations,
                            summary.code,
                            summary.opponent_id,
                            summary.score(),
                            summary.inputs_accepted,
                            summary.top_speed,
                            summary.reward()
                        );
                    }
                }
                Err(err) => {
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            err.as_str().red()
                        );
                    }
                    failures.push(format!(
                        "Iteration {} (policy {}, seed {}): {err}",
                        i + 1,
                        strategy.key(),
                        iteration_seed
                    ));
                }
            }
        }

        let avg_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let mean_score = if successes == 0 {
            0.0
        } else {
            total_score as f64 / successes as f64
        };

        ScenarioResult {
            scenario_name: format!("{} @ {}", strategy.key(), seed.display_code()),
            policy: strategy.key().to_string(),
            seed_code: seed.display_code(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            mini_game_wins,
            total_reward,
            mean_score,
            average_duration: avg_duration,
            performance_data,
        }
    }
}

/// Run one battle twice and apply the property and policy expectations.
fn judge_iteration(config: &SimulationConfig) -> Result<BattleSummary, String> {
    let summary = run_battle(config).map_err(|err| format!("{err:#}"))?;
    if let Some(first) = summary.violations.first() {
        return Err(format!(
            "{} violation(s), first: {first}",
            summary.violations.len()
        ));
    }

    let replay = run_battle(config).map_err(|err| format!("{err:#}"))?;
    if replay.fingerprint != summary.fingerprint {
        return Err(format!(
            "replay diverged: fingerprint {:016x} vs {:016x}",
            summary.fingerprint, replay.fingerprint
        ));
    }

    if config.strategy == AutopilotStrategy::Idle {
        if summary.crash != Some(ObstacleKind::Cactus) {
            return Err(format!(
                "idle runner should hit the opening cactus, crashed into {:?}",
                summary.crash
            ));
        }
        if summary.score() != 0 {
            return Err(format!("idle runner scored {}", summary.score()));
        }
    }

    Ok(summary)
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis_vec = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis_vec
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}
