pub mod policy;
pub mod reports;
pub mod seeds;
pub mod simulation;
pub mod tester;

pub use policy::AutopilotStrategy;
pub use seeds::resolve_seed_inputs;
pub use simulation::DEFAULT_FRAME_MS;
pub use tester::{LogicTester, ScenarioResult};

/// Split a comma-separated CLI list, dropping blanks.
pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}
