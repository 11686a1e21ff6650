use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::network::{NetworkSimulator, NetworkSummary};
use super::scenarios::NetworkScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub failures: Vec<String>,
    pub treatments_applied: usize,
    pub final_mean_pdi: f64,
    pub final_mean_sdi: f64,
    pub routine_maintenance: f64,
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

pub struct ScenarioRunner {
    simulator: NetworkSimulator,
    verbose: bool,
}

impl ScenarioRunner {
    pub const fn new(simulator: NetworkSimulator, verbose: bool) -> Self {
        Self { simulator, verbose }
    }

    pub fn run_scenario(&self, scenario: &NetworkScenario, seeds: &[u64]) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (segments: {} periods: {} seed: {})",
                        scenario.name.bright_white(),
                        scenario.plan.segments,
                        scenario.plan.periods,
                        seed
                    );
                }
                self.run_single(scenario, seed)
            })
            .collect()
    }

    fn run_single(&self, scenario: &NetworkScenario, seed: u64) -> ScenarioResult {
        let start = Instant::now();
        let outcome = self.simulator.run(&scenario.plan, seed);
        let duration = start.elapsed();

        match outcome {
            Ok(summary) => {
                let failures: Vec<String> = scenario.evaluate(&summary).into_iter().collect();
                if self.verbose {
                    for failure in &failures {
                        println!("  ❌ {}", failure.red());
                    }
                }
                result_from_summary(scenario, &summary, failures, duration)
            }
            Err(err) => {
                log::error!("{} seed {seed}: {err:#}", scenario.key);
                ScenarioResult {
                    scenario_name: scenario.name.to_string(),
                    seed,
                    passed: false,
                    failures: vec![format!("simulation error: {err:#}")],
                    treatments_applied: 0,
                    final_mean_pdi: 0.0,
                    final_mean_sdi: 0.0,
                    routine_maintenance: 0.0,
                    duration,
                }
            }
        }
    }
}

fn result_from_summary(
    scenario: &NetworkScenario,
    summary: &NetworkSummary,
    failures: Vec<String>,
    duration: Duration,
) -> ScenarioResult {
    let last = summary.records.last();
    ScenarioResult {
        scenario_name: scenario.name.to_string(),
        seed: summary.seed,
        passed: failures.is_empty(),
        failures,
        treatments_applied: summary.treatments_applied(),
        final_mean_pdi: last.map_or(0.0, |r| r.mean_pdi),
        final_mean_sdi: last.map_or(0.0, |r| r.mean_sdi),
        routine_maintenance: summary.records.iter().map(|r| r.routine_maintenance).sum(),
        duration,
    }
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
