use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::scenarios::LogicScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl ScenarioResult {
    /// Result of a single run that either succeeded or failed with `error`.
    #[must_use]
    pub fn single(
        name: impl Into<String>,
        error: Option<String>,
        duration: Duration,
        notes: Vec<String>,
    ) -> Self {
        let passed = error.is_none();
        Self {
            scenario_name: name.into(),
            passed,
            iterations_run: 1,
            successful_iterations: usize::from(passed),
            failures: error.into_iter().collect(),
            average_duration: duration,
            performance_data: if passed { vec![duration] } else { Vec::new() },
            notes,
        }
    }
}

pub struct LogicTester {
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn run_scenario(
        &self,
        scenario: &LogicScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 {} (seed {seed}, {iterations} iterations)",
                    scenario.key.bold()
                );
            }
            results.push(self.run_with_seed(scenario, seed, iterations));
        }

        results
    }

    fn run_with_seed(&self, scenario: &LogicScenario, seed: u64, iterations: usize) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            match (scenario.run)(iteration_seed) {
                Ok(()) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!("  ✅ Iteration {}/{} passed ({duration:?})", i + 1, iterations);
                    }
                }
                Err(err) => {
                    let message = format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1);
                    if self.verbose {
                        println!("  ❌ Iteration {}/{} failed: {}", i + 1, iterations, message.red());
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: format!("{} (seed {seed})", scenario.key),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
            notes: Vec::new(),
        }
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
