//! Prover process driver.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ProverError;

/// Decides a batch of formulas in one round trip.
pub trait Prover {
    /// Submits `batch` and returns one verdict (`true` = valid) per formula,
    /// in submission order. `expected` is the number of formulas in the batch.
    fn prove(&mut self, batch: &str, expected: usize) -> Result<Vec<bool>, ProverError>;
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub command: String,
    pub args: Vec<String>,
    pub valid_suffix: String,
    pub invalid_suffix: String,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            command: "simplify".to_string(),
            args: vec!["-nosc".to_string()],
            valid_suffix: "Valid.".to_string(),
            invalid_suffix: "Invalid.".to_string(),
        }
    }
}

/// Runs an external Simplify-compatible executable once per batch.
#[derive(Clone, Debug, Default)]
pub struct SimplifyProver {
    config: ProverConfig,
}

impl SimplifyProver {
    pub fn new(config: ProverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }
}

impl Prover for SimplifyProver {
    fn prove(&mut self, batch: &str, expected: usize) -> Result<Vec<bool>, ProverError> {
        let command = &self.config.command;
        debug!(command = %command, args = ?self.config.args, "starting prover");

        let spawn_err = |source| ProverError::Spawn {
            command: command.clone(),
            source,
        };
        let mut child = Command::new(command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // stdin is written on its own thread while stdout is drained here.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = batch.to_string();
            std::thread::spawn(move || stdin.write_all(input.as_bytes()))
        });

        let out = child.wait_with_output().map_err(spawn_err)?;
        if let Some(writer) = writer {
            match writer.join() {
                Ok(result) => result.map_err(spawn_err)?,
                Err(_) => warn!("prover stdin writer panicked"),
            }
        }

        if !out.status.success() {
            return Err(ProverError::Exit {
                command: command.clone(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&out.stdout);
        let verdicts = parse_verdicts(&stdout, &self.config);
        if verdicts.len() != expected {
            warn!(expected, got = verdicts.len(), "prover verdict count mismatch");
            return Err(ProverError::VerdictCount {
                expected,
                got: verdicts.len(),
            });
        }
        Ok(verdicts)
    }
}

/// Keeps the lines ending in a verdict keyword, in order.
pub fn parse_verdicts(stdout: &str, config: &ProverConfig) -> Vec<bool> {
    stdout
        .lines()
        .map(str::trim_end)
        .filter_map(|line| {
            let valid = line.ends_with(&config.valid_suffix);
            let invalid = line.ends_with(&config.invalid_suffix);
            match (valid, invalid) {
                // One keyword is a suffix of the other: the longer one wins.
                (true, true) => Some(config.valid_suffix.len() > config.invalid_suffix.len()),
                (true, false) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_verdict_lines_in_order() {
        let out = "\
1: Valid.
2: Invalid.
Counterexample:
  context:
    (AND (EQ x 1))
3: Valid.
";
        assert_eq!(
            parse_verdicts(out, &ProverConfig::default()),
            vec![true, false, true]
        );
    }

    #[test]
    fn custom_keywords() {
        let config = ProverConfig {
            valid_suffix: "unsat".to_string(),
            invalid_suffix: "sat".to_string(),
            ..ProverConfig::default()
        };
        assert_eq!(parse_verdicts("unsat\nsat\n", &config), vec![true, false]);
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let mut prover = SimplifyProver::new(ProverConfig {
            command: "gcl-no-such-prover".to_string(),
            ..ProverConfig::default()
        });
        let err = prover.prove("TRUE", 1).expect_err("missing executable");
        assert!(matches!(err, ProverError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn verdict_count_must_match() {
        let mut prover = SimplifyProver::new(ProverConfig {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "cat >/dev/null; echo '1: Valid.'".to_string()],
            ..ProverConfig::default()
        });
        assert_eq!(prover.prove("TRUE", 1).expect("one verdict"), vec![true]);
        let err = prover.prove("TRUE TRUE", 2).expect_err("two expected");
        assert!(matches!(err, ProverError::VerdictCount { expected: 2, got: 1 }));
    }
}
