#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use gcl_verify::ProverConfig;
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE: &str = "gcl.toml";
pub const PROVER_ENV: &str = "GCL_PROVER";

#[derive(Debug, Error, Diagnostic)]
#[error("config error: {message}")]
#[diagnostic(code(gcl::config))]
pub struct ConfigError {
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    prover: ProverConfig,
    axioms: AxiomsSection,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
struct AxiomsSection {
    /// Directory of extra `*.ax` files, relative to the config file.
    dir: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub prover: ProverConfig,
    pub axiom_dir: Option<PathBuf>,
}

/// Nearest `gcl.toml` in `start` or one of its ancestors.
pub fn find_config(start: &Path) -> Option<PathBuf> {
    let mut cur = if start.is_file() {
        start.parent()?.to_path_buf()
    } else {
        start.to_path_buf()
    };

    loop {
        let candidate = cur.join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => return None,
        }
    }
}

/// Loads `explicit`, or else the config found from `start`; every key is optional.
pub fn load_config(start: &Path, explicit: Option<&Path>) -> Result<ResolvedConfig, ConfigError> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(start),
    };
    let mut resolved = match path {
        Some(path) => read_config(&path)?,
        None => ResolvedConfig::default(),
    };
    apply_prover_env(&mut resolved, std::env::var(PROVER_ENV).ok());
    Ok(resolved)
}

fn read_config(path: &Path) -> Result<ResolvedConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|e| ConfigError {
        message: format!("failed to read {}: {e}", path.display()),
    })?;
    let parsed: ConfigFile = toml::from_str(&raw).map_err(|e| ConfigError {
        message: format!("failed to parse {}: {e}", path.display()),
    })?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(ResolvedConfig {
        config_path: Some(path.to_path_buf()),
        prover: parsed.prover,
        axiom_dir: parsed.axioms.dir.map(|d| resolve_path(base, &d)),
    })
}

fn apply_prover_env(config: &mut ResolvedConfig, command: Option<String>) {
    if let Some(command) = command.filter(|c| !c.trim().is_empty()) {
        config.prover.command = command;
    }
}

fn resolve_path(base: &Path, p: &str) -> PathBuf {
    let path = PathBuf::from(p);
    if path.is_absolute() { path } else { base.join(path) }
}
