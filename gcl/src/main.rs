#![forbid(unsafe_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use gcl_ast::{Span, TextRange};
use gcl_verify::{
    AxiomRegistry, JsonAstParser, Outcome, SemanticError, SimplifyProver, SyntaxError, TaskSource,
    format_summary,
    verify::{Prepared, prepare, verify_task},
};
use miette::{Diagnostic, IntoDiagnostic, LabeledSpan, NamedSource};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod manifest;
mod report;

use manifest::ResolvedConfig;

#[derive(Parser, Debug)]
#[command(
    name = "gcl",
    version,
    about = "Verification-condition generator for guarded-command programs"
)]
struct Cli {
    /// Configuration file. Defaults to the nearest `gcl.toml` above the task file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate every verification condition and prove it
    Verify {
        /// Task file (JSON)
        path: PathBuf,

        /// Prover executable. Overrides `gcl.toml` and GCL_PROVER.
        #[arg(long)]
        prover: Option<String>,

        /// Print a JSON report instead of diagnostics
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Program text the task's ranges refer to; enables source snippets
        #[arg(long)]
        source: Option<PathBuf>,
    },
    /// Print the prover input without running the prover
    Vcs {
        /// Task file (JSON)
        path: PathBuf,
    },
    /// List the axioms a task can enable
    Axioms {
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Verify {
            path,
            prover,
            json,
            source,
        } => {
            let mut cfg = manifest::load_config(&path, cli.config.as_deref())?;
            if let Some(command) = prover {
                cfg.prover.command = command;
            }
            verify_file(&path, &cfg, json, source.as_deref())
        }
        Cmd::Vcs { path } => {
            let cfg = manifest::load_config(&path, cli.config.as_deref())?;
            print_vcs(&path, &cfg)
        }
        Cmd::Axioms { path } => {
            let cfg = manifest::load_config(&path, cli.config.as_deref())?;
            list_axioms(&cfg)
        }
    }
}

fn load_task(path: &Path) -> miette::Result<TaskSource> {
    let raw = fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&raw)
        .map_err(|e| miette::miette!("failed to parse task {}: {e}", report::display_path(path)))
}

fn registry(cfg: &ResolvedConfig) -> miette::Result<AxiomRegistry> {
    let mut registry = AxiomRegistry::builtin();
    if let Some(dir) = &cfg.axiom_dir {
        let loaded = registry.load_dir(dir)?;
        info!(count = loaded.len(), dir = %dir.display(), "loaded axiom definitions");
    }
    Ok(registry)
}

fn verify_file(
    path: &Path,
    cfg: &ResolvedConfig,
    json: bool,
    source: Option<&Path>,
) -> miette::Result<()> {
    let task = load_task(path)?;
    let axioms = registry(cfg)?;
    let mut prover = SimplifyProver::new(cfg.prover.clone());
    let verification = verify_task(&task, &JsonAstParser, &axioms, &mut prover)?;

    if json {
        println!("{}", report::render_json(path, &verification)?);
    } else {
        let src = source.map(fs::read_to_string).transpose().into_diagnostic()?;
        if !verification.proofs.is_empty() {
            print!("{}", format_summary(&verification.proofs));
        }
        report_outcome(path, source, src.as_deref(), &verification.outcome);
    }

    match &verification.outcome {
        Outcome::SemanticErrors(errors) if errors.is_empty() => {
            if !json {
                println!(
                    "verified {}: {} conditions proved",
                    report::display_path(path),
                    verification.proofs.len()
                );
            }
            Ok(())
        }
        outcome => Err(miette::miette!(
            "verification failed with {} error(s)",
            error_count(outcome)
        )),
    }
}

fn print_vcs(path: &Path, cfg: &ResolvedConfig) -> miette::Result<()> {
    let task = load_task(path)?;
    let axioms = registry(cfg)?;
    match prepare(&task, &JsonAstParser, &axioms)? {
        Prepared::Ready(batch) => {
            print!("{}", batch.text());
            Ok(())
        }
        Prepared::Rejected(outcome) => {
            report_outcome(path, None, None, &outcome);
            Err(miette::miette!(
                "no conditions generated: {} error(s)",
                error_count(&outcome)
            ))
        }
    }
}

fn list_axioms(cfg: &ResolvedConfig) -> miette::Result<()> {
    for axiom in registry(cfg)?.iter() {
        let kind = if axiom.has_trigger() {
            "trigger + definitions"
        } else {
            "definitions only"
        };
        println!("{:<20} {kind}", axiom.name());
    }
    Ok(())
}

fn error_count(outcome: &Outcome) -> usize {
    match outcome {
        Outcome::ParsingErrors(errors) => errors.len(),
        Outcome::SemanticErrors(errors) => errors.len(),
    }
}

fn report_outcome(path: &Path, source: Option<&Path>, src: Option<&str>, outcome: &Outcome) {
    match outcome {
        Outcome::ParsingErrors(errors) => {
            for e in errors {
                eprintln!("{}: {}", report::display_path(path), syntax_line(e));
            }
        }
        Outcome::SemanticErrors(errors) => {
            for e in errors {
                match (source, src) {
                    (Some(source), Some(src)) => {
                        let named = NamedSource::new(report::display_path(source), src.to_string());
                        let report = miette::Report::new(Unproved::new(e, src)).with_source_code(named);
                        eprintln!("{report:?}");
                    }
                    _ => eprintln!("{}", semantic_lines(path, e)),
                }
            }
        }
    }
}

fn syntax_line(e: &SyntaxError) -> String {
    format!("{}:{}: syntax error: {}", e.row, e.col, e.message)
}

fn semantic_lines(path: &Path, e: &SemanticError) -> String {
    let mut out = format!(
        "{}:{}:{}: error: {}",
        report::display_path(path),
        e.start.row,
        e.start.col,
        e.message
    );
    for note in &e.notes {
        out.push_str(&format!(
            "\n  {}:{}: note: {}",
            note.start.row, note.start.col, note.message
        ));
    }
    out
}

/// A failed condition, located in the program text.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(gcl::semantic))]
#[allow(unused_assignments)]
struct Unproved {
    message: String,
    #[label("here")]
    span: Span,
    #[label(collection)]
    notes: Vec<LabeledSpan>,
}

impl Unproved {
    fn new(err: &SemanticError, src: &str) -> Self {
        Self {
            message: err.message.clone(),
            span: err.range().span_in(src),
            notes: err
                .notes
                .iter()
                .map(|n| {
                    let span = TextRange::new(n.start, n.end).span_in(src);
                    LabeledSpan::new_with_span(Some(n.message.clone()), span)
                })
                .collect(),
        }
    }
}
