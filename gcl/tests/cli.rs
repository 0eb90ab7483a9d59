use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const SWAP_TASK: &str = r#"{
  "precondition": {"type": "and",
    "left": {"type": "comp", "op": "=", "left": {"type": "var", "var": {"type": "name", "name": "x"}}, "right": {"type": "var", "var": {"type": "name", "name": "A"}}},
    "right": {"type": "comp", "op": "=", "left": {"type": "var", "var": {"type": "name", "name": "y"}}, "right": {"type": "var", "var": {"type": "name", "name": "B"}}}},
  "postcondition": {"type": "and",
    "left": {"type": "comp", "op": "=", "left": {"type": "var", "var": {"type": "name", "name": "x"}}, "right": {"type": "var", "var": {"type": "name", "name": "B"}}},
    "right": {"type": "comp", "op": "=", "left": {"type": "var", "var": {"type": "name", "name": "y"}}, "right": {"type": "var", "var": {"type": "name", "name": "A"}}}},
  "code": [
    {"type": "assign",
     "lvalues": [{"type": "name", "name": "x"}, {"type": "name", "name": "y"}],
     "rvalues": [{"type": "var", "var": {"type": "name", "name": "y"}}, {"type": "var", "var": {"type": "name", "name": "x"}}],
     "textRange": {"start": {"row": 1, "col": 0}, "end": {"row": 1, "col": 12}}}
  ]
}"#;

fn gcl(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gcl"))
        .args(args)
        .current_dir(dir)
        .env_remove("GCL_PROVER")
        .output()
        .expect("run gcl")
}

#[test]
fn vcs_prints_the_prover_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("task.json"), SWAP_TASK).expect("write task");

    let out = gcl(dir.path(), &["vcs", "task.json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim_end(),
        "(IMPLIES (AND (EQ x A) (EQ y B)) (AND (EQ y B) (EQ x A)))"
    );
}

#[test]
fn axioms_lists_configured_definitions() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir(dir.path().join("extra")).expect("mkdir");
    fs::write(
        dir.path().join("extra").join("even-sum.ax"),
        "(BG_PUSH (FORALL (n) (EQ (evensum n) (* 2 n))))\n",
    )
    .expect("write axiom");
    fs::write(dir.path().join("gcl.toml"), "[axioms]\ndir = \"extra\"\n").expect("write config");

    let out = gcl(dir.path(), &["axioms"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("ARRAY_SUM"), "{stdout}");
    assert!(
        stdout
            .lines()
            .any(|l| l.starts_with("EVEN_SUM") && l.contains("definitions only")),
        "{stdout}"
    );
}

#[test]
fn missing_prover_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("task.json"), SWAP_TASK).expect("write task");

    let out = gcl(
        dir.path(),
        &["verify", "task.json", "--prover", "gcl-no-such-prover"],
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("gcl-no-such-prover"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn verify_reports_json_from_a_scripted_prover() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("task.json"), SWAP_TASK).expect("write task");
    fs::write(
        dir.path().join("gcl.toml"),
        "[prover]\ncommand = \"sh\"\nargs = [\"-c\", \"cat > /dev/null; echo '1: Valid.'\"]\n",
    )
    .expect("write config");

    let out = gcl(dir.path(), &["verify", "task.json", "--json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json report");
    assert_eq!(report["ok"], true);
    assert_eq!(report["proofs"]["proved"], 1);
}
