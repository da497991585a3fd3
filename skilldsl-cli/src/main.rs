use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde_json::json;
use skilldsl_core::library::default_library_root;
use skilldsl_core::registry::{self, render_registry_document};
use skilldsl_core::{
    Generator, Value, ValueMap, encoding_stats, evaluate, format_literal, load_skill_library, parse,
    validate_skill_text,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Command line front-end for the SkillDSL toolchain.
#[derive(Parser, Debug)]
#[command(name = "skilldsl", version, about, long_about = None)]
struct Cli {
    /// Log at debug level regardless of SKILLDSL_LOG / RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse one expression and print its canonical form
    Parse {
        #[arg(short, long)]
        input: Option<String>,
        /// Print the value tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one expression against JSON state and inputs
    Eval {
        #[arg(short, long)]
        input: Option<String>,
        /// Initial state as a JSON object
        #[arg(long, value_name = "JSON")]
        state: Option<String>,
        /// Input channel values as a JSON object
        #[arg(long, value_name = "JSON")]
        inputs: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Render built-in skills as DSL text
    Render {
        /// Skill id, with or without the leading colon
        #[arg(long, conflicts_with = "all")]
        skill: Option<String>,
        /// Render every built-in skill (the default)
        #[arg(long)]
        all: bool,
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Render the default wiring between the built-in skills
    Wiring {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Render the full built-in document: every skill plus wiring
    Document {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Check that text holds a complete define-skill form
    Validate {
        #[arg(short, long)]
        input: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Load a directory of .skill files and summarise it
    Check {
        /// Library root (defaults to the bundled skills directory)
        #[arg(long, value_name = "PATH")]
        dir: Option<PathBuf>,
    },
    /// Compare DSL and JSON sizes of the built-in skills
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SKILLDSL_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    debug!(command = ?cli.command, "dispatching command");
    match cli.command {
        Command::Parse { input, json } => {
            let source = read_source(input.as_deref())?;
            let parsed = parse(&source).context("failed to parse input")?;
            if json {
                let document = json!({ "ast": parsed.ast, "skill_id": parsed.skill_id });
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                println!("{}", format_literal(&parsed.ast));
                if let Some(id) = parsed.skill_id {
                    println!("skill-id: {id}");
                }
            }
        }
        Command::Eval {
            input,
            state,
            inputs,
            json,
        } => {
            let source = read_source(input.as_deref())?;
            let state = json_object(state.as_deref(), "--state")?;
            let inputs = json_object(inputs.as_deref(), "--inputs")?;
            let outcome = evaluate(source.as_str(), state, inputs);
            if json {
                let document = json!({
                    "value": outcome.value,
                    "state": outcome.state,
                    "emissions": outcome.emissions,
                    "error": outcome.error.as_ref().map(ToString::to_string),
                });
                println!("{}", serde_json::to_string_pretty(&document)?);
            } else {
                println!("value: {}", outcome.value);
                println!("state: {}", Value::Map(outcome.state.clone()));
                println!("emissions: {}", Value::Map(outcome.emissions.clone()));
            }
            if let Some(err) = outcome.error {
                return Err(anyhow!(err).context("evaluation failed"));
            }
        }
        Command::Render { skill, all, output } => {
            let generator = Generator::default();
            let text = match skill {
                Some(id) if !all => {
                    let entry = registry::get_skill(&id)
                        .ok_or_else(|| anyhow!("unknown skill {id}"))?;
                    generator.render_skill(&entry.descriptor)
                }
                _ => registry::all_skills()
                    .iter()
                    .map(|entry| generator.render_skill(&entry.descriptor))
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            };
            emit(output.as_deref(), &text)?;
        }
        Command::Wiring { output } => {
            emit(output.as_deref(), &registry::default_wiring().to_sexpr())?;
        }
        Command::Document { output } => {
            emit(output.as_deref(), &render_registry_document(&Generator::default()))?;
        }
        Command::Validate { input, json } => {
            let source = read_source(input.as_deref())?;
            let report = validate_skill_text(&source);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("valid: {}", report.valid);
                if let Some(id) = &report.skill_id {
                    println!("skill-id: :{id}");
                }
                if !report.missing.is_empty() {
                    println!("missing: {}", report.missing.join(", "));
                }
                if let Some(error) = &report.error {
                    println!("error: {error}");
                }
            }
            if !report.valid {
                bail!("skill text is not valid");
            }
        }
        Command::Check { dir } => {
            let root = dir.unwrap_or_else(default_library_root);
            let library = load_skill_library(&root)
                .with_context(|| format!("failed to load skill library {}", root.display()))?;
            for file in &library.files {
                println!(
                    "{}: {} skills, {} connections",
                    file.path.display(),
                    file.skills.len(),
                    file.connections.len()
                );
            }
            for issue in &library.issues {
                eprintln!("{}: {}", issue.path.display(), issue.error);
            }
            if !library.is_clean() {
                bail!("{} skill file(s) failed to load", library.issues.len());
            }
        }
        Command::Stats => {
            for entry in registry::all_skills() {
                let stats = encoding_stats(&entry.descriptor);
                println!(
                    "{:<22} sexpr {:>5}  json {:>5}  savings {:>5.1}%",
                    entry.key,
                    stats.sexpr_chars,
                    stats.json_chars,
                    stats.savings * 100.0
                );
            }
        }
    }
    Ok(())
}

fn read_source(input: Option<&str>) -> Result<String> {
    match input {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read input file {path}"))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

/// Parses an optional JSON object flag into a value map.
fn json_object(text: Option<&str>, flag: &str) -> Result<ValueMap> {
    let Some(text) = text else {
        return Ok(ValueMap::new());
    };
    let json: serde_json::Value =
        serde_json::from_str(text).with_context(|| format!("{flag} is not valid JSON"))?;
    match Value::from_json(&json) {
        Value::Map(map) => Ok(map),
        other => bail!("{flag} must be a JSON object, got {other}"),
    }
}

fn emit(output: Option<&str>, text: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, text.as_bytes()),
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    fn skilldsl() -> Command {
        Command::cargo_bin("skilldsl").expect("binary exists")
    }

    #[test]
    fn reads_json_objects_from_flags() {
        assert!(json_object(None, "--state").expect("empty").is_empty());
        let map = json_object(Some(r#"{"count": 5, "tags": ["a"]}"#), "--state").expect("object");
        assert_eq!(map.get("count"), Some(&Value::int(5)));

        let err = json_object(Some("[1, 2]"), "--inputs").expect_err("not an object");
        assert!(err.to_string().contains("--inputs must be a JSON object"));
        let err = json_object(Some("{"), "--state").expect_err("not json");
        assert!(err.to_string().contains("--state is not valid JSON"));
    }

    #[test]
    fn write_output_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("a/b/out.skill");
        let path = path.to_str().expect("utf-8 path");
        write_output(path, b"(define-wiring)").expect("write");
        assert_eq!(fs::read_to_string(path).expect("read back"), "(define-wiring)");
    }

    #[test]
    fn writes_document_to_nested_output() {
        let dir = tempdir().expect("tempdir");
        let output = dir.path().join("out/skills.skill");

        skilldsl()
            .arg("document")
            .arg("--output")
            .arg(&output)
            .assert()
            .success();

        let text = fs::read_to_string(&output).expect("document written");
        assert!(text.starts_with(";; NeoExcelPPT Skills DSL"));
        assert!(text.contains(";; Skill Wiring\n(define-wiring"));

        skilldsl()
            .arg("check")
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("5 skills, 5 connections"));
    }

    #[test]
    fn validates_skill_text() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("partial.skill");
        fs::write(&input, "(define-skill :partial (inputs :a))").expect("write input");

        skilldsl()
            .arg("validate")
            .arg("--input")
            .arg(&input)
            .assert()
            .failure()
            .stdout(predicate::str::contains("missing: outputs, compute"));

        skilldsl()
            .args(["validate", "--json"])
            .write_stdin("(define-skill :ok (inputs :a) (outputs :b) (compute (emit :b 1)))")
            .assert()
            .success()
            .stdout(predicate::str::contains("\"valid\": true"));
    }

    #[test]
    fn check_reports_broken_files() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("good.skill"), "(define-skill :good)").expect("write");
        fs::write(dir.path().join("bad.skill"), "(define-skill :bad").expect("write");

        skilldsl()
            .arg("check")
            .arg("--dir")
            .arg(dir.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("good.skill: 1 skills, 0 connections"))
            .stderr(predicate::str::contains("bad.skill"));
    }
}
