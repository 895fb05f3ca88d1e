//! twopl CLI -- schedule histories under strict 2PL and check the result.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use twopl_core::operation::Operation;
use twopl_core::Policy;

#[derive(Debug, Parser)]
#[command(
    name = "twopl",
    about = "Strict two-phase-locking schedules with deadlock prevention"
)]
pub struct App {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Schedule a history under one policy
    Schedule(ScheduleArgs),
    /// Schedule a history under every policy
    Compare(CompareArgs),
    /// Check a rendered schedule for lock safety and strict 2PL
    Check(CheckArgs),
    /// Generate random histories
    Generate(GenerateArgs),
    /// Schedule and validate every generated history in a directory
    Verify(VerifyArgs),
    /// Print the JSON Schema for the history input format to stdout
    Schema,
}

#[derive(Debug, Parser)]
pub struct ScheduleArgs {
    /// History file: one operation per line, or a JSON array for `.json`
    pub input: PathBuf,
    /// Deadlock-prevention policy
    #[arg(long)]
    pub policy: PolicyArg,
    /// Emit `wait_T` / `restart_T` markers after denied requests
    #[arg(long)]
    pub annotate: bool,
    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
    /// Also print operations left waiting or restarted
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Parser)]
pub struct CompareArgs {
    /// History file: one operation per line, or a JSON array for `.json`
    pub input: PathBuf,
    /// Emit `wait_T` / `restart_T` markers after denied requests
    #[arg(long)]
    pub annotate: bool,
}

#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// File holding a rendered schedule such as `wl_1(x) w_1(x) wu_1(x) c_1`
    pub input: PathBuf,
}

#[derive(Debug, Parser)]
pub struct GenerateArgs {
    /// Number of histories to generate
    #[arg(long)]
    pub n_hist: u64,
    /// Number of transactions per history
    #[arg(long)]
    pub n_txn: u64,
    /// Number of pages
    #[arg(long)]
    pub n_page: u64,
    /// Number of reads and writes per transaction
    #[arg(long)]
    pub n_op: u64,
    /// Output directory for generated history files
    #[arg(long)]
    pub output_dir: PathBuf,
}

#[derive(Debug, Parser)]
pub struct VerifyArgs {
    /// Input directory containing generated history JSON files
    #[arg(long)]
    pub input_dir: PathBuf,
    /// Deadlock-prevention policy
    #[arg(long)]
    pub policy: PolicyArg,
    /// Print the schedule on PASS and full error details on FAIL
    #[arg(long)]
    pub verbose: bool,
    /// Output results as JSON (one object per file)
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    ImmediateRestart,
    WaitDie,
    WoundWait,
}

impl From<PolicyArg> for Policy {
    fn from(policy: PolicyArg) -> Self {
        match policy {
            PolicyArg::ImmediateRestart => Self::ImmediateRestart,
            PolicyArg::WaitDie => Self::WaitDie,
            PolicyArg::WoundWait => Self::WoundWait,
        }
    }
}

/// Reads a history from `path`.
///
/// `.json` files hold an array of operations; anything else uses the
/// line format (`w 1 x`, `c 1`).
///
/// # Errors
///
/// Returns a printable message if the file cannot be read or is malformed.
pub fn load_history(path: &Path) -> Result<Vec<Operation>, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    parse_history_input(&content, path.extension().is_some_and(|ext| ext == "json"))
        .map_err(|e| format!("{}: {e}", path.display()))
}

/// Parses history text, either as a JSON array of operations or in the
/// line format.
///
/// # Errors
///
/// Returns a printable message for malformed input.
pub fn parse_history_input(content: &str, json: bool) -> Result<Vec<Operation>, String> {
    if json {
        let operations: Vec<Operation> =
            serde_json::from_str(content).map_err(|e| e.to_string())?;
        twopl_parser::validate_history(&operations).map_err(|e| e.to_string())?;
        Ok(operations)
    } else {
        twopl_parser::parse_history(content).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        App::command().debug_assert();
    }

    #[test]
    fn test_parse_schedule_command() {
        let app = App::try_parse_from([
            "twopl",
            "schedule",
            "history.txt",
            "--policy",
            "wound-wait",
            "--annotate",
        ])
        .expect("should parse");
        let Command::Schedule(args) = app.command else {
            panic!("expected the schedule command");
        };
        assert_eq!(Policy::from(args.policy), Policy::WoundWait);
        assert!(args.annotate);
        assert!(!args.json);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(App::try_parse_from(["twopl", "schedule", "h.txt", "--policy", "oldest-first"])
            .is_err());
    }

    #[test]
    fn test_policy_names_agree() {
        for arg in PolicyArg::value_variants() {
            let name = arg
                .to_possible_value()
                .expect("no skipped variants")
                .get_name()
                .to_string();
            assert_eq!(name, Policy::from(*arg).name());
        }
    }

    #[test]
    fn test_json_and_line_input_agree() {
        let lines = parse_history_input("w 1 x\nc 1\n", false).expect("should parse");
        let json = parse_history_input(
            r#"[{"transaction":1,"page":"x","kind":"Write"},{"transaction":1,"kind":"Commit"}]"#,
            true,
        )
        .expect("should parse");
        assert_eq!(lines, json);
    }

    #[test]
    fn test_json_input_is_validated() {
        let err = parse_history_input(r#"[{"transaction":0,"kind":"Commit"}]"#, true).unwrap_err();
        assert!(err.contains("positive"), "{err}");
    }
}
