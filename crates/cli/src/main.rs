use std::{fs, process};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use twopl_cli::{load_history, App, Command};
use twopl_core::operation::Operation;
use twopl_core::validation::{check_accounting, check_schedule};
use twopl_core::{schedule, Policy, SchedulerConfig, SchedulerOutcome};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let app = App::parse();
    match &app.command {
        Command::Schedule(args) => schedule_one(args),
        Command::Compare(args) => compare(args),
        Command::Check(args) => check(args),
        Command::Generate(args) => generate(args),
        Command::Verify(args) => verify(args),
        Command::Schema => {
            let schema = schemars::schema_for!(Vec<Operation>);
            println!("{}", to_json(&schema, true));
        }
    }
}

fn exit_with(message: &str) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, pretty: bool) -> String {
    let result = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    result.unwrap_or_else(|e| exit_with(&format!("Failed to serialize output: {e}")))
}

fn read_history(path: &std::path::Path) -> Vec<Operation> {
    load_history(path).unwrap_or_else(|e| exit_with(&e))
}

fn print_leftovers(outcome: &SchedulerOutcome) {
    println!(
        "  waiting:    {}",
        twopl_core::history::format_operations(&outcome.waiting)
    );
    println!(
        "  restarting: {}",
        twopl_core::history::format_operations(&outcome.restarting)
    );
    let restarted: Vec<String> = outcome.restarted.iter().map(ToString::to_string).collect();
    println!("  restarted:  {}", restarted.join(" "));
}

fn schedule_one(args: &twopl_cli::ScheduleArgs) {
    let history = read_history(&args.input);
    let config = SchedulerConfig::new(Policy::from(args.policy)).with_annotations(args.annotate);
    let outcome = schedule(history, config);

    if args.json {
        println!("{}", to_json(&outcome, true));
    } else {
        println!("{}", outcome.schedule);
        if args.verbose {
            print_leftovers(&outcome);
        }
    }
}

fn compare(args: &twopl_cli::CompareArgs) {
    let history = read_history(&args.input);
    for policy in Policy::ALL {
        let config = SchedulerConfig::new(policy).with_annotations(args.annotate);
        let outcome = schedule(history.clone(), config);
        println!("{policy}: {}", outcome.schedule);
    }
}

fn check(args: &twopl_cli::CheckArgs) {
    let content = fs::read_to_string(&args.input).unwrap_or_else(|e| {
        exit_with(&format!("Failed to read {}: {e}", args.input.display()))
    });
    let events = twopl_parser::parse_schedule(&content)
        .unwrap_or_else(|e| exit_with(&format!("{}: {e}", args.input.display())));
    match check_schedule(&events) {
        Ok(()) => println!("{}: PASS", args.input.display()),
        Err(e) => {
            println!("{}: FAIL ({e})", args.input.display());
            process::exit(1);
        }
    }
}

fn generate(args: &twopl_cli::GenerateArgs) {
    fs::create_dir_all(&args.output_dir).unwrap_or_else(|e| {
        exit_with(&format!("Failed to create output directory: {e}"));
    });

    let histories = twopl_testgen::generator::generate_mult_histories(
        args.n_hist,
        args.n_txn,
        args.n_page,
        args.n_op,
    );

    for history in &histories {
        let path = args.output_dir.join(format!("{}.json", history.get_id()));
        let file = fs::File::create(&path).unwrap_or_else(|e| {
            exit_with(&format!("Failed to create {}: {e}", path.display()))
        });
        serde_json::to_writer_pretty(file, history).unwrap_or_else(|e| {
            exit_with(&format!("Failed to write {}: {e}", path.display()));
        });
    }

    println!(
        "Generated {} histories to {}",
        histories.len(),
        args.output_dir.display()
    );
}

fn verify(args: &twopl_cli::VerifyArgs) {
    let policy = Policy::from(args.policy);
    let mut any_failed = false;

    let mut entries: Vec<_> = fs::read_dir(&args.input_dir)
        .unwrap_or_else(|e| exit_with(&format!("Failed to read input directory: {e}")))
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .collect();

    entries.sort_by_key(fs::DirEntry::path);

    if entries.is_empty() {
        exit_with(&format!("No .json files found in {}", args.input_dir.display()));
    }

    for entry in entries {
        let path = entry.path();
        let filename = path.file_name().unwrap_or_default().to_string_lossy();

        let file = fs::File::open(&path)
            .unwrap_or_else(|e| exit_with(&format!("Failed to open {filename}: {e}")));

        let history: twopl_testgen::generator::History = serde_json::from_reader(file)
            .unwrap_or_else(|e| exit_with(&format!("Failed to parse {filename}: {e}")));

        let outcome = schedule(history.get_data().clone(), policy);
        let result = check_schedule(outcome.schedule.events()).and_then(|()| {
            check_accounting(history.get_data(), &outcome).map_err(Into::into)
        });

        match result {
            Ok(()) => {
                if args.json {
                    let result = serde_json::json!({
                        "file": filename,
                        "ok": true,
                        "schedule": outcome.schedule.to_string(),
                        "restarted": &outcome.restarted,
                    });
                    println!("{}", to_json(&result, false));
                } else if args.verbose {
                    println!("{filename}: PASS");
                    println!("  schedule:   {}", outcome.schedule);
                    print_leftovers(&outcome);
                } else {
                    println!("{filename}: PASS");
                }
            }
            Err(e) => {
                any_failed = true;
                if args.json {
                    let result = serde_json::json!({
                        "file": filename,
                        "ok": false,
                        "error": e.to_string(),
                    });
                    println!("{}", to_json(&result, false));
                } else if args.verbose {
                    println!("{filename}: FAIL");
                    println!("  error:    {e}");
                    println!("  schedule: {}", outcome.schedule);
                } else {
                    println!("{filename}: FAIL ({e})");
                }
            }
        }
    }

    if any_failed {
        process::exit(1);
    }
}
