//! Solana Vanity Keypair Generator CLI
//!
//! Usage:
//!   sol_vanity -p Sol              # Find a key starting with "sol" in any case
//!   sol_vanity -p Sol -c           # Exactly "Sol"
//!   sol_vanity -p abc -m 1000000   # Give up after a million keypairs

use std::process;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use sol_vanity::report::{format_number, progress_line};
use sol_vanity::{
    CancelHandle, Config, Ed25519Source, Pattern, Report, SearchCoordinator, SearchError,
    SearchResult,
};

fn main() {
    let config = Config::parse();
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("configuration error: {}", e);
        process::exit(1);
    }

    let pattern = match Pattern::new(config.pattern.as_str(), config.case_sensitive) {
        Ok(pattern) => pattern,
        Err(e) => {
            error!("invalid pattern: {}", e);
            process::exit(1);
        }
    };

    let search_config = config.search_config();

    // Print startup info
    eprintln!("Solana Vanity Keypair Generator");
    eprintln!("===============================");
    eprintln!("Pattern:    {}", pattern);
    eprintln!("Difficulty: {}", pattern.difficulty_description());
    eprintln!("Workers:    {}", search_config.effective_workers());
    eprintln!();

    let coordinator = SearchCoordinator::new(Ed25519Source);
    let cancel = CancelHandle::new();
    ctrlc_handler(cancel.clone());

    eprintln!("Searching... (Press Ctrl+C to stop)\n");

    let outcome =
        coordinator.search_with_progress(pattern.text(), &search_config, &cancel, |progress| {
            eprintln!("{}", progress_line(progress));
        });

    match outcome {
        Ok(result) => print_result(&result, config.json),
        Err(e) => {
            report_failure(&e);
            process::exit(2);
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_result(result: &SearchResult, json: bool) {
    let report = Report::from(result);

    if json {
        match report.to_json() {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("failed to serialize result: {}", e);
                process::exit(2);
            }
        }
        return;
    }

    println!("=== Match ===");
    println!("{}", report);
    println!("Worker:      {}", result.worker_id);
    println!(
        "Speed:       {}/s",
        format_number(result.keys_per_second() as u64)
    );
}

fn report_failure(e: &SearchError) {
    error!("{}", e);
    if let Some(attempts) = e.attempts() {
        eprintln!("Total keys generated: {}", format_number(attempts));
    }
}

fn ctrlc_handler(cancel: CancelHandle) {
    ctrlc::set_handler(move || {
        cancel.cancel();
    })
    .expect("Error setting Ctrl-C handler");
}
