//! Command-line front end: parse a Metamath database, verify every proof,
//! and report diagnostics with source snippets.

use annotate_snippets::{Level, Renderer};
use clap::Parser;
use metamath_check::Database;
use simple_logger::SimpleLogger;
use std::process;
use std::time::Instant;

/// A Metamath database parser and proof verifier
#[derive(Debug, clap::Parser)]
#[command(version, about)]
struct Cli {
    /// Database file to load
    #[arg(id("DATABASE"), required_unless_present("text"))]
    db: Option<String>,
    /// Provides raw database content on the command line
    #[arg(long, value_names(&["NAME", "TEXT"]))]
    text: Vec<String>,
    /// Prints milliseconds after each stage
    #[arg(long = "time")]
    timing: bool,
    /// Activates debug logs
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.debug {
        SimpleLogger::new().init().unwrap();
    }

    let mut data = Vec::new();
    for kv in cli.text.chunks(2) {
        data.push((kv[0].clone(), kv[1].clone().into_bytes()));
    }
    let start = cli.db.unwrap_or_else(|| data[0].0.clone());

    let renderer = Renderer::styled();
    let mut db = Database::default();

    let now = Instant::now();
    if let Err(diag) = db.parse(start, data) {
        eprintln!("{}", diag.render(db.sources(), &renderer));
        process::exit(1);
    }
    if cli.timing {
        println!("parse {}ms", now.elapsed().as_millis());
    }

    let now = Instant::now();
    match db.verify() {
        Ok(summary) => {
            if cli.timing {
                println!("verify {}ms", now.elapsed().as_millis());
            }
            for label in &summary.incomplete {
                let message = format!(
                    "proof of {} is incomplete and was not verified",
                    String::from_utf8_lossy(label)
                );
                eprintln!("{}", renderer.render(Level::Warning.title(&message)));
            }
            println!(
                "{} provables verified, {} incomplete",
                summary.verified,
                summary.incomplete.len()
            );
        }
        Err(failure) => {
            let message = format!(
                "verification of {} failed: {}",
                String::from_utf8_lossy(&failure.label),
                failure.diagnostic.message()
            );
            eprintln!("{}", renderer.render(Level::Error.title(&message)));
            process::exit(1);
        }
    }
}
