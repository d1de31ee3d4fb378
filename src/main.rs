//! Wiring Lab - circuit-wiring sandbox
//!
//! # Usage
//!
//! ```bash
//! wiring-lab                                 # interactive console, bundled lab
//! wiring-lab --catalog my_lab.json --state-dir .lab
//! wiring-lab --script session.txt --seed 7   # run commands without a terminal UI
//! ```

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use wiring_lab::console::{render_status, run_console, ConsoleApp};
use wiring_lab::LabConfig;

/// Circuit-wiring sandbox with answer-key checking
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Catalog JSON file (defaults to the bundled blink-and-button lab)
    #[arg(long, value_name = "CATALOG_FILE")]
    catalog: Option<PathBuf>,

    /// Directory where board state is saved between sessions
    #[arg(long, value_name = "DIR")]
    state_dir: Option<PathBuf>,

    /// Simulation tick period in milliseconds
    #[arg(long)]
    period_ms: Option<u64>,

    /// Seed for the simulated input levels
    #[arg(long)]
    seed: Option<u64>,

    /// Run commands from a file ("-" for stdin) instead of the console UI
    #[arg(long, value_name = "SCRIPT")]
    script: Option<PathBuf>,
}

impl Args {
    fn lab_config(&self) -> wiring_lab::Result<LabConfig> {
        let mut config = match &self.config {
            Some(path) => LabConfig::from_json_file(path)?,
            None => LabConfig::default(),
        };
        if let Some(catalog) = &self.catalog {
            config.catalog_path = Some(catalog.clone());
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir = Some(dir.clone());
        }
        if let Some(period) = self.period_ms {
            config.tick_period_ms = period;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        Ok(config)
    }
}

fn run_script(app: &mut ConsoleApp, reader: impl BufRead) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        println!("> {}", line.trim());
        println!("{}", app.execute_line(&line));
        if !app.is_running() {
            break;
        }
    }
    println!("{}", render_status(app.sandbox()));
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.lab_config()?;
    let sandbox = config.build_sandbox()?;

    match &args.script {
        Some(path) => {
            let mut app = ConsoleApp::new(sandbox, config.console.clone());
            if path.as_os_str() == "-" {
                run_script(&mut app, io::stdin().lock())?;
            } else {
                let file = std::fs::File::open(path)?;
                run_script(&mut app, io::BufReader::new(file))?;
            }
        }
        None => run_console(sandbox, config.console.clone())?,
    }

    Ok(())
}
