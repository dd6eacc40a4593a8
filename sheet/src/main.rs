use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sheet_core::{RunEvent, SheetJob, SheetRun, spawn_run};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: barcode-sheet <job.json> [output.pdf]");
        std::process::exit(2);
    }

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("barcode_sheet=info,sheet_core=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let input = &args[1];
    let txt = fs::read_to_string(input).with_context(|| format!("reading job file {input}"))?;
    let mut job = SheetJob::from_json(&txt).with_context(|| format!("parsing job file {input}"))?;
    if let Some(output) = args.get(2) {
        job.output = PathBuf::from(output);
    }
    info!(job = %input, output = %job.output.display(), count = job.count, "starting run");

    let handle = spawn_run(SheetRun::new(job))?;
    let mut last_logged = None;
    let mut outcome = None;
    for event in handle.events().iter() {
        match event {
            RunEvent::Progress(percent) => {
                // One line per ten percent is plenty on a terminal.
                let bucket = percent / 10;
                if last_logged != Some(bucket) {
                    info!("progress {percent}%");
                    last_logged = Some(bucket);
                }
            }
            RunEvent::Finished(result) => {
                outcome = Some(result);
                break;
            }
        }
    }

    match outcome {
        Some(Ok(path)) => {
            println!("{}", path.display());
            Ok(())
        }
        Some(Err(e)) => {
            eprintln!("{}: {e}", e.kind());
            std::process::exit(1);
        }
        None => anyhow::bail!("worker stopped without reporting a result"),
    }
}
