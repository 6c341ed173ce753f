//! Gnusto CLI: wires a demo [`Blueprint`] into a runnable [`Engine`] and
//! drives it one turn at a time over a real terminal (or, with `--script`, a
//! replayed command file), mirroring `bins/jitosd`'s `clap` + `tracing`
//! process-entry-point shape.
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gnusto_core::{demo, EndReason, IoBoundary, ScriptedIo, Snapshot, TerminalIo};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// `tracing` verbosity for process-level diagnostics.
    #[clap(long, default_value = "info")]
    log_level: Level,

    /// Seed for the engine's deterministic RNG.
    #[clap(long, default_value_t = 0)]
    seed: u64,

    /// Path to a snapshot JSON file to restore from before the first turn.
    #[clap(long)]
    restore: Option<PathBuf>,

    /// Path to a newline-delimited command file to replay instead of reading
    /// from the terminal.
    #[clap(long)]
    script: Option<PathBuf>,

    /// Where to write a snapshot after every turn, so a later run can
    /// `--restore` from it.
    #[clap(long, default_value = "gnusto-autosave.json")]
    autosave: PathBuf,
}

fn build_io(script: Option<&PathBuf>) -> Result<Box<dyn IoBoundary>> {
    match script {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading script file {}", path.display()))?;
            let lines: Vec<String> = contents.lines().map(str::to_string).collect();
            Ok(Box::new(ScriptedIo::new(lines)))
        }
        None => Ok(Box::new(TerminalIo::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt().with_max_level(args.log_level).init();

    let mut engine = demo::lamp_and_chest_world().with_rng_seed(args.seed).build();
    info!(title = %engine.title(), release = %engine.release(), "starting gnusto");

    if let Some(path) = &args.restore {
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading snapshot {}", path.display()))?;
        let snapshot = Snapshot::from_json(&json).context("parsing snapshot")?;
        engine.restore(snapshot).context("restoring snapshot")?;
        info!(path = %path.display(), "restored from snapshot");
    }

    let mut io = build_io(args.script.as_ref())?;

    loop {
        let outcome = engine.run_turn(io.as_mut());

        let snapshot = engine.snapshot();
        if let Ok(json) = snapshot.to_json() {
            if let Err(err) = fs::write(&args.autosave, json) {
                warn!(%err, path = %args.autosave.display(), "autosave failed");
            }
        }

        if let Some(reason) = outcome.ended {
            info!(?reason, turn = engine.turn(), "session ended");
            if matches!(reason, EndReason::Death) {
                std::process::exit(1);
            }
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::build_io;
    use gnusto_core::demo;

    /// Exercises the `--script` path end to end: a real file on disk, read
    /// through [`build_io`], replayed against the demo world exactly as
    /// `main` would.
    #[test]
    fn script_file_replays_as_scripted_commands() {
        let mut path = std::env::temp_dir();
        path.push("gnusto-cli-smoke-test-script.txt");
        std::fs::write(&path, "take lamp\nlook\n").expect("temp dir is writable");

        let mut io = build_io(Some(&path)).expect("script file reads back");
        let mut engine = demo::lamp_and_chest_world().build();
        engine.run_turn(io.as_mut());
        engine.run_turn(io.as_mut());

        let _ = std::fs::remove_file(&path);
    }
}
