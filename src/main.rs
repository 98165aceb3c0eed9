use clap::Parser;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chainwatch::{
    chain::{unix_now, ChainStore},
    cli::Cli,
    recorder::EventRecorder,
    watcher::DirWatcher,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let watch_path = cli.get_watch_path();

    // Resolved so it compares equal to the absolute paths notify reports.
    let chain_file = if cli.chain_file.is_absolute() {
        cli.chain_file.clone()
    } else {
        std::env::current_dir()?.join(&cli.chain_file)
    };

    // A corrupt or tampered chain file is fatal here; the log must not
    // silently restart from empty over a questionable history.
    let store = ChainStore::open(&chain_file)?;
    tracing::info!(
        "Loaded chain from {} ({} blocks)",
        store.path().display(),
        store.len()
    );

    println!("Watching directory: {}", watch_path.display());
    println!("Press Ctrl+C to quit");

    let watcher = DirWatcher::new(&watch_path)?;
    let mut recorder = EventRecorder::new(store);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    while running.load(Ordering::SeqCst) {
        match watcher.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                // The chain file lives in the watched directory by
                // default; its own writes must not feed back into it.
                if event.path == recorder.chain_path() {
                    continue;
                }

                let now = unix_now();
                let record = event.to_record();
                match recorder.record(&event, now)? {
                    Some(block) => {
                        println!("{}: {}", record.event, record.file);
                        tracing::debug!("Appended block {} ({})", block.index, block.hash);
                    }
                    None => {
                        tracing::debug!("Skipped {}: {}", record.event, record.file);
                    }
                }
                recorder.sweep(now);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    tracing::info!(
        "Stopped; chain at {} blocks",
        recorder.store().len()
    );

    Ok(())
}
