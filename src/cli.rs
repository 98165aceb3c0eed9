use std::path::PathBuf;
use clap::Parser;

#[derive(Parser)]
#[command(name = "chainwatch")]
#[command(version = "0.1.0")]
#[command(about = "Watches a directory and records file changes in a tamper-evident hash chain")]
#[command(long_about = "Chainwatch monitors a single directory (non-recursive) and appends every \
qualifying file change to an append-only hash chain on disk. Each block links to the previous \
one by SHA-256 digest, so retroactive edits to the log are detectable.")]
pub struct Cli {
    /// Directory to watch for changes
    #[arg(value_name = "PATH", help = "Path to watch (defaults to current directory)")]
    pub path: Option<PathBuf>,

    /// Where the chain is persisted
    #[arg(long, default_value = "blockchain.json", help = "Chain file location")]
    pub chain_file: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    pub fn get_watch_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }

    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        let path = self.get_watch_path();

        if !path.exists() {
            return Err(format!("Path does not exist: {}", path.display()));
        }

        if !path.is_dir() {
            return Err(format!("Path is not a directory: {}", path.display()));
        }

        Ok(())
    }
}
