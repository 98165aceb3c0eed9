pub mod chain;
pub mod cli;
pub mod events;
pub mod filter;
pub mod recorder;
pub mod watcher;

pub use chain::*;
pub use events::*;
pub use filter::*;
pub use recorder::*;
pub use watcher::*;
