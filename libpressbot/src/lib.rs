//! Pressbot - reposts sales announcements from monitored Bluesky accounts
//!
//! This library holds the scan loop and its pieces: a durable, bounded record
//! of posts already evaluated, a keyword classifier, the directory of
//! monitored accounts, and the client interface to the social network.

pub mod classifier;
pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod scan;
pub mod seen;
pub mod types;

// Re-export commonly used types
pub use classifier::{is_match, KeywordClassifier};
pub use config::{Config, ScanPolicy};
pub use directory::AccountDirectory;
pub use error::{PressbotError, Result};
pub use scan::{run_once, RunOptions, Scanner};
pub use seen::{SeenSet, SeenStore};
pub use types::{Account, PostRecord, ScanReport};
