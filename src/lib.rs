//! # cryptpool - bounded-concurrency file transforms
//!
//! cryptpool queues byte-rotation transform jobs ("encrypt" / "decrypt" with a
//! shared integer key) and runs them with one isolated worker per job, never
//! more workers at once than there are CPUs.
//!
//! The transform is a Caesar cipher over the byte alphabet. It is reversible
//! obfuscation, not cryptography.
//!
//! ## Quick Start
//!
//! ```bash
//! # Encrypt files in place, one child process per file
//! cryptpool run --action encrypt --key 42 notes.txt photo.jpg
//!
//! # Decrypt into another directory using in-process workers
//! cryptpool run -a decrypt -k 42 --isolation thread -o restored/ notes.txt
//!
//! # One file, no pool
//! cryptpool transform notes.txt notes.enc encrypt 42
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use cryptpool::key::StaticKey;
//! use cryptpool::pool::{Orchestrator, ThreadIsolation};
//! use cryptpool::task::{Action, Task};
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let workers = ThreadIsolation::new(Arc::new(StaticKey::new("42")));
//! let mut orchestrator = Orchestrator::new(Arc::new(workers));
//! orchestrator.submit(Task::in_place(1, "notes.txt", Action::Encrypt)?);
//!
//! let report = orchestrator.run().await;
//! assert!(report.is_drained());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod key;
pub mod pool;
pub mod task;

pub use cli::{Cli, Output};
pub use config::CryptpoolConfig;

/// Result type alias for cryptpool commands
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
