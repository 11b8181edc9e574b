//! Process worker entry point
//!
//! `cryptpool run` with process isolation starts one child per task as
//! `cryptpool worker <TICKET>`. The child takes its key from
//! `CRYPTPOOL_WORKER_KEY` when the parent set it, otherwise from its own
//! configuration. It reopens the files named in the ticket and reports only
//! through its exit status.

use crate::config::{CryptpoolConfig, WORKER_KEY_VAR};
use crate::key::{EnvKey, KeyProvider};
use crate::pool::isolation::run_ticket;
use anyhow::Result;
use clap::Args;
use std::panic::{self, AssertUnwindSafe};

#[derive(Args)]
pub struct WorkerArgs {
    /// Encoded task ticket
    pub ticket: String,
}

pub fn execute(args: WorkerArgs, config_path: Option<&str>) -> Result<()> {
    let settings = CryptpoolConfig::load_with_custom_config(config_path)?.settings()?;
    // A key resolved by the parent wins over this process's own configuration
    let keys: Box<dyn KeyProvider> = if std::env::var_os(WORKER_KEY_VAR).is_some() {
        Box::new(EnvKey::new(WORKER_KEY_VAR))
    } else {
        settings.key_provider()
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_ticket(&args.ticket, keys.as_ref())));
    match outcome {
        Ok(Ok(_)) => Ok(()),
        // run_ticket already logged the cause
        Ok(Err(_)) => std::process::exit(1),
        Err(_) => {
            tracing::error!("Worker panicked executing ticket '{}'", args.ticket);
            std::process::exit(1)
        }
    }
}
