//! Pool run command
//!
//! Queues one task per path and drains the queue on the worker pool.

use crate::cli::Output;
use crate::config::{CryptpoolConfig, IsolationKind, Settings, WORKER_KEY_VAR};
use crate::key::KeyProvider;
use crate::pool::{self, Isolation, Orchestrator, ProcessIsolation, RunReport, ThreadIsolation};
use crate::task::{Action, Task};
use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args)]
pub struct RunArgs {
    /// Files to transform
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Transform direction
    #[arg(short, long, value_enum)]
    pub action: Action,

    /// Write results into DIR instead of rewriting files in place
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Worker isolation strategy
    #[arg(long, value_enum)]
    pub isolation: Option<IsolationKind>,

    /// Maximum concurrent workers (0 = one per CPU)
    #[arg(short = 'j', long)]
    pub max_workers: Option<usize>,

    /// Key material, overriding configuration
    #[arg(short, long, allow_hyphen_values = true)]
    pub key: Option<String>,
}

/// `worker_flags` are the global flags each process worker is started with.
pub async fn execute(
    args: RunArgs,
    config_path: Option<&str>,
    worker_flags: &[String],
    output: &Output,
) -> Result<()> {
    let mut settings = CryptpoolConfig::load_with_custom_config(config_path)?.settings()?;
    if let Some(key) = args.key.clone() {
        settings.key = Some(key);
    }
    if let Some(isolation) = args.isolation {
        settings.isolation = isolation;
    }
    if let Some(max_workers) = args.max_workers {
        settings.max_workers = max_workers;
    }

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let isolation = build_isolation(&settings, worker_flags)?;
    let capacity = pool::resolve_capacity(settings.max_workers);
    let mut orchestrator = Orchestrator::new(isolation).with_capacity(capacity);

    let mut targets = HashSet::new();
    for (index, path) in args.paths.iter().enumerate() {
        let target = target_path(path, args.output_dir.as_deref())?;
        if !targets.insert(normalized_target(&target)) {
            bail!(
                "{} is targeted more than once; concurrent tasks must write distinct files",
                target.display()
            );
        }

        let task = Task::open(index as u64 + 1, path, target, args.action)
            .with_context(|| format!("Cannot queue {}", path.display()))?;
        orchestrator.submit(task);
    }

    output.verbose(&format!(
        "Queued {} task(s) for {} {} worker(s)",
        orchestrator.pending(),
        capacity,
        orchestrator.isolation()
    ));

    let report = orchestrator.run().await;
    print_report(&report, args.action, output);

    if report.is_success() {
        return Ok(());
    }
    let summary = format!(
        "{} of {} task(s) did not complete",
        report.total() - report.succeeded(),
        report.total()
    );
    if settings.fail_on_task_error {
        bail!(summary);
    }
    output.warning(&format!("{summary} (fail_on_task_error = false)"));
    Ok(())
}

fn build_isolation(settings: &Settings, worker_flags: &[String]) -> Result<Arc<dyn Isolation>> {
    match settings.isolation {
        IsolationKind::Thread => {
            let keys: Arc<dyn KeyProvider> = Arc::from(settings.key_provider());
            Ok(Arc::new(ThreadIsolation::new(keys)))
        }
        IsolationKind::Process => {
            let mut workers = ProcessIsolation::current_exe()
                .context("Cannot locate the cryptpool executable for process workers")?;
            for flag in worker_flags {
                workers = workers.arg(flag);
            }
            // Children load configuration themselves. A resolved key is passed
            // verbatim so figment never reinterprets it.
            if let Some(key) = &settings.key {
                workers = workers.env(WORKER_KEY_VAR, key);
            }
            Ok(Arc::new(workers))
        }
    }
}

fn target_path(path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    match output_dir {
        None => Ok(path.to_path_buf()),
        Some(dir) => {
            let name = path
                .file_name()
                .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
            Ok(dir.join(name))
        }
    }
}

/// Resolve `target` through its parent directory so aliases such as
/// `a.bin` and `./a.bin` compare equal. The file itself may not exist yet.
fn normalized_target(target: &Path) -> PathBuf {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    // An unresolvable directory is left as given; opening the task reports it
    let dir = std::fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
    match target.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    }
}

fn print_report(report: &RunReport, action: Action, output: &Output) {
    if report.is_success() {
        output.success(&format!(
            "{} {} file(s) with up to {} worker(s)",
            match action {
                Action::Encrypt => "Encrypted",
                Action::Decrypt => "Decrypted",
            },
            report.succeeded(),
            report.capacity
        ));
        return;
    }

    for record in report.problems() {
        let detail = record.detail.as_deref().unwrap_or("unknown failure");
        output.action_result(&record.id.to_string(), detail, false);
    }
    output.category("Summary");
    output.summary_stats("Succeeded:", report.succeeded());
    output.summary_stats("Failed:", report.failed());
    output.summary_stats("Dropped:", report.dropped());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_path_in_place_and_redirected() {
        let path = Path::new("data/report.bin");
        assert_eq!(target_path(path, None).unwrap(), PathBuf::from("data/report.bin"));
        assert_eq!(
            target_path(path, Some(Path::new("out"))).unwrap(),
            PathBuf::from("out/report.bin")
        );
        assert!(target_path(Path::new("/"), Some(Path::new("out"))).is_err());
    }

    #[test]
    fn test_normalized_target_folds_aliases() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let plain = normalized_target(&dir.path().join("a.bin"));
        assert_eq!(plain, normalized_target(&dir.path().join(".").join("a.bin")));
        assert_eq!(plain, normalized_target(&dir.path().join("sub/../a.bin")));
        assert_ne!(plain, normalized_target(&dir.path().join("sub/a.bin")));
    }
}
