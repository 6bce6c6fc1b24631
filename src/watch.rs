//! File watcher: runs `check` on startup, then re-runs on source changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, CheckOptions, Project};
use crate::config::Config;
use crate::diagnostics;
use crate::error;

/// Debounce delay between filesystem events and re-check.
const DEBOUNCE_MS: u64 = 100;

/// Paths to watch: the docs tree recursively, and the directories holding the
/// config, contract, and models file. Nested paths are folded into the
/// recursive watch that covers them.
fn collect_watch_paths(project: &Project, config: &Config) -> BTreeMap<PathBuf, RecursiveMode> {
    let mut paths = BTreeMap::new();
    paths.insert(config.docs_dir.clone(), RecursiveMode::Recursive);

    let files = [
        config.config_path.clone().or_else(|| return Some(project.root.join(".docdrift.toml"))),
        config.contract.clone(),
        config.drift.models_file.clone(),
    ];
    for file in files.into_iter().flatten() {
        let Some(parent) = file.parent().map(Path::to_path_buf) else {
            continue;
        };
        if parent.starts_with(&config.docs_dir) {
            continue;
        }
        paths.entry(parent).or_insert(RecursiveMode::NonRecursive);
    }
    return paths;
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Watch { reason: e.to_string() };
    });
}

/// Entry point for the watch command.
///
/// Runs an initial check, then watches the docs, config, and contract and
/// re-checks on changes. The config is re-read on every run.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(project: &Project, options: CheckOptions) -> Result<ExitCode, error::Error> {
    eprintln!("watch: initial check");
    let mut last_code = run_check(project, options);

    let config = project.load_config()?;
    let watch_paths = collect_watch_paths(project, &config);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    for (path, mode) in &watch_paths {
        if path.exists()
            && let Err(e) = watcher.watch(path, *mode)
        {
            tracing::warn!(path = %path.display(), error = %e, "cannot watch path");
        }
    }

    let path_count = watch_paths.len();
    eprintln!("watch: monitoring {path_count} paths, press Ctrl+C to stop");

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-checking...");
        last_code = run_check(project, options);
    }

    return Ok(last_code);
}

/// Run check once and print result. Returns the exit code from check.
fn run_check(project: &Project, options: CheckOptions) -> ExitCode {
    return match commands::check(project, options) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2_u8)
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watches_docs_recursively_and_contract_dir_flat() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".docdrift.toml"),
            "docs_dir = \"docs\"\ncontract = \"api/openapi.yaml\"\n",
        )
        .unwrap();
        let project = Project { config: None, root: dir.path().to_path_buf() };
        let config = project.load_config().unwrap();

        let paths = collect_watch_paths(&project, &config);
        assert_eq!(paths.get(&dir.path().join("docs")), Some(&RecursiveMode::Recursive));
        assert_eq!(paths.get(&dir.path().join("api")), Some(&RecursiveMode::NonRecursive));
        assert_eq!(paths.get(dir.path()), Some(&RecursiveMode::NonRecursive));
        assert_eq!(paths.len(), 3);
    }
}
