//! Regenerate when canonical sources change.
//!
//! The watcher polls modification times of `.rulesync/**`, `.rulesyncignore`
//! and `rulesync.toml`. Changes are debounced so a burst of saves produces one
//! run, and a run in progress is never interrupted: changes seen meanwhile
//! schedule exactly one follow-up run.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use walkdir::WalkDir;

use crate::config::CONFIG_FILE_NAME;
use crate::source::{IGNORE_FILE, RULESYNC_DIR};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    /// Quiet period required after the last change before regenerating.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Debounce and re-entrancy state, driven by explicit instants.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_change: Option<Instant>,
    running: bool,
    follow_up: bool,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_change: None,
            running: false,
            follow_up: false,
        }
    }

    pub fn on_change(&mut self, now: Instant) {
        if self.running {
            self.follow_up = true;
        } else {
            self.last_change = Some(now);
        }
    }

    /// Whether a run should start now.
    pub fn ready(&self, now: Instant) -> bool {
        !self.running
            && self
                .last_change
                .is_some_and(|at| now.saturating_duration_since(at) >= self.window)
    }

    /// Enter the running state. Returns `false` if a run is already active.
    pub fn begin(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_change = None;
        true
    }

    pub fn finish(&mut self, now: Instant) {
        self.running = false;
        if std::mem::take(&mut self.follow_up) {
            self.last_change = Some(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Modification times of every watched file.
pub type Snapshot = BTreeMap<PathBuf, SystemTime>;

pub fn snapshot(project_root: &Path) -> Result<Snapshot> {
    let mut out = Snapshot::new();

    let dir = project_root.join(RULESYNC_DIR);
    if dir.is_dir() {
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
            if entry.file_type().is_file() {
                let modified = entry
                    .metadata()
                    .with_context(|| format!("Failed to stat {}", entry.path().display()))?
                    .modified()?;
                out.insert(entry.into_path(), modified);
            }
        }
    }

    for file in [IGNORE_FILE, CONFIG_FILE_NAME] {
        let path = project_root.join(file);
        if let Ok(metadata) = std::fs::metadata(&path)
            && let Ok(modified) = metadata.modified()
        {
            out.insert(path, modified);
        }
    }

    Ok(out)
}

/// Poll until `should_stop` returns true, calling `regenerate` after each
/// debounced burst of changes. Returns the number of runs.
///
/// A failing run is logged and watching continues.
pub fn watch<F, S>(
    project_root: &Path,
    options: WatchOptions,
    mut regenerate: F,
    mut should_stop: S,
) -> Result<usize>
where
    F: FnMut() -> Result<()>,
    S: FnMut() -> bool,
{
    let mut debouncer = Debouncer::new(options.debounce);
    let mut last = snapshot(project_root)?;
    let mut runs = 0;

    while !should_stop() {
        let now = Instant::now();
        let current = snapshot(project_root)?;
        if current != last {
            tracing::debug!(files = current.len(), "change detected");
            debouncer.on_change(now);
            last = current;
        }

        if debouncer.ready(now) && debouncer.begin() {
            if let Err(e) = regenerate() {
                tracing::error!(error = %e, "regeneration failed");
            }
            runs += 1;
            debouncer.finish(Instant::now());
        }

        std::thread::sleep(options.poll_interval);
    }

    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs;
    use tempfile::TempDir;

    const WINDOW: Duration = Duration::from_millis(300);

    #[test]
    fn test_debounce_waits_for_quiet_period() {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.on_change(start);
        d.on_change(start + Duration::from_millis(200));

        assert!(!d.ready(start + Duration::from_millis(400)));
        assert!(d.ready(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_changes_during_run_schedule_one_follow_up() {
        let start = Instant::now();
        let mut d = Debouncer::new(WINDOW);
        d.on_change(start);
        assert!(d.begin());
        assert!(!d.begin());

        d.on_change(start + Duration::from_millis(10));
        d.on_change(start + Duration::from_millis(20));
        assert!(!d.ready(start + Duration::from_secs(5)));

        let done = start + Duration::from_millis(50);
        d.finish(done);
        assert!(d.ready(done + WINDOW));
        assert!(d.begin());
        d.finish(done + WINDOW);
        assert!(!d.ready(done + WINDOW * 10));
    }

    #[test]
    fn test_no_change_never_ready() {
        let d = Debouncer::new(WINDOW);
        assert!(!d.ready(Instant::now() + Duration::from_secs(60)));
        assert!(!d.is_running());
    }

    #[test]
    fn test_snapshot_tracks_sources() {
        let temp_dir = TempDir::new().unwrap();
        assert!(snapshot(temp_dir.path()).unwrap().is_empty());

        fs::write_text(&temp_dir.path().join(".rulesync/rules/a.md"), "x").unwrap();
        fs::write_text(&temp_dir.path().join(IGNORE_FILE), "dist/").unwrap();
        fs::write_text(&temp_dir.path().join("unrelated.md"), "x").unwrap();

        let snap = snapshot(temp_dir.path()).unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn test_watch_stops_without_runs() {
        let temp_dir = TempDir::new().unwrap();
        let mut polls = 0;
        let options = WatchOptions {
            poll_interval: Duration::from_millis(1),
            debounce: WINDOW,
        };
        let runs = watch(
            temp_dir.path(),
            options,
            || Ok(()),
            || {
                polls += 1;
                polls > 3
            },
        )
        .unwrap();
        assert_eq!(runs, 0);
    }
}
