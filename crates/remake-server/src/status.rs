//! Per-target status and the freshness fixpoint.

use std::time::SystemTime;

use tracing::debug;

use crate::Server;

/// Build status of a target.
///
/// Within one run, transitions are confined to
/// `{Todo, Uptodate} → Running → {Remade, Failed}`; an `Uptodate` verdict
/// only changes if a rule covering the target re-runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Up-to-date, with the modification time observed at first inspection.
    Uptodate(SystemTime),
    /// Missing or obsolete.
    Todo,
    /// Being rebuilt by a job.
    Running,
    /// Successfully rebuilt during this run.
    Remade,
    /// Build failed.
    Failed,
}

impl Server {
    /// Compute and memoize the status of `target`:
    /// - if the file does not exist, the target is obsolete,
    /// - if any recorded dependency is obsolete or younger than the file,
    ///   it is obsolete,
    /// - otherwise it is up-to-date.
    ///
    /// The verdict is a fixpoint over the recorded dependency graph and is
    /// never recomputed within a run; in particular it is NOT invalidated
    /// when the rule file rebuilds itself and the rules are reloaded.
    pub(crate) fn status_of(&mut self, target: &str) -> Status {
        if let Some(status) = self.status.get(target) {
            return *status;
        }
        if !self.checking.insert(target.to_string()) {
            eprintln!("Dependency cycle detected involving {target}");
            self.status.insert(target.to_string(), Status::Failed);
            return Status::Failed;
        }
        debug!(target, "checking status");
        let computed = self.compute_status(target);
        self.checking.remove(target);
        // The cycle path above may have recorded a verdict already.
        let status = *self.status.entry(target.to_string()).or_insert(computed);
        debug!(target, ?status, "status computed");
        status
    }

    fn compute_status(&mut self, target: &str) -> Status {
        let Ok(metadata) = std::fs::metadata(self.target_path(target)) else {
            return Status::Todo;
        };
        let Ok(mtime) = metadata.modified() else {
            return Status::Todo;
        };
        let recorded: Vec<String> = self
            .deps
            .deps_of(target)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default();
        for dep in recorded {
            match self.status_of(&dep) {
                Status::Uptodate(dep_mtime) if dep_mtime <= mtime => {}
                _ => return Status::Todo,
            }
        }
        Status::Uptodate(mtime)
    }
}
