//! Shell job supervision.
//!
//! One job is one execution of a rule's script, expected to produce the
//! rule's entire target list. Each spawned child is awaited by a small
//! task that reports `(job_id, success)` back to the event loop over the
//! exit channel; all bookkeeping happens there, never concurrently with
//! the scheduler.

use tokio::process::Command;
use tracing::debug;

use remake_rules::Rule;

use crate::Server;

/// A reaped child, as seen by the event loop.
pub(crate) struct JobExit {
    pub job_id: i32,
    pub success: bool,
}

impl Server {
    /// Execute the script from `rule` as job `job_id`.
    ///
    /// The script runs under `/bin/sh -e`, so it aborts on the first
    /// failing command. Positional parameters are the instantiated target
    /// names. A spawn failure completes the job as failed on the spot; the
    /// owning client observes the `Failed` status at its next harvest.
    pub(crate) fn run_script(&mut self, job_id: i32, rule: &Rule) {
        debug!(job_id, targets = ?rule.targets, "starting script");
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-e")
            .arg("-c")
            .arg(&rule.script)
            .arg("remake-shell")
            .args(&rule.targets)
            .current_dir(self.root())
            .env(remake_proto::JOB_ID_ENV, job_id.to_string())
            .env(remake_proto::SOCKET_ENV, self.socket_path.as_str());

        match cmd.spawn() {
            Ok(mut child) => {
                debug!(job_id, pid = child.id(), "script running");
                self.running_jobs += 1;
                let exit_tx = self.exit_tx.clone();
                tokio::spawn(async move {
                    let success = matches!(child.wait().await, Ok(status) if status.success());
                    let _ = exit_tx.send(JobExit { job_id, success });
                });
            }
            Err(e) => {
                debug!(job_id, error = %e, "failed to spawn script");
                self.complete_job(job_id, false);
            }
        }
    }

    /// Record the outcome of a job on every target it was building. Failed
    /// targets are unlinked so a half-written file is never mistaken for an
    /// up-to-date one.
    pub(crate) fn complete_job(&mut self, job_id: i32, success: bool) {
        debug!(job_id, success, "completing job");
        let Some(targets) = self.job_targets.remove(&job_id) else {
            debug!(job_id, "completion for unknown job ignored");
            return;
        };
        if success {
            for target in &targets {
                self.status.insert(target.clone(), crate::Status::Remade);
            }
        } else {
            let mut message = String::from("Failed to build");
            for target in &targets {
                self.status.insert(target.clone(), crate::Status::Failed);
                message.push(' ');
                message.push_str(target);
                let _ = std::fs::remove_file(self.target_path(target));
            }
            eprintln!("{message}");
        }
    }
}
