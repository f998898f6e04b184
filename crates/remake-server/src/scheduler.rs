//! Client advancement: the scheduler proper.

use std::io::Write;

use tracing::debug;

use remake_proto::{REPLY_FAILED, REPLY_OK};

use crate::client::{Client, ClientKind};
use crate::{Server, Status};

/// What happened when a job was created for a target.
pub(crate) enum StartOutcome {
    /// No rule covers the target; it has been marked failed.
    NoRule,
    /// The job's script is running (or already failed synchronously).
    Started,
    /// The rule has static deps; the returned dependency client must run
    /// before the current one, and the script starts when it completes.
    Deferred(Client),
}

impl Server {
    /// Whether a new job may start. A job blocked on a recursive request
    /// does not count against the cap, which keeps a script's nested
    /// `remake` call from deadlocking on its own parent's slot.
    pub(crate) fn has_free_slots(&self) -> bool {
        self.max_active_jobs <= 0 || self.running_jobs - self.waiting_jobs < self.max_active_jobs
    }

    /// Advance clients from the front of the queue while free slots exist:
    /// - drop running targets that have settled,
    /// - start as many pending targets as the budget allows,
    /// - complete a client once nothing is pending or running, or as soon
    ///   as any of its targets fails.
    pub(crate) fn update_clients(&mut self) {
        debug!(clients = self.clients.len(), "updating clients");
        let mut i = 0;
        'clients: while i < self.clients.len() && self.has_free_slots() {
            debug!(job_id = ?self.clients[i].job_id(), "handling client");

            // Remove running targets that have finished.
            let running: Vec<String> = self.clients[i].running.iter().cloned().collect();
            for target in running {
                match self.status.get(&target).copied() {
                    Some(Status::Uptodate(_) | Status::Remade) => {
                        self.clients[i].running.remove(&target);
                    }
                    Some(Status::Running) => {}
                    Some(Status::Failed) => {
                        self.fail_client(i);
                        continue 'clients;
                    }
                    // A running target never regresses to Todo, and it was
                    // given a status when its job started.
                    Some(Status::Todo) | None => debug_assert!(false, "running target regressed"),
                }
            }

            // Start pending targets.
            while let Some(target) = self.clients[i].pending.pop_front() {
                match self.status_of(&target) {
                    Status::Failed => {
                        self.fail_client(i);
                        continue 'clients;
                    }
                    Status::Running => {
                        self.clients[i].running.insert(target);
                    }
                    Status::Uptodate(_) | Status::Remade => {}
                    Status::Todo => {
                        match self.start(&target) {
                            StartOutcome::NoRule => {
                                self.fail_client(i);
                                continue 'clients;
                            }
                            StartOutcome::Started => {
                                self.clients[i].running.insert(target);
                            }
                            StartOutcome::Deferred(dep_client) => {
                                // The dependency client goes directly in
                                // front of the requester and is drained
                                // next, so deps are built depth-first.
                                self.clients.insert(i, dep_client);
                                self.clients[i + 1].running.insert(target);
                            }
                        }
                        if !self.has_free_slots() {
                            return;
                        }
                    }
                }
            }

            // Complete the request once nothing is left running. (For a
            // dependency client this is what starts the delayed script.)
            if self.clients[i].running.is_empty() {
                if let Some(client) = self.clients.remove(i) {
                    self.complete_request(client, true);
                }
            } else {
                i += 1;
            }
        }
    }

    /// The failure join: complete the client at `i` unsuccessfully and
    /// drop it from the queue.
    fn fail_client(&mut self, i: usize) {
        if let Some(client) = self.clients.remove(i) {
            self.complete_request(client, false);
        }
    }

    /// Create a job for `target` according to the loaded rules, marking
    /// every target of the matched rule as running and resetting its
    /// recorded deps to the rule's static list.
    pub(crate) fn start(&mut self, target: &str) -> StartOutcome {
        debug!(job_id = self.job_counter, target, "starting job");
        let Some(rule) = self.rules.find(target) else {
            self.status.insert(target.to_string(), Status::Failed);
            eprintln!("No rule for building {target}");
            return StartOutcome::NoRule;
        };
        for t in &rule.targets {
            self.status.insert(t.clone(), Status::Running);
            // The script is about to re-run, so dynamic discoveries from
            // previous runs no longer hold.
            self.deps.replace(t, rule.deps.iter().cloned());
        }
        let job_id = self.job_counter;
        self.job_counter += 1;
        self.job_targets.insert(job_id, rule.targets.clone());
        if rule.deps.is_empty() {
            self.run_script(job_id, &rule);
            StartOutcome::Started
        } else {
            StartOutcome::Deferred(Client::dep(job_id, rule))
        }
    }

    /// Send the reply for a finished client and release it.
    pub(crate) fn complete_request(&mut self, client: Client, success: bool) {
        debug!(job_id = ?client.job_id(), success, "completing request");
        match client.kind {
            ClientKind::Dep { rule, job_id } => {
                if success {
                    self.run_script(job_id, &rule);
                } else {
                    self.complete_job(job_id, false);
                }
            }
            ClientKind::Real { mut stream, .. } => {
                let reply = if success { REPLY_OK } else { REPLY_FAILED };
                if let Err(e) = stream.write_all(&[reply]) {
                    debug!(error = %e, "failed to send reply");
                }
                self.waiting_jobs -= 1;
            }
            ClientKind::Seed => {
                if !success {
                    self.build_failure = true;
                }
            }
        }
    }
}
