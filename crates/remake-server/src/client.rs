//! Build clients: the contexts waiting for targets to settle.

use std::collections::{HashSet, VecDeque};
use std::os::unix::net::UnixStream;

use remake_rules::Rule;

/// A client waiting for a set of targets to finish.
///
/// Real clients are remake processes spawned by running scripts, attached
/// to a socket. The server also creates synthetic clients: seeds for the
/// command-line targets (and the rule-file rebuild), and dependency clients
/// that drive a rule's static deps to completion before its script runs.
pub(crate) struct Client {
    pub kind: ClientKind,
    /// Targets not yet inspected, drained in order.
    pub pending: VecDeque<String>,
    /// Targets this client is blocked on.
    pub running: HashSet<String>,
}

pub(crate) enum ClientKind {
    /// Created by the server for command-line targets or the rule-file
    /// rebuild. Failure sets the overall build failure flag.
    Seed,
    /// A script's recursive request; owes a reply byte on the socket.
    Real { stream: UnixStream, job_id: i32 },
    /// Emulates a `remake` call for a rule's static deps; the held rule's
    /// script starts once they settle.
    Dep { rule: Rule, job_id: i32 },
}

impl Client {
    pub fn seed(targets: Vec<String>) -> Self {
        Self {
            kind: ClientKind::Seed,
            pending: targets.into(),
            running: HashSet::new(),
        }
    }

    pub fn real(stream: UnixStream, job_id: i32, targets: Vec<String>) -> Self {
        Self {
            kind: ClientKind::Real { stream, job_id },
            pending: targets.into(),
            running: HashSet::new(),
        }
    }

    pub fn dep(job_id: i32, rule: Rule) -> Self {
        Self {
            pending: rule.deps.iter().cloned().collect(),
            kind: ClientKind::Dep { rule, job_id },
            running: HashSet::new(),
        }
    }

    pub fn job_id(&self) -> Option<i32> {
        match self.kind {
            ClientKind::Seed => None,
            ClientKind::Real { job_id, .. } | ClientKind::Dep { job_id, .. } => Some(job_id),
        }
    }
}
