//! remake-server: the in-process build scheduler
//!
//! The server owns the whole build:
//! - maintains the dependency graph and per-target status,
//! - matches rules for obsolete targets and instantiates them,
//! - forks shell jobs under a bounded parallelism budget,
//! - listens on a unix socket for recursive requests from running scripts,
//! - advances a queue of clients (real or synthetic) until every requested
//!   target has settled.
//!
//! Everything lives in one `Server` value owned by the caller; no global
//! state. The event loop is a single task: parallelism comes from child
//! processes only, and child exits reach the loop through a channel fed by
//! per-child wait tasks, so scheduler state is never touched concurrently.

mod client;
mod endpoint;
mod scheduler;
mod status;
mod supervisor;


use std::collections::{HashMap, HashSet, VecDeque};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use thiserror::Error;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tracing::debug;

use remake_db::{DbError, DepDb};
use remake_rules::{RuleSet, RulesError};

pub use status::Status;

use client::Client;
use supervisor::JobExit;

/// Name of the rule file, relative to the build root.
pub const RULE_FILE: &str = "Remakefile";

/// Name of the dependency database, relative to the build root.
pub const DB_FILE: &str = ".remake";

/// Errors that abort the server before or between build phases
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Failed to create server: {0}")]
    Socket(std::io::Error),

    #[error("Failed to create server: socket path is not valid UTF-8")]
    SocketPath,
}

/// The build server. One per run, owned by `main`.
pub struct Server {
    /// Directory containing the rule file; scripts run here and target
    /// paths are resolved against it. Target names themselves are opaque:
    /// `f` and `./f` are distinct targets.
    root: Utf8PathBuf,

    /// Loaded rules, replaced wholesale if the rule file rebuilds itself.
    rules: RuleSet,

    /// Known dependencies, persisted across runs.
    deps: DepDb,

    /// Memoized per-target status for this run.
    status: HashMap<String, Status>,

    /// Targets currently being inspected, for cycle detection.
    checking: HashSet<String>,

    /// Pending build contexts. New clients go to the front so that the
    /// build is depth-first; only seeds are appended at the back.
    clients: VecDeque<Client>,

    /// Targets being built by each live job.
    job_targets: HashMap<i32, Vec<String>>,

    /// Allocator for dense job ids.
    job_counter: i32,

    /// Jobs with a live child process.
    running_jobs: i32,

    /// Jobs blocked on a recursive build request.
    waiting_jobs: i32,

    /// Parallelism cap; zero or negative means unbounded.
    max_active_jobs: i32,

    /// Whether any seed client failed.
    build_failure: bool,

    /// Request endpoint.
    listener: UnixListener,

    /// Socket path handed to scripts through the environment.
    socket_path: Utf8PathBuf,

    /// Holds the socket's directory; dropping it removes the socket.
    _socket_dir: TempDir,

    /// Child-exit notifications from the per-job wait tasks.
    exit_tx: mpsc::UnboundedSender<JobExit>,
    exit_rx: mpsc::UnboundedReceiver<JobExit>,
}

impl Server {
    /// Load the database and rules from `root` and open the request socket.
    ///
    /// Must be called within a tokio runtime (the listener registers with
    /// the reactor).
    pub fn new(root: Utf8PathBuf, max_active_jobs: i32) -> Result<Self, ServerError> {
        let deps = DepDb::load(&root.join(DB_FILE));
        let rules = RuleSet::load(&root.join(RULE_FILE))?;

        let socket_dir = tempfile::Builder::new()
            .prefix("rmk-")
            .tempdir()
            .map_err(ServerError::Socket)?;
        let socket_path = Utf8PathBuf::try_from(socket_dir.path().join("socket"))
            .map_err(|_| ServerError::SocketPath)?;
        let listener = UnixListener::bind(&socket_path).map_err(ServerError::Socket)?;
        debug!(socket = %socket_path, "server listening");

        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        let mut server = Self {
            root,
            rules,
            deps,
            status: HashMap::new(),
            checking: HashSet::new(),
            clients: VecDeque::new(),
            job_targets: HashMap::new(),
            job_counter: 0,
            running_jobs: 0,
            waiting_jobs: 0,
            max_active_jobs,
            build_failure: false,
            listener,
            socket_path,
            _socket_dir: socket_dir,
            exit_tx,
            exit_rx,
        };
        server.register_static_deps();
        Ok(server)
    }

    /// Union the static deps of every non-generic rule into the dependency
    /// map, so declared dependencies influence freshness before any script
    /// runs. Cumulative with records loaded from the database.
    fn register_static_deps(&mut self) {
        for rule in self.rules.rules() {
            if rule.generic {
                continue;
            }
            for target in &rule.targets {
                for dep in &rule.deps {
                    self.deps.record(target, dep);
                }
            }
        }
    }

    /// Run the build for `targets` to completion and persist the database.
    ///
    /// If the rule file itself is obsolete under the loaded graph, it is
    /// rebuilt first and the rules reloaded; the user's targets are only
    /// seeded once that succeeds. Returns whether the build succeeded.
    pub async fn run(mut self, targets: Vec<String>) -> Result<bool, ServerError> {
        if self.status_of(RULE_FILE) == Status::Todo {
            debug!("rule file is obsolete, rebuilding it first");
            self.clients
                .push_back(Client::seed(vec![RULE_FILE.to_string()]));
            self.server_loop().await;
            if !self.build_failure {
                self.rules = RuleSet::load(&self.root.join(RULE_FILE))?;
                self.register_static_deps();
            }
        }

        if !self.build_failure {
            self.clients.push_back(Client::seed(targets));
            self.server_loop().await;
        }

        self.deps.save(&self.root.join(DB_FILE))?;
        Ok(!self.build_failure)
    }

    /// Loop until all the jobs have finished.
    async fn server_loop(&mut self) {
        enum Wakeup {
            Connection(tokio::net::UnixStream),
            Exit(JobExit),
        }

        loop {
            self.update_clients();
            if self.running_jobs == 0 {
                debug_assert!(self.clients.is_empty());
                break;
            }

            debug!("waiting for events");
            let wakeup = tokio::select! {
                conn = self.listener.accept() => match conn {
                    Ok((stream, _addr)) => Some(Wakeup::Connection(stream)),
                    Err(e) => {
                        debug!(error = %e, "accept failed");
                        None
                    }
                },
                exit = self.exit_rx.recv() => exit.map(Wakeup::Exit),
            };

            match wakeup {
                Some(Wakeup::Connection(stream)) => self.accept_client(stream).await,
                Some(Wakeup::Exit(exit)) => {
                    self.finalize_job(exit);
                    // Drain every exit that is already queued before going
                    // back to the scheduler.
                    while let Ok(exit) = self.exit_rx.try_recv() {
                        self.finalize_job(exit);
                    }
                }
                None => {}
            }
        }
    }

    fn finalize_job(&mut self, exit: JobExit) {
        self.running_jobs -= 1;
        self.complete_job(exit.job_id, exit.success);
    }

    /// Resolve a target name against the build root for filesystem access.
    fn target_path(&self, target: &str) -> Utf8PathBuf {
        self.root.join(target)
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        &self.root
    }
}
