//! The request endpoint: recursive build requests from running scripts.

use tokio::io::AsyncReadExt;
use tokio::net::UnixStream;
use tracing::debug;

use remake_proto::{decode_job_id, decode_targets, targets_complete};

use crate::{Client, Server};

impl Server {
    /// Read a build request from a freshly accepted connection, record its
    /// targets as dynamic dependencies of the requesting job, and enqueue
    /// the connection as a client at the front of the queue.
    ///
    /// An ill-formed message only discards this connection; the server
    /// keeps running.
    pub(crate) async fn accept_client(&mut self, stream: UnixStream) {
        debug!("handling client request");
        if let Err(e) = self.read_request(stream).await {
            debug!(error = %e, "bad client request");
            eprintln!("Received an ill-formed client message");
        }
    }

    async fn read_request(&mut self, mut stream: UnixStream) -> std::io::Result<()> {
        let mut id_buf = [0u8; 4];
        stream.read_exact(&mut id_buf).await?;
        let job_id = decode_job_id(id_buf);
        if !self.job_targets.contains_key(&job_id) {
            return Err(std::io::Error::other(format!("unknown job id {job_id}")));
        }
        debug!(job_id, "receiving request");

        // Buffer until the empty-name terminator arrives.
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !targets_complete(&buf) {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(std::io::ErrorKind::UnexpectedEof.into());
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let targets = decode_targets(&buf);
        debug!(job_id, ?targets, "request received");

        // Each requested target becomes a dynamic dependency of every
        // target the requesting job is building.
        let job_targets = self.job_targets[&job_id].clone();
        for target in &targets {
            for job_target in &job_targets {
                self.deps.record(job_target, target);
            }
        }

        // The reply is written from the scheduler, which is synchronous;
        // hand the connection over as a blocking stream.
        let stream = stream.into_std()?;
        stream.set_nonblocking(false)?;
        self.clients.push_front(Client::real(stream, job_id, targets));
        self.waiting_jobs += 1;
        Ok(())
    }
}
