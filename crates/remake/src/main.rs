//! remake - a build tool bridging the gap between make and redo
//!
//! One binary, two behaviors:
//!
//! - If `REMAKE_SOCKET` is present in the environment, the process was
//!   spawned from a build script: it relays its targets to the server over
//!   the socket and exits with the server's verdict.
//! - Otherwise it becomes the server: it loads `Remakefile` and the
//!   `.remake` dependency database, then drives the command-line targets
//!   to completion.

use camino::Utf8PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing_subscriber::EnvFilter;

use remake_proto::{JOB_ID_ENV, NO_JOB_ID, REPLY_OK, SOCKET_ENV, encode_request};
use remake_server::Server;

#[derive(Debug)]
struct Args {
    /// Print lots of debugging information.
    debug: bool,

    /// Maximum number of parallel jobs; non-positive means unbounded.
    jobs: i32,

    /// Targets to bring up to date.
    targets: Vec<String>,
}

fn usage(exit_status: i32) -> ! {
    eprintln!(
        "Usage: remake [options] [target] ...\n\
         Options\n\
         \x20 -d                 Print lots of debugging information.\n\
         \x20 -h, --help         Print this message and exit.\n\
         \x20 -j[N], --jobs=[N]  Allow N jobs at once; infinite jobs with no arg."
    );
    std::process::exit(exit_status);
}

impl Args {
    fn parse() -> Self {
        let mut args = Self {
            debug: false,
            jobs: 1,
            targets: Vec::new(),
        };
        for arg in std::env::args().skip(1) {
            if arg.is_empty() {
                usage(1);
            }
            if arg == "-h" || arg == "--help" {
                usage(0);
            }
            if arg == "-d" {
                args.debug = true;
            } else if let Some(n) = arg.strip_prefix("--jobs=") {
                args.jobs = n.parse().unwrap_or(0);
            } else if let Some(n) = arg.strip_prefix("-j") {
                args.jobs = n.parse().unwrap_or(0);
            } else if arg.starts_with('-') {
                usage(1);
            } else {
                args.targets.push(arg);
            }
        }
        args
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("remake=debug,remake_server=debug,remake_rules=debug,remake_db=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    // Run as client if a server socket is present in the environment.
    if let Ok(socket) = std::env::var(SOCKET_ENV) {
        client_mode(&socket, args.targets).await;
    } else {
        server_mode(args).await;
    }
}

/// Connect to the server, send a build request for `targets`, and exit
/// with the verdict from the reply byte.
async fn client_mode(socket: &str, targets: Vec<String>) {
    if targets.is_empty() {
        std::process::exit(0);
    }
    tracing::debug!(socket, ?targets, "relaying build request");
    match relay_request(socket, &targets).await {
        Ok(success) => std::process::exit(if success { 0 } else { 1 }),
        Err(e) => {
            eprintln!("Failed to send targets to server: {e}");
            std::process::exit(1);
        }
    }
}

async fn relay_request(socket: &str, targets: &[String]) -> std::io::Result<bool> {
    let job_id = std::env::var(JOB_ID_ENV)
        .ok()
        .and_then(|id| id.parse().ok())
        .unwrap_or(NO_JOB_ID);
    let mut stream = UnixStream::connect(socket).await?;
    stream.write_all(&encode_request(job_id, targets)).await?;
    let mut reply = [0u8; 1];
    stream.read_exact(&mut reply).await?;
    Ok(reply[0] == REPLY_OK)
}

async fn server_mode(args: Args) {
    let cwd = std::env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::try_from(dir).ok());
    let Some(cwd) = cwd else {
        eprintln!("Failed to determine working directory");
        std::process::exit(1);
    };

    let server = match Server::new(cwd, args.jobs) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };
    match server.run(args.targets).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
