//! remake wire protocol definitions
//!
//! A script that wants more targets built connects to the server's unix
//! socket and sends one request:
//!
//! ```text
//! [job id: 4 bytes, native byte order]
//! [target name, NUL][target name, NUL]…[NUL]
//! ```
//!
//! The trailing empty name terminates the list. The server replies with a
//! single byte once every requested target has settled: `1` for success,
//! `0` for failure. Both halves of the protocol live here so the server
//! endpoint and the client-mode relay cannot drift apart.

/// Environment variable holding the server socket path; its presence puts
/// the binary in client mode, and the server injects it into every script.
pub const SOCKET_ENV: &str = "REMAKE_SOCKET";

/// Environment variable holding the job id of the enclosing script.
pub const JOB_ID_ENV: &str = "REMAKE_JOB_ID";

/// Job id sent by a client that was not spawned by any job.
pub const NO_JOB_ID: i32 = -1;

/// Reply byte for a request whose targets all settled successfully.
pub const REPLY_OK: u8 = 1;

/// Reply byte for a failed request.
pub const REPLY_FAILED: u8 = 0;

/// Encode a full request frame: job id followed by the target list.
pub fn encode_request(job_id: i32, targets: &[String]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + targets.iter().map(|t| t.len() + 1).sum::<usize>() + 1);
    buf.extend_from_slice(&job_id.to_ne_bytes());
    for target in targets {
        buf.extend_from_slice(target.as_bytes());
        buf.push(0);
    }
    buf.push(0);
    buf
}

/// Decode the leading job id field.
pub fn decode_job_id(bytes: [u8; 4]) -> i32 {
    i32::from_ne_bytes(bytes)
}

/// Whether a buffered target list has received its empty-name terminator.
pub fn targets_complete(buf: &[u8]) -> bool {
    buf.len() >= 2 && buf.ends_with(&[0, 0])
}

/// Decode a complete target list. Parsing stops at the empty name; any
/// trailing bytes are ignored.
pub fn decode_targets(buf: &[u8]) -> Vec<String> {
    let mut targets = Vec::new();
    for part in buf.split(|&b| b == 0) {
        if part.is_empty() {
            break;
        }
        targets.push(String::from_utf8_lossy(part).into_owned());
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_round_trip() {
        let targets = vec!["a".to_string(), "dir/b.o".to_string()];
        let frame = encode_request(7, &targets);

        let job_id = decode_job_id(frame[..4].try_into().unwrap());
        assert_eq!(job_id, 7);

        let body = &frame[4..];
        assert!(targets_complete(body));
        assert_eq!(decode_targets(body), targets);
    }

    #[test]
    fn negative_job_id_round_trips() {
        let frame = encode_request(NO_JOB_ID, &[]);
        assert_eq!(decode_job_id(frame[..4].try_into().unwrap()), NO_JOB_ID);
    }

    #[test]
    fn partial_list_is_not_complete() {
        assert!(!targets_complete(b"a\0"));
        assert!(!targets_complete(b"a\0partial"));
        assert!(!targets_complete(b"\0"));
        assert!(targets_complete(b"a\0\0"));
    }

    #[test]
    fn decode_stops_at_empty_name() {
        assert_eq!(decode_targets(b"a\0b\0\0junk\0"), ["a", "b"]);
    }
}
