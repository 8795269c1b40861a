// Control Channel: JSON IPC client for the running player process.
// Lazily connects, never blocks past a short deadline, and treats a missing
// or broken connection as "command ignored" rather than an error — the
// process is usually still starting up or already tearing down.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[cfg(unix)]
type Transport = std::os::unix::net::UnixStream;
#[cfg(windows)]
type Transport = std::fs::File;

const IO_TIMEOUT: Duration = Duration::from_millis(100);
const QUERY_DEADLINE: Duration = Duration::from_millis(250);

pub struct ControlChannel {
    endpoint: PathBuf,
    conn: Option<BufReader<Transport>>,
    next_request_id: u64,
}

impl ControlChannel {
    /// Does not connect yet: the player creates the endpoint some time
    /// after spawn, so the first send/query attempts the connection.
    pub fn new(endpoint: PathBuf) -> Self {
        Self {
            endpoint,
            conn: None,
            next_request_id: 1,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    #[cfg(unix)]
    fn try_connect(&mut self) {
        if self.conn.is_some() {
            return;
        }
        match Transport::connect(&self.endpoint) {
            Ok(stream) => {
                let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
                let _ = stream.set_write_timeout(Some(IO_TIMEOUT));
                debug!(endpoint = %self.endpoint.display(), "control channel connected");
                self.conn = Some(BufReader::new(stream));
            }
            Err(e) => {
                trace!("control channel not ready yet: {}", e);
            }
        }
    }

    #[cfg(windows)]
    fn try_connect(&mut self) {
        if self.conn.is_some() {
            return;
        }
        match std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.endpoint)
        {
            Ok(pipe) => {
                debug!(endpoint = %self.endpoint.display(), "control channel connected");
                self.conn = Some(BufReader::new(pipe));
            }
            Err(e) => {
                trace!("control channel not ready yet: {}", e);
            }
        }
    }

    /// Fire-and-forget write of one protocol line. Dropped silently when
    /// the channel is not connected; no queueing, no retry.
    pub fn send_raw(&mut self, line: &str) {
        self.try_connect();
        let Some(conn) = self.conn.as_mut() else {
            trace!("dropping command, channel not connected: {}", line);
            return;
        };
        let stream = conn.get_mut();
        if stream
            .write_all(line.as_bytes())
            .and_then(|_| stream.write_all(b"\n"))
            .is_err()
        {
            debug!("control channel write failed, disconnecting");
            self.conn = None;
        }
    }

    /// Send a command array, e.g. `["cycle", "pause"]`.
    pub fn send_command(&mut self, args: Value) {
        self.send_raw(&json!({ "command": args }).to_string());
    }

    /// Query one property, matching the response by request id and skipping
    /// interleaved event lines. Any failure or timeout yields None.
    pub fn query_property(&mut self, name: &str) -> Option<Value> {
        self.try_connect();
        self.conn.as_ref()?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.send_raw(
            &json!({ "command": ["get_property", name], "request_id": request_id }).to_string(),
        );

        let deadline = Instant::now() + QUERY_DEADLINE;
        let mut line = String::new();
        while Instant::now() < deadline {
            line.clear();
            let read = self.conn.as_mut()?.read_line(&mut line);
            match read {
                Ok(0) => {
                    debug!("control channel closed by player");
                    self.conn = None;
                    return None;
                }
                Ok(_) => {}
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return None;
                }
                Err(e) => {
                    debug!("control channel read failed, disconnecting: {}", e);
                    self.conn = None;
                    return None;
                }
            }

            let Ok(msg) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if msg.get("event").is_some() {
                continue;
            }
            if msg.get("request_id").and_then(Value::as_u64) != Some(request_id) {
                continue;
            }
            if msg.get("error").and_then(Value::as_str) == Some("success") {
                return msg.get("data").cloned();
            }
            return None;
        }
        None
    }

    /// Query a property expected to be numeric (position, duration).
    pub fn query_f64(&mut self, name: &str) -> Option<f64> {
        self.query_property(name).and_then(|v| v.as_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconnected_channel_absorbs_everything() {
        let mut channel = ControlChannel::new(PathBuf::from("/nonexistent/cadenza-test.sock"));

        channel.send_command(json!(["cycle", "pause"]));
        channel.send_raw(r#"{"command":["quit"]}"#);
        assert_eq!(channel.query_property("time-pos"), None);
        assert!(!channel.is_connected());
    }

    #[cfg(unix)]
    #[test]
    fn commands_arrive_in_order() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut lines = Vec::new();
            for _ in 0..3 {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                lines.push(line);
            }
            lines
        });

        let mut channel = ControlChannel::new(path);
        channel.send_command(json!(["cycle", "pause"]));
        channel.send_command(json!(["add", "volume", 5]));
        channel.send_command(json!(["seek", 5.0, "relative"]));

        let lines = server.join().unwrap();
        assert!(lines[0].contains("cycle"));
        assert!(lines[1].contains("volume"));
        assert!(lines[2].contains("seek"));
    }

    #[cfg(unix)]
    #[test]
    fn query_skips_events_and_matches_request_id() {
        use std::os::unix::net::UnixListener;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpv.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut writer = stream.try_clone().unwrap();
            let mut reader = BufReader::new(stream);

            // noise the real player emits between responses
            writer
                .write_all(b"{\"event\":\"property-change\"}\n")
                .unwrap();

            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            let id = request["request_id"].as_u64().unwrap();

            let reply = json!({ "data": 123.5, "error": "success", "request_id": id });
            writer
                .write_all(format!("{}\n", reply).as_bytes())
                .unwrap();
        });

        let mut channel = ControlChannel::new(path);
        assert_eq!(channel.query_f64("time-pos"), Some(123.5));
        server.join().unwrap();
    }
}
