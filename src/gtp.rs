//! Go Text Protocol (GTP) client.
//!
//! GTP is a line-oriented request/response protocol. Each request is one
//! line, optionally prefixed by a numeric id. Each response starts with `=`
//! (success) or `?` (failure), optionally followed by the echoed id, and is
//! terminated by an empty line.
//!
//! The client speaks to the engine through a [`Transport`], which is a child
//! process in production ([`ProcessTransport`]) and an in-process fake in
//! tests.
//!
//! ## Commands used
//!
//! - `boardsize <size>`, `clear_board`, `komi <value>` - game setup
//! - `play <color> <vertex>` - submit a move or a pass
//! - `genmove <color>` - ask the engine for its move
//! - `list_stones <color>` - authoritative stone positions
//! - `undo` - take back one ply
//! - `last_move` - colour and vertex of the previous move
//! - `final_score` - result after two passes
//! - `loadsgf <file>` - resume from a saved record
//! - `quit` - shut down

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

use crate::board::Color;
use crate::error::GtpError;

/// Line-level channel to an engine.
pub trait Transport: Send {
    /// Send one line; the transport appends the newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Next line without its line terminator, or `None` at end of stream.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Release the channel after `quit` has been sent.
    fn shutdown(&mut self) {}
}

/// Engine running as a child process, spoken to over its stdin/stdout.
pub struct ProcessTransport {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl ProcessTransport {
    /// Launch `program` with `args`. Stderr is discarded so the engine
    /// cannot block on a full pipe.
    pub fn spawn(program: &str, args: &[String]) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("engine stdout was not captured"))?;

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }
}

impl Transport for ProcessTransport {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        writeln!(stdin, "{line}")?;
        stdin.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();
        if self.stdout.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        let end = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(end);
        Ok(Some(buf))
    }

    fn shutdown(&mut self) {
        // Closing stdin lets engines that ignore `quit` see EOF.
        self.stdin.take();
        if let Err(e) = self.child.wait() {
            warn!(error = %e, "failed to wait for engine process");
        }
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// A parsed GTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub success: bool,
    pub id: Option<u32>,
    pub body: String,
}

/// Parse an optional numeric id from the beginning of `s`.
fn parse_id(s: &str) -> (Option<u32>, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    if end == 0 {
        return (None, s);
    }
    match s[..end].parse::<u32>() {
        Ok(id) => (Some(id), &s[end..]),
        Err(_) => (None, s),
    }
}

/// Build a response from its lines. The first line must start with a status
/// marker; later lines belong to the body verbatim.
pub fn parse_response(lines: &[String]) -> Option<Response> {
    let first = lines.first()?;
    let success = match first.chars().next()? {
        '=' => true,
        '?' => false,
        _ => return None,
    };
    let (id, rest) = parse_id(&first[1..]);

    let mut body = rest.trim().to_string();
    for line in &lines[1..] {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(line.trim_end());
    }

    Some(Response { success, id, body })
}

/// Synchronous GTP client. One request is in flight at a time: every `send`
/// waits for the full response before returning.
pub struct GtpClient {
    transport: Box<dyn Transport>,
    next_id: u32,
}

impl GtpClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: 1,
        }
    }

    /// Send a command and return the body of a successful response.
    pub fn send(&mut self, command: &str) -> Result<String, GtpError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        debug!(id, command, "gtp send");
        self.transport.write_line(&format!("{id} {command}"))?;

        let lines = self.read_response_lines()?;
        let response = parse_response(&lines).ok_or_else(|| GtpError::Malformed {
            command: command.to_string(),
            response: lines.join("\n"),
        })?;
        debug!(id, success = response.success, body = %response.body, "gtp recv");

        if let Some(got) = response.id {
            if got != id {
                return Err(GtpError::IdMismatch { expected: id, got });
            }
        }
        if !response.success {
            return Err(GtpError::Engine {
                command: command.to_string(),
                message: response.body,
            });
        }
        Ok(response.body)
    }

    /// Read one response: skip blank lines and stray output before the status
    /// marker, then collect lines until the terminating blank line.
    fn read_response_lines(&mut self) -> Result<Vec<String>, GtpError> {
        let mut lines: Vec<String> = Vec::new();
        loop {
            let line = self.transport.read_line()?.ok_or(GtpError::Disconnected)?;
            if lines.is_empty() {
                if line.trim().is_empty() {
                    continue;
                }
                if !line.starts_with('=') && !line.starts_with('?') {
                    warn!(line = %line, "ignoring unexpected engine output");
                    continue;
                }
            } else if line.trim().is_empty() {
                return Ok(lines);
            }
            lines.push(line);
        }
    }

    pub fn boardsize(&mut self, size: usize) -> Result<(), GtpError> {
        self.send(&format!("boardsize {size}")).map(drop)
    }

    pub fn clear_board(&mut self) -> Result<(), GtpError> {
        self.send("clear_board").map(drop)
    }

    pub fn komi(&mut self, komi: f64) -> Result<(), GtpError> {
        self.send(&format!("komi {komi:.1}")).map(drop)
    }

    /// Submit a move; `vertex` may be `pass`.
    pub fn play(&mut self, color: Color, vertex: &str) -> Result<(), GtpError> {
        self.send(&format!("play {} {vertex}", color.gtp_name())).map(drop)
    }

    /// Ask the engine to choose and play a move. Returns the raw vertex
    /// (`pass` and `resign` included).
    pub fn genmove(&mut self, color: Color) -> Result<String, GtpError> {
        self.send(&format!("genmove {}", color.gtp_name()))
    }

    /// Vertices of every stone of `color` on the engine's board.
    pub fn list_stones(&mut self, color: Color) -> Result<Vec<String>, GtpError> {
        let body = self.send(&format!("list_stones {}", color.gtp_name()))?;
        Ok(body.split_whitespace().map(str::to_string).collect())
    }

    pub fn undo(&mut self) -> Result<(), GtpError> {
        self.send("undo").map(drop)
    }

    /// Colour and vertex of the previous move, or `None` before any move.
    pub fn last_move(&mut self) -> Result<Option<(Color, String)>, GtpError> {
        let body = self.send("last_move")?;
        let mut parts = body.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(c), Some(v)) => match Color::from_gtp(c) {
                Some(color) => Ok(Some((color, v.to_string()))),
                None => Err(GtpError::Malformed {
                    command: "last_move".to_string(),
                    response: body,
                }),
            },
            _ => Ok(None),
        }
    }

    pub fn final_score(&mut self) -> Result<String, GtpError> {
        self.send("final_score")
    }

    /// Load a record; returns the colour to move next.
    pub fn loadsgf(&mut self, path: &str) -> Result<Color, GtpError> {
        self.load(format!("loadsgf {path}"))
    }

    /// Load a record up to the position before `move_number` (counted from
    /// 1). `1` loads the setup stones only.
    pub fn loadsgf_until(&mut self, path: &str, move_number: usize) -> Result<Color, GtpError> {
        self.load(format!("loadsgf {path} {move_number}"))
    }

    fn load(&mut self, command: String) -> Result<Color, GtpError> {
        let body = self.send(&command)?;
        Color::from_gtp(&body).ok_or(GtpError::Malformed {
            command,
            response: body,
        })
    }

    /// Send `quit` and release the transport. Errors are ignored since the
    /// engine may already be gone.
    pub fn quit(mut self) {
        if let Err(e) = self.send("quit") {
            debug!(error = %e, "quit failed");
        }
        self.transport.shutdown();
    }
}
