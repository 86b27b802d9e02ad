use std::io::{self, BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

use super::error::ProbeError;
use super::types::{ProbeStage, SmtpEvent, SmtpReply};

/// Longest accepted reply line, CRLF included.
pub(crate) const MAX_LINE_LEN: usize = 8192;
/// Most lines accepted in one multi-line reply.
pub(crate) const MAX_REPLY_LINES: usize = 128;

/// A plain-text SMTP connection plus the transcript of everything exchanged
/// on it.
pub(crate) struct SmtpSession {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
    timeout: Option<Duration>,
    transcript: Vec<SmtpEvent>,
}

impl SmtpSession {
    /// Connects to the first reachable address. All attempts share a single
    /// deadline so a multi-homed host cannot stretch the timeout.
    pub(crate) fn connect(
        host: &str,
        addrs: &[SocketAddr],
        timeout: Option<Duration>,
    ) -> Result<(Self, SocketAddr), ProbeError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut last_err = None;
        for addr in addrs {
            let attempt = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        last_err = Some(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "connect deadline exceeded",
                        ));
                        break;
                    }
                    TcpStream::connect_timeout(addr, remaining)
                }
                None => TcpStream::connect(addr),
            };
            match attempt.and_then(|stream| Self::from_stream(stream, timeout)) {
                Ok(session) => return Ok((session, *addr)),
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        Err(ProbeError::Connect {
            host: host.to_string(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no socket address available",
                )
            }),
        })
    }

    fn from_stream(stream: TcpStream, timeout: Option<Duration>) -> io::Result<Self> {
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self {
            stream,
            reader,
            timeout,
            transcript: Vec::new(),
        })
    }

    /// Reads the unsolicited 220 banner.
    pub(crate) fn read_greeting(&mut self) -> Result<SmtpReply, ProbeError> {
        self.receive(ProbeStage::Greeting)
    }

    /// Sends `command` and waits for its reply.
    pub(crate) fn command(
        &mut self,
        stage: ProbeStage,
        command: &str,
    ) -> Result<SmtpReply, ProbeError> {
        self.transcript.push(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        debug!(%stage, command, "sending");
        if let Err(err) = self.write_line(command) {
            return Err(self.fail(stage, err));
        }
        self.receive(stage)
    }

    /// Best-effort `QUIT`, then closes both directions. When the transport is
    /// already broken the reply is not awaited.
    pub(crate) fn quit(&mut self, wait_for_reply: bool) {
        const QUIT_CMD: &str = "QUIT";
        self.transcript.push(SmtpEvent::Sent {
            stage: ProbeStage::Quit,
            command: QUIT_CMD.to_string(),
        });
        if let Err(err) = self.write_line(QUIT_CMD) {
            self.fail(ProbeStage::Quit, err);
        } else if wait_for_reply {
            // a missing reply to QUIT changes nothing
            let _ = self.receive(ProbeStage::Quit);
        }
        let _ = self.stream.shutdown(Shutdown::Both);
    }

    pub(crate) fn into_transcript(self) -> Vec<SmtpEvent> {
        self.transcript
    }

    /// The whole reply, continuation lines included, must arrive within one
    /// timeout.
    fn receive(&mut self, stage: ProbeStage) -> Result<SmtpReply, ProbeError> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        match self.read_reply(deadline) {
            Ok(reply) => {
                debug!(%stage, code = reply.code, "received");
                self.transcript.push(SmtpEvent::Received {
                    stage,
                    reply: reply.clone(),
                });
                Ok(reply)
            }
            Err(err) => Err(self.fail(stage, err)),
        }
    }

    fn fail(&mut self, stage: ProbeStage, err: io::Error) -> ProbeError {
        self.transcript.push(SmtpEvent::Error {
            stage,
            message: err.to_string(),
        });
        ProbeError::io(stage, err)
    }

    fn write_line(&mut self, command: &str) -> io::Result<()> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        self.stream.write_all(&line)?;
        self.stream.flush()
    }

    fn read_reply(&mut self, deadline: Option<Instant>) -> io::Result<SmtpReply> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            if message_lines.len() == MAX_REPLY_LINES {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("SMTP reply exceeds {MAX_REPLY_LINES} lines"),
                ));
            }
            let bytes = self.read_line(deadline)?;
            if bytes.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by server",
                ));
            }
            let raw = String::from_utf8_lossy(&bytes);
            let (line_code, continuation, text) = parse_reply_line(&raw)?;
            match code {
                Some(existing) if existing != line_code => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("inconsistent SMTP reply codes: {existing} vs {line_code}"),
                    ));
                }
                Some(_) => {}
                None => code = Some(line_code),
            }
            message_lines.push(text.to_string());
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "SMTP reply missing status code")
            })?,
            message: message_lines.join("\n"),
        })
    }

    /// Reads up to and including the next `\n`. An empty buffer means EOF.
    fn read_line(&mut self, deadline: Option<Instant>) -> io::Result<Vec<u8>> {
        let mut line = Vec::new();
        loop {
            self.arm_read_timeout(deadline)?;
            let available = self.reader.fill_buf()?;
            if available.is_empty() {
                return Ok(line);
            }
            let (used, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(end) => (end + 1, true),
                None => (available.len(), false),
            };
            line.extend_from_slice(&available[..used]);
            self.reader.consume(used);
            if line.len() > MAX_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("SMTP reply line exceeds {MAX_LINE_LEN} bytes"),
                ));
            }
            if complete {
                return Ok(line);
            }
        }
    }

    fn arm_read_timeout(&self, deadline: Option<Instant>) -> io::Result<()> {
        let Some(deadline) = deadline else {
            return Ok(());
        };
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "SMTP reply deadline exceeded",
            ));
        }
        self.stream.set_read_timeout(Some(remaining))
    }
}

/// Splits one reply line into `(code, is_continuation, text)`.
fn parse_reply_line(raw: &str) -> io::Result<(u16, bool, &str)> {
    let line = raw.trim_end_matches(['\r', '\n']);
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid SMTP reply: '{line}'"),
        )
    };
    let code_part = line.get(..3).ok_or_else(invalid)?;
    if !code_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let code = code_part.parse::<u16>().map_err(|_| invalid())?;
    let rest = &line[3..];
    let continuation = rest.starts_with('-');
    if !(rest.is_empty() || continuation || rest.starts_with(' ')) {
        return Err(invalid());
    }
    let text = rest.get(1..).unwrap_or("");
    Ok((code, continuation, text))
}

pub(crate) fn resolve_socket_addrs(host: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeError> {
    (host, port)
        .to_socket_addrs()
        .map(|iter| iter.collect())
        .map_err(|source| ProbeError::Resolve {
            host: host.to_string(),
            source,
        })
}
