use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time;
use tracing::trace;

use super::error::ProbeError;
use super::types::SmtpReply;

/// RFC 5321 §4.5.3.1.5: a reply line is at most 512 octets, CRLF included.
pub(crate) const MAX_REPLY_LINE: usize = 512;
/// Continuation lines accepted for one reply.
pub(crate) const MAX_REPLY_LINES: usize = 64;

/// One TCP connection to an exchanger. Dropping it closes the socket.
pub(crate) struct SmtpSession {
    stream: BufReader<TcpStream>,
}

impl SmtpSession {
    /// Tries `addrs` in order and keeps the first connection that succeeds.
    pub(crate) async fn connect(
        addrs: &[SocketAddr],
        connect_timeout: Duration,
    ) -> Result<(Self, SocketAddr), ProbeError> {
        let mut last_err = None;
        for addr in addrs {
            match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
                Ok(Ok(stream)) => {
                    let session = Self {
                        stream: BufReader::new(stream),
                    };
                    return Ok((session, *addr));
                }
                Ok(Err(source)) => last_err = Some(ProbeError::Connect { addr: *addr, source }),
                Err(_) => last_err = Some(ProbeError::timeout("connect", connect_timeout)),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ProbeError::io(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            ))
        }))
    }

    pub(crate) async fn send_command(&mut self, command: &str) -> Result<(), ProbeError> {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        let stream = self.stream.get_mut();
        stream.write_all(&line).await.map_err(ProbeError::io)?;
        stream.flush().await.map_err(ProbeError::io)
    }

    pub(crate) async fn read_reply(
        &mut self,
        stage: &'static str,
        limit: Duration,
    ) -> Result<SmtpReply, ProbeError> {
        time::timeout(limit, self.read_reply_unbounded())
            .await
            .map_err(|_| ProbeError::timeout(stage, limit))?
    }

    /// Sends `QUIT`, waits up to `limit` for the answer, then shuts the socket
    /// down. Failures are only traced: the session is over either way.
    pub(crate) async fn quit(mut self, limit: Duration) {
        let outcome = time::timeout(limit, async {
            self.send_command("QUIT").await?;
            self.read_reply_unbounded().await
        })
        .await;
        match outcome {
            Ok(Ok(reply)) => trace!(code = reply.code, "QUIT acknowledged"),
            Ok(Err(err)) => trace!(error = %err, "QUIT failed"),
            Err(_) => trace!("QUIT reply timed out"),
        }
        let _ = time::timeout(limit, self.stream.get_mut().shutdown()).await;
    }

    async fn read_reply_unbounded(&mut self) -> Result<SmtpReply, ProbeError> {
        let mut code = None;
        let mut message_lines = Vec::new();
        loop {
            if message_lines.len() == MAX_REPLY_LINES {
                return Err(ProbeError::protocol(format!(
                    "SMTP reply longer than {MAX_REPLY_LINES} lines"
                )));
            }
            let mut raw = Vec::new();
            let bytes = (&mut self.stream)
                .take(MAX_REPLY_LINE as u64)
                .read_until(b'\n', &mut raw)
                .await
                .map_err(ProbeError::io)?;
            if bytes == MAX_REPLY_LINE && !raw.ends_with(b"\n") {
                return Err(ProbeError::protocol(format!(
                    "SMTP reply line exceeds {MAX_REPLY_LINE} octets"
                )));
            }
            if bytes == 0 {
                return Err(ProbeError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed while reading reply",
                )));
            }
            let line = String::from_utf8_lossy(&raw);
            let (parsed_code, continuation, text) = parse_reply_line(&line)?;
            if let Some(existing) = code {
                if existing != parsed_code {
                    return Err(ProbeError::protocol(format!(
                        "inconsistent SMTP reply codes: {existing} vs {parsed_code}"
                    )));
                }
            } else {
                code = Some(parsed_code);
            }
            message_lines.push(text);
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.ok_or_else(|| ProbeError::protocol("SMTP reply missing status code"))?,
            message: message_lines.join("\n"),
        })
    }
}

/// Parses one reply line into `(code, is_continuation, text)`.
pub(crate) fn parse_reply_line(raw: &str) -> Result<(u16, bool, String), ProbeError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    let code_part = line
        .get(..3)
        .ok_or_else(|| ProbeError::protocol(format!("invalid SMTP reply: '{line}'")))?;
    if !code_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProbeError::protocol(format!(
            "invalid SMTP status code: '{code_part}'"
        )));
    }
    let code = code_part
        .parse::<u16>()
        .map_err(|_| ProbeError::protocol(format!("invalid SMTP status code: '{code_part}'")))?;
    let continuation = line.as_bytes().get(3).copied() == Some(b'-');
    let text = line.get(4..).unwrap_or_default().to_string();
    Ok((code, continuation, text))
}
