use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::session::{MAX_REPLY_LINE, MAX_REPLY_LINES, parse_reply_line};
use super::{ProbeError, ProbeFailure, ProbeOptions, ProbeOutcome, Prober, SmtpProber};

type ProbeFn = dyn Fn(&str) -> ProbeOutcome + Send + Sync;

pub(crate) struct StubProber {
    on_probe: Box<ProbeFn>,
    hang: bool,
    calls: AtomicUsize,
}

impl StubProber {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> ProbeOutcome + Send + Sync + 'static,
    {
        Self {
            on_probe: Box::new(f),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn reachable() -> Self {
        Self::new(|_| ProbeOutcome::Reachable)
    }

    pub(crate) fn unreachable() -> Self {
        Self::new(|_| ProbeOutcome::Unreachable(ProbeFailure::Refused))
    }

    /// Never answers, like an exchanger that accepts the SYN and stalls.
    pub(crate) fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::reachable()
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for StubProber {
    async fn probe(&self, host: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        (self.on_probe)(host)
    }
}

/// Accepts one connection, sends `greeting` (if any) and records every line
/// the client sends until it hangs up.
async fn spawn_mock_server(greeting: Option<&'static str>) -> (u16, JoinHandle<Vec<String>>) {
    spawn_mock_server_raw(greeting.map(|g| g.as_bytes().to_vec())).await
}

/// Same as [`spawn_mock_server`], for greetings that are not static text.
/// The client may hang up mid-write, so write errors are ignored.
async fn spawn_mock_server_raw(greeting: Option<Vec<u8>>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let (read, mut write) = stream.into_split();
        if let Some(greeting) = greeting {
            let _ = write.write_all(&greeting).await;
        }
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if line == "QUIT" {
                let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
            }
            received.push(line);
        }
        received
    });
    (port, handle)
}

fn prober_for(port: u16) -> SmtpProber {
    SmtpProber::new(ProbeOptions {
        port,
        connect_timeout_ms: 1_000,
        greeting_timeout_ms: 300,
        quit_timeout_ms: 300,
    })
}

#[tokio::test]
async fn greeting_marks_host_reachable_and_quits() {
    let (port, server) = spawn_mock_server(Some("220 mock.smtp.test ESMTP\r\n")).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Reachable);
    let received = server.await.expect("server task");
    assert_eq!(received, vec!["QUIT".to_string()]);
}

#[tokio::test]
async fn multiline_greeting_is_accepted() {
    let (port, server) = spawn_mock_server(Some("220-mock.smtp.test\r\n220 ready\r\n")).await;

    let greeting = prober_for(port)
        .handshake("127.0.0.1")
        .await
        .expect("handshake");

    assert_eq!(greeting.code, 220);
    assert_eq!(greeting.message, "mock.smtp.test\nready");
    server.await.expect("server task");
}

#[tokio::test]
async fn negative_greeting_is_rejected() {
    let (port, server) = spawn_mock_server(Some("554 5.7.1 no service here\r\n")).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(
        outcome,
        ProbeOutcome::Unreachable(ProbeFailure::Rejected { code: 554 })
    );
    // la session est quand même terminée proprement
    assert_eq!(server.await.expect("server task"), vec!["QUIT".to_string()]);
}

#[tokio::test]
async fn silent_server_times_out_within_bound() {
    let (port, server) = spawn_mock_server(None).await;

    let started = Instant::now();
    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Unreachable(ProbeFailure::Timeout));
    assert!(started.elapsed() < Duration::from_secs(3));
    // socket closed by the prober, so the server loop ends
    server.await.expect("server task");
}

#[tokio::test]
async fn garbage_greeting_is_a_protocol_error() {
    let (port, server) = spawn_mock_server(Some("hello there\r\n")).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Unreachable(ProbeFailure::Protocol));
    server.await.expect("server task");
}

#[tokio::test]
async fn inconsistent_multiline_codes_are_a_protocol_error() {
    let (port, server) = spawn_mock_server(Some("220-a\r\n250 b\r\n")).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Unreachable(ProbeFailure::Protocol));
    server.await.expect("server task");
}

#[tokio::test]
async fn oversized_greeting_line_is_cut_off() {
    // 1 MiB sans fin de ligne
    let mut greeting = b"220 ".to_vec();
    greeting.resize(1 << 20, b'x');
    let (port, _server) = spawn_mock_server_raw(Some(greeting)).await;

    let err = prober_for(port)
        .handshake("127.0.0.1")
        .await
        .expect_err("oversized greeting");

    match err {
        ProbeError::Protocol(message) => {
            assert!(message.contains(&MAX_REPLY_LINE.to_string()), "{message}")
        }
        other => panic!("expected a protocol error, got {other:?}"),
    }
}

#[tokio::test]
async fn endless_continuation_lines_are_cut_off() {
    let greeting = "220-more\r\n".repeat(MAX_REPLY_LINES + 10).into_bytes();
    let (port, _server) = spawn_mock_server_raw(Some(greeting)).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Unreachable(ProbeFailure::Protocol));
}

#[tokio::test]
async fn greeting_line_at_the_limit_is_accepted() {
    let mut greeting = b"220 ".to_vec();
    greeting.resize(MAX_REPLY_LINE - 2, b'x');
    greeting.extend_from_slice(b"\r\n");
    let (port, server) = spawn_mock_server_raw(Some(greeting)).await;

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Reachable);
    assert_eq!(server.await.expect("server task"), vec!["QUIT".to_string()]);
}

#[tokio::test]
async fn closed_port_is_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let outcome = prober_for(port).probe("127.0.0.1").await;

    assert_eq!(outcome, ProbeOutcome::Unreachable(ProbeFailure::Refused));
}

#[test]
fn parse_reply_line_splits_code_and_text() {
    let (code, continuation, text) = parse_reply_line("250-mx.example.com\r\n").expect("parse");
    assert_eq!(code, 250);
    assert!(continuation);
    assert_eq!(text, "mx.example.com");

    let (code, continuation, text) = parse_reply_line("221").expect("parse");
    assert_eq!(code, 221);
    assert!(!continuation);
    assert_eq!(text, "");
}

#[test]
fn parse_reply_line_rejects_short_or_non_numeric() {
    assert!(matches!(parse_reply_line("22"), Err(ProbeError::Protocol(_))));
    assert!(matches!(parse_reply_line("abc ok"), Err(ProbeError::Protocol(_))));
    assert!(matches!(parse_reply_line("2é0 ok"), Err(ProbeError::Protocol(_))));
}

#[test]
fn io_timeout_maps_to_timeout_failure() {
    let err = ProbeError::io(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
    assert_eq!(err.failure(), ProbeFailure::Timeout);
    let err = ProbeError::timeout("greeting", Duration::from_millis(10));
    assert_eq!(err.failure(), ProbeFailure::Timeout);
}

#[test]
fn host_lookup_errors_map_to_host_resolution() {
    let err = ProbeError::HostResolution {
        host: "mx.nowhere.test".into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
    };
    assert_eq!(err.failure(), ProbeFailure::HostResolution);

    let err = ProbeError::NoAddresses {
        host: "mx.nowhere.test".into(),
    };
    assert_eq!(err.failure(), ProbeFailure::HostResolution);
}
