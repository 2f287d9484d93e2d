//! Loopback tests driving the TCP channel against a scripted server.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use postwire_smtp::{ChannelConfig, Client, Error, LineChannel, ReplyBuffer, ReplyCode, TcpChannel};

const TIMEOUT: Option<Duration> = Some(Duration::from_secs(5));

/// One scripted server step: the line expected from the client and the raw
/// bytes written back (may be empty).
type Step = (&'static str, &'static str);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("postwire_smtp=trace")
        .with_test_writer()
        .try_init();
}

/// Accepts one connection, writes `greeting`, then answers each line with
/// the scripted response. Returns every line received.
async fn spawn_server(greeting: &'static str, steps: Vec<Step>) -> (u16, JoinHandle<Vec<String>>) {
    let steps = steps
        .into_iter()
        .map(|(expected, response)| (expected, response, Duration::ZERO))
        .collect();
    spawn_slow_server(greeting, steps).await
}

/// Like [`spawn_server`], but each response is held back for the given delay.
/// Stops quietly once the client hangs up.
async fn spawn_slow_server(
    greeting: &'static str,
    steps: Vec<(&'static str, &'static str, Duration)>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = socket.into_split();
        let mut reader = BufReader::new(reader);
        writer.write_all(greeting.as_bytes()).await.unwrap();

        let mut received = Vec::new();
        for (expected, response, delay) in steps {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim_end_matches(['\r', '\n']).to_string();
            assert_eq!(line, expected);
            received.push(line);

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if writer.write_all(response.as_bytes()).await.is_err() {
                break;
            }
        }
        received
    });

    (port, handle)
}

fn client(port: u16) -> Client<TcpChannel> {
    let config = ChannelConfig::builder("127.0.0.1").port(port).build();
    Client::new(TcpChannel::new(config))
}

#[tokio::test]
async fn test_full_transaction() {
    init_tracing();
    let (port, server) = spawn_server(
        "220 mx.test.com ESMTP\r\n",
        vec![
            ("EHLO foo", "250-mx.test.com\r\n250-8BITMIME\r\n250-SIZE 1000\r\n250 AUTH PLAIN LOGIN\r\n"),
            ("AUTH PLAIN AGZvbwBiYXI=", "235 2.7.0 Authentication successful\r\n"),
            ("MAIL FROM:<foo@bar.com>", "250 ok\r\n"),
            ("RCPT TO:<baz@bar.com>", "250 ok\r\n"),
            ("DATA", "354 go ahead\r\n"),
            ("Subject: hi", ""),
            ("", ""),
            ("..hidden", ""),
            (".", "250 queued\r\n"),
            ("QUIT", "221 bye\r\n"),
        ],
    )
    .await;

    let mut client = client(port);
    assert_eq!(client.connect(TIMEOUT).await.unwrap(), ReplyCode::SERVICE_READY);
    assert_eq!(client.greet(Some("foo"), TIMEOUT).await.unwrap(), ReplyCode::OK);
    assert!(client.has_extension("8BITMIME"));
    assert_eq!(client.data_size_limit(), 1000);
    assert_eq!(client.auth_mechanisms(), ["PLAIN", "LOGIN"]);

    client.auth_plain("foo", "bar", TIMEOUT).await.unwrap();
    client.mail("foo@bar.com", false, TIMEOUT).await.unwrap();
    client.rcpt("baz@bar.com", TIMEOUT).await.unwrap();
    client
        .data("Subject: hi\n\n.hidden", Some(22), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(client.quit(TIMEOUT).await.unwrap(), ReplyCode::CLOSING);
    client.close().await.unwrap();
    assert!(!client.channel().is_connected());

    let received = server.await.unwrap();
    assert_eq!(received.len(), 10);
}

#[tokio::test]
async fn test_multiline_error_over_tcp() {
    init_tracing();
    let (port, server) = spawn_server(
        "220 mx.test.com ESMTP\r\n",
        vec![("QUIT", "500-foo    bar\r\n500 fin\r\n")],
    )
    .await;

    let mut client = client(port);
    client.connect(TIMEOUT).await.unwrap();
    let err = client.quit(TIMEOUT).await.unwrap_err();
    assert_eq!(err.reply().unwrap().message(), "foo bar fin");
    assert_eq!(err.reply().unwrap().code, ReplyCode::SYNTAX_ERROR);

    server.await.unwrap();
}

#[tokio::test]
async fn test_greeting_rejected() {
    let (port, server) = spawn_server("554 no service\r\n", vec![]).await;

    let mut client = client(port);
    let err = client.connect(TIMEOUT).await.unwrap_err();
    assert_eq!(err.reply().unwrap().message(), "no service");

    server.await.unwrap();
}

#[tokio::test]
async fn test_channel_collects_reply_lines() {
    let (port, server) = spawn_server(
        "220-mx.test.com\r\n220 ready\r\n",
        vec![("NOOP", "250 ok\r\n")],
    )
    .await;

    let config = ChannelConfig::builder("127.0.0.1").port(port).build();
    let mut channel = TcpChannel::new(config);

    let mut greeting = ReplyBuffer::new();
    assert_eq!(channel.connect(&mut greeting).await.unwrap(), ReplyCode::SERVICE_READY);
    assert_eq!(greeting.lines(), ["220-mx.test.com", "220 ready"]);

    let mut reply = ReplyBuffer::new();
    assert_eq!(channel.write("NOOP\r\n", &mut reply).await.unwrap(), ReplyCode::OK);
    assert!(reply.is_complete());

    channel.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_connection_closed_mid_reply() {
    let (port, server) = spawn_server(
        "220 mx.test.com ESMTP\r\n",
        vec![("NOOP", "250-partial\r\n")],
    )
    .await;

    let mut client = client(port);
    client.connect(TIMEOUT).await.unwrap();
    let err = client.noop(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));

    server.await.unwrap();
}

#[tokio::test]
async fn test_connect_twice_is_invalid() {
    let (port, server) = spawn_server("220 ready\r\n", vec![]).await;

    let mut client = client(port);
    client.connect(TIMEOUT).await.unwrap();
    let err = client.connect(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    client.close().await.unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_greet_timeout_does_not_fall_back_to_helo() {
    init_tracing();
    let (port, server) = spawn_slow_server(
        "220 mx.test.com ESMTP\r\n",
        vec![
            ("EHLO foo", "250-mx.test.com\r\n250 8BITMIME\r\n", Duration::from_millis(300)),
            ("HELO foo", "250 helo-ok\r\n", Duration::ZERO),
            ("NOOP", "500 noop refused\r\n", Duration::ZERO),
        ],
    )
    .await;

    let mut client = client(port);
    client.connect(TIMEOUT).await.unwrap();
    let err = client
        .greet(Some("foo"), Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(!client.has_extension("8BITMIME"));

    // The late EHLO reply must never be taken as the answer to a later command
    let err = client.noop(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    assert!(!client.channel().is_connected());

    assert_eq!(server.await.unwrap(), ["EHLO foo"]);
}

#[tokio::test]
async fn test_timed_out_exchange_drops_connection() {
    init_tracing();
    let (port, server) = spawn_slow_server(
        "220 mx.test.com ESMTP\r\n",
        vec![
            ("NOOP", "250 late\r\n", Duration::from_millis(300)),
            ("RSET", "500 rset refused\r\n", Duration::ZERO),
        ],
    )
    .await;

    let mut client = client(port);
    client.connect(TIMEOUT).await.unwrap();
    let err = client
        .noop(Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(!client.channel().is_connected());

    let err = client.rset(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));
    let err = client.rset(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)));

    client.close().await.unwrap();
    assert_eq!(server.await.unwrap(), ["NOOP"]);
}
