//! ParserClient against a canned HTTP service on a local socket.

use rulecraft_core::{Command, CommandParser, ParserError, ValueCategory};
use rulecraft_parser::ParserClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Serve `responses` in order, one per connection, recording request lines.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let line = request.lines().next().unwrap_or_default().to_string();
            log.lock().await.push(line);

            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        }
    });
    (url, seen)
}

fn client(url: &str) -> ParserClient {
    ParserClient::new(url, "en_US", Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn query_returns_candidates_and_keeps_the_session() {
    let (url, seen) = serve(vec![
        (200, r#"{"sessionId":"abc","candidates":[{"answer":"\"yes\"","prob":1.0,"score":1.0}]}"#),
        (200, r#"{"sessionId":"abc","candidates":[]}"#),
    ])
    .await;
    let parser = client(&url);

    let candidates = parser
        .parse("sure", Some(&ValueCategory::YesNo), &[])
        .await
        .unwrap();
    assert_eq!(candidates[0].command().unwrap(), Command::Yes);
    assert_eq!(parser.session_id().as_deref(), Some("abc"));

    let candidates = parser
        .parse("pick red", None, &["red".into(), "blue".into()])
        .await
        .unwrap();
    assert!(candidates.is_empty());

    let seen = seen.lock().await;
    assert!(seen[0].starts_with("GET /query?locale=en_US&limit=20&q=sure&expect=YesNo"));
    assert!(seen[1].contains("sessionId=abc"));
    assert!(seen[1].contains("choice%5B1%5D=blue"));
}

#[tokio::test]
async fn service_errors_surface_as_parser_errors() {
    let (url, _) = serve(vec![
        (200, r#"{"sessionId":"abc","error":"unknown locale"}"#),
        (500, r#"boom"#),
        (200, r#"not json"#),
    ])
    .await;
    let parser = client(&url);

    let remote = parser.parse("hi", None, &[]).await.unwrap_err();
    assert!(matches!(remote, ParserError::Remote(ref m) if m == "unknown locale"));

    let http = parser.parse("hi", None, &[]).await.unwrap_err();
    assert!(matches!(http, ParserError::Http { status_code: 500, .. }));

    let malformed = parser.parse("hi", None, &[]).await.unwrap_err();
    assert!(matches!(malformed, ParserError::Malformed(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client(&url).parse("hi", None, &[]).await.unwrap_err();
    assert!(matches!(err, ParserError::Network(_)));
}

#[tokio::test]
async fn learning_is_sent_in_the_background() {
    let (url, seen) = serve(vec![(200, "{}")]).await;
    let parser = client(&url);
    parser.learn("turn it off", &Command::No);

    for _ in 0..50 {
        if !seen.lock().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let seen = seen.lock().await;
    assert!(seen[0].starts_with("GET /learn?locale=en_US&q=turn+it+off"), "{}", seen[0]);
    assert!(seen[0].contains("target=%22no%22"));
}
