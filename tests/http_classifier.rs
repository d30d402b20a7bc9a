// tests/http_classifier.rs
use std::time::Duration;

use crypto_sentiment::classify::{Batch, Classifier, HttpClassifier, PreparedInput};
use crypto_sentiment::Label;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One-shot inference server: answers the first request with `status` and
/// `body`, and hands back the request body it received.
async fn stub_endpoint(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let body_start = loop {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client hung up before sending headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..body_start]).to_lowercase();
        let len = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map(|v| v.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while buf.len() < body_start + len {
            let n = sock.read(&mut chunk).await.unwrap();
            assert!(n > 0, "client hung up mid-body");
            buf.extend_from_slice(&chunk[..n]);
        }

        let resp = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        sock.write_all(resp.as_bytes()).await.unwrap();
        let _ = sock.shutdown().await;
        String::from_utf8(buf[body_start..body_start + len].to_vec()).unwrap()
    });
    (format!("http://{addr}/classify"), handle)
}

fn client(endpoint: &str, model: &str) -> HttpClassifier {
    HttpClassifier::new(endpoint, model, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn raw_batch_round_trip() {
    let (url, server) = stub_endpoint(
        "200 OK",
        r#"[{"label":"Bullish","score":0.93},{"label":"neutral","score":0.51}]"#,
    )
    .await;
    let c = client(&url, "ElKulako/cryptobert");

    let preds = c
        .classify(Batch::Raw(vec![
            "btc breaking out today".into(),
            "eth moving sideways today".into(),
        ]))
        .await
        .unwrap();
    assert_eq!(preds.len(), 2);
    assert_eq!(preds[0].label, Label::Bullish);
    assert_eq!(preds[0].confidence, 0.93);
    assert_eq!(preds[1].label, Label::Neutral);

    let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(
        sent,
        json!({
            "model": "ElKulako/cryptobert",
            "inputs": ["btc breaking out today", "eth moving sideways today"]
        })
    );
}

#[tokio::test]
async fn prepared_batch_sends_token_objects() {
    let (url, server) = stub_endpoint("200 OK", r#"[{"label":"negative","score":0.91}]"#).await;
    let c = client(&url, "ProsusAI/finbert");

    let preds = c
        .classify(Batch::Prepared(vec![PreparedInput {
            input_ids: vec![101, 2054, 102],
            attention_mask: vec![1, 1, 1],
        }]))
        .await
        .unwrap();
    assert_eq!(preds[0].label, Label::Bearish);

    let sent: Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(
        sent,
        json!({
            "model": "ProsusAI/finbert",
            "inputs": [{"input_ids": [101, 2054, 102], "attention_mask": [1, 1, 1]}]
        })
    );
}

#[tokio::test]
async fn error_status_is_reported() {
    let (url, server) = stub_endpoint("503 Service Unavailable", r#"{"error":"loading"}"#).await;
    let err = client(&url, "ElKulako/cryptobert")
        .classify(Batch::Raw(vec!["btc up only today".into()]))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("503"), "got: {err:#}");
    server.await.unwrap();
}

#[tokio::test]
async fn undecodable_body_is_an_error() {
    let (url, server) = stub_endpoint("200 OK", "<html>gateway</html>").await;
    let err = client(&url, "ElKulako/cryptobert")
        .classify(Batch::Raw(vec!["btc up only today".into()]))
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("decoding inference response"),
        "got: {err:#}"
    );
    server.await.unwrap();
}

#[tokio::test]
async fn short_answer_is_an_error() {
    let (url, server) = stub_endpoint("200 OK", r#"[{"label":"Bullish","score":0.7}]"#).await;
    let err = client(&url, "ElKulako/cryptobert")
        .classify(Batch::Raw(vec!["btc up".into(), "eth down".into()]))
        .await
        .unwrap_err();
    assert!(
        format!("{err:#}").contains("1 predictions for 2 inputs"),
        "got: {err:#}"
    );
    server.await.unwrap();
}
