//! Integration tests: drive the widget against a mock webhook served on a free port.
//! Pacing is zero so outcomes land as soon as the HTTP exchange finishes.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use widget::config::ChatConfig;
use widget::message::Sender;
use widget::webhook::{MessageOutcome, TranscriptOutcome, WebhookGateway, NO_REPLY_TEXT};
use widget::widget::{ChatWidget, WidgetOptions};

#[derive(Default)]
struct Hits {
    bodies: Mutex<Vec<Value>>,
}

impl Hits {
    fn record(&self, body: Value) {
        self.bodies.lock().unwrap().push(body);
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }
}

async fn mock_webhook() -> (SocketAddr, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route(
            "/reply",
            post(|State(h): State<Arc<Hits>>, Json(b): Json<Value>| async move {
                h.record(b);
                Json(json!({ "reply": "Hello back", "extra": 1 }))
            }),
        )
        .route(
            "/empty",
            post(|State(h): State<Arc<Hits>>, Json(b): Json<Value>| async move {
                h.record(b);
                Json(json!({}))
            }),
        )
        .route(
            "/fail",
            post(|State(h): State<Arc<Hits>>, Json(b): Json<Value>| async move {
                h.record(b);
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
        .route("/not-json", post(|| async { "plain text" }))
        .route(
            "/slow",
            post(|Json(b): Json<Value>| async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({ "reply": format!("slow: {}", b["message"].as_str().unwrap_or("")) }))
            }),
        )
        .route(
            "/fast",
            post(|Json(b): Json<Value>| async move {
                Json(json!({ "reply": format!("fast: {}", b["message"].as_str().unwrap_or("")) }))
            }),
        )
        .with_state(hits.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock webhook");
    let addr = listener.local_addr().expect("local_addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, hits)
}

fn widget_for(url: Option<String>) -> ChatWidget {
    ChatWidget::new(
        ChatConfig {
            webhook_url: url,
            ..ChatConfig::default()
        },
        WidgetOptions {
            pacing: Duration::ZERO,
            notice_ttl: Duration::ZERO,
        },
    )
}

async fn last_text(w: &ChatWidget) -> String {
    w.conversation()
        .messages()
        .await
        .last()
        .map(|m| m.text.clone())
        .unwrap_or_default()
}

#[tokio::test]
async fn reply_field_becomes_agent_message() {
    let (addr, hits) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/reply", addr)));
    w.send("Hi").await.expect("sent").await.unwrap();

    let msgs = w.conversation().messages().await;
    assert_eq!(msgs.len(), 3);
    assert_eq!(msgs[2].sender, Sender::Agent);
    assert_eq!(msgs[2].text, "Hello back");
    assert_eq!(hits.bodies(), vec![json!({ "message": "Hi" })]);
}

#[tokio::test]
async fn missing_reply_field_uses_placeholder() {
    let (addr, _) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/empty", addr)));
    w.send("Hi").await.unwrap().await.unwrap();
    assert_eq!(last_text(&w).await, NO_REPLY_TEXT);
}

#[tokio::test]
async fn http_error_is_rendered_with_status() {
    let (addr, _) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/fail", addr)));
    w.send("Hi").await.unwrap().await.unwrap();
    assert_eq!(last_text(&w).await, "Error: HTTP 500: Internal Server Error");
    assert!(!w.conversation().is_typing().await);
}

#[tokio::test]
async fn non_json_success_body_is_an_error() {
    let (addr, _) = mock_webhook().await;
    let gw = WebhookGateway::new(Duration::ZERO);
    let out = gw
        .send_message(Some(&format!("http://{}/not-json", addr)), "Hi")
        .await;
    assert!(matches!(out, MessageOutcome::Failed(_)));
    assert!(out.text().starts_with("Error: "));
}

#[tokio::test]
async fn pacing_delays_the_outcome() {
    let (addr, _) = mock_webhook().await;
    let gw = WebhookGateway::new(Duration::from_millis(250));
    let started = std::time::Instant::now();
    let out = gw
        .send_message(Some(&format!("http://{}/reply", addr)), "Hi")
        .await;
    assert_eq!(out, MessageOutcome::Reply("Hello back".into()));
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn pacing_delays_the_unconfigured_outcome() {
    let gw = WebhookGateway::new(Duration::from_millis(250));
    let started = std::time::Instant::now();
    let out = gw.send_message(None, "Hi").await;
    assert_eq!(out, MessageOutcome::NotConfigured);
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn pacing_delays_the_http_error_outcome() {
    let (addr, _) = mock_webhook().await;
    let gw = WebhookGateway::new(Duration::from_millis(250));
    let started = std::time::Instant::now();
    let out = gw
        .send_message(Some(&format!("http://{}/fail", addr)), "Hi")
        .await;
    assert_eq!(out.text(), "Error: HTTP 500: Internal Server Error");
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn overlapping_sends_each_append_their_reply() {
    let (addr, _) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/slow", addr)));
    let a = w.send("A").await.unwrap();
    w.update_config(ChatConfig {
        webhook_url: Some(format!("http://{}/fast", addr)),
        ..ChatConfig::default()
    })
    .await;
    let b = w.send("B").await.unwrap();
    a.await.unwrap();
    b.await.unwrap();

    let msgs = w.conversation().messages().await;
    assert_eq!(msgs.len(), 5);
    let users: Vec<_> = msgs.iter().filter(|m| m.sender == Sender::User).map(|m| m.text.as_str()).collect();
    assert_eq!(users, vec!["A", "B"]);
    let mut agents: Vec<_> = msgs[1..]
        .iter()
        .filter(|m| m.sender == Sender::Agent)
        .map(|m| m.text.clone())
        .collect();
    // The fast endpoint answers first.
    assert_eq!(agents[0], "fast: B");
    agents.sort();
    assert_eq!(agents, vec!["fast: B".to_string(), "slow: A".to_string()]);
    assert!(!w.conversation().is_typing().await);
}

#[tokio::test]
async fn transcript_send_posts_expected_shape() {
    let (addr, hits) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/reply", addr)));
    assert_eq!(w.send_transcript().await, TranscriptOutcome::Sent);
    assert_eq!(last_text(&w).await, TranscriptOutcome::Sent.text());

    let bodies = hits.bodies();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(body["type"], "transcript");
    assert!(body["transcript"]
        .as_str()
        .unwrap()
        .starts_with("Chat Transcript\n"));
    assert!(body["sessionId"].as_str().unwrap().starts_with("chat-session-"));
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn transcript_send_failure_notice() {
    let (addr, _) = mock_webhook().await;
    let w = widget_for(Some(format!("http://{}/fail", addr)));
    assert_eq!(w.send_transcript().await, TranscriptOutcome::Failed);
    assert_eq!(
        last_text(&w).await,
        "Failed to send transcript. Please try again."
    );
}

#[tokio::test]
async fn transcript_send_without_endpoint_makes_no_request() {
    let (_, hits) = mock_webhook().await;
    let w = widget_for(None);
    assert_eq!(w.send_transcript().await, TranscriptOutcome::NotConfigured);
    assert!(hits.bodies().is_empty());
}
