//! Drives the client against a local stand-in for a provider.

use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tally_ai::{AiProvider, OpenAiCompatClient, ProviderSettings};
use tally_core::smart_booking::{AiError, ChatCompletion, UserContent};
use tokio::net::TcpListener;

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn client(base_url: String, timeout: Duration) -> OpenAiCompatClient {
    OpenAiCompatClient::new(ProviderSettings {
        provider: AiProvider::Deepseek,
        base_url,
        api_key: "test-key".to_string(),
        text_model: "text-model".to_string(),
        vision_model: "vision-model".to_string(),
        timeout,
    })
    .unwrap()
}

async fn echo_model(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let reply = json!({ "model": body["model"], "auth": auth }).to_string();
    Json(json!({ "choices": [{ "message": { "role": "assistant", "content": reply } }] }))
}

#[tokio::test]
async fn test_text_and_image_pick_their_models() {
    let base = serve(Router::new().route("/v1/chat/completions", post(echo_model))).await;
    let client = client(format!("{base}/"), Duration::from_secs(5));
    assert!(client.endpoint().ends_with("/v1/chat/completions"));

    let reply = client
        .complete("sys", UserContent::Text("午饭35".into()))
        .await
        .unwrap();
    let reply: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(reply["model"], "text-model");
    assert_eq!(reply["auth"], "Bearer test-key");

    let image = UserContent::Image {
        text: "识别".into(),
        image_data_uri: "data:image/jpeg;base64,AAAA".into(),
    };
    let reply: Value = serde_json::from_str(&client.complete("sys", image).await.unwrap()).unwrap();
    assert_eq!(reply["model"], "vision-model");
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
    );
    let client = client(serve(router).await, Duration::from_secs(5));

    let err = client
        .complete("sys", UserContent::Text("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Status { status: 429, ref body } if body == "quota exceeded"));
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({ "choices": [] }))
        }),
    );
    let client = client(serve(router).await, Duration::from_millis(200));

    let err = client
        .complete("sys", UserContent::Text("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Timeout));
}

#[tokio::test]
async fn test_non_json_reply_is_unparseable() {
    let router =
        Router::new().route("/v1/chat/completions", post(|| async { "<html>oops</html>" }));
    let client = client(serve(router).await, Duration::from_secs(5));

    let err = client
        .complete("sys", UserContent::Text("x".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Unparseable(_)));
}
