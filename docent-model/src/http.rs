//! Shared HTTP plumbing for the two model clients: one request path with
//! timeout, bounded retries, and exponential backoff.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ModelConfig;

/// What went wrong with a request, before it is mapped into the caller's
/// error type.
#[derive(Debug)]
pub(crate) enum HttpFailure {
    /// Non-retryable status, or a retryable one that outlived every retry.
    Status { status: u16, body: String },
    /// Connection-level failure on the last attempt.
    Transport(reqwest::Error),
    /// 200 OK but the body did not deserialize.
    Malformed(String),
}

impl std::fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, body } => write!(f, "HTTP {status}: {body}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Malformed(m) => write!(f, "malformed body: {m}"),
        }
    }
}

/// Build the shared `reqwest` client with the configured per-request timeout.
pub(crate) fn build_client(config: &ModelConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
}

/// POST `body` as JSON to `url` and deserialize the response.
///
/// HTTP 429 and 5xx responses and transport errors are retried up to
/// `max_retries` additional times with exponential backoff (1s, 2s, 4s, ...
/// capped at 32s); any other non-success status fails immediately.
pub(crate) async fn post_json<B: Serialize, R: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    body: &B,
    max_retries: u32,
) -> Result<R, HttpFailure> {
    let mut last_failure = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!(url, attempt, delay_secs = delay.as_secs(), "retrying request");
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json::<R>()
                        .await
                        .map_err(|e| HttpFailure::Malformed(e.to_string()));
                }

                let body_text = response.text().await.unwrap_or_default();
                let failure = HttpFailure::Status {
                    status: status.as_u16(),
                    body: body_text,
                };
                // Rate limits and server errors are worth another attempt;
                // every other client error is definitive.
                if status.as_u16() == 429 || status.is_server_error() {
                    last_failure = Some(failure);
                    continue;
                }
                return Err(failure);
            }
            Err(e) => {
                last_failure = Some(HttpFailure::Transport(e));
                continue;
            }
        }
    }

    Err(last_failure.unwrap_or(HttpFailure::Malformed("no attempt made".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Serialize)]
    struct Ping {
        message: &'static str,
    }

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn canned_response(status: u16, reason: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serve one canned response per connection, in order, then stop
    /// accepting.
    async fn serve(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        url
    }

    fn client() -> reqwest::Client {
        build_client(&ModelConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_is_retried_until_success() {
        let url = serve(vec![
            canned_response(500, "Internal Server Error", "boom"),
            canned_response(200, "OK", r#"{"ok":true}"#),
        ])
        .await;

        let pong: Pong = post_json(&client(), &url, None, &Ping { message: "hi" }, 3)
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        // A single canned response: a retry would hit a closed listener and
        // surface as a transport failure instead of this status.
        let url = serve(vec![canned_response(400, "Bad Request", "bad field")]).await;

        let err = post_json::<_, Pong>(&client(), &url, None, &Ping { message: "hi" }, 3)
            .await
            .unwrap_err();
        match err {
            HttpFailure::Status { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad field");
            }
            other => panic!("expected immediate status failure, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_status() {
        let url = serve(vec![
            canned_response(503, "Service Unavailable", "down"),
            canned_response(503, "Service Unavailable", "still down"),
        ])
        .await;

        let err = post_json::<_, Pong>(&client(), &url, None, &Ping { message: "hi" }, 1)
            .await
            .unwrap_err();
        match err {
            HttpFailure::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "still down");
            }
            other => panic!("expected exhausted-retries status, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = post_json::<_, Pong>(&client(), &url, None, &Ping { message: "hi" }, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpFailure::Transport(_)));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_reported() {
        let url = serve(vec![canned_response(200, "OK", "not json")]).await;

        let err = post_json::<_, Pong>(&client(), &url, None, &Ping { message: "hi" }, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpFailure::Malformed(_)));
    }
}
