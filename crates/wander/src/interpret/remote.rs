use std::time::Duration;

use isahc::prelude::*;
use isahc::{HttpClient, Request};

use super::{InterpretError, Interpretation, Interpreter, Interpreting, RoutingDecision};
use crate::api::{ErrorBody, ResolveRequest, ResolveResponse, TokenResponse};

/// Routing plus generation can take two model calls back to back.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Client for a running `wander serve` backend.
///
/// Delegates interpretation to `POST /api/resolve` and fetches the map token
/// from `GET /api/token`, so the front end never needs the secrets itself.
pub struct Remote {
    client: HttpClient,
    base_url: String,
    timeout: Duration,
}

impl Remote {
    pub fn new(base_url: &str) -> Result<Self, String> {
        let client = HttpClient::new().map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    /// Bound every backend request by `timeout` instead of the default.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The map access token held by the backend, `None` when it has none.
    pub async fn token(&self) -> Result<Option<String>, String> {
        let request = Request::get(format!("{}/api/token", self.base_url))
            .timeout(self.timeout)
            .body(())
            .map_err(|e| e.to_string())?;
        let mut response = self
            .client
            .send_async(request)
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("backend returned status {}", response.status()));
        }
        let body = response.text().await.map_err(|e| e.to_string())?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| e.to_string())?;
        Ok(token.token.filter(|t| !t.is_empty()))
    }

    async fn resolve(&self, query: &str) -> Result<Interpretation, InterpretError> {
        let body = serde_json::to_vec(&ResolveRequest {
            query: query.to_owned(),
        })
        .map_err(|e| InterpretError::Upstream(e.to_string()))?;

        let request = Request::post(format!("{}/api/resolve", self.base_url))
            .timeout(self.timeout)
            .header("Content-Type", "application/json")
            .body(body)
            .map_err(|e| InterpretError::Upstream(e.to_string()))?;

        let mut response = self.client.send_async(request).await.map_err(|e| {
            if e.is_timeout() {
                InterpretError::TimedOut
            } else {
                InterpretError::Upstream(e.to_string())
            }
        })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| InterpretError::Upstream(e.to_string()))?;
        decode_response(status, &text)
    }
}

impl Interpreter for Remote {
    fn interpret<'a>(&'a self, query: &'a str) -> Interpreting<'a> {
        Box::pin(async move {
            let result = self.resolve(query).await;
            if let Err(e) = &result {
                tracing::warn!(%e, base_url = %self.base_url, "backend resolve failed");
            }
            result
        })
    }
}

/// Map a `/api/resolve` response onto an interpretation.
fn decode_response(status: u16, body: &str) -> Result<Interpretation, InterpretError> {
    match status {
        200 => {
            let response: ResolveResponse =
                serde_json::from_str(body).map_err(|e| InterpretError::Malformed(e.to_string()))?;
            Ok(match response.decision {
                RoutingDecision::Direct => Interpretation::Direct,
                RoutingDecision::Interpret => {
                    Interpretation::Candidates(response.locations.unwrap_or_default())
                }
            })
        }
        504 => Err(InterpretError::TimedOut),
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body).map_or_else(
                |_| format!("backend returned status {status}"),
                |e| match e.details {
                    Some(details) => format!("{}: {details}", e.error),
                    None => e.error,
                },
            );
            Err(InterpretError::Upstream(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_decision() {
        assert_eq!(
            decode_response(200, r#"{"decision":"mapbox"}"#),
            Ok(Interpretation::Direct)
        );
    }

    #[test]
    fn candidate_decision() {
        assert_eq!(
            decode_response(200, r#"{"decision":"gpt","locations":["Crissy Field, San Francisco, CA"]}"#),
            Ok(Interpretation::Candidates(vec![
                "Crissy Field, San Francisco, CA".into()
            ]))
        );
        assert_eq!(
            decode_response(200, r#"{"decision":"gpt"}"#),
            Ok(Interpretation::Candidates(Vec::new()))
        );
    }

    #[test]
    fn gateway_timeout_is_timed_out() {
        assert_eq!(
            decode_response(504, r#"{"error":"Request timed out"}"#),
            Err(InterpretError::TimedOut)
        );
    }

    #[test]
    fn server_error_carries_message() {
        assert_eq!(
            decode_response(
                500,
                r#"{"error":"Error parsing JSON response","details":"expected value"}"#
            ),
            Err(InterpretError::Upstream(
                "Error parsing JSON response: expected value".into()
            ))
        );
        assert_eq!(
            decode_response(502, "Bad Gateway"),
            Err(InterpretError::Upstream("backend returned status 502".into()))
        );
    }

    #[test]
    fn unknown_decision_is_malformed() {
        assert!(matches!(
            decode_response(200, r#"{"decision":"bing"}"#),
            Err(InterpretError::Malformed(_))
        ));
    }

    /// A backend that accepts connections and never answers.
    fn silent_backend() -> (std::net::TcpListener, String) {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (listener, url)
    }

    #[test]
    fn token_fetch_gives_up_on_silent_backend() {
        let (_listener, url) = silent_backend();
        let remote = Remote::new(&url)
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let started = std::time::Instant::now();
        assert!(futures_lite::future::block_on(remote.token()).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn resolve_on_silent_backend_times_out() {
        let (_listener, url) = silent_backend();
        let remote = Remote::new(&url)
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        assert_eq!(
            futures_lite::future::block_on(remote.interpret("Louvre")),
            Err(InterpretError::TimedOut)
        );
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let remote = Remote::new("http://127.0.0.1:8888/").unwrap();
        assert_eq!(remote.base_url, "http://127.0.0.1:8888");
    }
}
