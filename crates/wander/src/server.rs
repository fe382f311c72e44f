use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use exn::ResultExt;

use crate::api::{ErrorBody, ResolveRequest, ResolveResponse, TokenResponse};
use crate::interpret::{InterpretError, Interpretation, Interpreter};

#[derive(Debug)]
pub struct Error(String);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Error {}

/// Everything the handlers need. Secrets live here and nowhere else.
#[derive(Clone)]
pub struct AppState {
    map_token: Option<Arc<str>>,
    interpreter: Arc<dyn Interpreter>,
}

impl AppState {
    pub fn new(map_token: Option<String>, interpreter: Arc<dyn Interpreter>) -> Self {
        Self {
            map_token: map_token.filter(|t| !t.is_empty()).map(Arc::from),
            interpreter,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/token", get(token))
        .route("/api/resolve", post(resolve))
        .with_state(state)
}

/// Bind `addr` and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: AppState) -> exn::Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .or_raise(|| Error(format!("bind {addr}")))?;
    tracing::info!(%addr, "backend listening");
    axum::serve(listener, router(state))
        .await
        .or_raise(|| Error("serve".into()))?;
    Ok(())
}

async fn token(State(state): State<AppState>) -> Json<TokenResponse> {
    if state.map_token.is_none() {
        tracing::warn!("map token requested but none is configured");
    }
    Json(TokenResponse {
        token: state.map_token.as_deref().map(str::to_owned),
    })
}

type ApiError = (StatusCode, Json<ErrorBody>);

async fn resolve(
    State(state): State<AppState>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Query must not be empty")),
        ));
    }

    match state.interpreter.interpret(query).await {
        Ok(Interpretation::Direct) => Ok(Json(ResolveResponse::direct())),
        Ok(Interpretation::Candidates(locations)) => {
            Ok(Json(ResolveResponse::candidates(locations)))
        }
        Err(e) => {
            tracing::warn!(%e, %query, "resolve failed");
            Err(error_response(e))
        }
    }
}

fn error_response(e: InterpretError) -> ApiError {
    match e {
        InterpretError::TimedOut => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ErrorBody::new("Request timed out")),
        ),
        InterpretError::Upstream(details) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Language model request failed").with_details(details)),
        ),
        InterpretError::Malformed(details) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new("Error parsing JSON response").with_details(details)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::interpret::Interpreting;

    struct Fixed(Result<Interpretation, InterpretError>);

    impl Interpreter for Fixed {
        fn interpret<'a>(&'a self, _query: &'a str) -> Interpreting<'a> {
            let result = self.0.clone();
            Box::pin(async move { result })
        }
    }

    fn app(token: Option<&str>, result: Result<Interpretation, InterpretError>) -> Router {
        router(AppState::new(
            token.map(str::to_owned),
            Arc::new(Fixed(result)),
        ))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn resolve_request(query: &str) -> Request<Body> {
        Request::post("/api/resolve")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "query": query }).to_string(),
            ))
            .unwrap()
    }

    fn token_request() -> Request<Body> {
        Request::get("/api/token").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn token_is_returned() {
        let (status, body) = call(
            app(Some("pk.test"), Ok(Interpretation::Direct)),
            token_request(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "token": "pk.test" }));
    }

    #[tokio::test]
    async fn missing_token_is_null() {
        let (status, body) = call(app(None, Ok(Interpretation::Direct)), token_request()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "token": null }));

        let (_, body) = call(app(Some(""), Ok(Interpretation::Direct)), token_request()).await;
        assert_eq!(body["token"], Value::Null);
    }

    #[tokio::test]
    async fn direct_decision() {
        let (status, body) = call(
            app(None, Ok(Interpretation::Direct)),
            resolve_request("Eiffel Tower, Paris"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "decision": "mapbox" }));
    }

    #[tokio::test]
    async fn candidate_decision() {
        let (status, body) = call(
            app(
                None,
                Ok(Interpretation::Candidates(vec![
                    "Golden Gate Park, San Francisco, CA".into(),
                    "Baker Beach, San Francisco, CA".into(),
                ])),
            ),
            resolve_request("somewhere romantic for a picnic"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["decision"], "gpt");
        assert_eq!(body["locations"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn timeout_is_gateway_timeout() {
        let (status, body) = call(
            app(None, Err(InterpretError::TimedOut)),
            resolve_request("q"),
        )
        .await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body, serde_json::json!({ "error": "Request timed out" }));
    }

    #[tokio::test]
    async fn malformed_reply_is_server_error_with_details() {
        let (status, body) = call(
            app(
                None,
                Err(InterpretError::Malformed("expected value at line 1".into())),
            ),
            resolve_request("q"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Error parsing JSON response");
        assert_eq!(body["details"], "expected value at line 1");
    }

    #[tokio::test]
    async fn upstream_failure_is_server_error() {
        let (status, body) = call(
            app(None, Err(InterpretError::Upstream("API error (401)".into()))),
            resolve_request("q"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["details"], "API error (401)");
    }

    #[tokio::test]
    async fn blank_query_is_bad_request() {
        let (status, body) = call(
            app(None, Ok(Interpretation::Direct)),
            resolve_request("  "),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Query must not be empty");
    }
}
