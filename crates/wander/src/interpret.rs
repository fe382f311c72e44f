mod candidates;
pub mod remote;
mod router;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wander_llm::Provider;

pub use candidates::CandidateGenerator;
pub use router::Router;

/// Whether a query can be geocoded as typed or needs interpretation first.
///
/// The wire names are the replies the routing prompt asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingDecision {
    #[serde(rename = "mapbox")]
    Direct,
    #[serde(rename = "gpt")]
    Interpret,
}

impl RoutingDecision {
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Direct => "mapbox",
            Self::Interpret => "gpt",
        }
    }
}

/// What to geocode for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Geocode the query text itself.
    Direct,
    /// Geocode each candidate place name, at most five.
    Candidates(Vec<String>),
}

/// Why interpretation failed. Routing never fails; only candidate generation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    TimedOut,
    Upstream(String),
    Malformed(String),
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => f.write_str("request timed out"),
            Self::Upstream(msg) => write!(f, "upstream error: {msg}"),
            Self::Malformed(msg) => write!(f, "malformed reply: {msg}"),
        }
    }
}

impl std::error::Error for InterpretError {}

/// A pending interpretation.
pub type Interpreting<'a> =
    Pin<Box<dyn Future<Output = Result<Interpretation, InterpretError>> + Send + 'a>>;

/// Decides how a query should be geocoded.
pub trait Interpreter: Send + Sync {
    fn interpret<'a>(&'a self, query: &'a str) -> Interpreting<'a>;
}

/// Routes and generates candidates in-process with a language model.
pub struct Local<P> {
    router: Router<P>,
    generator: CandidateGenerator<P>,
}

impl<P: Provider> Local<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            router: Router::new(Arc::clone(&provider)),
            generator: CandidateGenerator::new(provider),
        }
    }

    /// Override the per-call language-model time limit.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            router: self.router.with_timeout(timeout),
            generator: self.generator.with_timeout(timeout),
        }
    }
}

impl<P: Provider> Interpreter for Local<P> {
    fn interpret<'a>(&'a self, query: &'a str) -> Interpreting<'a> {
        Box::pin(async move {
            match self.router.route(query).await {
                RoutingDecision::Direct => Ok(Interpretation::Direct),
                RoutingDecision::Interpret => {
                    tracing::debug!(%query, "generating candidates");
                    self.generator
                        .generate(query)
                        .await
                        .map(Interpretation::Candidates)
                }
            }
        })
    }
}

/// Used when no language model is configured: everything is geocoded as typed.
pub struct Fallback;

impl Interpreter for Fallback {
    fn interpret<'a>(&'a self, _query: &'a str) -> Interpreting<'a> {
        Box::pin(async { Ok(Interpretation::Direct) })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, Scripted};
    use super::*;

    use futures_lite::future::block_on;

    #[test]
    fn direct_route_skips_generation() {
        let provider = Arc::new(Scripted::new([Reply::Text("mapbox")]));
        let local = Local::new(Arc::clone(&provider));
        let out = block_on(local.interpret("Eiffel Tower, Paris"));
        assert_eq!(out, Ok(Interpretation::Direct));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn interpret_route_generates_candidates() {
        let provider = Arc::new(Scripted::new([
            Reply::Text("gpt"),
            Reply::Text(
                r#"{"locations": ["Golden Gate Park, San Francisco, CA", "Baker Beach, San Francisco, CA"]}"#,
            ),
        ]));
        let local = Local::new(Arc::clone(&provider));
        let out = block_on(local.interpret("somewhere romantic for a picnic"));
        assert_eq!(
            out,
            Ok(Interpretation::Candidates(vec![
                "Golden Gate Park, San Francisco, CA".into(),
                "Baker Beach, San Francisco, CA".into(),
            ]))
        );
        assert_eq!(provider.calls(), 2);
    }

    #[test]
    fn routing_outage_behaves_as_direct() {
        let provider = Arc::new(Scripted::new([Reply::Fail]));
        let local = Local::new(Arc::clone(&provider));
        assert_eq!(
            block_on(local.interpret("anything")),
            Ok(Interpretation::Direct)
        );
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn generation_timeout_is_reported() {
        let provider = Arc::new(Scripted::new([Reply::Text("gpt"), Reply::Hang]));
        let local = Local::new(provider).with_timeout(Duration::from_millis(20));
        assert_eq!(
            block_on(local.interpret("a cozy reading nook")),
            Err(InterpretError::TimedOut)
        );
    }

    #[test]
    fn malformed_candidates_are_an_error_not_empty() {
        let provider = Arc::new(Scripted::new([
            Reply::Text("gpt"),
            Reply::Text("Sure! Here are some places: ..."),
        ]));
        let local = Local::new(provider);
        assert!(matches!(
            block_on(local.interpret("best tacos")),
            Err(InterpretError::Malformed(_))
        ));
    }

    #[test]
    fn fallback_is_always_direct() {
        assert_eq!(block_on(Fallback.interpret("x")), Ok(Interpretation::Direct));
    }

    #[test]
    fn decision_wire_names() {
        assert_eq!(
            serde_json::to_string(&RoutingDecision::Direct).unwrap(),
            r#""mapbox""#
        );
        assert_eq!(
            serde_json::from_str::<RoutingDecision>(r#""gpt""#).unwrap(),
            RoutingDecision::Interpret
        );
        assert_eq!(RoutingDecision::Interpret.wire_name(), "gpt");
    }
}
