use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use wander_llm::{timebox, GenOptions, Provider, LLM_TIMEOUT};

use super::InterpretError;

/// Upper bound on place names produced for one query.
pub const MAX_CANDIDATES: usize = 5;

const CANDIDATE_TEMPERATURE: f64 = 0.7;
const CANDIDATE_MAX_TOKENS: u32 = 300;

/// Turns a vibe query into concrete, geocodable place names.
pub struct CandidateGenerator<P> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P: Provider> CandidateGenerator<P> {
    pub const fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            timeout: LLM_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn generate(&self, query: &str) -> Result<Vec<String>, InterpretError> {
        let prompt = candidate_prompt(query);
        let options = GenOptions::exploratory(CANDIDATE_TEMPERATURE, CANDIDATE_MAX_TOKENS);

        let reply = match timebox(self.timeout, self.provider.complete(&prompt, &options)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                tracing::warn!(%e, %query, "candidate generation failed");
                return Err(InterpretError::Upstream(e.to_string()));
            }
            Err(elapsed) => {
                tracing::warn!(%elapsed, %query, "candidate generation timed out");
                return Err(InterpretError::TimedOut);
            }
        };

        let locations = parse_candidates(&reply).inspect_err(|e| {
            tracing::warn!(%e, %reply, "unusable candidate reply");
        })?;
        tracing::info!(%query, count = locations.len(), "candidates generated");
        Ok(locations)
    }
}

#[derive(Deserialize)]
struct CandidateReply {
    locations: Vec<String>,
}

/// Parse a `{"locations": [...]}` reply.
///
/// The reply must be exactly that JSON object. Blank names are dropped and at
/// most [`MAX_CANDIDATES`] are kept, in the order given.
pub fn parse_candidates(reply: &str) -> Result<Vec<String>, InterpretError> {
    let parsed: CandidateReply =
        serde_json::from_str(reply.trim()).map_err(|e| InterpretError::Malformed(e.to_string()))?;

    let mut locations: Vec<String> = parsed
        .locations
        .into_iter()
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect();
    if locations.len() > MAX_CANDIDATES {
        tracing::debug!(count = locations.len(), "truncating candidate list");
        locations.truncate(MAX_CANDIDATES);
    }
    Ok(locations)
}

fn candidate_prompt(query: &str) -> String {
    format!(
        r#"Suggest up to {MAX_CANDIDATES} real places that match this map search: "{query}"

Each entry must be specific enough for a geocoding service to find it: a place name
followed by its city and region or country, for example "Dolores Park, San Francisco, CA".
Prefer well-known, currently existing places. Do not invent places.

Reply with JSON only, no prose and no code fences, in exactly this shape:
{{"locations": ["Place, City, Region", "..."]}}"#
    )
}
