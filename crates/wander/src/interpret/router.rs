use std::sync::Arc;
use std::time::Duration;

use wander_llm::{timebox, GenOptions, Provider, LLM_TIMEOUT};

use super::RoutingDecision;

/// The reply is a single word.
const ROUTING_MAX_TOKENS: u32 = 10;

/// Classifies queries as direct geocoding lookups or vibe searches.
///
/// Routing cannot fail: an unreachable model, a timeout, or an unexpected
/// reply all degrade to [`RoutingDecision::Direct`].
pub struct Router<P> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P: Provider> Router<P> {
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

    pub async fn route(&self, query: &str) -> RoutingDecision {
        let prompt = routing_prompt(query);
        let options = GenOptions::deterministic(ROUTING_MAX_TOKENS);
        tracing::debug!(
            %query,
            provider = self.provider.name(),
            model = self.provider.model_id(),
            "routing query"
        );

        match timebox(self.timeout, self.provider.complete(&prompt, &options)).await {
            Ok(Ok(reply)) => {
                let decision = decide(&reply);
                tracing::info!(%query, %reply, decision = decision.wire_name(), "query routed");
                decision
            }
            Ok(Err(e)) => {
                tracing::warn!(%e, %query, "routing failed, geocoding directly");
                RoutingDecision::Direct
            }
            Err(elapsed) => {
                tracing::warn!(%elapsed, %query, "routing timed out, geocoding directly");
                RoutingDecision::Direct
            }
        }
    }
}

/// Map a routing reply to a decision. Anything other than `gpt` is direct.
#[must_use]
pub fn decide(reply: &str) -> RoutingDecision {
    match reply.trim().to_lowercase().as_str() {
        "gpt" => RoutingDecision::Interpret,
        _ => RoutingDecision::Direct,
    }
}

fn routing_prompt(query: &str) -> String {
    format!(
        r#"You decide whether a map search query can go straight to a geocoding service
or needs interpretation first.

Answer "mapbox" when the query is one of:
1. A full address ("1600 Pennsylvania Ave NW, Washington, DC 20500")
2. A place name ("Eiffel Tower, Paris")
3. A city and country ("Tokyo, Japan")
4. A postal code ("90210")
5. A landmark ("Statue of Liberty")
6. An intersection ("5th Avenue and 42nd Street, New York")
7. A point of interest ("Central Park")
8. A neighborhood ("SoHo, New York")
9. A natural feature ("Mount Everest")
10. An explicit request for where something is ("Where is the Louvre?")

Answer "gpt" when:
1. The query has no direct match in the list above
2. The query is not primarily about location or geography
3. The query needs complex reasoning or general knowledge
4. The query is conversational or depends on context
5. The query is about something unrelated to locations or mapping

Reply with exactly one word, mapbox or gpt, and nothing else.

Query: "{query}""#
    )
}
