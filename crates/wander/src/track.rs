pub mod log;
pub mod noop;

use serde_json::Value;

pub const SEARCH_QUERY: &str = "Search Query";
pub const USER_LOCATION: &str = "User Location";
pub const GEOLOCATION_DENIED: &str = "Geolocation Denied";
pub const TIME_SPENT: &str = "Time Spent";

/// Product analytics sink. Tracking is fire-and-forget and never fails.
pub trait Tracker: Send + Sync {
    fn track(&self, event: &str, props: Value);
}
