mod caller;
mod health;
mod metrics;
mod router;
mod rules;

pub use caller::{caller_from_headers, CallerError, ORG_ID_HEADER, USER_HEADER};
pub use router::{router, AppState, ALERTS_PATH, RULES_PATH};
pub use rules::status_code;
