pub mod annotate;
pub mod filter;
pub mod grouping;
pub mod importance;
pub mod matcher;
pub mod model;
pub mod orchestrator;
pub mod pagination;
pub mod precedence;
pub mod projector;
pub mod query;
pub mod source;
pub mod token;
pub mod wire;

pub use orchestrator::{Collaborators, RuleStatusService};
pub use query::RawParams;
