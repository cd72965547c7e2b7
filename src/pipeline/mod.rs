//! Pipeline entry points for the harvest stages.
//!
//! - `run_forums`: Resolve the closest listing snapshot per forum page and date
//! - `run_topics`: Parse topic rows from the resolved listing snapshots
//! - `run_replies`: Rebuild the reply thread of each selected topic
//! - `run_pipeline`: All three stages in order
//! - `run_validate`: Check the configuration and its selectors

pub mod forums;
pub mod pipeline;
pub mod replies;
pub mod topics;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use forums::run_forums;
pub use pipeline::run_pipeline;
pub use replies::{ReplyFilter, run_replies};
pub use topics::run_topics;
pub use validate::run_validate;
