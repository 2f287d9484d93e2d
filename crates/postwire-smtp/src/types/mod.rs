//! Core SMTP types.

mod capability;
mod reply;

pub use capability::{AuthMechanism, Capabilities, Capability};
pub(crate) use reply::collapse_whitespace;
pub use reply::{EnhancedCode, Reply, ReplyCode};
