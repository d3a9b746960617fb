//! Adapto — content generator clients.
//!
//! [`HttpContentGenerator`] talks to the dialogue generation service over
//! HTTP. [`OfflineContentGenerator`] stands in when no service is configured,
//! so every dynamic scene uses its authored content.

mod http;
mod offline;

pub use http::{HttpContentGenerator, HttpContentGeneratorConfig};
pub use offline::OfflineContentGenerator;
