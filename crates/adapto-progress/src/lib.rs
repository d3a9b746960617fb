//! Adapto — Progress bounded context.
//!
//! Durable per-player bookkeeping: investigation path completion flags and
//! the detection meter, validated on load and written as whole records.

pub mod application;
pub mod domain;
