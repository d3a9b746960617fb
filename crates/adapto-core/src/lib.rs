//! Adapto Core — shared domain abstractions.
//!
//! This crate defines the fundamental traits and types that every bounded
//! context depends on: errors, time, commands, events, the progress
//! persistence seam, and the external content generator seam. It contains no
//! infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod generator;
pub mod player;
pub mod repository;
