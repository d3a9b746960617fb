//! Shared test mocks and utilities for the Adapto narrative engine.

mod clock;
mod generator;
mod repository;

pub use clock::FixedClock;
pub use generator::{
    FailingContentGenerator, GatedContentGenerator, ScriptedContentGenerator,
    SlowContentGenerator,
};
pub use repository::{
    FailingProgressRepository, InMemoryProgressRepository, StallingProgressRepository,
};
