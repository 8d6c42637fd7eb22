// src/core/stub/mod.rs

//! The stub store and request matcher (component C): how canned responses
//! are registered, scoped, looked up for an incoming frame, and translated
//! into an ordered action list.

pub mod action;
pub mod defaults;
pub mod matcher;
pub mod prime;
pub mod store;

pub use action::Action;
pub use matcher::{ExpectedParams, ExpectedValue, ExpectedValueKind, Matcher, QueryMatcher};
pub use prime::{Prime, PrimeKind};
pub use store::StubStore;
