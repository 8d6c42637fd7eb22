// src/core/stub/prime.rs

//! A registered `(matcher, actions, scope)` triple. `PrimeKind` distinguishes
//! operator-registered primes from ones the engine synthesizes for itself
//! (auto-prime-on-Prepare, built-in system-table responses) purely so
//! `clear()` can choose to spare the latter.

use super::action::Action;
use super::matcher::Matcher;
use crate::core::scope::Scope;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimeKind {
    User,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prime {
    pub id: String,
    #[serde(default = "PrimeKind::user")]
    pub kind: PrimeKind,
    #[serde(default)]
    pub scope: Scope,
    pub matcher: Matcher,
    #[serde(rename = "then")]
    pub actions: Vec<Action>,
    /// If true, this prime doesn't count as "already covering" its query
    /// text when the engine decides whether a fresh `Prepare` needs an
    /// auto-registered skeleton (load-bearing field name at the JSON
    /// boundary; see DESIGN.md for the resolved Open Question).
    #[serde(default)]
    pub ignore_on_prepare: bool,
}

impl PrimeKind {
    fn user() -> Self {
        PrimeKind::User
    }
}

impl Prime {
    pub fn new(scope: Scope, matcher: Matcher, actions: Vec<Action>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: PrimeKind::User,
            scope,
            matcher,
            actions,
            ignore_on_prepare: false,
        }
    }

    pub fn internal(scope: Scope, matcher: Matcher, actions: Vec<Action>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: PrimeKind::Internal,
            scope,
            matcher,
            actions,
            ignore_on_prepare: false,
        }
    }
}
