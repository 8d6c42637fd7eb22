// src/core/stub/matcher.rs

//! Predicates a prime is matched against. A `Matcher` never inspects more
//! than one incoming `Message`; `Execute` frames are matched by first
//! resolving the prepared query text and re-running `Query` matching against
//! it (see `store.rs`), so there is no `Matcher::Execute` variant.

use crate::core::protocol::{Consistency, Message, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// One expected bound value. `Wildcard` is the JSON literal `"*"`, matching
/// any value of any declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValueKind {
    Wildcard,
    Literal(Value),
}

impl Serialize for ExpectedValueKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            ExpectedValueKind::Wildcard => s.serialize_str("*"),
            ExpectedValueKind::Literal(v) => v.serialize(s),
        }
    }
}

impl<'de> Deserialize<'de> for ExpectedValueKind {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        if v == Value::String("*".to_string()) {
            Ok(ExpectedValueKind::Wildcard)
        } else {
            Ok(ExpectedValueKind::Literal(v))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedValue {
    pub type_name: String,
    pub value: ExpectedValueKind,
}

impl ExpectedValue {
    fn accepts(&self, actual: &crate::core::protocol::message::BoundValue) -> bool {
        if self.type_name != actual.type_name {
            return false;
        }
        match &self.value {
            ExpectedValueKind::Wildcard => true,
            ExpectedValueKind::Literal(expected) => *expected == actual.value,
        }
    }
}

/// Expected bound parameters of a `Query`/`Execute`. A well-formed prime
/// declares either positional or named parameters, matching the shape real
/// frames carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpectedParams {
    Positional(Vec<ExpectedValue>),
    Named(BTreeMap<String, ExpectedValue>),
}

impl ExpectedParams {
    fn accepts(&self, actual: &QueryParams) -> bool {
        match self {
            ExpectedParams::Positional(expected) => {
                if expected.len() != actual.positional.len() {
                    return false;
                }
                expected
                    .iter()
                    .zip(actual.positional.iter())
                    .all(|(e, a)| e.accepts(a))
            }
            ExpectedParams::Named(expected) => {
                if expected.len() != actual.named.len() {
                    return false;
                }
                expected.iter().all(|(name, e)| {
                    actual.named.get(name).is_some_and(|a| e.accepts(a))
                })
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatcher {
    pub query: String,
    #[serde(default)]
    pub consistency: Option<HashSet<Consistency>>,
    #[serde(default)]
    pub params: Option<ExpectedParams>,
}

impl QueryMatcher {
    fn matches(&self, query: &str, consistency: Consistency, params: &QueryParams) -> bool {
        if normalize(&self.query) != normalize(query) {
            return false;
        }
        if let Some(allowed) = &self.consistency
            && !allowed.contains(&consistency)
        {
            return false;
        }
        match &self.params {
            None => true,
            Some(expected) => expected.accepts(params),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Matcher {
    Startup,
    Options,
    Any,
    Query(QueryMatcher),
    Prepare { query: String },
}

impl Matcher {
    pub fn matches(&self, message: &Message) -> bool {
        match (self, message) {
            (Matcher::Any, _) => true,
            (Matcher::Startup, Message::Startup { .. }) => true,
            (Matcher::Options, Message::Options) => true,
            (Matcher::Prepare { query }, Message::Prepare { query: q }) => {
                normalize(query) == normalize(q)
            }
            (Matcher::Query(qm), Message::Query {
                query,
                consistency,
                params,
            }) => qm.matches(query, *consistency, params),
            _ => false,
        }
    }

    /// The query text this matcher keys on, if it has one — used to decide
    /// whether an existing prime already covers a freshly `Prepare`d query.
    pub fn query_text(&self) -> Option<&str> {
        match self {
            Matcher::Query(qm) => Some(&qm.query),
            Matcher::Prepare { query } => Some(query),
            _ => None,
        }
    }
}

pub(crate) fn normalize(query: &str) -> String {
    query.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::message::BoundValue;

    fn bv(type_name: &str, value: serde_json::Value) -> BoundValue {
        BoundValue {
            type_name: type_name.to_string(),
            value,
        }
    }

    #[test]
    fn wildcard_accepts_any_value_of_the_declared_type() {
        let expected = ExpectedValue {
            type_name: "bigint".to_string(),
            value: ExpectedValueKind::Wildcard,
        };
        assert!(expected.accepts(&bv("bigint", serde_json::json!(1))));
        assert!(expected.accepts(&bv("bigint", serde_json::json!(999))));
        assert!(!expected.accepts(&bv("ascii", serde_json::json!(1))));
    }

    #[test]
    fn positional_params_reject_extra_or_missing_values() {
        let expected = ExpectedParams::Positional(vec![ExpectedValue {
            type_name: "ascii".to_string(),
            value: ExpectedValueKind::Literal(serde_json::json!("c1")),
        }]);
        let exact = QueryParams {
            positional: vec![bv("ascii", serde_json::json!("c1"))],
            named: Default::default(),
        };
        assert!(expected.accepts(&exact));

        let extra = QueryParams {
            positional: vec![
                bv("ascii", serde_json::json!("c1")),
                bv("ascii", serde_json::json!("extra")),
            ],
            named: Default::default(),
        };
        assert!(!expected.accepts(&extra));
    }

    #[test]
    fn named_params_require_exact_key_match() {
        let mut expected_map = BTreeMap::new();
        expected_map.insert(
            "id".to_string(),
            ExpectedValue {
                type_name: "bigint".to_string(),
                value: ExpectedValueKind::Literal(serde_json::json!(1)),
            },
        );
        expected_map.insert(
            "id2".to_string(),
            ExpectedValue {
                type_name: "bigint".to_string(),
                value: ExpectedValueKind::Literal(serde_json::json!(2)),
            },
        );
        let expected = ExpectedParams::Named(expected_map);

        let mut matching = BTreeMap::new();
        matching.insert("id".to_string(), bv("bigint", serde_json::json!(1)));
        matching.insert("id2".to_string(), bv("bigint", serde_json::json!(2)));
        assert!(expected.accepts(&QueryParams {
            positional: Vec::new(),
            named: matching,
        }));

        let mut missing = BTreeMap::new();
        missing.insert("id".to_string(), bv("bigint", serde_json::json!(1)));
        assert!(!expected.accepts(&QueryParams {
            positional: Vec::new(),
            named: missing,
        }));
    }

    #[test]
    fn query_matcher_checks_consistency_set() {
        let qm = QueryMatcher {
            query: "SELECT 1".to_string(),
            consistency: Some(HashSet::from([Consistency::Quorum])),
            params: None,
        };
        let params = QueryParams::default();
        assert!(qm.matches("SELECT 1", Consistency::Quorum, &params));
        assert!(!qm.matches("SELECT 1", Consistency::One, &params));
    }
}
