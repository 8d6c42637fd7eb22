// src/core/stub/defaults.rs

//! The "minimal-viable database" the connection engine falls back to when no
//! prime matches (SPEC_FULL.md §3, default-response table), plus the
//! auto-prime-on-Prepare skeleton and the built-in system-schema primes
//! installed once per store.

use super::action::Action;
use super::matcher::{Matcher, QueryMatcher};
use super::prime::Prime;
use super::store::StubStore;
use crate::core::protocol::message::no_rows;
use crate::core::protocol::Message;
use crate::core::scope::Scope;
use std::collections::BTreeMap;

/// `Ready`, unconditionally, for `Startup`/`Register`.
pub fn handshake_response() -> Message {
    Message::Ready
}

/// The `Supported` body advertised for `Options`.
pub fn options_response() -> Message {
    let mut options = BTreeMap::new();
    options.insert(
        "PROTOCOL_VERSIONS".to_string(),
        vec!["3/v3".to_string(), "4/v4".to_string(), "5/v5-beta".to_string()],
    );
    options.insert("CQL_VERSION".to_string(), vec!["3.4.4".to_string()]);
    options.insert(
        "COMPRESSION".to_string(),
        vec!["snappy".to_string(), "lz4".to_string()],
    );
    Message::Supported { options }
}

/// Recognizes `USE <keyspace>`, case-insensitively with leading whitespace,
/// returning the keyspace name if the query is one. The `use` prefix must be
/// its own word (`"useful ..."` is not a `USE` statement).
pub fn parse_use_keyspace(query: &str) -> Option<String> {
    let trimmed = query.trim_start();
    let rest = trimmed
        .get(0..3)
        .filter(|prefix| prefix.eq_ignore_ascii_case("use"))?;
    let _ = rest;
    if !trimmed.as_bytes().get(3).is_some_and(u8::is_ascii_whitespace) {
        return None;
    }
    let remainder = trimmed[3..].trim();
    if remainder.is_empty() {
        return None;
    }
    let keyspace = remainder.trim_end_matches(';').trim();
    if keyspace.is_empty() || keyspace.contains(char::is_whitespace) {
        return None;
    }
    Some(keyspace.to_string())
}

/// Whether this query text is one of the schema-introspection queries a
/// driver issues at startup (`system_schema.*`, `system.schema_*`), which get
/// an empty rowset rather than `Void` so driver-side metadata parsing
/// doesn't choke on an unexpected response kind.
pub fn is_system_schema_query(query: &str) -> bool {
    let lowered = query.to_ascii_lowercase();
    lowered.contains("system_schema.") || lowered.contains("system.schema_")
}

/// Whether this query asks for this node's own row or its peers', which the
/// engine answers dynamically from the live topology rather than through the
/// prime store (see `node_engine::defaults_dynamic`).
pub fn is_local_or_peers_query(query: &str) -> bool {
    let lowered = query.to_ascii_lowercase();
    lowered.contains("system.local") || lowered.contains("system.peers")
}

/// Builds the internal prime the engine auto-registers on `Prepare`: a
/// parameter skeleton inferred from the query text, whose `then` always
/// responds with an empty rowset.
pub fn build_auto_prime(query: &str, scope: Scope) -> Prime {
    let params = infer_params(query);
    let matcher = Matcher::Query(QueryMatcher {
        query: query.to_string(),
        consistency: None,
        params: Some(params),
    });
    Prime::internal(scope, matcher, vec![Action::respond(no_rows(Vec::new()))])
}

fn infer_params(query: &str) -> super::matcher::ExpectedParams {
    use super::matcher::{ExpectedParams, ExpectedValue, ExpectedValueKind};

    let positional_count = query.chars().filter(|c| *c == '?').count();
    if positional_count > 0 {
        let values = (0..positional_count)
            .map(|_| ExpectedValue {
                type_name: "varchar".to_string(),
                value: ExpectedValueKind::Wildcard,
            })
            .collect();
        return ExpectedParams::Positional(values);
    }

    let names = scan_named_markers(query);
    let mut named = BTreeMap::new();
    for name in names {
        named.insert(
            name,
            ExpectedValue {
                type_name: "varchar".to_string(),
                value: ExpectedValueKind::Wildcard,
            },
        );
    }
    ExpectedParams::Named(named)
}

/// Scans for `word = :name` bind markers without a full CQL lexer: walks the
/// text looking for `:identifier`, then checks that the preceding non-space
/// token is `=` preceded by another identifier.
fn scan_named_markers(query: &str) -> Vec<String> {
    let chars: Vec<char> = query.chars().collect();
    let mut names = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ':' {
            let start = i + 1;
            let mut end = start;
            while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            if end > start && preceded_by_bind_equals(&chars, i) {
                names.push(chars[start..end].iter().collect());
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    names
}

fn preceded_by_bind_equals(chars: &[char], colon_index: usize) -> bool {
    let mut j = colon_index;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    if j == 0 || chars[j - 1] != '=' {
        return false;
    }
    j -= 1;
    while j > 0 && chars[j - 1].is_whitespace() {
        j -= 1;
    }
    j > 0 && (chars[j - 1].is_alphanumeric() || chars[j - 1] == '_')
}

/// Installs the built-in schema primes once per store; idempotent only in
/// the sense that calling it twice registers two copies, so callers must
/// call it exactly once per store (the top-level facade does, at
/// construction).
pub fn install_system_schema_primes(store: &StubStore) {
    let queries = [
        "SELECT * FROM system_schema.keyspaces",
        "SELECT * FROM system_schema.tables",
        "SELECT * FROM system_schema.columns",
        "SELECT * FROM system_schema.views",
        "SELECT * FROM system_schema.indexes",
        "SELECT * FROM system_schema.functions",
        "SELECT * FROM system_schema.aggregates",
        "SELECT * FROM system_schema.types",
        "SELECT * FROM system_schema.triggers",
    ];
    for query in queries {
        let matcher = Matcher::Query(QueryMatcher {
            query: query.to_string(),
            consistency: None,
            params: None,
        });
        let prime = Prime::internal(
            Scope::whole_deployment(),
            matcher,
            vec![Action::respond(no_rows(Vec::new()))],
        );
        store.add(prime);
    }
}

/// A `Void` response, used for any `Query`/`Batch` that hits none of the
/// special cases above and isn't otherwise primed.
pub fn void_response() -> Message {
    Message::Void
}
