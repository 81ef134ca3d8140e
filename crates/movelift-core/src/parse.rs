//! Publish output parsing.
//!
//! The toolchain's human-readable and machine-readable output formats are
//! not stable across versions, so extraction degrades through progressively
//! weaker patterns instead of failing when the primary label is absent.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::error::{DeployError, Result};

/// Structured fields extracted from raw publish output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPublish {
    /// Transaction hash, from the strongest matching pattern.
    pub tx_hash: String,

    /// `0x`-prefixed tokens other than the transaction hash, deduplicated
    /// in first-seen order.
    pub addresses: Vec<String>,

    /// Identifiers following the literal word `module`, in order.
    pub modules: Vec<String>,
}

fn tx_hash_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Labeled forms: `Transaction hash: 0x…` and `"transaction_hash": "0x…"`.
            Regex::new(r#"(?i)transaction[_ ]hash"?:\s*"?(0x[0-9a-fA-F]+)"#).expect("valid regex"),
            // Generic hash label.
            Regex::new(r#"(?i)\bhash"?:\s*"?(0x[0-9a-fA-F]+)"#).expect("valid regex"),
            // Bare 64-66 character hex token with a 0x prefix.
            Regex::new(r"\b(0x[0-9a-fA-F]{62,64})\b").expect("valid regex"),
        ]
    })
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b0x[0-9a-fA-F]+\b").expect("valid regex"))
}

fn module_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)\bmodule\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid regex"))
}

/// Parse raw publish output into its structured fields.
///
/// Fails with [`DeployError::UnrecognizedOutput`] when no transaction
/// identifier pattern matches; no placeholder value is ever invented.
pub fn parse_publish_output(raw: &str) -> Result<ParsedPublish> {
    let tx_hash = extract_tx_hash(raw).ok_or(DeployError::UnrecognizedOutput)?;

    let mut seen = HashSet::new();
    let addresses: Vec<String> = address_pattern()
        .find_iter(raw)
        .map(|m| m.as_str().to_string())
        .filter(|token| *token != tx_hash)
        .filter(|token| seen.insert(token.clone()))
        .collect();

    let modules: Vec<String> = module_pattern()
        .captures_iter(raw)
        .map(|captures| captures[1].to_string())
        .collect();

    Ok(ParsedPublish {
        tx_hash,
        addresses,
        modules,
    })
}

fn extract_tx_hash(raw: &str) -> Option<String> {
    for pattern in tx_hash_patterns() {
        if let Some(captures) = pattern.captures(raw) {
            if let Some(token) = captures.get(1) {
                return Some(token.as_str().to_string());
            }
        }
    }
    None
}
