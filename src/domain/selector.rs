//! Label selectors used to pick which dependencies belong to a project run
//!
//! Supports the Kubernetes label query syntax: `k=v`, `k==v`, `k!=v`,
//! `k in (a,b)`, `k notin (a,b)`, `k` and `!k`, joined by commas.

use crate::error::{CiuxError, Result};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[-A-Za-z0-9_./]*[A-Za-z0-9])?$").expect("static regex")
    })
}

fn value_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9](?:[-A-Za-z0-9_.]*[A-Za-z0-9])?)?$").expect("static regex")
    })
}

fn set_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\S+)\s+(in|notin)\s*\(([^()]*)\)$").expect("static regex")
    })
}

/// A single label constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, Vec<String>),
    NotIn(String, Vec<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Requirement::Equals(k, v) => labels.get(k) == Some(v),
            Requirement::NotEquals(k, v) => labels.get(k) != Some(v),
            Requirement::In(k, values) => labels.get(k).is_some_and(|l| values.contains(l)),
            Requirement::NotIn(k, values) => !labels.get(k).is_some_and(|l| values.contains(l)),
            Requirement::Exists(k) => labels.contains_key(k),
            Requirement::DoesNotExist(k) => !labels.contains_key(k),
        }
    }

    fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Err(CiuxError::selector("empty requirement"));
        }

        if let Some(captures) = set_pattern().captures(expr) {
            let key = checked_key(&captures[1])?;
            let values = captures[3]
                .split(',')
                .map(|v| checked_value(v.trim()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(match &captures[2] {
                "in" => Requirement::In(key, values),
                _ => Requirement::NotIn(key, values),
            });
        }

        if let Some(key) = expr.strip_prefix('!') {
            if !key.contains('=') {
                return Ok(Requirement::DoesNotExist(checked_key(key.trim())?));
            }
        }

        if let Some((key, value)) = expr.split_once("!=") {
            return Ok(Requirement::NotEquals(
                checked_key(key.trim())?,
                checked_value(value.trim())?,
            ));
        }
        if let Some((key, value)) = expr.split_once("==") {
            return Ok(Requirement::Equals(
                checked_key(key.trim())?,
                checked_value(value.trim())?,
            ));
        }
        if let Some((key, value)) = expr.split_once('=') {
            return Ok(Requirement::Equals(
                checked_key(key.trim())?,
                checked_value(value.trim())?,
            ));
        }

        Ok(Requirement::Exists(checked_key(expr)?))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Equals(k, v) => write!(f, "{}={}", k, v),
            Requirement::NotEquals(k, v) => write!(f, "{}!={}", k, v),
            Requirement::In(k, values) => write!(f, "{} in ({})", k, values.join(",")),
            Requirement::NotIn(k, values) => write!(f, "{} notin ({})", k, values.join(",")),
            Requirement::Exists(k) => write!(f, "{}", k),
            Requirement::DoesNotExist(k) => write!(f, "!{}", k),
        }
    }
}

fn checked_key(key: &str) -> Result<String> {
    if key_pattern().is_match(key) {
        Ok(key.to_string())
    } else {
        Err(CiuxError::selector(format!("invalid label key {:?}", key)))
    }
}

fn checked_value(value: &str) -> Result<String> {
    if value_pattern().is_match(value) {
        Ok(value.to_string())
    } else {
        Err(CiuxError::selector(format!("invalid label value {:?}", value)))
    }
}

/// Conjunction of label requirements
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector matching every label set
    pub fn everything() -> Self {
        Selector::default()
    }

    pub fn parse(expr: &str) -> Result<Self> {
        if expr.trim().is_empty() {
            return Ok(Selector::everything());
        }

        let requirements = split_top_level(expr)?
            .into_iter()
            .map(Requirement::parse)
            .collect::<Result<Vec<_>>>()?;

        Ok(Selector { requirements })
    }

    pub fn is_everything(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    /// Suffix used to name per-selector output files
    ///
    /// "build=true,ci" -> "_build_true-ci"; empty for the everything selector.
    pub fn to_file_suffix(&self) -> String {
        if self.is_everything() {
            return String::new();
        }
        format!("_{}", self.to_string().replace('=', "_").replace(',', "-"))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Split on commas that are not inside a value set
fn split_top_level(expr: &str) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| CiuxError::selector(format!("unbalanced ')' in {:?}", expr)))?;
            }
            ',' if depth == 0 => {
                parts.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(CiuxError::selector(format!("unbalanced '(' in {:?}", expr)));
    }
    parts.push(&expr[start..]);
    Ok(parts)
}
