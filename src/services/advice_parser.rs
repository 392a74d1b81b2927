use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{AdviceOutcome, AdviceShape};

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("fence pattern is valid")
    })
}

/// Pulls the JSON object out of a model reply.
///
/// Models often wrap JSON in Markdown fences or add a sentence around it.
pub fn extract_json_object(reply: &str) -> Option<Map<String, Value>> {
    let trimmed = reply.trim();

    let candidates = [
        Some(trimmed),
        fence_regex()
            .captures(trimmed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
        match (trimmed.find('{'), trimmed.rfind('}')) {
            (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
            _ => None,
        },
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Object(object)) => Some(object),
            _ => None,
        })
}

/// Models sometimes answer `15` where a string is expected; scalars are
/// rendered as text when the default for that field is a string.
fn coerce_scalar(default: Option<&Value>, value: &Value) -> Value {
    match (default, value) {
        (Some(Value::String(_)), Value::Number(n)) => Value::String(n.to_string()),
        (Some(Value::String(_)), Value::Bool(b)) => Value::String(b.to_string()),
        _ => value.clone(),
    }
}

/// Parses a reply against the advice shape `T`.
///
/// Each field is checked on its own. Fields present with a usable type are
/// kept; missing or wrongly typed ones take their defaults and make the
/// outcome a fallback so it is never mistaken for, or cached as, genuine
/// advice.
pub fn parse_advice<T: AdviceShape>(reply: &str) -> AdviceOutcome<T> {
    let Some(object) = extract_json_object(reply) else {
        return AdviceOutcome::Fallback {
            advice: T::fallback(),
            reason: "reply did not contain a JSON object".to_string(),
        };
    };

    let defaults = match serde_json::to_value(T::fallback()) {
        Ok(Value::Object(defaults)) => defaults,
        _ => Map::new(),
    };

    let mut merged = defaults.clone();
    let mut missing = Vec::new();
    let mut mistyped = Vec::new();
    for field in T::FIELDS {
        let value = match object.get(*field) {
            Some(value) if !value.is_null() => coerce_scalar(defaults.get(*field), value),
            _ => {
                missing.push(*field);
                continue;
            }
        };

        let mut candidate = defaults.clone();
        candidate.insert((*field).to_string(), value.clone());
        if serde_json::from_value::<T>(Value::Object(candidate)).is_ok() {
            merged.insert((*field).to_string(), value);
        } else {
            mistyped.push(*field);
        }
    }

    let advice = match serde_json::from_value::<T>(Value::Object(merged)) {
        Ok(advice) => advice,
        Err(e) => {
            return AdviceOutcome::Fallback {
                advice: T::fallback(),
                reason: format!("reply did not match the expected shape: {}", e),
            }
        }
    };

    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing field(s): {}", missing.join(", ")));
    }
    if !mistyped.is_empty() {
        problems.push(format!("wrongly typed field(s): {}", mistyped.join(", ")));
    }

    if problems.is_empty() {
        AdviceOutcome::Parsed(advice)
    } else {
        AdviceOutcome::Fallback {
            advice,
            reason: format!("reply {}", problems.join("; ")),
        }
    }
}
