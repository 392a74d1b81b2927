use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

const KEY_PREFIX: &str = "fingenius";

/// Escapes the separators so distinct part lists never render to the same key.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            '=' => out.push_str("%3D"),
            _ => out.push(c),
        }
    }
    out
}

/// Deterministic cache key derived from the inputs of a logical request.
///
/// Renders as `fingenius:{namespace}:{name}={value}:...`. Parts are appended
/// in call order, so callers must add them in a fixed order. Floats are keyed
/// by their bit pattern after normalising `-0.0`.
#[derive(Debug, Clone)]
pub struct CacheKey {
    namespace: String,
    parts: Vec<(String, String)>,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.parts.push((name.to_string(), value.to_string()));
        self
    }

    pub fn float(self, name: &str, value: f64) -> Self {
        let normalised = if value == 0.0 { 0.0_f64 } else { value };
        self.part(name, format!("{:016x}", normalised.to_bits()))
    }

    /// Symbols are keyed case-insensitively.
    pub fn symbol(self, symbol: &str) -> Self {
        self.part("symbol", symbol.trim().to_uppercase())
    }

    /// Free text (prompts, descriptions) goes in hashed to keep keys short.
    pub fn text(self, name: &str, value: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        self.part(name, format!("{:x}", hasher.finish()))
    }

    pub fn build(&self) -> String {
        let mut key = format!("{}:{}", KEY_PREFIX, self.namespace);
        for (name, value) in &self.parts {
            key.push(':');
            key.push_str(&escape(name));
            key.push('=');
            key.push_str(&escape(value));
        }
        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}
