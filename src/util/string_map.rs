use std::collections::HashMap;
use std::str::FromStr;

/// StringMap is a flat key-value map used for transport settings.
///
/// Text form is one `key=value` pair per line. Values keep everything after the
/// first `=` (only surrounding whitespace on the key is trimmed, and trailing
/// `\r` on the value), so a generator program like
/// `prefix=v1.0 GET /$random_string(5, 10) HTTP/1.1` survives intact.
/// Escapes `\n`, `\r`, `\t` and `\\` in values are expanded, which lets
/// multi-line prefixes live on one line. Lines starting with `#` are comments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringMap(HashMap<String, String>);

impl StringMap {
    /// Create a new empty StringMap
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Insert a key-value pair into the map
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Get a value and parse it, reporting the key on failure.
    /// An empty value counts as absent.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, String>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key).map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|e| format!("invalid value for '{}': {}", key, e)),
        }
    }

    /// Parse from text in format: "key=value\nkey2=value2\n..."
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut map = HashMap::new();
        let text = String::from_utf8_lossy(data);

        for line in text.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.strip_suffix('\r').unwrap_or(value);
                map.insert(key.trim().to_string(), unescape(value));
            }
        }

        Self(map)
    }
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

impl std::ops::Deref for StringMap {
    type Target = HashMap<String, String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<HashMap<String, String>> for StringMap {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}
