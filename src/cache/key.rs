//! Cache Key Module
//!
//! Typed cache keys made of a namespace and discriminator segments, plus the
//! patterns used to invalidate them.
//!
//! Keys render as `namespace:seg1:seg2`. Prefix matching compares whole
//! segments, so `transfers:1` never matches `transfers:12:history`.

use std::fmt;
use std::str::FromStr;

use crate::cache::MAX_KEY_LENGTH;
use crate::error::CacheError;

/// Separator between key segments in the rendered form.
pub const KEY_SEPARATOR: char = ':';

/// Trailing marker that turns a textual pattern into a prefix pattern.
pub const WILDCARD: char = '*';

// == Cache Key ==
/// Identifies one logical resource-and-parameter combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    namespace: String,
    parts: Vec<String>,
}

impl CacheKey {
    /// Creates a key with no discriminator segments.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            parts: Vec::new(),
        }
    }

    /// Appends a discriminator segment.
    pub fn with(mut self, part: impl fmt::Display) -> Self {
        self.parts.push(part.to_string());
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Returns true if every segment of `prefix` equals the corresponding
    /// segment of this key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.namespace == prefix.namespace
            && prefix.parts.len() <= self.parts.len()
            && self.parts.iter().zip(&prefix.parts).all(|(a, b)| a == b)
    }

    /// Pattern matching exactly this key.
    pub fn exact(&self) -> KeyPattern {
        KeyPattern::Exact(self.clone())
    }

    /// Pattern matching this key and every key extending it.
    pub fn prefix(&self) -> KeyPattern {
        KeyPattern::Prefix(self.clone())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace)?;
        for part in &self.parts {
            write!(f, "{}{}", KEY_SEPARATOR, part)?;
        }
        Ok(())
    }
}

impl FromStr for CacheKey {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CacheError::InvalidKey("key cannot be empty".to_string()));
        }
        if s.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if s.contains(WILDCARD) {
            return Err(CacheError::InvalidKey(format!(
                "'{}' is only allowed at the end of a pattern",
                WILDCARD
            )));
        }

        let mut segments = s.split(KEY_SEPARATOR);
        let namespace = segments.next().unwrap_or_default();
        if namespace.is_empty() {
            return Err(CacheError::InvalidKey(format!(
                "key '{}' has an empty namespace",
                s
            )));
        }

        Ok(segments.fold(CacheKey::new(namespace), |key, part| key.with(part)))
    }
}

// == Key Pattern ==
/// Selects keys for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    /// Exactly one key
    Exact(CacheKey),
    /// The key itself and every key that extends it
    Prefix(CacheKey),
}

impl KeyPattern {
    /// Parses the textual form: a trailing `*` means prefix.
    ///
    /// `blockades:*` and `blockades*` both select the whole `blockades`
    /// namespace.
    pub fn parse(s: &str) -> Result<Self, CacheError> {
        match s.strip_suffix(WILDCARD) {
            Some(rest) => {
                let rest = rest.strip_suffix(KEY_SEPARATOR).unwrap_or(rest);
                Ok(KeyPattern::Prefix(rest.parse()?))
            }
            None => Ok(KeyPattern::Exact(s.parse()?)),
        }
    }

    pub fn matches(&self, key: &CacheKey) -> bool {
        match self {
            KeyPattern::Exact(exact) => exact == key,
            KeyPattern::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}

impl From<CacheKey> for KeyPattern {
    fn from(key: CacheKey) -> Self {
        KeyPattern::Exact(key)
    }
}

impl FromStr for KeyPattern {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPattern::parse(s)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Exact(key) => write!(f, "{}", key),
            KeyPattern::Prefix(key) => write!(f, "{}{}{}", key, KEY_SEPARATOR, WILDCARD),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        let key = CacheKey::new("blockades").with("14.600").with("120.900");
        assert_eq!(key.to_string(), "blockades:14.600:120.900");
        assert_eq!(CacheKey::new("hospitals").to_string(), "hospitals");
    }

    #[test]
    fn test_key_parse() {
        let key: CacheKey = "transfers:42:history:2".parse().unwrap();
        assert_eq!(key.namespace(), "transfers");
        assert_eq!(key.parts(), ["42", "history", "2"]);
        assert_eq!(key, CacheKey::new("transfers").with(42).with("history").with(2));
    }

    #[test]
    fn test_key_parse_rejects_invalid() {
        assert!("".parse::<CacheKey>().is_err());
        assert!(":orphan".parse::<CacheKey>().is_err());
        assert!("a:*".parse::<CacheKey>().is_err());
        assert!("x".repeat(MAX_KEY_LENGTH + 1).parse::<CacheKey>().is_err());
    }

    #[test]
    fn test_starts_with_is_segment_wise() {
        let detail = CacheKey::new("transfers").with(12).with("history");
        let one = CacheKey::new("transfers").with(1);
        let twelve = CacheKey::new("transfers").with(12);

        assert!(detail.starts_with(&twelve));
        assert!(!detail.starts_with(&one));
        assert!(detail.starts_with(&CacheKey::new("transfers")));
        assert!(!CacheKey::new("transfer").starts_with(&CacheKey::new("transfers")));
    }

    #[test]
    fn test_pattern_parse_wildcard() {
        let pattern = KeyPattern::parse("blockades:*").unwrap();
        assert_eq!(pattern, KeyPattern::Prefix(CacheKey::new("blockades")));
        assert_eq!(KeyPattern::parse("blockades*").unwrap(), pattern);

        assert!(pattern.matches(&CacheKey::new("blockades").with("all")));
        assert!(pattern.matches(&CacheKey::new("blockades")));
        assert!(!pattern.matches(&CacheKey::new("hospitals").with("all")));
    }

    #[test]
    fn test_pattern_parse_exact() {
        let pattern = KeyPattern::parse("hospitals:all").unwrap();
        assert!(pattern.matches(&CacheKey::new("hospitals").with("all")));
        assert!(!pattern.matches(&CacheKey::new("hospitals").with("all").with("x")));
    }

    #[test]
    fn test_pattern_rejects_bare_wildcard() {
        assert!(KeyPattern::parse("*").is_err());
    }

    #[test]
    fn test_pattern_display_roundtrip() {
        let pattern = CacheKey::new("chat").prefix();
        assert_eq!(pattern.to_string(), "chat:*");
        assert_eq!(KeyPattern::parse(&pattern.to_string()).unwrap(), pattern);
    }
}
