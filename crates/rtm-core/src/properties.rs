// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Flat, dotted-key property map.
//!
//! All configuration reaches the engine as a `Properties` value: connector
//! profiles (`dataport.interface_type = inproc`), buffer policies
//! (`buffer.write.full_policy = block`), publisher settings
//! (`publisher.push_rate = 100.0`), execution-context settings (`rate`).
//! The engine reads only the keys it knows; everything else passes through
//! untouched.
//!
//! # Example
//!
//! ```rust
//! use rtm_core::Properties;
//!
//! let props = Properties::from_pairs([
//!     ("buffer.length", "16"),
//!     ("buffer.write.full_policy", "block"),
//!     ("publisher.push_policy", "fifo"),
//! ]);
//!
//! let buffer = props.node("buffer");
//! assert_eq!(buffer.get("length"), Some("16"));
//! assert_eq!(buffer.parse::<usize>("length"), Some(16));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Ordered string-keyed property map with `a.b.c` hierarchical keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut props = Self::new();
        for (k, v) in pairs {
            props.set(k, v);
        }
        props
    }

    /// Set `key` to `value`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value of `key`, or `default` when absent or empty.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => v,
            _ => default,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Sub-tree below `prefix`, with the prefix (and its dot) stripped.
    pub fn node(&self, prefix: &str) -> Properties {
        let dotted = format!("{}.", prefix);
        let entries = self
            .entries
            .range(dotted.clone()..)
            .take_while(|(k, _)| k.starts_with(&dotted))
            .map(|(k, v)| (k[dotted.len()..].to_string(), v.clone()))
            .collect();
        Properties { entries }
    }

    /// Copy every entry of `other` below `prefix` (empty prefix = top level).
    pub fn merge_node(&mut self, prefix: &str, other: &Properties) {
        for (k, v) in other.iter() {
            let key = if prefix.is_empty() {
                k.to_string()
            } else {
                format!("{}.{}", prefix, k)
            };
            self.entries.insert(key, v.to_string());
        }
    }

    /// Overlay `other` on top of `self` (other wins).
    pub fn merge(&mut self, other: &Properties) {
        self.merge_node("", other);
    }

    /// Parse `key` with `FromStr`, ignoring surrounding whitespace.
    pub fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }

    /// Duration from a value expressed in (fractional) seconds.
    ///
    /// Negative, non-finite, out-of-range or unparsable values yield `None`.
    pub fn duration_secs(&self, key: &str) -> Option<Duration> {
        let secs: f64 = self.parse(key)?;
        Duration::try_from_secs_f64(secs).ok()
    }

    /// Boolean view of `key` (see [`to_bool`]).
    pub fn flag(&self, key: &str, true_word: &str, false_word: &str, default: bool) -> bool {
        match self.get(key) {
            Some(v) => to_bool(v, true_word, false_word, default),
            None => default,
        }
    }
}

impl fmt::Display for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            writeln!(f, "{}: {}", k, v)?;
        }
        Ok(())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Properties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Interpret `value` as a boolean.
///
/// Case-insensitive match against `true_word` / `false_word`; anything else
/// yields `default`. The common spellings `yes/no`, `true/false`, `on/off`
/// and `1/0` are accepted as well.
pub fn to_bool(value: &str, true_word: &str, false_word: &str, default: bool) -> bool {
    let v = value.trim();
    if v.eq_ignore_ascii_case(true_word) {
        return true;
    }
    if v.eq_ignore_ascii_case(false_word) {
        return false;
    }
    match v.to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => true,
        "no" | "false" | "off" | "0" => false,
        _ => default,
    }
}

/// Lowercase + trim, for policy words (`" Overwrite "` -> `"overwrite"`).
pub fn normalize(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

#[cfg(feature = "yaml")]
pub use yaml::{from_yaml_file, from_yaml_str};

#[cfg(feature = "yaml")]
mod yaml {
    //! YAML loader: nested mappings become dotted keys.
    //!
    //! ```yaml
    //! buffer:
    //!   length: 16
    //!   write:
    //!     full_policy: block
    //!     timeout: 0.5
    //! publisher:
    //!   push_policy: fifo
    //! ```

    use super::Properties;
    use crate::error::{Error, Result};
    use serde_yaml::Value;
    use std::fs;
    use std::path::Path;

    /// Parse a YAML document into flattened properties.
    pub fn from_yaml_str(doc: &str) -> Result<Properties> {
        let root: Value =
            serde_yaml::from_str(doc).map_err(|e| Error::Config(format!("yaml: {}", e)))?;
        let mut props = Properties::new();
        flatten("", &root, &mut props)?;
        Ok(props)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Properties> {
        let doc = fs::read_to_string(path.as_ref())?;
        from_yaml_str(&doc)
    }

    fn flatten(prefix: &str, value: &Value, out: &mut Properties) -> Result<()> {
        match value {
            Value::Mapping(map) => {
                for (k, v) in map {
                    let key = scalar(k).ok_or_else(|| {
                        Error::Config(format!("non-scalar key under '{}'", prefix))
                    })?;
                    let full = if prefix.is_empty() {
                        key
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    flatten(&full, v, out)?;
                }
                Ok(())
            }
            Value::Sequence(items) => {
                let joined: Option<Vec<String>> = items.iter().map(scalar).collect();
                let joined = joined.ok_or_else(|| {
                    Error::Config(format!("nested sequence under '{}'", prefix))
                })?;
                out.set(prefix, joined.join(","));
                Ok(())
            }
            Value::Tagged(tagged) => flatten(prefix, &tagged.value, out),
            other => {
                if let Some(s) = scalar(other) {
                    out.set(prefix, s);
                }
                Ok(())
            }
        }
    }

    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_flatten_nested() {
            let props = from_yaml_str(
                "buffer:\n  length: 16\n  write:\n    full_policy: block\npublisher:\n  push_rate: 50.0\n",
            )
            .expect("valid yaml");
            assert_eq!(props.get("buffer.length"), Some("16"));
            assert_eq!(props.get("buffer.write.full_policy"), Some("block"));
            assert_eq!(props.parse::<f64>("publisher.push_rate"), Some(50.0));
        }

        #[test]
        fn test_from_file() {
            let mut file = tempfile::NamedTempFile::new().expect("temp file");
            writeln!(file, "rate: 250\nsync_transition: YES").expect("write yaml");
            let props = from_yaml_file(file.path()).expect("load yaml");
            assert_eq!(props.parse::<f64>("rate"), Some(250.0));
            assert!(props.flag("sync_transition", "YES", "NO", false));
        }

        #[test]
        fn test_invalid_yaml_is_config_error() {
            assert!(matches!(from_yaml_str("a: [b"), Err(Error::Config(_))));
        }
    }
}
