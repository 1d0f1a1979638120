//! Payload parsing.
//!
//! A configuration payload is either JSON (when the caller asks for it) or
//! a permissive `KEY=VALUE` text:
//!
//! ```text
//! # comment
//! // comment
//! DB_HOST = db.internal
//! DB_PORT=5432
//! ```
//!
//! Blank and comment lines are skipped. Lines without `=` or with an empty
//! key are logged and skipped, and a payload with no `=` at all is returned
//! untouched.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::SconfigError;

/// A parsed configuration payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Config {
    /// JSON mode.
    Json(Value),
    /// `KEY=VALUE` pairs, keyed by name.
    Pairs(BTreeMap<String, String>),
    /// A payload without any `=`, returned as-is.
    Raw(String),
}

impl Config {
    /// Look up a `KEY=VALUE` entry, or a top-level string in a JSON object.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            Self::Pairs(pairs) => pairs.get(key).map(String::as_str),
            Self::Json(value) => value.get(key).and_then(Value::as_str),
            Self::Raw(_) => None,
        }
    }
}

/// Parse `text` as JSON when `json` is set, as `KEY=VALUE` lines otherwise.
///
/// With `mirror_env`, every parsed pair is also exported to the process
/// environment.
pub fn parse(text: &str, json: bool, mirror_env: bool) -> Result<Config, SconfigError> {
    if json {
        return serde_json::from_str(text).map(Config::Json).map_err(|err| {
            tracing::warn!("received invalid JSON configuration");
            SconfigError::Parse(err.to_string())
        });
    }

    if !text.contains('=') {
        return Ok(Config::Raw(text.to_string()));
    }

    let pairs = parse_pairs(text);
    if mirror_env {
        mirror_into_env(&pairs);
    }
    Ok(Config::Pairs(pairs))
}

fn parse_pairs(text: &str) -> BTreeMap<String, String> {
    let mut pairs = BTreeMap::new();
    for line in text.split('\n') {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            tracing::warn!(line, "skipping configuration line without '='");
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            tracing::warn!(line, "skipping configuration line with an empty key");
            continue;
        }
        pairs.insert(key.to_string(), value.trim().to_string());
    }
    pairs
}

/// Export pairs to the process environment. Pairs the platform cannot
/// represent (NUL bytes) are logged and left out of the environment; they
/// stay in the parsed config.
fn mirror_into_env(pairs: &BTreeMap<String, String>) {
    for (key, value) in pairs {
        if key.contains('\0') || value.contains('\0') {
            tracing::warn!(
                key = %key.escape_debug(),
                "not exporting configuration pair containing NUL"
            );
            continue;
        }
        std::env::set_var(key, value);
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Config {
        Config::Pairs(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_key_value_with_comment_and_blank_lines() {
        let parsed = parse("A=1\n# comment\nB=2\n\n", false, false).unwrap();
        assert_eq!(parsed, pairs(&[("A", "1"), ("B", "2")]));
    }

    #[test]
    fn test_no_equals_returns_raw() {
        let parsed = parse("just some text\n", false, false).unwrap();
        assert_eq!(parsed, Config::Raw("just some text\n".to_string()));
    }

    #[test]
    fn test_crlf_slashes_and_invalid_lines() {
        let text = "// header\r\n  HOST = example.org \r\nnot a pair\r\nURL=http://x/?a=b\r\n";
        let parsed = parse(text, false, false).unwrap();
        assert_eq!(
            parsed,
            pairs(&[("HOST", "example.org"), ("URL", "http://x/?a=b")])
        );
        assert_eq!(parsed.get("URL"), Some("http://x/?a=b"));
    }

    #[test]
    fn test_json_mode() {
        let parsed = parse(r#"{"a":"b","n":1}"#, true, false).unwrap();
        assert_eq!(parsed.get("a"), Some("b"));
        assert!(matches!(parse("A=1", true, false), Err(SconfigError::Parse(_))));
    }

    #[test]
    fn test_empty_key_is_skipped() {
        let parsed = parse("=orphan\n  = spaced\nSCONFIG_PARSE_TEST_KEPT=1\n", false, true).unwrap();
        assert_eq!(parsed, pairs(&[("SCONFIG_PARSE_TEST_KEPT", "1")]));
    }

    #[test]
    fn test_nul_bytes_are_not_exported() {
        let parsed = parse(
            "SCONFIG_PARSE_TEST_NUL=x\0y\nSCONFIG_PARSE\0_KEY=v\nSCONFIG_PARSE_TEST_OK=z\n",
            false,
            true,
        )
        .unwrap();

        assert_eq!(parsed.get("SCONFIG_PARSE_TEST_NUL"), Some("x\0y"));
        assert!(std::env::var("SCONFIG_PARSE_TEST_NUL").is_err());
        assert_eq!(std::env::var("SCONFIG_PARSE_TEST_OK").as_deref(), Ok("z"));
    }

    #[test]
    fn test_mirrors_into_environment() {
        parse("SCONFIG_PARSE_TEST_MIRROR=on", false, true).unwrap();
        assert_eq!(
            std::env::var("SCONFIG_PARSE_TEST_MIRROR").as_deref(),
            Ok("on")
        );
    }
}
