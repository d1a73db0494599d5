//! Regex-based path substitution.
//!
//! # Responsibilities
//! - Match a compiled pattern against the request path
//! - Substitute every non-overlapping match with the replacement template
//! - Report whether the path actually changed
//!
//! # Design Decisions
//! - The decoded path is matched, unless decoding would lose information
//!   (an encoded `/` for example). Then the raw encoded path is matched so
//!   escaped reserved characters survive the rewrite.
//! - A substitution that reproduces the original path is not a rewrite

use std::borrow::Cow;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use url::Url;

use crate::config::error::ConfigError;
use crate::rewrite::Rewrite;

/// Characters escaped when turning a decoded path back into its wire form.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Rewrites the URL path with a regular expression.
///
/// The replacement supports `$1` and `${name}` capture references.
#[derive(Debug, Clone)]
pub struct RegexPathRewriter {
    pattern: Regex,
    replacement: String,
}

impl RegexPathRewriter {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Result<Self, ConfigError> {
        let compiled = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            replacement: replacement.into(),
        })
    }
}

impl Rewrite for RegexPathRewriter {
    fn apply(&self, url: &mut Url) -> bool {
        let target = MatchTarget::of(url.path());
        let rewritten = self.pattern.replace_all(target.as_str(), self.replacement.as_str());
        if rewritten == target.as_str() {
            return false;
        }

        let encoded = match target {
            MatchTarget::Decoded(_) => encode_path(&rewritten),
            MatchTarget::Raw(_) => rewritten.into_owned(),
        };
        let before = url.path().to_string();
        url.set_path(&encoded);
        url.path() != before
    }
}

/// The form of the path a rule is evaluated against.
enum MatchTarget<'a> {
    Decoded(Cow<'a, str>),
    Raw(&'a str),
}

impl<'a> MatchTarget<'a> {
    fn of(raw: &'a str) -> Self {
        match percent_decode_str(raw).decode_utf8() {
            Ok(decoded) if encode_path(&decoded) == raw => MatchTarget::Decoded(decoded),
            _ => MatchTarget::Raw(raw),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            MatchTarget::Decoded(s) => s.as_ref(),
            MatchTarget::Raw(s) => *s,
        }
    }
}

fn encode_path(decoded: &str) -> String {
    utf8_percent_encode(decoded, PATH).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_rewrites_matching_path() {
        let rewriter = RegexPathRewriter::new("/foo/", "/bar/").unwrap();
        let mut u = url("http://example.com/foo/path?q=qv#frag");

        assert!(rewriter.apply(&mut u));
        assert_eq!(u.as_str(), "http://example.com/bar/path?q=qv#frag");
    }

    #[test]
    fn test_reports_unchanged_when_nothing_matches() {
        let rewriter = RegexPathRewriter::new("^/nomatch", "/x").unwrap();
        let mut u = url("http://example.com/foo/path");

        assert!(!rewriter.apply(&mut u));
        assert_eq!(u.path(), "/foo/path");
    }

    #[test]
    fn test_identity_replacement_is_not_a_rewrite() {
        let rewriter = RegexPathRewriter::new("/foo", "/foo").unwrap();
        let mut u = url("http://example.com/foo/path");

        assert!(!rewriter.apply(&mut u));
        assert_eq!(u.path(), "/foo/path");
    }

    #[test]
    fn test_replaces_all_matches() {
        let rewriter = RegexPathRewriter::new("a", "b").unwrap();
        let mut u = url("http://example.com/a/a/c");

        assert!(rewriter.apply(&mut u));
        assert_eq!(u.path(), "/b/b/c");
    }

    #[test]
    fn test_capture_references() {
        let rewriter = RegexPathRewriter::new(r"^/v(\d+)/(?P<rest>.*)$", "/api/$1/${rest}").unwrap();
        let mut u = url("http://example.com/v2/users/7");

        assert!(rewriter.apply(&mut u));
        assert_eq!(u.path(), "/api/2/users/7");
    }

    #[test]
    fn test_matches_decoded_path() {
        let rewriter = RegexPathRewriter::new("/hello world/", "/hi there/").unwrap();
        let mut u = url("http://example.com/hello%20world/x");

        assert!(rewriter.apply(&mut u));
        assert_eq!(u.path(), "/hi%20there/x");
    }

    #[test]
    fn test_keeps_encoded_slash() {
        let rewriter = RegexPathRewriter::new("^/files/", "/blobs/").unwrap();
        let mut u = url("http://example.com/files/a%2Fb");

        assert!(rewriter.apply(&mut u));
        assert_eq!(u.path(), "/blobs/a%2Fb");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = RegexPathRewriter::new("(unclosed", "/x").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }
}
