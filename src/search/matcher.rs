//! Line matchers.
//!
//! Case-sensitive literals go through `memchr::memmem`; case-insensitive
//! literals and regular expressions use the ripgrep `RegexMatcher`. A pattern
//! that fails to compile degrades to a literal match on the same text.

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use memchr::memmem::Finder;

#[derive(Debug, Clone)]
pub enum LineMatcher {
    Literal(Finder<'static>),
    Pattern(RegexMatcher),
}

impl LineMatcher {
    pub fn new(text: &str, case_sensitive: bool, use_regex: bool) -> Self {
        if use_regex {
            match RegexMatcherBuilder::new()
                .case_insensitive(!case_sensitive)
                .build(text)
            {
                Ok(matcher) => return Self::Pattern(matcher),
                Err(e) => {
                    log::warn!("invalid regex {:?}, matching literally: {}", text, e);
                }
            }
        }
        Self::literal(text, case_sensitive)
    }

    fn literal(text: &str, case_sensitive: bool) -> Self {
        if !case_sensitive {
            match RegexMatcherBuilder::new()
                .case_insensitive(true)
                .fixed_strings(true)
                .build(text)
            {
                Ok(matcher) => return Self::Pattern(matcher),
                Err(e) => {
                    log::warn!("case-insensitive literal {:?} unavailable: {}", text, e);
                }
            }
        }
        Self::Literal(Finder::new(text.as_bytes()).into_owned())
    }

    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Self::Literal(finder) => finder.find(line.as_bytes()).is_some(),
            Self::Pattern(matcher) => matcher.is_match(line.as_bytes()).unwrap_or(false),
        }
    }

    /// Byte ranges of all non-overlapping matches in `line`
    pub fn find_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        let haystack = line.as_bytes();
        match self {
            Self::Literal(finder) => {
                let len = finder.needle().len();
                finder
                    .find_iter(haystack)
                    .map(|start| (start, start + len))
                    .collect()
            }
            Self::Pattern(matcher) => {
                let mut ranges = Vec::new();
                let _ = matcher.find_iter(haystack, |m| {
                    ranges.push((m.start(), m.end()));
                    true
                });
                ranges
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_sensitive_literal() {
        let matcher = LineMatcher::new("Error", true, false);
        assert!(matches!(matcher, LineMatcher::Literal(_)));
        assert!(matcher.is_match(r#"{"level":"Error"}"#));
        assert!(!matcher.is_match(r#"{"level":"error"}"#));
    }

    #[test]
    fn test_case_insensitive_literal() {
        let matcher = LineMatcher::new("ERROR", false, false);
        assert!(matcher.is_match(r#"{"level":"error"}"#));
        assert_eq!(matcher.find_ranges("error Error"), vec![(0, 5), (6, 11)]);
    }

    #[test]
    fn test_literal_treats_metacharacters_plainly() {
        let matcher = LineMatcher::new("a.b", false, false);
        assert!(matcher.is_match("xa.by"));
        assert!(!matcher.is_match("axb"));
    }

    #[test]
    fn test_regex() {
        let matcher = LineMatcher::new(r#""id":\s*\d{3}\b"#, true, true);
        assert!(matcher.is_match(r#"{"id": 123}"#));
        assert!(!matcher.is_match(r#"{"id": 12}"#));
    }

    #[test]
    fn test_invalid_regex_falls_back_to_literal() {
        let matcher = LineMatcher::new("a[b", true, true);
        assert!(matcher.is_match("xxa[bxx"));
        assert!(!matcher.is_match("ab"));
    }

    #[test]
    fn test_literal_ranges() {
        let matcher = LineMatcher::new("ab", true, false);
        assert_eq!(matcher.find_ranges("ab-ab-a"), vec![(0, 2), (3, 5)]);
        assert!(matcher.find_ranges("none").is_empty());
    }
}
