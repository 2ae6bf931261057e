//! Pattern matching for the `MATCH` and `LIKE` operators
//!
//! `MATCH` patterns use `*` (any run) and `?` (any one character),
//! anchored at both ends. `LIKE` patterns use SQL `%` and `_`, also
//! anchored. Both match case-insensitively.

use glob::Pattern as GlobPattern;
use regex::Regex;

/// Compiled `MATCH` wildcard pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    glob: GlobPattern,
}

impl WildcardPattern {
    /// Compile a wildcard pattern. Only `*` and `?` are special; glob
    /// character classes in the input are escaped so they match
    /// literally.
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        let escaped = escape_for_glob(&pattern.to_lowercase());
        Ok(Self {
            glob: GlobPattern::new(&escaped)?,
        })
    }

    /// Test a value against the pattern
    pub fn matches(&self, value: &str) -> bool {
        self.glob.matches(&value.to_lowercase())
    }
}

/// Escape glob specials that are not wildcard syntax here
fn escape_for_glob(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '[' => out.push_str("[[]"),
            ']' => out.push_str("[]]"),
            _ => out.push(c),
        }
    }
    out
}

/// Compiled SQL `LIKE` pattern
#[derive(Debug, Clone)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    /// Translate a `LIKE` pattern to an anchored regex and compile it
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push_str("(?is)^");
        for c in pattern.chars() {
            match c {
                '%' => source.push_str(".*"),
                '_' => source.push('.'),
                c => source.push_str(&regex::escape(&c.to_string())),
            }
        }
        source.push('$');
        Ok(Self {
            regex: Regex::new(&source)?,
        })
    }

    /// Test a value against the pattern
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_star() {
        let p = WildcardPattern::new("Assume*").unwrap();
        assert!(p.matches("AssumeRole"));
        assert!(p.matches("Assume"));
        assert!(!p.matches("ReAssumeRole"));
    }

    #[test]
    fn test_wildcard_question() {
        let p = WildcardPattern::new("Get?bject").unwrap();
        assert!(p.matches("GetObject"));
        assert!(!p.matches("GetObjects"));
        assert!(!p.matches("Getbject"));
    }

    #[test]
    fn test_wildcard_anchored() {
        let p = WildcardPattern::new("Role").unwrap();
        assert!(!p.matches("AssumeRole"));
        assert!(p.matches("Role"));
    }

    #[test]
    fn test_wildcard_case_insensitive() {
        let p = WildcardPattern::new("assume*").unwrap();
        assert!(p.matches("AssumeRole"));
    }

    #[test]
    fn test_wildcard_literal_brackets() {
        let p = WildcardPattern::new("a[1]*").unwrap();
        assert!(p.matches("a[1]b"));
        assert!(!p.matches("a1b"));
    }

    #[test]
    fn test_like_percent() {
        let p = LikePattern::new("%Denied%").unwrap();
        assert!(p.matches("AccessDenied"));
        assert!(p.matches("DeniedAccess"));
        assert!(!p.matches("Allowed"));
    }

    #[test]
    fn test_like_underscore() {
        let p = LikePattern::new("Get_bject").unwrap();
        assert!(p.matches("GetObject"));
        assert!(!p.matches("GetObbject"));
    }

    #[test]
    fn test_like_anchored_and_escaped() {
        let p = LikePattern::new("a.b").unwrap();
        assert!(p.matches("a.b"));
        assert!(!p.matches("axb"));
        assert!(!p.matches("za.bz"));
    }
}
