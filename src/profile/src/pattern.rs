//! Glob-style attachment pattern compiler
//!
//! Attachment patterns name subjects and objects with a small glob language:
//!
//! - `?` matches one character other than `/`
//! - `*` matches within one path segment
//! - `**` matches across path segments
//! - `{a,b,c}` matches any of the alternatives (groups may nest)
//! - `.`, `+` and `$` are literal; other regex syntax passes through
//!
//! A wildcard that picks up right after a `/` in the candidate must match at
//! least one character, so `/foo/*` does not match `/foo/`. Every compiled pattern is anchored at
//! both ends unless the pattern starts with `^` or ends with `$` itself.
//!
//! # Examples
//!
//! ```
//! use comarmor_profile::pattern::compile;
//!
//! let pattern = compile("/foo/*").unwrap();
//! assert!(pattern.is_match("/foo/bar"));
//! assert!(!pattern.is_match("/foo/bar/baz"));
//! assert!(!pattern.is_match("/foo"));
//! ```

use crate::error::PatternError;
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const SEPARATOR: char = '/';

const SEGMENT_ANY: &str = "[^/\\x00]*";
const SEGMENT_SOME: &str = "[^/\\x00]+";
const PATH_ANY: &str = "[^\\x00]*";
const PATH_SOME: &str = "[^\\x00]+";
const SINGLE: &str = "[^/\\x00]";

/// A compiled attachment pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Whether the whole candidate matches
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The glob pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The translated regular expression
    pub fn regex_source(&self) -> &str {
        self.regex.as_str()
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile a glob pattern into an anchored matcher
///
/// # Errors
///
/// - [`PatternError::Empty`] for a blank pattern
/// - [`PatternError::UnbalancedBrace`] for an unmatched `{` or `}`
/// - [`PatternError::InvalidRegex`] when passed-through regex syntax is invalid
pub fn compile(pattern: &str) -> Result<CompiledPattern, PatternError> {
    let translated = translate(pattern)?;
    let regex = Regex::new(&translated).map_err(|e| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CompiledPattern {
        source: pattern.to_string(),
        regex,
    })
}

/// Translate a glob pattern into regex source
///
/// Whether a wildcard follows a separator is decided on the candidate, not
/// on the pattern text: in `{a/,b}*` the `*` must match at least one
/// character after `a/` and may match nothing after `b`.
pub fn translate(pattern: &str) -> Result<String, PatternError> {
    let glob = pattern.trim();
    if glob.is_empty() {
        return Err(PatternError::Empty);
    }

    let lead = pattern.len() - pattern.trim_start().len();
    let mut chars: Vec<(usize, char)> = glob
        .char_indices()
        .map(|(offset, c)| (offset + lead, c))
        .collect();
    if glob.ends_with('$') && !ends_with_escape(glob) {
        chars.pop();
    }
    let skip = usize::from(glob.starts_with('^'));

    let mut parser = Parser {
        pattern,
        chars,
        pos: skip,
    };
    let nodes = parser.parse(Scope::Top)?.into_iter().flatten().collect::<Vec<_>>();
    let body = sequence(&nodes, Boundary::Other);
    Ok(format!("^{}$", body.regex))
}

/// Whether the trailing `$` is escaped by an odd run of backslashes
fn ends_with_escape(glob: &str) -> bool {
    let body = &glob[..glob.len() - 1];
    body.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// What the candidate text matched so far ends with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Separator,
    Other,
}

/// One parsed glob element
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    /// Fixed text; the flag is set when it ends with a separator
    Literal(String, bool),
    /// Character class or class escape
    Class(String),
    /// Zero-width regex syntax passed through
    Assertion(String),
    Single,
    Star,
    DoubleStar,
    /// `{a,b}` or a passed-through `(a|b)`
    Group(Vec<Vec<Node>>),
}

/// Regex for a run of nodes, also split by how its matches end
///
/// `separator` and `other` together match exactly what `regex` matches.
/// `None` means no match ends that way.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fragment {
    regex: String,
    separator: Option<String>,
    other: Option<String>,
}

impl Fragment {
    fn empty(prior: Boundary) -> Self {
        Self::ending("", prior)
    }

    fn ending(regex: &str, boundary: Boundary) -> Self {
        Self {
            regex: regex.to_string(),
            separator: (boundary == Boundary::Separator).then(|| regex.to_string()),
            other: (boundary == Boundary::Other).then(|| regex.to_string()),
        }
    }

    fn prefixed(self, head: &str) -> Self {
        Self {
            regex: format!("{}{}", head, self.regex),
            separator: self.separator.map(|s| format!("{}{}", head, s)),
            other: self.other.map(|o| format!("{}{}", head, o)),
        }
    }

    /// `after_separator` behind the separator-ending matches of `self`,
    /// `after_other` behind the rest
    fn branch(&self, after_separator: Fragment, after_other: Fragment) -> Self {
        let (sep, other) = (self.separator.as_deref(), self.other.as_deref());
        let join = |head: Option<&str>, tail: Option<&String>| {
            head.zip(tail).map(|(h, t)| format!("{}{}", h, t))
        };

        let regex = alternation(vec![
            join(sep, Some(&after_separator.regex)),
            join(other, Some(&after_other.regex)),
        ])
        .unwrap_or_default();
        Self {
            regex,
            separator: alternation(vec![
                join(sep, after_separator.separator.as_ref()),
                join(other, after_other.separator.as_ref()),
            ]),
            other: alternation(vec![
                join(sep, after_separator.other.as_ref()),
                join(other, after_other.other.as_ref()),
            ]),
        }
    }
}

fn alternation(branches: Vec<Option<String>>) -> Option<String> {
    let branches: Vec<String> = branches.into_iter().flatten().collect();
    match branches.len() {
        0 => None,
        1 => branches.into_iter().next(),
        _ => Some(format!("(?:{})", branches.join("|"))),
    }
}

impl Node {
    fn fragment(&self, prior: Boundary) -> Fragment {
        match self {
            Node::Literal(text, ends_with_separator) => Fragment::ending(
                text,
                if *ends_with_separator {
                    Boundary::Separator
                } else {
                    Boundary::Other
                },
            ),
            Node::Class(class) => class_fragment(class),
            Node::Assertion(text) => Fragment::ending(text, prior),
            Node::Single => Fragment::ending(SINGLE, Boundary::Other),
            Node::Star => match prior {
                Boundary::Separator => Fragment::ending(SEGMENT_SOME, Boundary::Other),
                Boundary::Other => Fragment::ending(SEGMENT_ANY, Boundary::Other),
            },
            Node::DoubleStar => match prior {
                Boundary::Separator => Fragment {
                    regex: PATH_SOME.to_string(),
                    separator: Some(format!("{}/", PATH_ANY)),
                    other: Some(format!("{}{}", PATH_ANY, SINGLE)),
                },
                Boundary::Other => Fragment {
                    regex: PATH_ANY.to_string(),
                    separator: Some(format!("{}/", PATH_ANY)),
                    other: Some(format!("(?:{}{})?", PATH_ANY, SINGLE)),
                },
            },
            Node::Group(alternatives) => {
                let parts: Vec<Fragment> = alternatives
                    .iter()
                    .map(|alternative| sequence(alternative, prior))
                    .collect();
                let regexes: Vec<&str> = parts.iter().map(|p| p.regex.as_str()).collect();
                Fragment {
                    regex: format!("({})", regexes.join("|")),
                    separator: alternation(parts.iter().map(|p| p.separator.clone()).collect()),
                    other: alternation(parts.iter().map(|p| p.other.clone()).collect()),
                }
            }
        }
    }
}

/// Split a class by whether it matches the separator
///
/// An invalid class is left whole; compiling the full expression reports it.
fn class_fragment(class: &str) -> Fragment {
    let matches_separator = Regex::new(&format!("^{}$", class))
        .map(|re| re.is_match("/"))
        .unwrap_or(false);
    if !matches_separator {
        return Fragment::ending(class, Boundary::Other);
    }

    let without_separator = format!("[{}&&[^/]]", class);
    Fragment {
        regex: class.to_string(),
        separator: Some("/".to_string()),
        other: Regex::new(&without_separator)
            .is_ok()
            .then_some(without_separator),
    }
}

/// Translate a run of nodes that starts after `prior`
///
/// Only the last node is kept split; it is expanded into both branches when
/// the next node translates differently after a separator.
fn sequence(nodes: &[Node], prior: Boundary) -> Fragment {
    let mut head = String::new();
    let mut tail = Fragment::empty(prior);

    for node in nodes {
        let after_separator = node.fragment(Boundary::Separator);
        let after_other = node.fragment(Boundary::Other);
        tail = match (tail.separator.is_some(), tail.other.is_some()) {
            (true, false) => {
                head.push_str(&tail.regex);
                after_separator
            }
            (true, true) if after_separator != after_other => {
                tail.branch(after_separator, after_other)
            }
            _ => {
                head.push_str(&tail.regex);
                after_other
            }
        };
    }

    tail.prefixed(&head)
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Top,
    /// Brace group opened at this byte offset
    Brace(usize),
    Paren,
}

struct Parser<'a> {
    pattern: &'a str,
    /// Byte offsets into `pattern`
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn unbalanced(&self, position: usize) -> PatternError {
        PatternError::UnbalancedBrace {
            pattern: self.pattern.to_string(),
            position,
        }
    }

    /// Parse up to the end of `scope`, returning its alternatives
    fn parse(&mut self, scope: Scope) -> Result<Vec<Vec<Node>>, PatternError> {
        let mut alternatives = Vec::new();
        let mut current = Vec::new();

        while let Some(&(offset, c)) = self.chars.get(self.pos) {
            self.pos += 1;
            let node = match (c, scope) {
                ('\\', _) => self.escape(),
                ('{', _) => Node::Group(self.parse(Scope::Brace(offset))?),
                ('}', Scope::Brace(_)) | (')', Scope::Paren) => {
                    alternatives.push(current);
                    return Ok(alternatives);
                }
                ('}', _) => return Err(self.unbalanced(offset)),
                ('(', _) => Node::Group(self.parse(Scope::Paren)?),
                (',', Scope::Brace(_)) | ('|', Scope::Brace(_) | Scope::Paren) => {
                    alternatives.push(std::mem::take(&mut current));
                    continue;
                }
                ('[', _) => self.class(offset),
                ('?', _) => Node::Single,
                ('*', _) => {
                    if matches!(self.chars.get(self.pos), Some((_, '*'))) {
                        self.pos += 1;
                        Node::DoubleStar
                    } else {
                        Node::Star
                    }
                }
                ('.' | '+' | '$', _) => Node::Literal(format!("\\{}", c), false),
                ('^' | '|' | ')', _) => Node::Assertion(c.to_string()),
                (c, _) => Node::Literal(c.to_string(), c == SEPARATOR),
            };
            current.push(node);
        }

        match scope {
            Scope::Top => {
                alternatives.push(current);
                Ok(alternatives)
            }
            Scope::Brace(offset) => Err(self.unbalanced(offset)),
            Scope::Paren => Err(PatternError::InvalidRegex {
                pattern: self.pattern.to_string(),
                reason: "unclosed group".to_string(),
            }),
        }
    }

    fn escape(&mut self) -> Node {
        let Some(&(_, escaped)) = self.chars.get(self.pos) else {
            return Node::Literal("\\".to_string(), false);
        };
        self.pos += 1;
        match escaped {
            'b' | 'B' | 'A' | 'z' => Node::Assertion(format!("\\{}", escaped)),
            'd' | 'D' | 'w' | 'W' | 's' | 'S' => Node::Class(format!("\\{}", escaped)),
            c => Node::Literal(format!("\\{}", c), c == SEPARATOR),
        }
    }

    /// Bracket class opened at `start`; an unterminated one is kept as text
    fn class(&mut self, start: usize) -> Node {
        let mut end = self.pos;
        if matches!(self.chars.get(end), Some((_, '^'))) {
            end += 1;
        }
        if matches!(self.chars.get(end), Some((_, ']'))) {
            end += 1;
        }

        let mut depth = 1;
        while let Some(&(offset, c)) = self.chars.get(end) {
            match c {
                '\\' => end += 1,
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = end + 1;
                        return Node::Class(self.pattern[start..=offset].to_string());
                    }
                }
                _ => {}
            }
            end += 1;
        }

        let rest: String = std::iter::once('[')
            .chain(self.chars[self.pos.min(self.chars.len())..].iter().map(|&(_, c)| c))
            .collect();
        self.pos = self.chars.len();
        Node::Literal(rest, false)
    }
}

/// Compiled pattern cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternCacheConfig {
    /// Maximum number of compiled patterns kept
    pub max_entries: usize,
}

impl Default for PatternCacheConfig {
    fn default() -> Self {
        Self { max_entries: 4096 }
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}

/// Thread-safe cache of compiled patterns keyed by pattern text
///
/// Compilation failures are not cached.
pub struct PatternCache {
    config: PatternCacheConfig,
    patterns: DashMap<String, CompiledPattern>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl PatternCache {
    /// Create a cache with the given configuration
    pub fn new(config: PatternCacheConfig) -> Self {
        Self {
            config,
            patterns: DashMap::new(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    /// Compile `pattern`, reusing a previous compilation when available
    pub fn compile(&self, pattern: &str) -> Result<CompiledPattern, PatternError> {
        if let Some(entry) = self.patterns.get(pattern) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(entry.clone());
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let compiled = compile(pattern)?;

        if self.patterns.len() >= self.config.max_entries {
            debug!(
                entries = self.patterns.len(),
                "pattern cache full, clearing"
            );
            self.patterns.clear();
        }
        self.patterns.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Whether `candidate` matches `pattern`
    pub fn is_match(&self, pattern: &str, candidate: &str) -> Result<bool, PatternError> {
        Ok(self.compile(pattern)?.is_match(candidate))
    }

    /// Drop every cached pattern and reset statistics
    pub fn clear(&self) {
        self.patterns.clear();
        self.hit_count.store(0, Ordering::Relaxed);
        self.miss_count.store(0, Ordering::Relaxed);
    }

    /// Returns cache statistics
    pub fn get_stats(&self) -> CacheStats {
        let hits = self.hit_count.load(Ordering::Relaxed);
        let misses = self.miss_count.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            size: self.patterns.len(),
            hit_count: hits,
            miss_count: misses,
            hit_rate,
        }
    }
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(PatternCacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(pattern: &str, candidate: &str) -> bool {
        compile(pattern).unwrap().is_match(candidate)
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(matches("/foo/*", "/foo/bar"));
        assert!(!matches("/foo/*", "/foo/bar/baz"));
        assert!(!matches("/foo/*", "/foo"));
        assert!(!matches("/foo/*", "/foo/"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        assert!(matches("/foo/**", "/foo/bar/baz"));
        assert!(matches("/foo/**", "/foo/bar"));
        assert!(!matches("/foo/**", "/foo/"));
        assert!(matches("/foo**", "/foobar"));
        assert!(matches("/foo**", "/foo"));
        assert!(matches("/foo**", "/foo/bar/baz"));
    }

    #[test]
    fn test_star_without_separator_may_be_empty() {
        assert!(matches("/foo*", "/foo"));
        assert!(matches("/foo*", "/foobar"));
        assert!(!matches("/foo*", "/foo/bar"));
    }

    #[test]
    fn test_brace_alternation() {
        for candidate in ["a", "b", "c"] {
            assert!(matches("{a,b,c}", candidate));
        }
        for candidate in ["", "ab", "d", "a,b", "{a,b,c}"] {
            assert!(!matches("{a,b,c}", candidate));
        }
    }

    #[test]
    fn test_multiple_and_nested_groups() {
        assert!(matches("/{talker,listener}/{in,out}", "/talker/out"));
        assert!(!matches("/{talker,listener}/{in,out}", "/talker/sideways"));
        assert!(matches("/{a,{b,c}x}", "/cx"));
        assert!(!matches("/{a,{b,c}x}", "/c"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches("/node?", "/node1"));
        assert!(!matches("/node?", "/node"));
        assert!(!matches("/node?", "/node/"));
    }

    #[test]
    fn test_literals_are_escaped() {
        assert!(matches("/a.b", "/a.b"));
        assert!(!matches("/a.b", "/axb"));
        assert!(matches("/a+b", "/a+b"));
        assert!(!matches("/a+b", "/aab"));
    }

    #[test]
    fn test_comma_outside_braces_is_literal() {
        assert!(matches("/a,b", "/a,b"));
        assert!(!matches("/a,b", "/a"));
    }

    #[test]
    fn test_explicit_anchors() {
        let translated = translate("^/foo/*$").unwrap();
        assert!(translated.starts_with("^/foo"));
        assert!(translated.ends_with("+$"));
        assert!(!translated.starts_with("^^"));
        assert!(matches("^/foo$", "/foo"));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert!(matches!(
            compile("/foo/{a,b"),
            Err(PatternError::UnbalancedBrace { position: 5, .. })
        ));
        assert!(matches!(
            compile("/foo/a,b}"),
            Err(PatternError::UnbalancedBrace { position: 8, .. })
        ));
    }

    #[test]
    fn test_wildcard_after_group_checks_candidate() {
        assert!(!matches("{a/,b}*", "a/"));
        assert!(matches("{a/,b}*", "a/x"));
        assert!(matches("{a/,b}*", "b"));
        assert!(matches("{a/,b}*", "bx"));
        assert!(!matches("{a/,b}*", "a/x/y"));

        assert!(!matches("/{*,x}", "/"));
        assert!(matches("/{*,x}", "/y"));
        assert!(matches("{/,}**", ""));
        assert!(!matches("{/,x}**", "/"));
    }

    #[test]
    fn test_wildcard_after_class() {
        assert!(!matches("[a/]*", "/"));
        assert!(matches("[a/]*", "/x"));
        assert!(matches("[a/]*", "a"));
        assert!(matches("/x\\W*", "/x-"));
        assert!(!matches("/x\\W*", "/x/"));
        assert!(matches("(a/|b)*", "b"));
        assert!(!matches("(a/|b)*", "a/"));
    }

    #[test]
    fn test_wildcard_after_double_star() {
        assert!(!matches("/***", "/a/"));
        assert!(matches("/***", "/a/b"));
        assert!(matches("/***", "/a"));
    }

    #[test]
    fn test_simple_translation_is_unchanged() {
        assert_eq!(translate("/foo/*").unwrap(), "^/foo/[^/\\x00]+$");
        assert_eq!(translate("/{a,b}").unwrap(), "^/(a|b)$");
        assert_eq!(translate("/foo**").unwrap(), "^/foo[^\\x00]*$");
    }

    #[test]
    fn test_unbalanced_brace_offset_counts_leading_whitespace() {
        let pattern = "  /a/{b";
        match compile(pattern) {
            Err(PatternError::UnbalancedBrace { position, .. }) => {
                assert_eq!(position, 5);
                assert_eq!(&pattern[position..=position], "{");
            }
            other => panic!("expected unbalanced brace, got {:?}", other),
        }
        assert!(matches!(
            compile(" /a}"),
            Err(PatternError::UnbalancedBrace { position: 3, .. })
        ));
    }

    #[test]
    fn test_empty_pattern() {
        assert_eq!(compile("").unwrap_err(), PatternError::Empty);
        assert_eq!(compile("   ").unwrap_err(), PatternError::Empty);
    }

    #[test]
    fn test_invalid_regex_passthrough() {
        assert!(matches!(
            compile("/foo/[a"),
            Err(PatternError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn test_cache_hits_and_misses() {
        let cache = PatternCache::default();

        assert!(cache.is_match("/foo/*", "/foo/bar").unwrap());
        assert!(cache.is_match("/foo/*", "/foo/baz").unwrap());

        let stats = cache.get_stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.size, 1);

        cache.clear();
        assert_eq!(cache.get_stats().size, 0);
    }

    #[test]
    fn test_cache_eviction() {
        let cache = PatternCache::new(PatternCacheConfig { max_entries: 2 });
        cache.compile("/a").unwrap();
        cache.compile("/b").unwrap();
        cache.compile("/c").unwrap();
        assert_eq!(cache.get_stats().size, 1);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = PatternCache::default();
        assert!(cache.compile("{a").is_err());
        assert_eq!(cache.get_stats().size, 0);
    }
}
