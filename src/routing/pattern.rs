//! Route template compilation and matching.
//!
//! # Responsibilities
//! - Compile a template such as `/users/:id/*` into a token sequence
//! - Record parameter names in the order they appear
//! - Match a concrete request path and extract decoded parameter values
//!
//! # Design Decisions
//! - No regex: templates compile to literal/param/wildcard tokens, matched by
//!   a greedy backtracking walker with the same results as `^...$` built from
//!   `([^/]+)` and `.*`
//! - The walker remembers every (token, offset) state that failed, so each
//!   state is explored once and matching stays polynomial in the path length
//!   whatever the template
//! - Matches are always anchored at both ends
//! - Parameter values are percent-decoded after matching, so an encoded `/`
//!   stays inside its segment
//! - A repeated parameter name keeps the value of its last occurrence

use std::collections::HashMap;

use percent_encoding::percent_decode_str;

use crate::routing::path::normalize;

/// Parameters captured from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(HashMap<String, String>);

impl Params {
    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn insert(&mut self, name: String, value: String) {
        self.0.insert(name, value);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param,
    Wildcard,
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    tokens: Vec<Token>,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compile a template. The template is normalized first, so an empty
    /// template matches only `/`.
    pub fn compile(template: &str) -> Self {
        let template = normalize(template).into_owned();
        let mut tokens = Vec::new();
        let mut param_names = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                ':' if chars.peek().copied().is_some_and(is_ident_start) => {
                    flush_literal(&mut literal, &mut tokens);
                    let mut name = String::new();
                    while let Some(&next) = chars.peek() {
                        if !is_ident_continue(next) {
                            break;
                        }
                        name.push(next);
                        chars.next();
                    }
                    tokens.push(Token::Param);
                    param_names.push(name);
                }
                '*' => {
                    flush_literal(&mut literal, &mut tokens);
                    tokens.push(Token::Wildcard);
                }
                other => literal.push(other),
            }
        }
        flush_literal(&mut literal, &mut tokens);

        Self {
            template,
            tokens,
            param_names,
        }
    }

    /// The normalized template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in order of appearance.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_match(&self, path: &str) -> bool {
        Walker::new(&self.tokens, path).run(0, 0)
    }

    /// Match a concrete path, returning decoded parameters on success.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let mut walker = Walker::new(&self.tokens, path);
        if !walker.run(0, 0) {
            return None;
        }
        let captures = walker.captures;
        debug_assert_eq!(captures.len(), self.param_names.len());

        let mut params = Params::default();
        for (name, raw) in self.param_names.iter().zip(captures) {
            params.insert(name.clone(), decode(raw));
        }
        Some(params)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn flush_literal(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Greedy, backtracking walk over the token list.
///
/// Success from a state depends only on the token index and input offset, so
/// a state that failed once is never retried. Only param and wildcard states
/// branch, and only those are remembered.
struct Walker<'p> {
    tokens: &'p [Token],
    input: &'p str,
    failed: Vec<bool>,
    captures: Vec<&'p str>,
}

impl<'p> Walker<'p> {
    fn new(tokens: &'p [Token], input: &'p str) -> Self {
        Self {
            tokens,
            input,
            failed: Vec::new(),
            captures: Vec::new(),
        }
    }

    fn slot(&self, token: usize, offset: usize) -> usize {
        token * (self.input.len() + 1) + offset
    }

    fn run(&mut self, token: usize, offset: usize) -> bool {
        let branching = matches!(self.tokens.get(token), Some(Token::Param | Token::Wildcard));
        if !branching {
            return self.step(token, offset);
        }

        let slot = self.slot(token, offset);
        if self.failed.get(slot).copied().unwrap_or(false) {
            return false;
        }
        if self.step(token, offset) {
            return true;
        }
        if self.failed.is_empty() {
            self.failed = vec![false; self.slot(self.tokens.len(), self.input.len()) + 1];
        }
        self.failed[slot] = true;
        false
    }

    fn step(&mut self, token: usize, offset: usize) -> bool {
        let (tokens, input) = (self.tokens, self.input);
        let rest = &input[offset..];
        let Some(current) = tokens.get(token) else {
            return rest.is_empty();
        };

        match current {
            Token::Literal(literal) => {
                rest.starts_with(literal.as_str()) && self.run(token + 1, offset + literal.len())
            }
            Token::Param => {
                let segment_end = rest.find('/').unwrap_or(rest.len());
                for end in (1..=segment_end).rev() {
                    if !rest.is_char_boundary(end) {
                        continue;
                    }
                    self.captures.push(&rest[..end]);
                    if self.run(token + 1, offset + end) {
                        return true;
                    }
                    self.captures.pop();
                }
                false
            }
            Token::Wildcard => {
                for end in (0..=rest.len()).rev() {
                    if rest.is_char_boundary(end) && self.run(token + 1, offset + end) {
                        return true;
                    }
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn test_static_template() {
        let pattern = PathPattern::compile("/hello");
        assert!(pattern.param_names().is_empty());
        assert_eq!(pattern.matches("/hello"), Some(Params::default()));
        assert!(pattern.matches("/hello/").is_none());
        assert!(pattern.matches("/hello/world").is_none());
        assert!(pattern.matches("/prefix/hello").is_none());
    }

    #[test]
    fn test_params_in_order() {
        let pattern = PathPattern::compile("/users/:userId/posts/:postId");
        assert_eq!(pattern.param_names(), ["userId", "postId"]);

        let params = pattern.matches("/users/7/posts/99").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("userId"), Some("7"));
        assert_eq!(params.get("postId"), Some("99"));
    }

    #[test]
    fn test_param_needs_one_char() {
        let pattern = PathPattern::compile("/hello/:id");
        assert!(pattern.matches("/hello/").is_none());
        assert!(pattern.matches("/hello/a/b").is_none());
    }

    #[test]
    fn test_params_are_decoded() {
        let pattern = PathPattern::compile("/files/:name");
        let params = pattern.matches("/files/my%20report%2Fq1").unwrap();
        assert_eq!(params.get("name"), Some("my report/q1"));
    }

    #[test]
    fn test_wildcard_spans_segments() {
        let pattern = PathPattern::compile("/static/*");
        assert!(pattern.param_names().is_empty());
        assert!(pattern.is_match("/static/"));
        assert!(pattern.is_match("/static/css/site.css"));
        assert!(!pattern.is_match("/static"));
    }

    #[test]
    fn test_trailing_wildcard_after_params() {
        let pattern = PathPattern::compile("/:a/:b/*");
        let params = pattern.matches("/x/y/z/w").unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("a"), Some("x"));
        assert_eq!(params.get("b"), Some("y"));
    }

    #[test]
    fn test_params_with_literal_suffix_backtrack() {
        let pattern = PathPattern::compile("/img/:name.png");
        let params = pattern.matches("/img/logo.dark.png").unwrap();
        assert_eq!(params.get("name"), Some("logo.dark"));
    }

    #[test]
    fn test_empty_template_matches_root_only() {
        let pattern = PathPattern::compile("");
        assert_eq!(pattern.template(), "/");
        assert!(pattern.is_match("/"));
        assert!(!pattern.is_match("/a"));
        assert!(!pattern.is_match(""));
    }

    #[test]
    fn test_colon_without_identifier_is_literal() {
        let pattern = PathPattern::compile("/time/12:30");
        assert!(pattern.param_names().is_empty());
        assert!(pattern.is_match("/time/12:30"));
        assert!(!pattern.is_match("/time/12:31"));
    }

    #[test]
    fn test_param_name_takes_letters_digits_and_underscores() {
        let pattern = PathPattern::compile("/:id2/:_kind");
        assert_eq!(pattern.param_names(), ["id2", "_kind"]);
        let params = pattern.matches("/7/book").unwrap();
        assert_eq!(params.get("id2"), Some("7"));
        assert_eq!(params.get("_kind"), Some("book"));
    }

    #[test]
    fn test_many_wildcards_on_long_path_is_fast() {
        let pattern = PathPattern::compile("/*/*/*/*/end");
        let path = format!("/{}", "a/".repeat(400));
        assert_eq!(path.len(), 801);

        let started = Instant::now();
        assert!(!pattern.is_match(&path));
        assert!(pattern.is_match(&format!("{}end", path)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_params_split_by_literals_on_long_segment_is_fast() {
        let pattern = PathPattern::compile("/:a-:b-:c-:d-:e.x");
        let path = format!("/{}", "-".repeat(800));

        let started = Instant::now();
        assert!(pattern.matches(&path).is_none());
        let params = pattern.matches("/1-2-3-4-5.x").unwrap();
        assert_eq!(params.get("e"), Some("5"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_backtracking_order_is_greedy() {
        let pattern = PathPattern::compile("/:a-:b");
        let params = pattern.matches("/x-y-z").unwrap();
        assert_eq!(params.get("a"), Some("x-y"));
        assert_eq!(params.get("b"), Some("z"));
    }

    #[test]
    fn test_duplicate_name_keeps_last_value() {
        let pattern = PathPattern::compile("/:id/:id");
        assert_eq!(pattern.param_names().len(), 2);
        let params = pattern.matches("/first/second").unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("id"), Some("second"));
    }
}
