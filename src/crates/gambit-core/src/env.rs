//! Per-execution variable environment
//!
//! A write-once, insertion-ordered name-to-string store. Steps communicate
//! exclusively through it: `llm` and `tool` steps bind their outputs here,
//! and templates read from it via `{name}` placeholders.

use crate::plan::is_identifier;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by environment operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// A name was bound twice within one execution.
    #[error("duplicate binding for variable '{0}'")]
    DuplicateBinding(String),
}

/// Result of rendering a template against the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The substituted text.
    pub text: String,
    /// Names that resolved to a binding.
    pub refs_used: Vec<String>,
    /// Names that had no binding and were replaced by the empty string.
    pub refs_missing: Vec<String>,
}

/// Write-once variable store seeded with system-provided inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    values: IndexMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a system-provided variable (e.g. `user_query`).
    ///
    /// Seeding overwrites silently; it happens before execution starts and
    /// is not subject to the write-once rule.
    pub fn seed(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Bind a step output. Fails if the name is already present.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), EnvError> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(EnvError::DuplicateBinding(name));
        }
        self.values.insert(name, value.into());
        Ok(())
    }

    /// Look up a binding.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no variable is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve `{name}` placeholders in `template`.
    ///
    /// `{{` and `}}` are literal single braces. An unbound `{name}` renders
    /// as the empty string and is reported in `refs_missing`. Substituted
    /// values are inserted verbatim; there is no recursive expansion. A
    /// brace sequence that is not a well-formed placeholder (no closing
    /// brace, or the inner text is not an identifier) is left as-is.
    pub fn render(&self, template: &str) -> Rendered {
        let mut text = String::with_capacity(template.len());
        let mut refs_used = Vec::new();
        let mut refs_missing = Vec::new();

        let bytes = template.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' if bytes.get(i + 1) == Some(&b'{') => {
                    text.push('{');
                    i += 2;
                }
                b'}' if bytes.get(i + 1) == Some(&b'}') => {
                    text.push('}');
                    i += 2;
                }
                b'{' => {
                    let rest = &template[i + 1..];
                    match rest.find('}') {
                        Some(end) if is_identifier(&rest[..end]) => {
                            let name = &rest[..end];
                            match self.lookup(name) {
                                Some(value) => {
                                    text.push_str(value);
                                    if !refs_used.iter().any(|r| r == name) {
                                        refs_used.push(name.to_string());
                                    }
                                }
                                None => {
                                    if !refs_missing.iter().any(|r| r == name) {
                                        refs_missing.push(name.to_string());
                                    }
                                }
                            }
                            i += 1 + end + 1;
                        }
                        _ => {
                            text.push('{');
                            i += 1;
                        }
                    }
                }
                _ => match template[i..].chars().next() {
                    // Copy the full UTF-8 character, not just one byte.
                    Some(ch) => {
                        text.push(ch);
                        i += ch.len_utf8();
                    }
                    None => break,
                },
            }
        }

        Rendered {
            text,
            refs_used,
            refs_missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(pairs: &[(&str, &str)]) -> Environment {
        let mut env = Environment::new();
        for (k, v) in pairs {
            env.seed(*k, *v);
        }
        env
    }

    #[test]
    fn test_bind_is_write_once() {
        let mut env = Environment::new();
        env.bind("essay", "first draft").unwrap();
        let err = env.bind("essay", "second draft").unwrap_err();
        assert_eq!(err, EnvError::DuplicateBinding("essay".to_string()));
        assert_eq!(env.lookup("essay"), Some("first draft"));
    }

    #[test]
    fn test_seed_overwrites() {
        let mut env = Environment::new();
        env.seed("user_query", "first");
        env.seed("user_query", "second");
        assert_eq!(env.lookup("user_query"), Some("second"));
    }

    #[test]
    fn test_seed_then_bind_conflicts() {
        let mut env = Environment::new();
        env.seed("user_query", "hello");
        assert!(env.bind("user_query", "other").is_err());
    }

    #[test]
    fn test_render_basic_substitution() {
        let env = env_with(&[("name", "world")]);
        let r = env.render("hello {name}!");
        assert_eq!(r.text, "hello world!");
        assert_eq!(r.refs_used, vec!["name".to_string()]);
        assert!(r.refs_missing.is_empty());
    }

    #[test]
    fn test_render_missing_ref_is_empty() {
        let env = Environment::new();
        let r = env.render("hello {ghost}!");
        assert_eq!(r.text, "hello !");
        assert_eq!(r.refs_missing, vec!["ghost".to_string()]);
        assert!(r.refs_used.is_empty());
    }

    #[test]
    fn test_render_doubled_braces_are_literal() {
        let env = env_with(&[("b", "unused")]);
        let r = env.render("a {{b}} c");
        assert_eq!(r.text, "a {b} c");
        assert!(r.refs_used.is_empty());
        assert!(r.refs_missing.is_empty());
    }

    #[test]
    fn test_render_no_recursive_expansion() {
        let env = env_with(&[("outer", "{inner}"), ("inner", "nope")]);
        let r = env.render("{outer}");
        assert_eq!(r.text, "{inner}");
    }

    #[test]
    fn test_render_unclosed_brace_kept() {
        let env = Environment::new();
        assert_eq!(env.render("open {brace").text, "open {brace");
    }

    #[test]
    fn test_render_non_identifier_kept() {
        let env = Environment::new();
        assert_eq!(env.render("{not ok}").text, "{not ok}");
        assert_eq!(env.render("{9x}").text, "{9x}");
    }

    #[test]
    fn test_render_plain_string_is_identity() {
        let env = env_with(&[("x", "1")]);
        let s = "no placeholders at all, even unicode: caf\u{e9}";
        assert_eq!(env.render(s).text, s);
    }

    #[test]
    fn test_render_repeated_ref_reported_once() {
        let env = env_with(&[("x", "v")]);
        let r = env.render("{x}{x}{y}{y}");
        assert_eq!(r.text, "vv");
        assert_eq!(r.refs_used, vec!["x".to_string()]);
        assert_eq!(r.refs_missing, vec!["y".to_string()]);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut env = Environment::new();
        env.bind("b", "2").unwrap();
        env.bind("a", "1").unwrap();
        let names: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
