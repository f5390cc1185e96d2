// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Dotted name globs: `*` within one segment, `..` across segments

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

#[derive(Clone, Serialize, Deserialize)]
pub struct NamePattern {
    text: String,
    #[serde(skip)]
    regex: OnceLock<Option<Regex>>,
}

impl NamePattern {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            regex: OnceLock::new(),
        }
    }

    pub fn any() -> Self {
        Self::new("*")
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_any(&self) -> bool {
        self.text == "*"
    }

    /// No `*` and no `..`: the pattern names exactly one thing
    pub fn is_exact(&self) -> bool {
        !self.text.contains('*') && !self.text.contains("..")
    }

    /// A single identifier, possibly a formal name
    pub fn is_simple_identifier(&self) -> bool {
        self.is_exact() && !self.text.is_empty() && !self.text.contains('.')
    }

    /// Whether `candidate` matches; `$` in nested type names reads as `.`
    pub fn matches(&self, candidate: &str) -> bool {
        if self.is_any() {
            return true;
        }
        let candidate = candidate.replace('$', ".");
        if self.is_exact() {
            return self.text.replace('$', ".") == candidate;
        }
        match self.regex.get_or_init(|| Regex::new(&glob_to_regex(&self.text)).ok()) {
            Some(re) => re.is_match(&candidate),
            None => false,
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let glob = glob.replace('$', ".");
    let mut out = String::from("^");
    let mut rest = glob.as_str();
    if let Some(stripped) = rest.strip_prefix("..") {
        out.push_str("(?:.*\\.)?");
        rest = stripped;
    }
    let chars: Vec<char> = rest.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str("[^.]*"),
            '.' if chars.get(i + 1) == Some(&'.') => {
                out.push_str("\\.(?:.*\\.)?");
                i += 1;
            }
            '.' => out.push_str("\\."),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    out.push('$');
    out
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for NamePattern {}

impl Hash for NamePattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamePattern({:?})", self.text)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_stays_within_a_segment() {
        let p = NamePattern::new("com.acme.*");
        assert!(p.matches("com.acme.Foo"));
        assert!(!p.matches("com.acme.sub.Foo"));
        assert!(NamePattern::new("*Service").matches("OrderService"));
        assert!(!NamePattern::new("*Service").matches("com.acme.OrderService"));
    }

    #[test]
    fn test_double_dot_spans_packages() {
        let p = NamePattern::new("com.acme..*");
        assert!(p.matches("com.acme.Foo"));
        assert!(p.matches("com.acme.a.b.Foo"));
        assert!(!p.matches("com.other.Bar"));
        assert!(!p.matches("com.acmeX.Foo"));
        assert!(NamePattern::new("..*Dao").matches("org.x.UserDao"));
    }

    #[test]
    fn test_nested_names_and_exact_patterns() {
        assert!(NamePattern::new("com.acme.Outer.Inner").matches("com.acme.Outer$Inner"));
        assert!(NamePattern::new("*").matches("anything.at.All"));
        assert!(NamePattern::new("get*").matches("getName"));
        assert!(!NamePattern::new("get*").matches("setName"));
        assert!(NamePattern::new("s").is_simple_identifier());
        assert!(!NamePattern::new("a.b").is_simple_identifier());
    }

    #[test]
    fn test_equality_ignores_compiled_state() {
        let a = NamePattern::new("com..*");
        assert!(a.matches("com.x.Y"));
        assert_eq!(a, NamePattern::new("com..*"));
    }
}
