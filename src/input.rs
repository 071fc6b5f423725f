//! Raw command-line input
//!
//! Words after the binary name are split into positional words and
//! `KEY=VALUE` pairs. Nothing is interpreted further; the first positional
//! word names the requested task.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInput {
    positional: Vec<String>,
    values: HashMap<String, String>,
}

impl ProcessInput {
    /// Split words into positional words and `KEY=VALUE` pairs
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut input = ProcessInput::default();
        for word in words {
            let word = word.into();
            match word.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    input.values.insert(key.to_string(), value.to_string());
                }
                _ => input.positional.push(word),
            }
        }
        input
    }

    /// The task named by the first positional word
    pub fn requested_task(&self) -> Option<&str> {
        self.positional.first().map(String::as_str)
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        let input = ProcessInput::from_words(["build", "mode=release", "extra", "flag="]);
        assert_eq!(input.requested_task(), Some("build"));
        assert_eq!(input.positional(), &["build".to_string(), "extra".to_string()]);
        assert_eq!(input.value("mode"), Some("release"));
        assert_eq!(input.value("flag"), Some(""));
    }

    #[test]
    fn test_leading_equals_is_positional() {
        let input = ProcessInput::from_words(["=odd"]);
        assert_eq!(input.requested_task(), Some("=odd"));
        assert_eq!(input.value(""), None);
    }

    #[test]
    fn test_no_words() {
        let input = ProcessInput::default();
        assert_eq!(input.requested_task(), None);
    }
}
