//! Variable interpolation for strings
//!
//! `${name}` is replaced by whatever the lookup returns for `name`. Unknown
//! names are left in place so shell-style `${VAR}` text still reaches the
//! interpreter. Replacement values are themselves interpolated, but a name
//! is expanded at most once along a chain: a value that refers back to a
//! name already being expanded keeps that reference as literal text.

use crate::error::{InterpolationError, InterpolationResult};
use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Longest chain of nested references before a template is rejected
pub const MAX_DEPTH: usize = 16;

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("interpolation pattern is valid"))
}

/// Interpolate `${name}` references in `template`
pub fn interpolate<F>(template: &str, lookup: F) -> InterpolationResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    check_syntax(template)?;

    let mut chain = Vec::new();
    expand(template, &lookup, &mut chain).ok_or_else(|| {
        InterpolationError::RecursiveInterpolation(template.to_string())
    })
}

/// Expand one level; `None` once the chain grows past [`MAX_DEPTH`]
fn expand<F>(text: &str, lookup: &F, chain: &mut Vec<String>) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if chain.len() > MAX_DEPTH {
        return None;
    }

    let mut too_deep = false;
    let expanded = variable_pattern()
        .replace_all(text, |caps: &Captures| {
            let name = caps[1].trim();
            if too_deep || chain.iter().any(|seen| seen == name) {
                return caps[0].to_string();
            }
            let Some(value) = lookup(name) else {
                return caps[0].to_string();
            };

            chain.push(name.to_string());
            let nested = expand(&value, lookup, chain);
            chain.pop();

            nested.unwrap_or_else(|| {
                too_deep = true;
                caps[0].to_string()
            })
        })
        .into_owned();

    if too_deep {
        None
    } else {
        Some(expanded)
    }
}

/// Reject an opening `${` that is never closed
fn check_syntax(template: &str) -> InterpolationResult<()> {
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => rest = &after[end + 1..],
            None => {
                return Err(InterpolationError::InvalidSyntax(format!(
                    "unclosed '${{' in '{}'",
                    template
                )))
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_simple_interpolation() {
        let vars = vars(&[("name", "world")]);
        let result = interpolate("hello ${name}", |k| vars.get(k).cloned()).unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn test_unknown_variable_left_untouched() {
        let result = interpolate("echo ${HOME_DIR_X}", |_| None).unwrap();
        assert_eq!(result, "echo ${HOME_DIR_X}");
    }

    #[test]
    fn test_nested_interpolation() {
        let vars = vars(&[("target", "${arch}-linux"), ("arch", "x86_64")]);
        let result = interpolate("build ${target}", |k| vars.get(k).cloned()).unwrap();
        assert_eq!(result, "build x86_64-linux");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let vars = vars(&[("mode", "release")]);
        let result = interpolate("${ mode }", |k| vars.get(k).cloned()).unwrap();
        assert_eq!(result, "release");
    }

    #[test]
    fn test_cycle_keeps_repeated_reference() {
        let vars = vars(&[("a", "x-${b}"), ("b", "y-${a}")]);
        let result = interpolate("${a}", |k| vars.get(k).cloned()).unwrap();
        assert_eq!(result, "x-y-${a}");
    }

    #[test]
    fn test_value_referring_to_itself_is_kept_literally() {
        let result = interpolate("echo ${path}", |k| {
            (k == "path").then(|| "/src/${path}.rs".to_string())
        })
        .unwrap();
        assert_eq!(result, "echo /src/${path}.rs");
    }

    #[test]
    fn test_same_name_twice_in_one_template() {
        let vars = vars(&[("v", "1")]);
        let result = interpolate("${v}.${v}", |k| vars.get(k).cloned()).unwrap();
        assert_eq!(result, "1.1");
    }

    #[test]
    fn test_overly_deep_chain_fails() {
        let result = interpolate("${v0}", |k| {
            let n: usize = k.trim_start_matches('v').parse().ok()?;
            Some(format!("${{v{}}}", n + 1))
        });
        assert!(matches!(
            result,
            Err(InterpolationError::RecursiveInterpolation(_))
        ));
    }

    #[test]
    fn test_unclosed_reference_fails() {
        let result = interpolate("echo ${oops", |_| Some("x".to_string()));
        assert!(matches!(result, Err(InterpolationError::InvalidSyntax(_))));
    }

    #[test]
    fn test_no_references() {
        let result = interpolate("plain $text {x}", |_| None).unwrap();
        assert_eq!(result, "plain $text {x}");
    }
}
