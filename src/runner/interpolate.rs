//! Template expansion for `{KEY}` placeholders
//!
//! Placeholders name a setting in the [`Config`] store or a call-specific
//! override. `{{` and `}}` produce literal braces; braces around anything
//! that is not an identifier are passed through untouched.

use crate::config::Config;
use crate::error::{TemplateError, TemplateResult};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Call-specific values that shadow settings of the same name
pub type Overrides = HashMap<String, String>;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
    })
}

/// Turn a literal string into a template that expands back to it
pub fn escape(literal: &str) -> String {
    literal.replace('{', "{{").replace('}', "}}")
}

/// Whether `s` can be used as a placeholder name
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Names of all placeholders in `template`, in order of appearance
pub fn placeholders(template: &str) -> Vec<&str> {
    placeholder_regex()
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Expand `template`, resolving each placeholder through `lookup`
///
/// Substituted values are not scanned again.
pub fn expand_with<F>(template: &str, mut lookup: F) -> TemplateResult<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut result = String::with_capacity(template.len());
    let mut last = 0;

    for caps in placeholder_regex().captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        result.push_str(&template[last..whole.start()]);

        match caps.get(1) {
            Some(key) => {
                let value = lookup(key.as_str())
                    .ok_or_else(|| TemplateError::MissingKey(key.as_str().to_string()))?;
                result.push_str(&value);
            }
            // escaped brace: `{{` or `}}`
            None => result.push_str(&whole.as_str()[..1]),
        }

        last = whole.end();
    }

    result.push_str(&template[last..]);
    Ok(result)
}

/// Expands templates against a settings store
#[derive(Debug, Clone, Copy)]
pub struct Expander<'a> {
    config: &'a Config,
}

impl<'a> Expander<'a> {
    pub fn new(config: &'a Config) -> Self {
        Expander { config }
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Expand using settings only
    pub fn expand(&self, template: &str) -> TemplateResult<String> {
        expand_with(template, |key| self.config.get(key).map(str::to_string))
    }

    /// Expand with overrides taking precedence over settings
    pub fn expand_with_overrides(
        &self,
        template: &str,
        overrides: &Overrides,
    ) -> TemplateResult<String> {
        expand_with(template, |key| {
            overrides
                .get(key)
                .cloned()
                .or_else(|| self.config.get(key).map(str::to_string))
        })
    }

    /// Expand a list of templates
    pub fn expand_all<S: AsRef<str>>(&self, templates: &[S]) -> TemplateResult<Vec<String>> {
        templates
            .iter()
            .map(|t| self.expand(t.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    fn config() -> Config {
        ConfigBuilder::new("/src/os64").build().unwrap()
    }

    #[test]
    fn test_escape_expands_to_literal() {
        let config = config();
        let expander = Expander::new(&config);
        for literal in ["/src/{CC}.c", "a}}b{{c", "{", "plain"] {
            assert_eq!(expander.expand(&escape(literal)).unwrap(), literal);
        }
    }

    #[test]
    fn test_simple_expansion() {
        let config = config();
        let expander = Expander::new(&config);
        assert_eq!(
            expander.expand("{BUILD_DIR}/kernel.elf").unwrap(),
            "/src/os64/build/kernel.elf"
        );
    }

    #[test]
    fn test_multiple_placeholders() {
        let config = config();
        let expander = Expander::new(&config);
        assert_eq!(
            expander.expand("{CC} -c {BASE_DIR}/a.c").unwrap(),
            "clang -c /src/os64/a.c"
        );
    }

    #[test]
    fn test_override_takes_precedence() {
        let config = config();
        let expander = Expander::new(&config);

        let mut overrides = Overrides::new();
        overrides.insert("CC".to_string(), "gcc".to_string());
        overrides.insert("src".to_string(), "main.c".to_string());

        let result = expander
            .expand_with_overrides("{CC} -c {src}", &overrides)
            .unwrap();
        assert_eq!(result, "gcc -c main.c");
    }

    #[test]
    fn test_missing_key() {
        let config = config();
        let expander = Expander::new(&config);
        assert_eq!(
            expander.expand("{NOPE}/x"),
            Err(TemplateError::MissingKey("NOPE".to_string()))
        );
    }

    #[test]
    fn test_no_placeholders_is_identity() {
        let config = config();
        let expander = Expander::new(&config);
        let plain = "dd if=/dev/zero bs=1M count=32";

        let once = expander.expand(plain).unwrap();
        assert_eq!(once, plain);
        assert_eq!(expander.expand(&once).unwrap(), once);
    }

    #[test]
    fn test_escaped_braces() {
        let config = config();
        let expander = Expander::new(&config);
        assert_eq!(
            expander.expand("{{BUILD_DIR}} is {BUILD_DIR}").unwrap(),
            "{BUILD_DIR} is /src/os64/build"
        );
    }

    #[test]
    fn test_non_placeholder_braces_untouched() {
        let config = config();
        let expander = Expander::new(&config);
        assert_eq!(expander.expand("awk '{ print }' {1}").unwrap(), "awk '{ print }' {1}");
    }

    #[test]
    fn test_values_not_rescanned() {
        let config = config();
        let expander = Expander::new(&config);

        let mut overrides = Overrides::new();
        overrides.insert("a".to_string(), "{b}".to_string());

        assert_eq!(expander.expand_with_overrides("{a}", &overrides).unwrap(), "{b}");
    }

    #[test]
    fn test_expand_all() {
        let config = config();
        let expander = Expander::new(&config);
        let result = expander.expand_all(&["{LD}", "static"]).unwrap();
        assert_eq!(result, vec!["ld".to_string(), "static".to_string()]);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders("{a} {{b}} {c_1}"), vec!["a", "c_1"]);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("BUILD_DIR"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("A-B"));
    }
}
