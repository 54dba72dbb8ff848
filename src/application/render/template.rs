//! Minimal `{{KEY}}` template substitution.
//!
//! Only double-brace placeholders are expanded. Compose `${KEY}` references
//! and Caddy `{$KEY}` placeholders pass through untouched. A line holding
//! nothing but a placeholder whose value is empty is dropped, so optional
//! blocks leave no blank lines behind.

use std::collections::BTreeMap;

use crate::error::RenderError;

/// Placeholder values keyed by name.
pub type Values = BTreeMap<String, String>;

/// An embedded template.
#[derive(Debug, Clone, Copy)]
pub struct Template {
    name: &'static str,
    source: &'static str,
}

impl Template {
    #[must_use]
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Names of every placeholder in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        let mut rest = self.source;
        while let Some(start) = rest.find("{{") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else { break };
            keys.push(after[..end].trim());
            rest = &after[end + 2..];
        }
        keys
    }

    /// Substitute every placeholder, failing on the first missing value.
    pub fn render(&self, values: &Values) -> Result<String, RenderError> {
        let mut out = String::with_capacity(self.source.len());
        for line in self.source.split_inclusive('\n') {
            if let Some(key) = sole_placeholder(line) {
                let value = self.lookup(values, key)?;
                if value.is_empty() {
                    continue;
                }
                out.push_str(value);
                if !value.ends_with('\n') && line.ends_with('\n') {
                    out.push('\n');
                }
                continue;
            }
            self.expand_line(line, values, &mut out)?;
        }
        Ok(out)
    }

    fn expand_line(&self, line: &str, values: &Values, out: &mut String) -> Result<(), RenderError> {
        let mut rest = line;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after.find("}}").ok_or(RenderError::Unterminated {
                template: self.name,
            })?;
            let key = after[..end].trim();
            out.push_str(self.lookup(values, key)?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(())
    }

    fn lookup<'a>(&self, values: &'a Values, key: &str) -> Result<&'a str, RenderError> {
        values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| RenderError::MissingValue {
                template: self.name,
                key: key.to_string(),
            })
    }
}

fn sole_placeholder(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

/// Build a [`Values`] map from `(key, value)` pairs.
pub fn values<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Values
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_placeholders() {
        let template = Template::new("t", "host={{HOST}} port={{ PORT }}\n");
        let out = template
            .render(&values([("HOST", "example.com"), ("PORT", "80")]))
            .unwrap();
        assert_eq!(out, "host=example.com port=80\n");
    }

    #[test]
    fn missing_value_names_the_key() {
        let template = Template::new("site.caddy", "{{HOST}} {\n}\n");
        let err = template.render(&Values::new()).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingValue {
                template: "site.caddy",
                key: "HOST".into()
            }
        );
    }

    #[test]
    fn compose_and_caddy_references_pass_through() {
        let template = Template::new("t", "memory: ${LIMIT}\ntls {$ACME_EMAIL}\n");
        let out = template.render(&Values::new()).unwrap();
        assert_eq!(out, "memory: ${LIMIT}\ntls {$ACME_EMAIL}\n");
    }

    #[test]
    fn empty_block_placeholder_drops_line() {
        let template = Template::new("t", "a:\n{{PORTS}}\nb:\n");
        let empty = template.render(&values([("PORTS", "")])).unwrap();
        assert_eq!(empty, "a:\nb:\n");

        let block = template
            .render(&values([("PORTS", "  ports:\n    - \"80:80\"\n")]))
            .unwrap();
        assert_eq!(block, "a:\n  ports:\n    - \"80:80\"\nb:\n");
    }

    #[test]
    fn unterminated_placeholder_is_an_error() {
        let template = Template::new("t", "x={{OPEN\n");
        assert!(matches!(
            template.render(&Values::new()),
            Err(RenderError::Unterminated { .. })
        ));
    }

    #[test]
    fn lists_placeholders() {
        let template = Template::new("t", "{{A}} and {{B}}\n{{A}}\n");
        assert_eq!(template.placeholders(), vec!["A", "B", "A"]);
    }
}
