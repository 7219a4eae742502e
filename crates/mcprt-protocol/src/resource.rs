//! Static resources and RFC 6570-like parameterised resource templates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Resource {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: None,
            mime_type: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceTemplate {
    pub uri_template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ResourceTemplate {
    pub fn new(uri_template: impl Into<String>) -> Self {
        Self {
            uri_template: uri_template.into(),
            name: None,
            mime_type: None,
            description: None,
        }
    }

    /// Match a concrete URI against this template's `{placeholder}` segments,
    /// returning the bound placeholder values in left-to-right order if the
    /// URI matches, else `None`. Matching is literal-segment exact except for
    /// `{name}` placeholders, which bind one path segment each — sufficient
    /// for the "first matching template in registration order wins" rule in
    /// spec §4.9 step 5 without pulling in a full RFC 6570 expander.
    pub fn matches(&self, uri: &str) -> Option<Vec<(String, String)>> {
        let pattern_segments: Vec<&str> = self.uri_template.split('/').collect();
        let uri_segments: Vec<&str> = uri.split('/').collect();
        if pattern_segments.len() != uri_segments.len() {
            return None;
        }
        let mut bindings = Vec::new();
        for (pat, actual) in pattern_segments.iter().zip(uri_segments.iter()) {
            if let Some(name) = pat.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                bindings.push((name.to_string(), (*actual).to_string()));
            } else if pat != actual {
                return None;
            }
        }
        Some(bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_matches_single_placeholder() {
        let tmpl = ResourceTemplate::new("file:///{path}");
        let bindings = tmpl.matches("file:///etc").unwrap();
        assert_eq!(bindings, vec![("path".to_string(), "etc".to_string())]);
    }

    #[test]
    fn template_rejects_segment_count_mismatch() {
        let tmpl = ResourceTemplate::new("file:///{path}");
        assert!(tmpl.matches("file:///a/b").is_none());
    }

    #[test]
    fn template_rejects_literal_mismatch() {
        let tmpl = ResourceTemplate::new("db://{table}/rows");
        assert!(tmpl.matches("db://users/columns").is_none());
        assert!(tmpl.matches("db://users/rows").is_some());
    }
}
