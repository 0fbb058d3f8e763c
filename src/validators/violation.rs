//! Violations reported when a candidate conflicts with existing records.

use std::fmt;

use crate::record::RecordId;

/// Message template shared by every uniqueness violation.
pub const ENTITY_MESSAGE: &str = "There is existing content: <a href=\":url\" target=\"_blank\">@title</a>, with identical values for the following field(s): %label.";

/// A single conflict between the candidate and an existing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the validator that raised this violation
    pub validator: &'static str,
    /// Field carrying the constraint configuration
    pub constraint: String,
    /// Id of the conflicting record
    pub conflicting_id: RecordId,
    /// `:url` parameter
    pub url: String,
    /// `@title` parameter
    pub title: String,
    /// `%label` parameter, comma-joined field labels
    pub labels: String,
    /// Property path the violation is attached to
    pub path: &'static str,
}

impl Violation {
    pub fn new(
        validator: &'static str,
        constraint: impl Into<String>,
        conflicting_id: RecordId,
        url: impl Into<String>,
        title: impl Into<String>,
        labels: impl Into<String>,
    ) -> Self {
        Violation {
            validator,
            constraint: constraint.into(),
            conflicting_id,
            url: url.into(),
            title: title.into(),
            labels: labels.into(),
            path: "value",
        }
    }

    pub fn template(&self) -> &'static str {
        ENTITY_MESSAGE
    }

    /// Template placeholders and their values.
    pub fn parameters(&self) -> [(&'static str, &str); 3] {
        [
            (":url", self.url.as_str()),
            ("@title", self.title.as_str()),
            ("%label", self.labels.as_str()),
        ]
    }

    /// Render the message as HTML. `@` values are escaped, `%` values are
    /// escaped and emphasized, `:` values are escaped URLs.
    pub fn render_html(&self) -> String {
        let url = escape_html(&self.url);
        let title = escape_html(&self.title);
        let labels = format!("<em class=\"placeholder\">{}</em>", escape_html(&self.labels));
        substitute(
            ENTITY_MESSAGE,
            &[
                (":url", url.as_str()),
                ("@title", title.as_str()),
                ("%label", labels.as_str()),
            ],
        )
    }

    /// Render the message as plain text.
    pub fn render_plain(&self) -> String {
        format!(
            "There is existing content: {} ({}), with identical values for the following field(s): {}.",
            self.title, self.url, self.labels
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_plain())
    }
}

/// Single-pass placeholder substitution, so values are never re-scanned.
fn substitute(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while !rest.is_empty() {
        for (placeholder, value) in replacements {
            if let Some(after) = rest.strip_prefix(placeholder) {
                rendered.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            rendered.push(c);
        }
        rest = chars.as_str();
    }

    rendered
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Receiver of violations, deciding how they are rendered or acted upon.
pub trait ViolationSink {
    fn add_violation(&mut self, violation: Violation);
}

impl ViolationSink for Vec<Violation> {
    fn add_violation(&mut self, violation: Violation) {
        self.push(violation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation() -> Violation {
        Violation::new(
            "uniqueness",
            "field_unique",
            3,
            "/node/3",
            "Tom & Jerry <3>",
            "Title (not case sensitive), ISBN",
        )
    }

    #[test]
    fn test_render_html_escapes_parameters() {
        assert_eq!(
            violation().render_html(),
            "There is existing content: <a href=\"/node/3\" target=\"_blank\">Tom &amp; Jerry &lt;3&gt;</a>, \
             with identical values for the following field(s): \
             <em class=\"placeholder\">Title (not case sensitive), ISBN</em>."
        );
    }

    #[test]
    fn test_placeholders_in_values_are_kept() {
        let mut v = violation();
        v.title = "Ask about %label".to_string();
        assert!(v.render_html().contains(">Ask about %label</a>"));
    }

    #[test]
    fn test_render_plain() {
        assert_eq!(
            violation().to_string(),
            "There is existing content: Tom & Jerry <3> (/node/3), with identical values for the following field(s): Title (not case sensitive), ISBN."
        );
    }

    #[test]
    fn test_parameters() {
        let v = violation();
        let params = v.parameters();
        assert_eq!(params[0], (":url", "/node/3"));
        assert_eq!(params[2].0, "%label");
        assert_eq!(v.template(), ENTITY_MESSAGE);
        assert_eq!(v.path, "value");
    }

    #[test]
    fn test_vec_sink() {
        let mut sink: Vec<Violation> = Vec::new();
        sink.add_violation(violation());
        assert_eq!(sink.len(), 1);
    }
}
