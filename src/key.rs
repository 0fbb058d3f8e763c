//! Comparison keys: the normalized values a candidate is compared on.

use indexmap::IndexMap;

use crate::labels::FieldLabelResolver;
use crate::record::UniqueRecord;
use crate::settings::UniquenessSettings;

/// Case folding used for case-insensitive title comparison.
///
/// Unicode lowercase mapping, applied the same way by every corpus backend.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

/// Title component of a comparison key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleComponent {
    /// The candidate's title, verbatim
    pub value: String,
    pub case_sensitive: bool,
}

impl TitleComponent {
    pub fn new(value: impl Into<String>, case_sensitive: bool) -> Self {
        TitleComponent {
            value: value.into(),
            case_sensitive,
        }
    }

    /// The value to compare against, folded when case insensitive.
    pub fn normalized(&self) -> String {
        if self.case_sensitive {
            self.value.clone()
        } else {
            fold_case(&self.value)
        }
    }

    /// Whether an existing title is equal under this component's rule.
    pub fn matches(&self, title: &str) -> bool {
        if self.case_sensitive {
            self.value == title
        } else {
            fold_case(&self.value) == fold_case(title)
        }
    }
}

/// Title plus selected field values of a candidate, and the labels
/// describing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComparisonKey {
    title: Option<TitleComponent>,
    field_values: IndexMap<String, String>,
    field_labels: Vec<String>,
}

impl ComparisonKey {
    /// Build the key for a record under the given settings.
    ///
    /// Selected fields whose trimmed value is empty are left out, along with
    /// their label.
    pub fn build(
        settings: &UniquenessSettings,
        record: &dyn UniqueRecord,
        labels: &dyn FieldLabelResolver,
    ) -> Self {
        let mut key = ComparisonKey::default();

        if settings.include_title {
            let sensitivity = if settings.title_case_sensitive {
                "case sensitive"
            } else {
                "not case sensitive"
            };
            key.field_labels
                .push(format!("{} ({})", settings.kind.title_label(), sensitivity));
            key.title = Some(TitleComponent::new(
                record.label(),
                settings.title_case_sensitive,
            ));
        }

        for field in &settings.selected_fields {
            let raw = record.field_string(field);
            let value = raw.trim();
            if value.is_empty() {
                continue;
            }
            key.field_values.insert(field.clone(), value.to_string());
            key.field_labels
                .push(labels.label(settings.kind, &settings.category, field));
        }

        key
    }

    /// True when there is nothing to compare.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.field_values.is_empty()
    }

    pub fn title(&self) -> Option<&TitleComponent> {
        self.title.as_ref()
    }

    /// Field identifier -> trimmed value, in selection order.
    pub fn field_values(&self) -> &IndexMap<String, String> {
        &self.field_values
    }

    pub fn field_labels(&self) -> &[String] {
        &self.field_labels
    }

    /// Labels joined for display.
    pub fn joined_labels(&self) -> String {
        self.field_labels.join(", ")
    }
}
