//! Validator framework for checking records before they are saved.
//!
//! A validator inspects one record against the corpus of existing records
//! and reports violations. Violations are not errors: the caller blocks the
//! save based on how many were reported. Errors are reserved for failures of
//! the validation step itself, such as an unreachable corpus.
//!
//! # Example
//!
//! ```ignore
//! let validator = UniquenessValidator::new(&settings);
//! let ctx = ValidationContext::new(&corpus, &labels);
//! let violations = validator.validate(&record, &ctx)?;
//! if !violations.is_empty() {
//!     // refuse to save
//! }
//! ```

pub mod uniqueness;
pub mod violation;

pub use uniqueness::UniquenessValidator;
pub use violation::{Violation, ViolationSink, ENTITY_MESSAGE};

use crate::corpus::Corpus;
use crate::error::Result;
use crate::labels::FieldLabelResolver;
use crate::record::UniqueRecord;

/// Collaborators available to validators during a validation pass.
pub struct ValidationContext<'a> {
    /// Existing records to compare against
    pub corpus: &'a dyn Corpus,
    /// Display labels for violation messages
    pub labels: &'a dyn FieldLabelResolver,
}

impl<'a> ValidationContext<'a> {
    /// Create a new validation context.
    pub fn new(corpus: &'a dyn Corpus, labels: &'a dyn FieldLabelResolver) -> Self {
        Self { corpus, labels }
    }
}

/// Trait for implementing record validators.
pub trait Validator {
    /// Returns the unique name of this validator.
    fn name(&self) -> &'static str;

    /// Validate a record and return the violations found.
    fn validate(
        &self,
        record: &dyn UniqueRecord,
        ctx: &ValidationContext<'_>,
    ) -> Result<Vec<Violation>>;

    /// Validate a record and hand every violation to a sink.
    ///
    /// Returns the number of violations reported.
    fn validate_into(
        &self,
        record: &dyn UniqueRecord,
        ctx: &ValidationContext<'_>,
        sink: &mut dyn ViolationSink,
    ) -> Result<usize> {
        let violations = self.validate(record, ctx)?;
        let count = violations.len();
        for violation in violations {
            sink.add_violation(violation);
        }
        Ok(count)
    }
}
