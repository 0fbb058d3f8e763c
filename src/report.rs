use colored::Colorize;
use std::path::Path;

use crate::record::{CandidateRecord, UniqueRecord};
use crate::validators::Violation;

/// Print the report header.
pub fn print_header(settings_path: &Path, corpus_path: &Path, candidate: &CandidateRecord) {
    println!("{}", "=".repeat(80));
    println!("{}", "Uniqueness Check Report".bold());
    println!("{}", "=".repeat(80));
    println!("Settings: {}", settings_path.display());
    println!("Corpus: {}", corpus_path.display());
    println!("Record: {}", describe_candidate(candidate));
    println!();
}

fn describe_candidate(candidate: &CandidateRecord) -> String {
    let id_str = match candidate.id() {
        Some(id) => format!("#{}", id),
        None => "(new)".to_string(),
    };
    let status = if candidate.is_published() {
        "published"
    } else {
        "unpublished"
    };
    format!(
        "{} {} {} \"{}\" [{}]",
        candidate.entity_type(),
        candidate.category(),
        id_str,
        candidate.label(),
        status
    )
}

/// Print a single violation.
pub fn print_violation(index: usize, violation: &Violation) {
    println!("{}", "-".repeat(80));
    println!(
        "{} #{} from {}",
        "CONFLICT".red().bold(),
        index + 1,
        violation.constraint.yellow()
    );
    println!("{}", "-".repeat(80));
    println!("Existing: {} ({})", violation.title.cyan(), violation.url);
    println!("Fields: {}", violation.labels);
    println!("Message: {}", violation.render_plain());
    println!();
}

/// Print the summary footer.
pub fn print_summary(violations: &[Violation]) {
    println!("{}", "=".repeat(80));

    if violations.is_empty() {
        println!("{}", "No conflicts found - record may be saved.".green().bold());
    } else {
        println!(
            "{}: {} conflicting record(s) found",
            "Summary".bold(),
            violations.len().to_string().red()
        );
    }

    println!("{}", "=".repeat(80));
}
