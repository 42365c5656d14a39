//! Per-file and batch-wide validation of submitted card images.

use std::collections::HashMap;

use crate::config::ImportLimits;
use crate::models::{FileAsset, Finding, FindingKind, ParsedName, Severity};

use super::filename::parse_card_filename;

/// Outcome of validating one file.
#[derive(Debug, Clone)]
pub struct CheckedFile {
    /// `None` when the name could not be parsed.
    pub parsed: Option<ParsedName>,
    /// Most severe finding raised for this file.
    pub worst: Option<Severity>,
}

impl CheckedFile {
    /// Whether the file may be uploaded and staged.
    pub fn is_eligible(&self) -> bool {
        self.parsed.is_some() && !self.worst.is_some_and(|s| s.skips_file())
    }
}

/// Findings for a whole batch, with one [`CheckedFile`] per input in order.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub files: Vec<CheckedFile>,
    pub findings: Vec<Finding>,
    pub duplicates: Vec<String>,
    pub large_files: Vec<String>,
}

impl ValidationReport {
    pub fn has_critical(&self) -> bool {
        self.findings.iter().any(|f| f.severity.blocks_batch())
    }

    pub fn valid_files(&self) -> usize {
        self.files.iter().filter(|f| f.is_eligible()).count()
    }

    fn record(&mut self, index: usize, finding: Finding) {
        let slot = &mut self.files[index].worst;
        *slot = Some(slot.map_or(finding.severity, |s| s.max(finding.severity)));
        self.findings.push(finding);
    }
}

/// Strip parameters and lowercase a MIME type.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Structural problems that make a file unusable regardless of its name.
fn structural_problem(file: &FileAsset) -> Option<String> {
    if file.name.trim().is_empty() {
        return Some("File name is required".to_string());
    }
    if file.size == 0 || file.data.is_empty() {
        return Some("File is empty".to_string());
    }
    if file.content_type.trim().is_empty() {
        return Some("Content type is required".to_string());
    }
    if file.size != file.data.len() as u64 {
        return Some(format!(
            "Declared size {} does not match data length {}",
            file.size,
            file.data.len()
        ));
    }
    None
}

/// Validate every file, then check the batch for duplicate cards.
///
/// Findings are ordered by file, with duplicate findings after the per-file ones.
pub fn validate_files(files: &[FileAsset], limits: &ImportLimits) -> ValidationReport {
    let mut report = ValidationReport {
        files: Vec::with_capacity(files.len()),
        ..Default::default()
    };

    for (index, file) in files.iter().enumerate() {
        let parsed = parse_card_filename(&file.name);
        report.files.push(CheckedFile {
            parsed: parsed.as_ref().ok().cloned(),
            worst: None,
        });

        if let Some(problem) = structural_problem(file) {
            report.record(
                index,
                Finding::new(&file.name, FindingKind::MalformedFile, Severity::Critical, problem),
            );
        }

        if let Err(rejection) = &parsed {
            report.record(
                index,
                Finding::new(
                    &file.name,
                    FindingKind::MalformedName,
                    Severity::Critical,
                    rejection.to_string(),
                ),
            );
        }

        let size = file.size.max(file.data.len() as u64);
        if size > limits.max_file_size as u64 {
            report.record(
                index,
                Finding::new(
                    &file.name,
                    FindingKind::SizeExceeded,
                    Severity::Critical,
                    format!(
                        "File size {} bytes exceeds maximum of {} bytes",
                        size, limits.max_file_size
                    ),
                ),
            );
        } else if size > limits.large_file_warning as u64 {
            report.large_files.push(file.name.clone());
            report.record(
                index,
                Finding::new(
                    &file.name,
                    FindingKind::LargeFile,
                    Severity::Low,
                    format!("Large file: {:.1} MiB", size as f64 / (1024.0 * 1024.0)),
                ),
            );
        }

        if let Ok(parsed) = &parsed {
            let declared = normalize_content_type(&file.content_type);
            let expected = parsed.extension.content_type();
            if !declared.is_empty() && declared != expected {
                report.record(
                    index,
                    Finding::new(
                        &file.name,
                        FindingKind::ContentTypeMismatch,
                        Severity::Medium,
                        format!(
                            "Content type '{}' does not match extension '{}' (expected '{}')",
                            declared, parsed.extension, expected
                        ),
                    ),
                );
            }
        }
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    for index in 0..files.len() {
        let Some(key) = report.files[index].parsed.as_ref().map(ParsedName::duplicate_key) else {
            continue;
        };

        match seen.get(&key) {
            Some(&first) => {
                let name = files[index].name.clone();
                report.duplicates.push(name.clone());
                report.record(
                    index,
                    Finding::new(
                        name,
                        FindingKind::DuplicateName,
                        Severity::High,
                        format!("Duplicate card '{}' (first seen in {})", key, files[first].name),
                    ),
                );
            }
            None => {
                seen.insert(key, index);
            }
        }
    }

    report
}
