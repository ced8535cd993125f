//! Column mapping, row validation, preview and confirmation.

use std::collections::{BTreeMap, HashMap};

use bow_core::validation::date_order;
use bow_core::ValidationErrors;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::table::Table;
use crate::target::ImportTarget;
use crate::values::{normalize_cell, parse_date};
use crate::ImportError;

/// Field name → zero-based column index.
pub type ColumnMapping = BTreeMap<String, usize>;

/// A normalised row, keyed by field name. Empty optional cells are absent.
pub type Record = Map<String, Value>;

fn header_key(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Guess a mapping by comparing normalised headers with each field's name,
/// label and aliases. Each column is used at most once.
pub fn suggest_mapping(headers: &[String], target: ImportTarget) -> ColumnMapping {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
    let mut taken = vec![false; headers.len()];
    let mut mapping = ColumnMapping::new();

    for spec in target.fields() {
        let candidates: Vec<String> = [spec.name, spec.label]
            .into_iter()
            .chain(spec.aliases.iter().copied())
            .map(header_key)
            .collect();
        let hit = keys
            .iter()
            .enumerate()
            .find(|(i, key)| !taken[*i] && !key.is_empty() && candidates.contains(key));
        if let Some((index, _)) = hit {
            taken[index] = true;
            mapping.insert(spec.name.to_string(), index);
        }
    }
    mapping
}

/// Check a mapping against the target's field table and the file's width.
pub fn validate_mapping(
    mapping: &ColumnMapping,
    column_count: usize,
    target: ImportTarget,
) -> Result<(), ImportError> {
    let mut errors = ValidationErrors::new();
    let mut used: HashMap<usize, &str> = HashMap::new();

    for (field, &column) in mapping {
        if target.field(field).is_none() {
            errors.add(field, format!("Unknown field '{field}' for {target}."));
            continue;
        }
        if column >= column_count {
            errors.add(
                field,
                format!("Column {} does not exist (the file has {column_count}).", column + 1),
            );
        }
        if let Some(other) = used.insert(column, field) {
            errors.add(field, format!("Column {} is already mapped to {other}.", column + 1));
        }
    }

    for spec in target.fields().iter().filter(|f| f.required) {
        if !mapping.contains_key(spec.name) {
            errors.add(spec.name, format!("The {} column must be mapped.", spec.label));
        }
    }

    errors.into_result().map_err(ImportError::InvalidMapping)
}

/// Normalise and validate one data row.
pub fn normalize_row(
    row: &[String],
    target: ImportTarget,
    mapping: &ColumnMapping,
) -> Result<Record, ValidationErrors> {
    let mut record = Record::new();
    let mut errors = ValidationErrors::new();

    for spec in target.fields() {
        let cell = mapping
            .get(spec.name)
            .and_then(|&i| row.get(i))
            .map(|c| c.trim())
            .unwrap_or_default();
        if cell.is_empty() {
            if spec.required {
                errors.add(spec.name, format!("The {} field is required.", spec.label));
            }
            continue;
        }
        match normalize_cell(spec, cell) {
            Ok(value) => {
                record.insert(spec.name.to_string(), value);
            }
            Err(message) => errors.add(spec.name, message),
        }
    }

    for (start, end) in target.date_pairs() {
        date_order(&mut errors, start, record_date(&record, start), end, record_date(&record, end));
    }

    errors.into_result().map(|()| record)
}

fn record_date(record: &Record, field: &str) -> Option<NaiveDate> {
    record.get(field).and_then(Value::as_str).and_then(parse_date)
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    /// Line number in the uploaded file (sheet row for Excel).
    pub line: usize,
    pub values: Record,
    pub errors: ValidationErrors,
}

impl PreviewRow {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub target: ImportTarget,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    /// First rows of the file, valid or not.
    pub sample: Vec<PreviewRow>,
    /// First invalid rows, for fixing the file.
    pub failures: Vec<PreviewRow>,
}

fn preview_row(line: usize, row: &[String], target: ImportTarget, mapping: &ColumnMapping) -> PreviewRow {
    match normalize_row(row, target, mapping) {
        Ok(values) => PreviewRow { line, values, errors: ValidationErrors::new() },
        Err(errors) => PreviewRow { line, values: Record::new(), errors },
    }
}

/// Validate every row and return counts plus up to `sample` rows of each
/// kind.
pub fn preview(
    table: &Table,
    target: ImportTarget,
    mapping: &ColumnMapping,
    sample: usize,
) -> Result<Preview, ImportError> {
    validate_mapping(mapping, table.headers.len(), target)?;

    let mut rows = Vec::new();
    let mut failures = Vec::new();
    let mut invalid_rows = 0;
    for (index, row) in table.rows.iter().enumerate() {
        let checked = preview_row(table.line(index), row, target, mapping);
        if !checked.is_valid() {
            invalid_rows += 1;
            if failures.len() < sample {
                failures.push(checked.clone());
            }
        }
        if rows.len() < sample {
            rows.push(checked);
        }
    }

    Ok(Preview {
        target,
        total_rows: table.len(),
        valid_rows: table.len() - invalid_rows,
        invalid_rows,
        sample: rows,
        failures,
    })
}

#[derive(Debug, Clone)]
pub struct Confirmed {
    pub records: Vec<Record>,
    pub skipped: usize,
}

/// Normalise the whole table for insertion. Invalid rows abort the import
/// unless `skip_invalid` is set, in which case they are counted and dropped.
pub fn confirm(
    table: &Table,
    target: ImportTarget,
    mapping: &ColumnMapping,
    skip_invalid: bool,
) -> Result<Confirmed, ImportError> {
    validate_mapping(mapping, table.headers.len(), target)?;

    let mut records = Vec::with_capacity(table.len());
    let mut skipped = 0;
    for row in &table.rows {
        match normalize_row(row, target, mapping) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 && !skip_invalid {
        return Err(ImportError::InvalidRows { count: skipped });
    }
    debug!(target = %target, records = records.len(), skipped, "import confirmed");
    Ok(Confirmed { records, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn risk_table() -> Table {
        Table::new(
            strings(&["Risk Title", "Probability", "Severity", "Owner", "Review"]),
            vec![
                strings(&["Data centre flood", "2", "5", "ops@example.com", "01/04/2026"]),
                strings(&["Key person leaves", "9", "3", "", ""]),
                strings(&["", "3", "3", "", ""]),
                strings(&["Supplier insolvency", "3", "4", "", "2026-05-01"]),
            ],
        )
    }

    #[test]
    fn suggests_mapping_from_aliases() {
        let table = risk_table();
        let mapping = suggest_mapping(&table.headers, ImportTarget::Risks);
        assert_eq!(mapping.get("title"), Some(&0));
        assert_eq!(mapping.get("likelihood"), Some(&1));
        assert_eq!(mapping.get("impact"), Some(&2));
        assert_eq!(mapping.get("owner_email"), Some(&3));
        assert_eq!(mapping.get("review_date"), Some(&4));
        assert!(!mapping.contains_key("status"));
    }

    #[test]
    fn header_matching_ignores_case_and_punctuation() {
        let headers = strings(&["DUE_DATE", "Title", "start-date"]);
        let mapping = suggest_mapping(&headers, ImportTarget::WorkItems);
        assert_eq!(mapping.get("due_date"), Some(&0));
        assert_eq!(mapping.get("title"), Some(&1));
        assert_eq!(mapping.get("start_date"), Some(&2));
    }

    #[test]
    fn mapping_validation_reports_every_problem() {
        let mapping: ColumnMapping = [("title", 0), ("likelihood", 0), ("colour", 1), ("impact", 7)]
            .into_iter()
            .map(|(field, column)| (field.to_string(), column))
            .collect();
        let Err(ImportError::InvalidMapping(errors)) = validate_mapping(&mapping, 3, ImportTarget::Risks) else {
            panic!("expected mapping errors");
        };
        assert!(errors.get("colour").is_some());
        assert!(errors.get("impact").unwrap()[0].contains("Column 8"));
        // fields are checked in name order
        assert!(errors.get("title").unwrap()[0].contains("already mapped to likelihood"));
    }

    #[test]
    fn missing_required_column_is_rejected() {
        let mapping: ColumnMapping = [("title".to_string(), 0)].into_iter().collect();
        let err = validate_mapping(&mapping, 2, ImportTarget::Risks).unwrap_err();
        let ImportError::InvalidMapping(errors) = err else { panic!() };
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["impact", "likelihood"]);
    }

    #[test]
    fn preview_counts_and_samples() {
        let table = risk_table();
        let mapping = suggest_mapping(&table.headers, ImportTarget::Risks);
        let preview = preview(&table, ImportTarget::Risks, &mapping, 2).unwrap();

        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.valid_rows, 2);
        assert_eq!(preview.invalid_rows, 2);
        assert_eq!(preview.sample.len(), 2);
        assert_eq!(preview.sample[0].line, 2);
        assert_eq!(preview.sample[0].values["review_date"], "2026-04-01");
        assert_eq!(preview.failures.len(), 2);
        assert_eq!(preview.failures[0].line, 3);
        assert!(preview.failures[0].errors.get("likelihood").is_some());
        assert!(preview.failures[1].errors.get("title").is_some());
    }

    #[test]
    fn preview_lines_skip_blank_rows_in_the_file() {
        let csv = "Title,Likelihood,Impact\nFlood,2,5\n,,\n\nFire,9,3\n";
        let table = crate::read_csv(csv.as_bytes()).unwrap();
        let mapping = suggest_mapping(&table.headers, ImportTarget::Risks);
        let preview = preview(&table, ImportTarget::Risks, &mapping, 10).unwrap();
        assert_eq!(preview.failures.len(), 1);
        assert_eq!(preview.failures[0].line, 5);
    }

    #[test]
    fn cross_field_dates_are_checked() {
        let headers = strings(&["Title", "Start", "Due"]);
        let mapping = suggest_mapping(&headers, ImportTarget::WorkItems);
        let row = strings(&["Migrate", "2026-05-01", "2026-04-01"]);
        let errors = normalize_row(&row, ImportTarget::WorkItems, &mapping).unwrap_err();
        assert!(errors.get("due_date").is_some());
    }

    #[test]
    fn confirm_all_or_skip() {
        let table = risk_table();
        let mapping = suggest_mapping(&table.headers, ImportTarget::Risks);

        let err = confirm(&table, ImportTarget::Risks, &mapping, false).unwrap_err();
        assert!(matches!(err, ImportError::InvalidRows { count: 2 }));

        let confirmed = confirm(&table, ImportTarget::Risks, &mapping, true).unwrap();
        assert_eq!(confirmed.skipped, 2);
        assert_eq!(confirmed.records.len(), 2);
        let first = &confirmed.records[0];
        assert_eq!(first["title"], "Data centre flood");
        assert_eq!(first["likelihood"], 2);
        assert_eq!(first["owner_email"], "ops@example.com");
        assert!(!confirmed.records[1].contains_key("owner_email"));
    }
}
