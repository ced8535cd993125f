//! CSV export of list views.

use bow_core::models::{GovernanceItemView, RiskView, SupplierView, WorkItemView};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::ImportError;

/// A record that can be written as one CSV row.
pub trait ExportRecord {
    fn headers() -> &'static [&'static str];
    fn row(&self) -> Vec<String>;
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn id(value: Option<Uuid>) -> String {
    opt(&value)
}

impl ExportRecord for WorkItemView {
    fn headers() -> &'static [&'static str] {
        &[
            "id", "title", "description", "status", "priority", "team_id", "owner_id",
            "assignee_id", "start_date", "due_date", "completed_at", "rag",
        ]
    }

    fn row(&self) -> Vec<String> {
        let i = &self.item;
        vec![
            i.id.to_string(),
            i.title.clone(),
            opt(&i.description),
            i.status.to_string(),
            i.priority.to_string(),
            id(i.team_id),
            id(i.owner_id),
            id(i.assignee_id),
            date(i.start_date),
            date(i.due_date),
            i.completed_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.rag.to_string(),
        ]
    }
}

impl ExportRecord for RiskView {
    fn headers() -> &'static [&'static str] {
        &[
            "id", "title", "description", "category", "likelihood", "impact", "score", "status",
            "owner_id", "mitigation", "review_date", "rag",
        ]
    }

    fn row(&self) -> Vec<String> {
        let r = &self.risk;
        vec![
            r.id.to_string(),
            r.title.clone(),
            opt(&r.description),
            opt(&r.category),
            r.likelihood.to_string(),
            r.impact.to_string(),
            self.score.to_string(),
            r.status.to_string(),
            id(r.owner_id),
            opt(&r.mitigation),
            date(r.review_date),
            self.rag.to_string(),
        ]
    }
}

impl ExportRecord for SupplierView {
    fn headers() -> &'static [&'static str] {
        &[
            "id", "name", "contact_name", "contact_email", "phone", "category", "criticality",
            "status", "contract_start", "contract_end", "annual_value", "owner_id", "notes", "rag",
        ]
    }

    fn row(&self) -> Vec<String> {
        let s = &self.supplier;
        vec![
            s.id.to_string(),
            s.name.clone(),
            opt(&s.contact_name),
            opt(&s.contact_email),
            opt(&s.phone),
            opt(&s.category),
            s.criticality.to_string(),
            s.status.to_string(),
            date(s.contract_start),
            date(s.contract_end),
            s.annual_value_cents.map(format_cents).unwrap_or_default(),
            id(s.owner_id),
            opt(&s.notes),
            self.rag.to_string(),
        ]
    }
}

impl ExportRecord for GovernanceItemView {
    fn headers() -> &'static [&'static str] {
        &[
            "id", "title", "description", "kind", "status", "review_frequency", "last_reviewed",
            "next_review_date", "owner_id", "rag",
        ]
    }

    fn row(&self) -> Vec<String> {
        let g = &self.item;
        vec![
            g.id.to_string(),
            g.title.clone(),
            opt(&g.description),
            g.kind.to_string(),
            g.status.to_string(),
            g.review_frequency.to_string(),
            date(g.last_reviewed),
            date(g.next_review_date),
            id(g.owner_id),
            self.rag.to_string(),
        ]
    }
}

/// `123450` → `"1234.50"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Serialise rows under a header line. Output re-imports cleanly.
pub fn write_csv<I>(headers: &[&str], rows: I) -> Result<Vec<u8>, ImportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ImportError::Csv(e.into_error().into()))
}

/// All records of one type as CSV.
pub fn export_records<R: ExportRecord>(records: &[R]) -> Result<Vec<u8>, ImportError> {
    write_csv(R::headers(), records.iter().map(ExportRecord::row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_csv;

    #[test]
    fn formats_cents() {
        assert_eq!(format_cents(123_450), "1234.50");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(-250), "-2.50");
    }

    #[test]
    fn quotes_awkward_cells_and_reads_back() {
        let rows = vec![
            vec!["Plan, then act".to_string(), "say \"hi\"".to_string()],
            vec!["line\nbreak".to_string(), String::new()],
        ];
        let bytes = write_csv(&["title", "notes"], rows.clone()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("title,notes\n\"Plan, then act\""));

        let table = read_csv(&bytes).unwrap();
        assert_eq!(table.headers, vec!["title", "notes"]);
        assert_eq!(table.rows[0], rows[0]);
    }

    #[test]
    fn exports_risks_with_score_and_rag() {
        let now = chrono::Utc::now();
        let risk = bow_core::models::Risk::new(
            bow_core::models::CreateRisk {
                title: "Flood".into(),
                description: None,
                category: None,
                likelihood: 4,
                impact: 5,
                status: Default::default(),
                owner_id: None,
                department_id: None,
                mitigation: None,
                review_date: None,
            },
            Uuid::new_v4(),
            None,
            now,
        );
        let csv = export_records(&[RiskView::from(risk)]).unwrap();
        let table = read_csv(&csv).unwrap();
        let score = table.headers.iter().position(|h| h == "score").unwrap();
        let rag = table.headers.iter().position(|h| h == "rag").unwrap();
        assert_eq!(table.rows[0][score], "20");
        assert_eq!(table.rows[0][rag], "red");
    }
}
