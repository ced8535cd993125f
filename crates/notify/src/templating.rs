//! Minijinja template rendering for notification messages.
//!
//! Every [`NotificationKind`] has a built-in subject and body template.
//! Deployments may replace them; replacements are syntax-checked when
//! installed so a broken template never reaches a scheduled job.
//!
//! Templates are owned strings, so a fresh [`minijinja::Environment`] is
//! created per render call.

use std::collections::HashMap;

use bow_core::models::NotificationKind;
use chrono::NaiveDate;

use crate::traits::NotifyError;

/// One line in a list rendered by a template (digest entries).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LineContext {
    pub title: String,
    /// ISO date.
    pub due: Option<String>,
    pub link: String,
}

/// Data available to notification templates.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MessageContext {
    pub app_name: String,
    pub app_url: String,
    pub recipient_name: String,
    /// Title of the record the message is about.
    pub title: String,
    /// ISO date the message is about (due date, review date, contract end).
    pub due: Option<String>,
    pub days_until: Option<i64>,
    /// Absolute URL of the record.
    pub link: Option<String>,
    /// Who triggered the message, for assignments.
    pub actor_name: Option<String>,
    /// Imported row count, or open item count for digests.
    pub count: Option<usize>,
    pub overdue: Vec<LineContext>,
    pub due_soon: Vec<LineContext>,
}

/// Subject and body template pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTemplate {
    pub subject: String,
    pub body: String,
}

const FOOTER: &str = "\n\n--\n{{ app_name }} · {{ app_url }}\nYou receive these e-mails because notifications are enabled on your profile.";

fn builtin(kind: NotificationKind) -> (&'static str, &'static str) {
    match kind {
        NotificationKind::Assigned => (
            "You have been assigned: {{ title }}",
            "Hi {{ recipient_name }},\n\n{{ actor_name or 'Someone' }} assigned \"{{ title }}\" to you.{% if due %} It is due on {{ due | date }}.{% endif %}\n\n{{ link }}",
        ),
        NotificationKind::DeadlineApproaching => (
            "Due {% if days_until == 0 %}today{% else %}in {{ days_until }} day{% if days_until != 1 %}s{% endif %}{% endif %}: {{ title }}",
            "Hi {{ recipient_name }},\n\n\"{{ title }}\" is due on {{ due | date }}.\n\n{{ link }}",
        ),
        NotificationKind::Overdue => (
            "Overdue: {{ title }}",
            "Hi {{ recipient_name }},\n\n\"{{ title }}\" was due on {{ due | date }} and is not done yet.\n\n{{ link }}",
        ),
        NotificationKind::RiskReview => (
            "Risk review due: {{ title }}",
            "Hi {{ recipient_name }},\n\nThe risk \"{{ title }}\" is due for review on {{ due | date }}.\n\n{{ link }}",
        ),
        NotificationKind::ContractExpiring => (
            "Contract expiring: {{ title }}",
            "Hi {{ recipient_name }},\n\nThe contract with {{ title }} ends on {{ due | date }} ({{ days_until }} days from today).\n\n{{ link }}",
        ),
        NotificationKind::GovernanceReview => (
            "Governance review due: {{ title }}",
            "Hi {{ recipient_name }},\n\n\"{{ title }}\" is due for review on {{ due | date }}.\n\n{{ link }}",
        ),
        NotificationKind::WeeklyDigest => (
            "Your week: {{ count }} open item{% if count != 1 %}s{% endif %}",
            "Hi {{ recipient_name }},\n\nYou have {{ count }} open item{% if count != 1 %}s{% endif %}.\n{% if overdue %}\nOverdue:\n{% for line in overdue %}  - {{ line.title }} (due {{ line.due | date }}) {{ line.link }}\n{% endfor %}{% endif %}{% if due_soon %}\nDue this week:\n{% for line in due_soon %}  - {{ line.title }} (due {{ line.due | date }}) {{ line.link }}\n{% endfor %}{% endif %}",
        ),
        NotificationKind::ImportCompleted => (
            "Import completed: {{ count }} {{ title }}",
            "Hi {{ recipient_name }},\n\nYour import finished and created {{ count }} {{ title }}.\n\n{{ link }}",
        ),
    }
}

/// Renders notification templates using minijinja.
#[derive(Debug, Default)]
pub struct TemplateRenderer {
    overrides: HashMap<NotificationKind, KindTemplate>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the templates for one kind after checking they parse.
    pub fn set_template(&mut self, kind: NotificationKind, template: KindTemplate) -> Result<(), NotifyError> {
        self.validate(&template.subject)?;
        self.validate(&template.body)?;
        self.overrides.insert(kind, template);
        Ok(())
    }

    pub fn template(&self, kind: NotificationKind) -> KindTemplate {
        self.overrides.get(&kind).cloned().unwrap_or_else(|| {
            let (subject, body) = builtin(kind);
            KindTemplate {
                subject: subject.to_string(),
                body: format!("{body}{FOOTER}"),
            }
        })
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.add_filter("lower", lower_filter);
        env.add_filter("upper", upper_filter);
        env.add_filter("date", date_filter);
        env
    }

    /// Render a template string with the given context.
    pub fn render<S: serde::Serialize>(&self, template_str: &str, ctx: &S) -> Result<String, NotifyError> {
        let env = Self::build_env();
        env.render_str(template_str, ctx)
            .map_err(|e| NotifyError::Template(e.to_string()))
    }

    /// Render the subject and body for a notification kind.
    pub fn render_kind(&self, kind: NotificationKind, ctx: &MessageContext) -> Result<(String, String), NotifyError> {
        let template = self.template(kind);
        let subject = self.render(&template.subject, ctx)?;
        let body = self.render(&template.body, ctx)?;
        // Subjects are single-line headers.
        Ok((subject.replace(['\r', '\n'], " ").trim().to_string(), body))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template_str: &str) -> Result<(), NotifyError> {
        let env = Self::build_env();
        env.template_from_str(template_str)
            .map_err(|e| NotifyError::Template(e.to_string()))?;
        Ok(())
    }
}

fn lower_filter(value: String) -> String {
    value.to_lowercase()
}

fn upper_filter(value: String) -> String {
    value.to_uppercase()
}

/// Format an ISO date (`2025-03-01`, optionally with a time part) with a
/// chrono format string, default `%d %b %Y`. Unparseable input is returned
/// unchanged and a missing date renders empty.
fn date_filter(value: minijinja::Value, format: Option<String>) -> String {
    if value.is_none() || value.is_undefined() {
        return String::new();
    }
    let raw = value.to_string();
    let head = raw.get(..10).unwrap_or(&raw);
    match NaiveDate::parse_from_str(head, "%Y-%m-%d") {
        Ok(date) => date.format(format.as_deref().unwrap_or("%d %b %Y")).to_string(),
        Err(_) => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> MessageContext {
        MessageContext {
            app_name: "Book of Work".into(),
            app_url: "https://bow.example.com".into(),
            recipient_name: "Ada".into(),
            title: "Renew ISO certificate".into(),
            due: Some("2025-03-07".into()),
            days_until: Some(3),
            link: Some("https://bow.example.com/work-items/1".into()),
            ..Default::default()
        }
    }

    #[test]
    fn every_kind_renders() {
        let renderer = TemplateRenderer::new();
        for kind in NotificationKind::ALL {
            let (subject, body) = renderer.render_kind(*kind, &ctx()).unwrap();
            assert!(!subject.is_empty(), "{kind}");
            assert!(body.contains("Ada"), "{kind}");
        }
    }

    #[test]
    fn deadline_subject_pluralises() {
        let renderer = TemplateRenderer::new();
        let (subject, body) = renderer.render_kind(NotificationKind::DeadlineApproaching, &ctx()).unwrap();
        assert_eq!(subject, "Due in 3 days: Renew ISO certificate");
        assert!(body.contains("07 Mar 2025"), "{body}");

        let mut today = ctx();
        today.days_until = Some(0);
        let (subject, _) = renderer.render_kind(NotificationKind::DeadlineApproaching, &today).unwrap();
        assert_eq!(subject, "Due today: Renew ISO certificate");
    }

    #[test]
    fn digest_lists_lines() {
        let renderer = TemplateRenderer::new();
        let mut ctx = ctx();
        ctx.count = Some(2);
        ctx.overdue = vec![LineContext {
            title: "Late thing".into(),
            due: Some("2025-03-01".into()),
            link: "https://bow.example.com/work-items/2".into(),
        }];
        let (subject, body) = renderer.render_kind(NotificationKind::WeeklyDigest, &ctx).unwrap();
        assert_eq!(subject, "Your week: 2 open items");
        assert!(body.contains("Overdue:\n  - Late thing (due 01 Mar 2025)"), "{body}");
        assert!(!body.contains("Due this week"));
    }

    #[test]
    fn filters() {
        let renderer = TemplateRenderer::new();
        assert_eq!(renderer.render("{{ title | upper }}", &ctx()).unwrap(), "RENEW ISO CERTIFICATE");
        assert_eq!(renderer.render("{{ title | lower }}", &ctx()).unwrap(), "renew iso certificate");
        assert_eq!(renderer.render("{{ due | date('%Y/%m/%d') }}", &ctx()).unwrap(), "2025/03/07");
        assert_eq!(renderer.render("{{ 'soon' | date }}", &ctx()).unwrap(), "soon");
    }

    #[test]
    fn overrides_are_validated() {
        let mut renderer = TemplateRenderer::new();
        let bad = KindTemplate { subject: "{{ unclosed".into(), body: "ok".into() };
        assert!(matches!(
            renderer.set_template(NotificationKind::Overdue, bad),
            Err(NotifyError::Template(_))
        ));

        let good = KindTemplate { subject: "LATE {{ title }}".into(), body: "{{ link }}".into() };
        renderer.set_template(NotificationKind::Overdue, good).unwrap();
        let (subject, body) = renderer.render_kind(NotificationKind::Overdue, &ctx()).unwrap();
        assert_eq!(subject, "LATE Renew ISO certificate");
        assert_eq!(body, "https://bow.example.com/work-items/1");
    }
}
