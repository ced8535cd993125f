//! In-app notifications with optional e-mail delivery.
//!
//! Every message is rendered once from the kind's template. The subject
//! becomes the notification title; the e-mail goes out only when the row
//! was actually stored, so a deduplicated reminder is never mailed twice.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, warn};

use bow_core::models::{NewNotification, NotificationKind, User, WorkItem};
use bow_core::reminders::{Digest, DigestLine, Reminder};
use bow_notify::{LineContext, MessageContext, Notification};

use crate::repo;
use crate::state::{AppState, APP_NAME};

/// Marks the start of the e-mail footer in rendered bodies.
const FOOTER_SEPARATOR: &str = "\n\n--\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub stored: bool,
    pub emailed: bool,
}

/// Template context with the app and recipient filled in.
pub fn context_for(state: &AppState, recipient: &User) -> MessageContext {
    MessageContext {
        app_name: APP_NAME.to_string(),
        app_url: state.config.mail.app_url.clone(),
        recipient_name: recipient.name.clone(),
        ..Default::default()
    }
}

pub fn reminder_context(state: &AppState, recipient: &User, reminder: &Reminder) -> MessageContext {
    MessageContext {
        title: reminder.title.clone(),
        due: Some(reminder.due.to_string()),
        days_until: Some(reminder.days_until),
        link: Some(state.absolute_link(&reminder.link)),
        ..context_for(state, recipient)
    }
}

pub fn digest_context(state: &AppState, recipient: &User, digest: &Digest) -> MessageContext {
    let line = |l: &DigestLine| LineContext {
        title: l.title.clone(),
        due: l.due.map(|d| d.to_string()),
        link: state.absolute_link(&l.link),
    };
    MessageContext {
        count: Some(digest.open),
        overdue: digest.overdue.iter().map(line).collect(),
        due_soon: digest.due_this_week.iter().map(line).collect(),
        ..context_for(state, recipient)
    }
}

/// Store a notification for `recipient` and e-mail it if they opted in.
pub async fn deliver(
    state: &AppState,
    pool: &PgPool,
    recipient: &User,
    kind: NotificationKind,
    ctx: &MessageContext,
    link: Option<String>,
    dedupe_key: Option<String>,
) -> anyhow::Result<Delivery> {
    let (subject, body) = state.templates.render_kind(kind, ctx)?;
    let in_app_body = body.split(FOOTER_SEPARATOR).next().unwrap_or(&body).trim().to_string();

    let new = NewNotification {
        user_id: recipient.id,
        kind,
        title: subject.clone(),
        body: in_app_body,
        link,
        dedupe_key,
    };
    let Some(stored) = repo::notifications::insert(pool, &new, Utc::now()).await? else {
        debug!(user_id = %recipient.id, kind = %kind, "notification already sent, skipping");
        return Ok(Delivery::default());
    };

    let mut delivery = Delivery { stored: true, emailed: false };
    if recipient.is_active && recipient.email_notifications {
        let mail = Notification::new(subject, body, vec![recipient.email.clone()])
            .with_meta("kind", kind.as_str())
            .with_meta("notification_id", stored.id.to_string());
        for result in state.dispatcher.dispatch(&mail).await {
            if result.success {
                delivery.emailed = true;
            } else {
                warn!(
                    user_id = %recipient.id,
                    channel = %result.channel,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "e-mail delivery failed"
                );
            }
        }
    }
    Ok(delivery)
}

/// Tell a work item's new assignee about it. Self-assignment is silent;
/// failures are logged and never fail the request.
pub async fn notify_assignment(state: &AppState, pool: &PgPool, item: &WorkItem, actor: &User) {
    let Some(assignee_id) = item.assignee_id.filter(|id| *id != actor.id) else {
        return;
    };
    let assignee = match repo::users::find(pool, assignee_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            warn!(work_item_id = %item.id, error = %e, "could not load assignee");
            return;
        }
    };

    let link = bow_core::calendar::EventSource::WorkItem.link(item.id);
    let ctx = MessageContext {
        title: item.title.clone(),
        due: item.due_date.map(|d| d.to_string()),
        link: Some(state.absolute_link(&link)),
        actor_name: Some(actor.name.clone()),
        ..context_for(state, &assignee)
    };
    if let Err(e) = deliver(state, pool, &assignee, NotificationKind::Assigned, &ctx, Some(link), None).await {
        warn!(work_item_id = %item.id, user_id = %assignee.id, error = %e, "assignment notification failed");
    }
}
