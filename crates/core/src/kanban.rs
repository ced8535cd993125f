//! Kanban board layout and card moves.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::BowError;
use crate::models::{WorkItem, WorkItemView, WorkStatus};
use crate::permissions::passes_filter;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Column {
    pub status: WorkStatus,
    pub cards: Vec<WorkItemView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Board {
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MoveCard {
    pub status: WorkStatus,
    /// Target index in the destination column; clamped to its length.
    pub position: i64,
}

/// New placement of a card touched by a move.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CardUpdate {
    pub id: Uuid,
    pub status: WorkStatus,
    pub position: i32,
    pub completed_at: Option<DateTime<Utc>>,
}

fn column_order(a: &WorkItem, b: &WorkItem) -> std::cmp::Ordering {
    a.position
        .cmp(&b.position)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Columns in workflow order, every status present even when empty.
pub fn board(items: Vec<WorkItem>, today: NaiveDate, amber_days: u32) -> Board {
    let mut items = items;
    items.sort_by(column_order);
    let columns = WorkStatus::ALL
        .iter()
        .map(|status| Column {
            status: *status,
            cards: items
                .iter()
                .filter(|w| w.status == *status)
                .cloned()
                .map(|w| WorkItemView::new(w, today, amber_days))
                .collect(),
        })
        .collect();
    Board { columns }
}

/// Move a card and return the placements that changed.
///
/// Only cards passing `department` (a `department_filter`) make up the
/// columns, so `to_index` is an index into the board the caller sees. Both
/// the source and target columns are renumbered densely from 0.
pub fn move_card(
    cards: &[WorkItem],
    department: Option<Uuid>,
    id: Uuid,
    to_status: WorkStatus,
    to_index: i64,
    now: DateTime<Utc>,
) -> Result<Vec<CardUpdate>, BowError> {
    let visible: Vec<&WorkItem> = cards
        .iter()
        .filter(|c| passes_filter(c.department_id, department))
        .collect();
    let moving = *visible
        .iter()
        .find(|c| c.id == id)
        .ok_or(BowError::UnknownCard(id))?;
    let from_status = moving.status;

    let column = |status: WorkStatus| {
        let mut col: Vec<&WorkItem> = visible
            .iter()
            .copied()
            .filter(|c| c.status == status && c.id != id)
            .collect();
        col.sort_by(|a, b| column_order(a, b));
        col
    };

    let mut target = column(to_status);
    let index = usize::try_from(to_index.max(0)).unwrap_or(usize::MAX).min(target.len());
    target.insert(index, moving);

    let mut updates = Vec::new();
    let mut renumber = |col: &[&WorkItem], status: WorkStatus| {
        for (pos, card) in col.iter().enumerate() {
            let position = i32::try_from(pos).unwrap_or(i32::MAX);
            let completed_at = if card.id == id {
                match (card.status.is_done(), status.is_done()) {
                    (false, true) => Some(now),
                    (true, false) => None,
                    _ => card.completed_at,
                }
            } else {
                card.completed_at
            };
            if card.status != status || card.position != position || card.completed_at != completed_at {
                updates.push(CardUpdate {
                    id: card.id,
                    status,
                    position,
                    completed_at,
                });
            }
        }
    };

    renumber(&target, to_status);
    if from_status != to_status {
        renumber(&column(from_status), from_status);
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateWorkItem;
    use chrono::Duration;

    fn card(title: &str, status: WorkStatus, position: i32, offset: i64) -> WorkItem {
        WorkItem::new(
            CreateWorkItem { title: title.into(), status, ..Default::default() },
            Uuid::new_v4(),
            None,
            position,
            Utc::now() + Duration::seconds(offset),
        )
    }

    fn placement(updates: &[CardUpdate], id: Uuid) -> Option<(WorkStatus, i32)> {
        updates.iter().find(|u| u.id == id).map(|u| (u.status, u.position))
    }

    #[test]
    fn board_has_every_column_in_order() {
        let cards = vec![
            card("b", WorkStatus::Todo, 1, 0),
            card("a", WorkStatus::Todo, 0, 1),
            card("c", WorkStatus::Done, 0, 2),
        ];
        let board = board(cards, Utc::now().date_naive(), 14);
        assert_eq!(board.columns.len(), WorkStatus::ALL.len());
        assert_eq!(board.columns[0].status, WorkStatus::Backlog);
        let todo = &board.columns[1];
        assert_eq!(todo.cards.iter().map(|c| c.item.title.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn move_within_column_reorders() {
        let cards = vec![
            card("a", WorkStatus::Todo, 0, 0),
            card("b", WorkStatus::Todo, 1, 1),
            card("c", WorkStatus::Todo, 2, 2),
        ];
        let updates = move_card(&cards, None, cards[2].id, WorkStatus::Todo, 0, Utc::now()).unwrap();
        assert_eq!(placement(&updates, cards[2].id), Some((WorkStatus::Todo, 0)));
        assert_eq!(placement(&updates, cards[0].id), Some((WorkStatus::Todo, 1)));
        assert_eq!(placement(&updates, cards[1].id), Some((WorkStatus::Todo, 2)));
    }

    #[test]
    fn move_across_columns_renumbers_both_and_stamps_completion() {
        let cards = vec![
            card("a", WorkStatus::Review, 0, 0),
            card("b", WorkStatus::Review, 1, 1),
            card("c", WorkStatus::Done, 0, 2),
        ];
        let now = Utc::now();
        let updates = move_card(&cards, None, cards[0].id, WorkStatus::Done, 99, now).unwrap();

        let moved = updates.iter().find(|u| u.id == cards[0].id).unwrap();
        assert_eq!((moved.status, moved.position, moved.completed_at), (WorkStatus::Done, 1, Some(now)));
        assert_eq!(placement(&updates, cards[1].id), Some((WorkStatus::Review, 0)));
        // "c" keeps position 0 in done and is not reported.
        assert_eq!(placement(&updates, cards[2].id), None);
    }

    #[test]
    fn moving_out_of_done_clears_completion() {
        let cards = vec![card("a", WorkStatus::Done, 0, 0)];
        let updates = move_card(&cards, None, cards[0].id, WorkStatus::InProgress, -5, Utc::now()).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].completed_at, None);
        assert_eq!(updates[0].position, 0);
    }

    #[test]
    fn move_indexes_into_the_department_board() {
        let (dept_a, dept_b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut a0 = card("A0", WorkStatus::Todo, 0, 0);
        let mut b0 = card("B0", WorkStatus::Todo, 1, 1);
        let mut a1 = card("A1", WorkStatus::Todo, 2, 2);
        a0.department_id = Some(dept_a);
        b0.department_id = Some(dept_b);
        a1.department_id = Some(dept_a);
        let cards = vec![a0.clone(), b0.clone(), a1.clone()];

        // Department A sees [A0, A1]; dropping A0 at index 1 puts it below A1.
        let updates = move_card(&cards, Some(dept_a), a0.id, WorkStatus::Todo, 1, Utc::now()).unwrap();
        assert_eq!(placement(&updates, a1.id), Some((WorkStatus::Todo, 0)));
        assert_eq!(placement(&updates, a0.id), Some((WorkStatus::Todo, 1)));
        assert_eq!(placement(&updates, b0.id), None);

        let err = move_card(&cards, Some(dept_a), b0.id, WorkStatus::Done, 0, Utc::now()).unwrap_err();
        assert!(matches!(err, BowError::UnknownCard(_)));
    }

    #[test]
    fn unknown_card_is_an_error() {
        let cards = vec![card("a", WorkStatus::Todo, 0, 0)];
        let err = move_card(&cards, None, Uuid::new_v4(), WorkStatus::Done, 0, Utc::now()).unwrap_err();
        assert!(matches!(err, BowError::UnknownCard(_)));
    }
}
