//! Drop resolution for the two nested ordered collections: all categories, and
//! the memos of each category.
//!
//! Everything here is pure. [`resolve_drop`] turns one finished drag gesture
//! into at most one backend command; applying it is the store's job.

use crate::models::{CategoryWithMemos, Id, MoveMemoInput, ReorderCategoriesInput, ReorderMemosInput};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragItem {
    Category { id: Id },
    Memo { id: Id, category_id: Id },
}

impl DragItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Category { id } | Self::Memo { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    Category { id: Id },
    Memo { id: Id, category_id: Id },
    /// A category's memo list as a whole (including its empty-list placeholder).
    CategoryZone { category_id: Id },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
    ReorderCategories(ReorderCategoriesInput),
    ReorderMemos(ReorderMemosInput),
    MoveMemo(MoveMemoInput),
}

/// Id sequences of every collection, sorted ascending by `position`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    category_ids: Vec<Id>,
    memo_ids: HashMap<Id, Vec<Id>>,
    memo_owner: HashMap<Id, Id>,
}

impl Board {
    pub fn from_categories(categories: &[CategoryWithMemos]) -> Self {
        let mut sorted = categories.iter().collect::<Vec<_>>();
        sorted.sort_by_key(|item| item.category.position);

        let mut board = Self::default();
        for item in sorted {
            let category_id = item.category.id.clone();
            let memo_ids = item
                .sorted_memos()
                .into_iter()
                .map(|memo| memo.id.clone())
                .collect::<Vec<_>>();
            for memo_id in &memo_ids {
                board.memo_owner.insert(memo_id.clone(), category_id.clone());
            }
            board.memo_ids.insert(category_id.clone(), memo_ids);
            board.category_ids.push(category_id);
        }
        board
    }

    pub fn category_ids(&self) -> &[Id] {
        &self.category_ids
    }

    pub fn memo_ids(&self, category_id: &str) -> &[Id] {
        self.memo_ids.get(category_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_category(&self, category_id: &str) -> bool {
        self.memo_ids.contains_key(category_id)
    }

    pub fn owner_of(&self, memo_id: &str) -> Option<&str> {
        self.memo_owner.get(memo_id).map(String::as_str)
    }
}

/// Removes the element at `from` and reinserts it at `to`. Out-of-range
/// indices leave the sequence unchanged.
pub fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut next = items.to_vec();
    if from >= next.len() || to >= next.len() || from == to {
        return next;
    }
    let item = next.remove(from);
    next.insert(to, item);
    next
}

fn reorder_within(ids: &[Id], dragged: &str, target: &str) -> Option<Vec<Id>> {
    let old_index = ids.iter().position(|id| id == dragged)?;
    let new_index = ids.iter().position(|id| id == target)?;
    if old_index == new_index {
        return None;
    }
    Some(array_move(ids, old_index, new_index))
}

/// Maps a completed drop onto the single command it implies, or `None` when
/// the drop changes nothing or refers to ids the board does not know.
pub fn resolve_drop(board: &Board, item: &DragItem, target: &DropTarget) -> Option<OrderCommand> {
    match item {
        DragItem::Category { id } => match target {
            DropTarget::Category { id: target_id } => reorder_within(board.category_ids(), id, target_id)
                .map(|ordered_ids| OrderCommand::ReorderCategories(ReorderCategoriesInput { ordered_ids })),
            _ => None,
        },
        DragItem::Memo { id, category_id } => {
            let Some(source) = board.owner_of(id) else {
                tracing::debug!(memo_id = %id, "dragged memo is not on the board; ignoring drop");
                return None;
            };
            if source != category_id.as_str() {
                tracing::debug!(memo_id = %id, tagged = %category_id, actual = source, "drag tag is stale");
            }

            let destination = match target {
                DropTarget::Memo { id: target_id, .. } => {
                    if target_id == id {
                        return None;
                    }
                    let owner = board.owner_of(target_id)?;
                    if owner == source {
                        return reorder_within(board.memo_ids(source), id, target_id).map(|ordered_ids| {
                            OrderCommand::ReorderMemos(ReorderMemosInput {
                                category_id: source.to_string(),
                                ordered_ids,
                            })
                        });
                    }
                    owner
                }
                DropTarget::Category { id: category_id } | DropTarget::CategoryZone { category_id } => {
                    if !board.contains_category(category_id) {
                        return None;
                    }
                    category_id.as_str()
                }
            };

            if destination == source {
                return None;
            }
            Some(OrderCommand::MoveMemo(MoveMemoInput {
                memo_id: id.clone(),
                to_category_id: destination.to_string(),
            }))
        }
    }
}
