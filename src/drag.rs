//! Pointer gesture handling for the sortable category grid and memo lists.
//!
//! Draggable and droppable elements are identified by tagged keys:
//! `cat:<id>` for a category card, `memo:<id>` for a memo row and
//! `catdrop:<id>` for a category's memo-list drop zone.

use crate::errors::AppResult;
use crate::ordering::{resolve_drop, Board, DragItem, DropTarget, OrderCommand};
use crate::store::ClientStore;

const CATEGORY_PREFIX: &str = "cat:";
const MEMO_PREFIX: &str = "memo:";
const DROP_ZONE_PREFIX: &str = "catdrop:";

pub fn category_key(id: &str) -> String {
    format!("{CATEGORY_PREFIX}{id}")
}

pub fn memo_key(id: &str) -> String {
    format!("{MEMO_PREFIX}{id}")
}

pub fn drop_zone_key(category_id: &str) -> String {
    format!("{DROP_ZONE_PREFIX}{category_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Category,
    Memo,
    DropZone,
}

fn split_key(key: &str) -> Option<(KeyKind, &str)> {
    let (kind, id) = if let Some(id) = key.strip_prefix(DROP_ZONE_PREFIX) {
        (KeyKind::DropZone, id)
    } else if let Some(id) = key.strip_prefix(CATEGORY_PREFIX) {
        (KeyKind::Category, id)
    } else if let Some(id) = key.strip_prefix(MEMO_PREFIX) {
        (KeyKind::Memo, id)
    } else {
        return None;
    };
    (!id.is_empty()).then_some((kind, id))
}

/// Resolves a drag handle key. Memos are tagged with the category that
/// currently owns them on `board`.
pub fn parse_drag_item(key: &str, board: &Board) -> Option<DragItem> {
    match split_key(key)? {
        (KeyKind::Category, id) => Some(DragItem::Category { id: id.to_string() }),
        (KeyKind::Memo, id) => board.owner_of(id).map(|category_id| DragItem::Memo {
            id: id.to_string(),
            category_id: category_id.to_string(),
        }),
        (KeyKind::DropZone, _) => None,
    }
}

pub fn parse_drop_target(key: &str, board: &Board) -> Option<DropTarget> {
    match split_key(key)? {
        (KeyKind::Category, id) => Some(DropTarget::Category { id: id.to_string() }),
        (KeyKind::DropZone, id) => Some(DropTarget::CategoryZone {
            category_id: id.to_string(),
        }),
        (KeyKind::Memo, id) => board.owner_of(id).map(|category_id| DropTarget::Memo {
            id: id.to_string(),
            category_id: category_id.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GesturePhase {
    Idle,
    /// Pointer is down on a handle but has not travelled far enough to drag.
    Pressed { item: DragItem, origin: Point },
    Dragging { item: DragItem },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Released without real movement: open the item instead.
    Click(DragItem),
    Dropped(OrderCommand),
    /// Released over a known target that implies no change.
    NoChange,
    Cancelled,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct DragController {
    phase: GesturePhase,
    activation_distance: f64,
    search_active: bool,
}

impl DragController {
    pub fn new(activation_distance: f64) -> Self {
        Self {
            phase: GesturePhase::Idle,
            activation_distance,
            search_active: false,
        }
    }

    pub fn phase(&self) -> &GesturePhase {
        &self.phase
    }

    /// Search results are a filtered view, so their order says nothing about
    /// the stored order. Entering search aborts any gesture in progress.
    pub fn set_search_active(&mut self, active: bool) {
        self.search_active = active;
        if active {
            self.phase = GesturePhase::Idle;
        }
    }

    pub fn drag_enabled(&self) -> bool {
        !self.search_active
    }

    /// The item drawn as the floating proxy. The list itself keeps its layout
    /// until the refreshed cache arrives.
    pub fn active_item(&self) -> Option<&DragItem> {
        match &self.phase {
            GesturePhase::Dragging { item } => Some(item),
            _ => None,
        }
    }

    pub fn overlay_label(&self) -> Option<&'static str> {
        self.active_item().map(|item| match item {
            DragItem::Category { .. } => "Move category",
            DragItem::Memo { .. } => "Move memo",
        })
    }

    pub fn pointer_down(&mut self, handle_key: &str, at: Point, board: &Board) -> bool {
        if self.search_active || self.phase != GesturePhase::Idle {
            return false;
        }
        let Some(item) = parse_drag_item(handle_key, board) else {
            return false;
        };
        self.phase = GesturePhase::Pressed { item, origin: at };
        true
    }

    /// Returns true on the move that turns a press into a drag.
    pub fn pointer_move(&mut self, at: Point) -> bool {
        let GesturePhase::Pressed { item, origin } = &self.phase else {
            return false;
        };
        if origin.distance_to(at) < self.activation_distance {
            return false;
        }
        tracing::debug!(item = item.id(), "drag started");
        self.phase = GesturePhase::Dragging { item: item.clone() };
        true
    }

    pub fn cancel(&mut self) -> DragOutcome {
        match std::mem::replace(&mut self.phase, GesturePhase::Idle) {
            GesturePhase::Idle => DragOutcome::Ignored,
            _ => DragOutcome::Cancelled,
        }
    }

    /// Ends the gesture. Always leaves the controller idle.
    pub fn pointer_up(&mut self, over_key: Option<&str>, board: &Board) -> DragOutcome {
        match std::mem::replace(&mut self.phase, GesturePhase::Idle) {
            GesturePhase::Idle => DragOutcome::Ignored,
            GesturePhase::Pressed { item, .. } => DragOutcome::Click(item),
            GesturePhase::Dragging { item } => {
                let Some(target) = over_key.and_then(|key| parse_drop_target(key, board)) else {
                    return DragOutcome::Cancelled;
                };
                // Categories only ever land on other categories.
                if matches!(item, DragItem::Category { .. }) && !matches!(target, DropTarget::Category { .. }) {
                    return DragOutcome::Cancelled;
                }
                match resolve_drop(board, &item, &target) {
                    Some(command) => DragOutcome::Dropped(command),
                    None => DragOutcome::NoChange,
                }
            }
        }
    }

    /// [`Self::pointer_up`] against the store's current board, issuing the
    /// resulting command if there is one.
    pub async fn release(&mut self, over_key: Option<&str>, store: &ClientStore) -> AppResult<DragOutcome> {
        let outcome = self.pointer_up(over_key, &store.board());
        if let DragOutcome::Dropped(command) = &outcome {
            store.apply_order(command.clone()).await?;
        }
        Ok(outcome)
    }
}
