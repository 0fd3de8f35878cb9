// File: ./src/drag.rs
use crate::model::{ChecklistItem, ItemStatus};

/// What dropping the grabbed item on a column amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Move {
        id: String,
        from: ItemStatus,
        to: ItemStatus,
    },
    /// Dropped back onto its own column.
    Unchanged,
    /// Nothing grabbed, or the item vanished while it was held.
    Nothing,
}

/// Grab-and-drop gesture state. Holds only the item id; the item itself is
/// looked up again on drop.
#[derive(Debug, Default, Clone)]
pub struct DragController {
    grabbed: Option<String>,
}

impl DragController {
    pub fn grab(&mut self, id: &str) {
        self.grabbed = Some(id.to_string());
    }

    pub fn grabbed(&self) -> Option<&str> {
        self.grabbed.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        self.grabbed.is_some()
    }

    pub fn cancel(&mut self) {
        self.grabbed = None;
    }

    /// Ends the gesture over `target`.
    pub fn drop_on(&mut self, target: ItemStatus, items: &[ChecklistItem]) -> DropOutcome {
        let Some(id) = self.grabbed.take() else {
            return DropOutcome::Nothing;
        };
        match items.iter().find(|i| i.id == id) {
            Some(item) if item.status != target => DropOutcome::Move {
                id,
                from: item.status,
                to: target,
            },
            Some(_) => DropOutcome::Unchanged,
            None => DropOutcome::Nothing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tent() -> ChecklistItem {
        let mut i = ChecklistItem::new("Tent", None);
        i.id = "1".into();
        i
    }

    #[test]
    fn drop_on_other_column_moves() {
        let mut drag = DragController::default();
        drag.grab("1");
        assert!(drag.is_dragging());
        assert_eq!(
            drag.drop_on(ItemStatus::Packed, &[tent()]),
            DropOutcome::Move { id: "1".into(), from: ItemStatus::ToPack, to: ItemStatus::Packed }
        );
        assert!(!drag.is_dragging());
    }

    #[test]
    fn drop_on_same_column_is_unchanged() {
        let mut drag = DragController::default();
        drag.grab("1");
        assert_eq!(drag.drop_on(ItemStatus::ToPack, &[tent()]), DropOutcome::Unchanged);
    }

    #[test]
    fn drop_without_grab_or_after_removal() {
        let mut drag = DragController::default();
        assert_eq!(drag.drop_on(ItemStatus::Packed, &[tent()]), DropOutcome::Nothing);

        drag.grab("1");
        assert_eq!(drag.drop_on(ItemStatus::Packed, &[]), DropOutcome::Nothing);

        drag.grab("1");
        drag.cancel();
        assert_eq!(drag.drop_on(ItemStatus::Packed, &[tent()]), DropOutcome::Nothing);
    }
}
