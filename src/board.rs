// File: ./src/board.rs
//! Projection of the item list into the three status columns.
//!
//! Rebuilt from scratch on every call; there is no incremental diffing.

use crate::model::{ChecklistItem, ItemStatus};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Board {
    columns: [Vec<ChecklistItem>; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BucketStats {
    pub count: usize,
    /// Share of all items, rounded to one decimal place.
    pub percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    pub total: usize,
    pub to_pack: BucketStats,
    pub packed: BucketStats,
    pub delivered: BucketStats,
}

impl Board {
    /// Partitions `items` by status, keeping their relative order.
    pub fn project(items: &[ChecklistItem]) -> Self {
        let mut columns: [Vec<ChecklistItem>; 3] = Default::default();
        for item in items {
            columns[item.status.index()].push(item.clone());
        }
        Self { columns }
    }

    pub fn column(&self, status: ItemStatus) -> &[ChecklistItem] {
        &self.columns[status.index()]
    }

    /// Which column an item is rendered in, if any.
    pub fn locate(&self, id: &str) -> Option<(ItemStatus, usize)> {
        ItemStatus::ALL.iter().find_map(|status| {
            self.column(*status)
                .iter()
                .position(|i| i.id == id)
                .map(|pos| (*status, pos))
        })
    }

    pub fn len(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn progress(&self) -> Progress {
        let total = self.len();
        let stats = |status: ItemStatus| {
            let count = self.column(status).len();
            let percent = if total == 0 {
                0.0
            } else {
                (count as f64 / total as f64 * 1000.0).round() / 10.0
            };
            BucketStats { count, percent }
        };
        Progress {
            total,
            to_pack: stats(ItemStatus::ToPack),
            packed: stats(ItemStatus::Packed),
            delivered: stats(ItemStatus::Delivered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, status: ItemStatus) -> ChecklistItem {
        let mut i = ChecklistItem::new(id, None);
        i.id = id.to_string();
        i.status = status;
        i
    }

    #[test]
    fn each_item_lands_in_exactly_one_column() {
        let items = vec![
            item("1", ItemStatus::ToPack),
            item("2", ItemStatus::Packed),
            item("3", ItemStatus::Delivered),
            item("4", ItemStatus::Packed),
        ];
        let board = Board::project(&items);
        assert_eq!(board.len(), 4);
        for it in &items {
            let hits = ItemStatus::ALL
                .iter()
                .filter(|s| board.column(**s).iter().any(|i| i.id == it.id))
                .count();
            assert_eq!(hits, 1);
            assert_eq!(board.locate(&it.id).map(|(s, _)| s), Some(it.status));
        }
        let packed: Vec<_> = board.column(ItemStatus::Packed).iter().map(|i| i.id.as_str()).collect();
        assert_eq!(packed, vec!["2", "4"]);
    }

    #[test]
    fn unrecognized_status_renders_in_to_pack() {
        let items: Vec<ChecklistItem> = serde_json::from_str(
            r#"[{"id":"1","name":"Tent","status":"Misplaced"},{"id":"2","name":"Map"}]"#,
        )
        .unwrap();
        let board = Board::project(&items);
        assert_eq!(board.column(ItemStatus::ToPack).len(), 2);
    }

    #[test]
    fn progress_percentages() {
        let items = vec![
            item("1", ItemStatus::ToPack),
            item("2", ItemStatus::Packed),
            item("3", ItemStatus::Packed),
        ];
        let p = Board::project(&items).progress();
        assert_eq!(p.total, 3);
        assert_eq!(p.to_pack.percent, 33.3);
        assert_eq!(p.packed.percent, 66.7);
        assert_eq!(p.delivered, BucketStats { count: 0, percent: 0.0 });

        assert_eq!(Board::project(&[]).progress(), Progress::default());
    }
}
