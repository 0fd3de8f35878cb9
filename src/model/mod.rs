// File: ./src/model/mod.rs
pub mod adapter;
pub mod item;

pub use item::{Alert, Checklist, ChecklistItem, ItemStatus, Suggestion, TripDetails};
