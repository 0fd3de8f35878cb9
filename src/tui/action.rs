use crate::drag::DropOutcome;
use crate::model::{Checklist, ChecklistItem, ItemStatus, Suggestion, TripDetails};

#[derive(Debug)]
pub enum Action {
    Reload,
    SwitchChecklist(String),
    CreateChecklist(String),
    RenameChecklist { id: String, title: String },
    DeleteChecklist(String),
    CreateItem(ChecklistItem),
    EditItem(ChecklistItem),
    DeleteItem(String),
    Drop(DropOutcome),
    Suggest(TripDetails),
    AddSuggestions(Vec<Suggestion>, ItemStatus),
    MarkAlertsRead,
    Overview,
    Quit,
}

#[derive(Debug)]
pub enum AppEvent {
    ChecklistsLoaded(Vec<Checklist>),
    ItemsLoaded {
        checklist: Option<Checklist>,
        items: Vec<ChecklistItem>,
    },
    UnreadAlerts(usize),
    SuggestionsLoaded(Vec<Suggestion>),
    Error(String),
    Status(String),
}
