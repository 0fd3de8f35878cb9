use crate::board::Board;
use crate::drag::{DragController, DropOutcome};
use crate::model::{Checklist, ChecklistItem, ItemStatus, Suggestion, TripDetails};
use ratatui::widgets::ListState;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum InputMode {
    Normal,
    Creating,
    Editing,
    Suggesting,
    ReviewingSuggestions,
    NamingChecklist,
    RetitlingChecklist,
}

pub struct AppState {
    pub items: Vec<ChecklistItem>,
    pub board: Board,
    pub checklist: Option<Checklist>,
    pub checklists: Vec<Checklist>,
    pub column: ItemStatus,
    pub column_states: [ListState; 3],
    pub drag: DragController,
    pub suggestions: Vec<Suggestion>,
    pub unread_alerts: usize,
    pub message: String,
    pub loading: bool,
    pub mode: InputMode,
    pub input_buffer: String,
    pub cursor_position: usize,
    pub editing_id: Option<String>,
    /// Checklist awaiting a second `X` before it is deleted.
    pub confirm_delete: Option<String>,
    pub suggestion_list: ListState,
    /// Parallel to `suggestions`: which ones will be added.
    pub suggestion_picked: Vec<bool>,
    pub suggestion_status: ItemStatus,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        let mut states: [ListState; 3] = Default::default();
        for s in states.iter_mut() {
            s.select(Some(0));
        }
        Self {
            items: vec![],
            board: Board::default(),
            checklist: None,
            checklists: vec![],
            column: ItemStatus::ToPack,
            column_states: states,
            drag: DragController::default(),
            suggestions: vec![],
            unread_alerts: 0,
            message: "a: Add | Space: Grab/Drop | s: Suggest".to_string(),
            loading: true,
            mode: InputMode::Normal,
            input_buffer: String::new(),
            cursor_position: 0,
            editing_id: None,
            confirm_delete: None,
            suggestion_list: ListState::default(),
            suggestion_picked: vec![],
            suggestion_status: ItemStatus::ToPack,
        }
    }

    pub fn set_items(&mut self, items: Vec<ChecklistItem>) {
        self.board = Board::project(&items);
        self.items = items;
        for status in ItemStatus::ALL {
            let len = self.board.column(status).len();
            let state = &mut self.column_states[status.index()];
            let sel = state.selected().unwrap_or(0);
            if len == 0 {
                state.select(Some(0));
            } else if sel >= len {
                state.select(Some(len - 1));
            }
        }
        if let Some(id) = self.drag.grabbed()
            && !self.items.iter().any(|i| i.id == id)
        {
            self.drag.cancel();
        }
    }

    fn column_len(&self) -> usize {
        self.board.column(self.column).len()
    }

    fn list_state(&mut self) -> &mut ListState {
        &mut self.column_states[self.column.index()]
    }

    pub fn selected_item(&self) -> Option<&ChecklistItem> {
        let sel = self.column_states[self.column.index()].selected()?;
        self.board.column(self.column).get(sel)
    }

    pub fn next(&mut self) {
        let len = self.column_len();
        if len == 0 {
            return;
        }
        let i = match self.list_state().selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.list_state().select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.column_len();
        if len == 0 {
            return;
        }
        let i = match self.list_state().selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state().select(Some(i));
    }

    pub fn jump_forward(&mut self, step: usize) {
        let len = self.column_len();
        if len == 0 {
            return;
        }
        let current = self.list_state().selected().unwrap_or(0);
        self.list_state().select(Some((current + step).min(len - 1)));
    }

    pub fn jump_backward(&mut self, step: usize) {
        if self.column_len() == 0 {
            return;
        }
        let current = self.list_state().selected().unwrap_or(0);
        self.list_state().select(Some(current.saturating_sub(step)));
    }

    pub fn focus_left(&mut self) {
        self.column = ItemStatus::from_index(self.column.index().saturating_sub(1));
    }

    pub fn focus_right(&mut self) {
        self.column = ItemStatus::from_index(self.column.index() + 1);
    }

    /// Space bar: grab the selected item, or drop the held one on the
    /// focused column.
    ///
    /// A move is applied to the local copy right away; the sync actor sends
    /// back the authoritative list once the server has answered.
    pub fn grab_or_drop(&mut self) -> Option<DropOutcome> {
        if self.drag.is_dragging() {
            let outcome = self.drag.drop_on(self.column, &self.items);
            if let DropOutcome::Move { id, to, .. } = &outcome {
                let mut items = self.items.clone();
                if let Some(item) = items.iter_mut().find(|i| &i.id == id) {
                    item.status = *to;
                }
                self.set_items(items);
                if let Some((_, pos)) = self.board.locate(id) {
                    self.column_states[to.index()].select(Some(pos));
                }
            }
            Some(outcome)
        } else {
            let id = self.selected_item()?.id.clone();
            self.drag.grab(&id);
            None
        }
    }

    /// Every suggestion starts out picked.
    pub fn show_suggestions(&mut self, suggestions: Vec<Suggestion>) {
        self.suggestion_picked = vec![true; suggestions.len()];
        self.suggestion_list
            .select(if suggestions.is_empty() { None } else { Some(0) });
        self.suggestion_status = ItemStatus::ToPack;
        self.suggestions = suggestions;
    }

    pub fn next_suggestion(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            let i = self.suggestion_list.selected().map_or(0, |i| (i + 1) % len);
            self.suggestion_list.select(Some(i));
        }
    }

    pub fn previous_suggestion(&mut self) {
        let len = self.suggestions.len();
        if len > 0 {
            let i = match self.suggestion_list.selected() {
                Some(0) | None => len - 1,
                Some(i) => i - 1,
            };
            self.suggestion_list.select(Some(i));
        }
    }

    pub fn toggle_suggestion(&mut self) {
        if let Some(picked) = self
            .suggestion_list
            .selected()
            .and_then(|i| self.suggestion_picked.get_mut(i))
        {
            *picked = !*picked;
        }
    }

    pub fn cycle_suggestion_status(&mut self) {
        self.suggestion_status = ItemStatus::from_index((self.suggestion_status.index() + 1) % 3);
    }

    /// Takes the picked suggestions out of the review list.
    pub fn take_picked_suggestions(&mut self) -> Vec<Suggestion> {
        let picked = std::mem::take(&mut self.suggestion_picked);
        let all = std::mem::take(&mut self.suggestions);
        self.suggestion_list.select(None);
        all.into_iter()
            .zip(picked)
            .filter_map(|(s, keep)| keep.then_some(s))
            .collect()
    }

    pub fn move_cursor_left(&mut self) {
        let cursor_moved_left = self.cursor_position.saturating_sub(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_left);
    }
    pub fn move_cursor_right(&mut self) {
        let cursor_moved_right = self.cursor_position.saturating_add(1);
        self.cursor_position = self.clamp_cursor(cursor_moved_right);
    }
    pub fn enter_char(&mut self, new_char: char) {
        let byte_idx = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_idx, new_char);
        self.move_cursor_right();
    }
    pub fn delete_char(&mut self) {
        if self.cursor_position != 0 {
            let current_index = self.cursor_position;
            let before = self.input_buffer.chars().take(current_index - 1);
            let after = self.input_buffer.chars().skip(current_index);
            self.input_buffer = before.chain(after).collect();
            self.move_cursor_left();
        }
    }
    pub fn reset_input(&mut self) {
        self.input_buffer.clear();
        self.cursor_position = 0;
    }
    fn clamp_cursor(&self, new_cursor_pos: usize) -> usize {
        new_cursor_pos.clamp(0, self.input_buffer.chars().count())
    }

    pub fn start_input(&mut self, mode: InputMode, prefill: &str) {
        self.mode = mode;
        self.input_buffer = prefill.to_string();
        self.cursor_position = self.input_buffer.chars().count();
    }
}

/// Text shown in the edit prompt for `item`, in the format
/// [`parse_item_input`] reads back.
pub fn item_to_input(item: &ChecklistItem) -> String {
    let mut out = format!("{}; category={}; status={}", item.name, item.category, item.status);
    if let Some(who) = &item.assignee {
        out.push_str(&format!("; assignee={}", who));
    }
    if !item.description.is_empty() {
        out.push_str(&format!("; desc={}", item.description));
    }
    out
}

fn parse_status_field(raw: &str) -> Option<ItemStatus> {
    let key: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    match key.as_str() {
        "topack" | "todo" => Some(ItemStatus::ToPack),
        "packed" => Some(ItemStatus::Packed),
        "delivered" => Some(ItemStatus::Delivered),
        _ => None,
    }
}

/// Parses `name; category=..; status=..; assignee=..; desc=..` onto `base`.
///
/// Only the name is required. Fields that are not given keep the value from
/// `base`; an empty `assignee=` clears it.
pub fn parse_item_input(input: &str, mut base: ChecklistItem) -> Result<ChecklistItem, String> {
    let mut parts = input.split(';');
    let name = parts.next().unwrap_or("").trim();
    if name.is_empty() {
        return Err("Please enter an item name".to_string());
    }
    base.name = name.to_string();

    for part in parts.map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("expected field=value, got '{}'", part))?;
        let value = value.trim();
        match key.trim().to_lowercase().as_str() {
            "category" | "cat" => {
                base.category = if value.is_empty() {
                    crate::model::item::default_category()
                } else {
                    value.to_string()
                };
            }
            "status" => {
                base.status = parse_status_field(value)
                    .ok_or_else(|| format!("unknown status '{}'", value))?;
            }
            "assignee" | "who" => {
                base.assignee = Some(value.to_string()).filter(|v| !v.is_empty());
            }
            "desc" | "description" => base.description = value.to_string(),
            other => return Err(format!("unknown field '{}'", other)),
        }
    }
    Ok(base)
}

/// Parses "trip type, destination, days, group size", e.g.
/// `trek, Seattle, 10, 6`. Days and group size may be omitted.
pub fn parse_trip(input: &str) -> Option<TripDetails> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    let trip_type = parts.first().filter(|s| !s.is_empty())?.to_lowercase();
    let destination = parts.get(1).copied().unwrap_or("").to_string();
    let duration_days = match parts.get(2) {
        Some(raw) if !raw.is_empty() => raw.parse().ok()?,
        _ => 0,
    };
    let group_size = match parts.get(3) {
        Some(raw) if !raw.is_empty() => raw.parse().ok()?,
        _ => 1,
    };
    Some(TripDetails {
        trip_type,
        destination,
        duration_days,
        group_size,
    })
}
