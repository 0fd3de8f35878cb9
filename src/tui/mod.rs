// File: ./src/tui/mod.rs
pub mod action;
pub mod state;
pub mod view;

use crate::config::Config;
use crate::logging;
use crate::model::{ChecklistItem, ItemStatus};
use crate::storage::LocalStorage;
use crate::sync::Session;
use crate::tui::action::{Action, AppEvent};
use crate::tui::state::{AppState, InputMode, item_to_input, parse_item_input, parse_trip};
use crate::tui::view::draw;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{io, time::Duration};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn run() -> Result<()> {
    let config = Config::load()?;
    let data_dir = LocalStorage::default_dir().context("no data directory on this platform")?;
    logging::init(&data_dir)?;
    info!("Starting against {}", config.url);

    // First run: leave a config file behind for the user to edit
    if let Some(path) = Config::get_path()
        && !path.exists()
    {
        match config.save_to(&path) {
            Ok(()) => info!("Wrote default config to {}", path.display()),
            Err(e) => warn!("Could not write default config: {}", e),
        }
    }

    let session = Session::from_config(&config)?;

    // Restore the terminal before the panic message is printed
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        error!("PANIC: {:?}", panic_info);
        default_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app_state = AppState::new();
    let (action_tx, action_rx) = mpsc::channel(10);
    let (event_tx, mut event_rx) = mpsc::channel(10);

    tokio::spawn(sync_actor(session, action_rx, event_tx));

    loop {
        terminal.draw(|f| draw(f, &mut app_state))?;

        while let Ok(event) = event_rx.try_recv() {
            apply_event(&mut app_state, event);
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        match event::read()? {
            Event::Mouse(mouse_event) => match mouse_event.kind {
                MouseEventKind::ScrollDown => app_state.next(),
                MouseEventKind::ScrollUp => app_state.previous(),
                _ => {}
            },
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let quit = matches!(key.code, KeyCode::Char('q'))
                    && app_state.mode == InputMode::Normal;
                if let Some(action) = handle_key(&mut app_state, key.code) {
                    let _ = action_tx.send(action).await;
                }
                if quit {
                    break;
                }
            }
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn apply_event(state: &mut AppState, event: AppEvent) {
    match event {
        AppEvent::ChecklistsLoaded(list) => state.checklists = list,
        AppEvent::ItemsLoaded { checklist, items } => {
            state.checklist = checklist;
            state.set_items(items);
            state.loading = false;
        }
        AppEvent::UnreadAlerts(n) => state.unread_alerts = n,
        AppEvent::SuggestionsLoaded(list) => {
            state.show_suggestions(list);
            state.mode = InputMode::ReviewingSuggestions;
            state.message = format!("{} suggestions", state.suggestions.len());
        }
        AppEvent::Error(msg) => {
            state.message = format!("Error: {}", msg);
            state.loading = false;
        }
        AppEvent::Status(msg) => state.message = msg,
    }
}

/// Puts a rejected form back in front of the user with the reason.
fn retry_input(state: &mut AppState, mode: InputMode, input: &str, reason: String) -> Option<Action> {
    state.message = format!("Error: {}", reason);
    state.start_input(mode, input);
    None
}

/// Maps a key press to state changes and, possibly, an action for the actor.
fn handle_key(state: &mut AppState, code: KeyCode) -> Option<Action> {
    match state.mode {
        InputMode::Creating
        | InputMode::Editing
        | InputMode::Suggesting
        | InputMode::NamingChecklist
        | InputMode::RetitlingChecklist => match code {
            KeyCode::Enter => {
                let input = state.input_buffer.trim().to_string();
                let mode = state.mode;
                state.reset_input();
                state.mode = InputMode::Normal;
                if input.is_empty() {
                    state.message = match mode {
                        InputMode::NamingChecklist | InputMode::RetitlingChecklist => {
                            "Please enter a checklist title".to_string()
                        }
                        _ => "Please enter an item name".to_string(),
                    };
                    return None;
                }
                match mode {
                    InputMode::Creating => {
                        let mut base = ChecklistItem::new("", None);
                        base.status = state.column;
                        match parse_item_input(&input, base) {
                            Ok(draft) => Some(Action::CreateItem(draft)),
                            Err(e) => retry_input(state, mode, &input, e),
                        }
                    }
                    InputMode::NamingChecklist => Some(Action::CreateChecklist(input)),
                    InputMode::RetitlingChecklist => {
                        let id = state.checklist.as_ref()?.id.clone();
                        Some(Action::RenameChecklist { id, title: input })
                    }
                    InputMode::Editing => {
                        let id = state.editing_id.clone()?;
                        let item = state.items.iter().find(|i| i.id == id)?.clone();
                        match parse_item_input(&input, item) {
                            Ok(item) => {
                                state.editing_id = None;
                                Some(Action::EditItem(item))
                            }
                            Err(e) => retry_input(state, mode, &input, e),
                        }
                    }
                    _ => match parse_trip(&input) {
                        Some(trip) => {
                            state.message = "Fetching suggestions...".to_string();
                            Some(Action::Suggest(trip))
                        }
                        None => {
                            state.message = "Error: expected type, destination, days, group".to_string();
                            None
                        }
                    },
                }
            }
            KeyCode::Esc => {
                state.mode = InputMode::Normal;
                state.editing_id = None;
                state.reset_input();
                None
            }
            KeyCode::Char(c) => {
                state.enter_char(c);
                None
            }
            KeyCode::Backspace => {
                state.delete_char();
                None
            }
            KeyCode::Left => {
                state.move_cursor_left();
                None
            }
            KeyCode::Right => {
                state.move_cursor_right();
                None
            }
            _ => None,
        },
        InputMode::ReviewingSuggestions => match code {
            KeyCode::Enter => {
                if state.suggestions.is_empty() {
                    state.mode = InputMode::Normal;
                    return None;
                }
                if !state.suggestion_picked.contains(&true) {
                    state.message = "Please select at least one item to add.".to_string();
                    return None;
                }
                state.mode = InputMode::Normal;
                let status = state.suggestion_status;
                Some(Action::AddSuggestions(state.take_picked_suggestions(), status))
            }
            KeyCode::Esc => {
                state.mode = InputMode::Normal;
                state.take_picked_suggestions();
                None
            }
            KeyCode::Char(' ') => {
                state.toggle_suggestion();
                None
            }
            KeyCode::Tab => {
                state.cycle_suggestion_status();
                None
            }
            KeyCode::Down | KeyCode::Char('j') => {
                state.next_suggestion();
                None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                state.previous_suggestion();
                None
            }
            _ => None,
        },
        InputMode::Normal => {
            let pending_delete = state.confirm_delete.take();
            handle_normal_key(state, code, pending_delete)
        }
    }
}

fn handle_normal_key(state: &mut AppState, code: KeyCode, pending_delete: Option<String>) -> Option<Action> {
    match code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('n') => {
            state.start_input(InputMode::NamingChecklist, "");
            None
        }
        KeyCode::Char('t') => {
            let title = state.checklist.as_ref()?.title.clone();
            state.start_input(InputMode::RetitlingChecklist, &title);
            None
        }
        KeyCode::Char('X') => {
            let checklist = state.checklist.as_ref()?;
            if pending_delete.as_deref() == Some(checklist.id.as_str()) {
                Some(Action::DeleteChecklist(checklist.id.clone()))
            } else {
                state.message = format!("Press X again to delete {}", checklist.title);
                state.confirm_delete = Some(checklist.id.clone());
                None
            }
        }
        KeyCode::Char('a') => {
            state.start_input(InputMode::Creating, "");
            None
        }
        KeyCode::Char('e') => {
            let (id, prefill) = state
                .selected_item()
                .map(|i| (i.id.clone(), item_to_input(i)))?;
            state.editing_id = Some(id);
            state.start_input(InputMode::Editing, &prefill);
            None
        }
        KeyCode::Char('s') => {
            state.start_input(InputMode::Suggesting, "");
            None
        }
        KeyCode::Char('d') => state
            .selected_item()
            .map(|i| Action::DeleteItem(i.id.clone())),
        KeyCode::Char('r') => {
            state.message = "Reloading...".to_string();
            Some(Action::Reload)
        }
        KeyCode::Char('c') => {
            // cycle through the user's checklists
            let current = state.checklist.as_ref().map(|c| c.id.clone());
            let idx = state
                .checklists
                .iter()
                .position(|c| Some(&c.id) == current.as_ref())
                .map(|i| i + 1)
                .unwrap_or(0);
            let next = state.checklists.get(idx % state.checklists.len().max(1))?;
            Some(Action::SwitchChecklist(next.id.clone()))
        }
        KeyCode::Char('m') => {
            state.unread_alerts = 0;
            Some(Action::MarkAlertsRead)
        }
        KeyCode::Char('o') => {
            state.message = "Fetching progress...".to_string();
            Some(Action::Overview)
        }
        KeyCode::Char(' ') => state.grab_or_drop().map(Action::Drop),
        KeyCode::Esc => {
            state.drag.cancel();
            None
        }
        KeyCode::Left | KeyCode::Char('h') => {
            state.focus_left();
            None
        }
        KeyCode::Right | KeyCode::Char('l') => {
            state.focus_right();
            None
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.next();
            None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.previous();
            None
        }
        KeyCode::PageDown => {
            state.jump_forward(10);
            None
        }
        KeyCode::PageUp => {
            state.jump_backward(10);
            None
        }
        _ => None,
    }
}

async fn publish(session: &Session, tx: &mpsc::Sender<AppEvent>) {
    let _ = tx
        .send(AppEvent::ItemsLoaded {
            checklist: session.checklist().cloned(),
            items: session.items().to_vec(),
        })
        .await;
}

async fn refresh_alerts(session: &Session, tx: &mpsc::Sender<AppEvent>) {
    if let Ok(alerts) = session.alerts().await {
        let unread = alerts.iter().filter(|a| !a.read).count();
        let _ = tx.send(AppEvent::UnreadAlerts(unread)).await;
    }
}

async fn reload(session: &mut Session, tx: &mpsc::Sender<AppEvent>) {
    match session.load().await {
        Ok(report) => {
            let _ = tx
                .send(AppEvent::ChecklistsLoaded(session.checklists().to_vec()))
                .await;
            publish(session, tx).await;
            let status = report
                .warning
                .unwrap_or_else(|| format!("{} items", report.items));
            let _ = tx.send(AppEvent::Status(status)).await;
            if !session.is_offline() {
                refresh_alerts(session, tx).await;
            }
        }
        Err(e) => {
            publish(session, tx).await;
            let _ = tx.send(AppEvent::Error(e.to_string())).await;
        }
    }
}

/// Owns the session; actions are handled strictly one after another.
async fn sync_actor(
    mut session: Session,
    mut rx: mpsc::Receiver<Action>,
    tx: mpsc::Sender<AppEvent>,
) {
    let _ = tx.send(AppEvent::Status("Connecting...".to_string())).await;
    reload(&mut session, &tx).await;

    while let Some(action) = rx.recv().await {
        let result = match action {
            Action::Quit => break,
            Action::Reload => {
                reload(&mut session, &tx).await;
                continue;
            }
            Action::SwitchChecklist(id) => session
                .open(&id)
                .await
                .map(|r| format!("{} items", r.items)),
            Action::CreateChecklist(title) => match session.create_checklist(&title).await {
                Ok(checklist) => {
                    let _ = tx
                        .send(AppEvent::ChecklistsLoaded(session.checklists().to_vec()))
                        .await;
                    session
                        .open(&checklist.id)
                        .await
                        .map(|_| format!("Created {}", checklist.title))
                }
                Err(e) => Err(e),
            },
            Action::RenameChecklist { id, title } => {
                let renamed = session.rename_checklist(&id, &title).await;
                let _ = tx
                    .send(AppEvent::ChecklistsLoaded(session.checklists().to_vec()))
                    .await;
                renamed.map(|_| "Renamed.".to_string())
            }
            Action::DeleteChecklist(id) => match session.delete_checklist(&id).await {
                Ok(()) => {
                    reload(&mut session, &tx).await;
                    continue;
                }
                Err(e) => Err(e),
            },
            Action::CreateItem(draft) => {
                session
                    .create_item(draft)
                    .await
                    .map(|item| format!("Added {}", item.name))
            }
            Action::EditItem(item) => session.edit_item(item).await.map(|_| "Updated.".to_string()),
            Action::DeleteItem(id) => session.delete_item(&id).await.map(|removed| {
                if removed {
                    "Deleted.".to_string()
                } else {
                    "Already gone.".to_string()
                }
            }),
            Action::Drop(outcome) => session.apply_drop(outcome).await.map(|moved| {
                if moved {
                    "Synced.".to_string()
                } else {
                    "Unchanged.".to_string()
                }
            }),
            Action::Suggest(trip) => match session.suggestions(&trip).await {
                Ok(list) => {
                    let _ = tx.send(AppEvent::SuggestionsLoaded(list)).await;
                    continue;
                }
                Err(e) => Err(e),
            },
            Action::AddSuggestions(list, status) => {
                let report = session.add_suggestions(&list, status).await;
                if report.failed.is_empty() {
                    Ok(format!("Added {} items to your checklist.", report.added.len()))
                } else {
                    Ok(format!(
                        "Added {} items, {} failed: {}",
                        report.added.len(),
                        report.failed.len(),
                        report.failed[0].1
                    ))
                }
            }
            Action::Overview => session.overview().await.map(|all| {
                if all.is_empty() {
                    return "No checklists.".to_string();
                }
                all.iter()
                    .map(|(c, p)| {
                        format!("{}: {}% packed, {}% delivered", c.title, p.packed.percent, p.delivered.percent)
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            }),
            Action::MarkAlertsRead => {
                if let Ok(alerts) = session.alerts().await {
                    for alert in alerts.iter().filter(|a| !a.read) {
                        if let Err(e) = session.mark_alert_read(&alert.id).await {
                            let _ = tx.send(AppEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                }
                refresh_alerts(&session, &tx).await;
                continue;
            }
        };

        // Success or revert, the UI gets the store's current list
        publish(&session, &tx).await;
        match result {
            Ok(msg) => {
                let _ = tx.send(AppEvent::Status(msg)).await;
            }
            Err(e) => {
                let _ = tx.send(AppEvent::Error(e.to_string())).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Checklist, Suggestion};

    #[test]
    fn typing_a_name_creates_an_item() {
        let mut state = AppState::new();
        assert!(handle_key(&mut state, KeyCode::Char('a')).is_none());
        assert_eq!(state.mode, InputMode::Creating);
        for c in "Tent".chars() {
            handle_key(&mut state, KeyCode::Char(c));
        }
        match handle_key(&mut state, KeyCode::Enter) {
            Some(Action::CreateItem(item)) => {
                assert_eq!(item.name, "Tent");
                assert_eq!(item.status, ItemStatus::ToPack);
                assert_eq!(item.category, "General");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.mode, InputMode::Normal);
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            handle_key(state, KeyCode::Char(c));
        }
    }

    #[test]
    fn add_form_takes_all_fields() {
        let mut state = AppState::new();
        state.focus_right();
        handle_key(&mut state, KeyCode::Char('a'));
        type_text(&mut state, "Stove; category=Kitchen; assignee=Sam; desc=Gas");
        match handle_key(&mut state, KeyCode::Enter) {
            Some(Action::CreateItem(item)) => {
                assert_eq!(item.name, "Stove");
                assert_eq!(item.category, "Kitchen");
                assert_eq!(item.assignee.as_deref(), Some("Sam"));
                assert_eq!(item.description, "Gas");
                // added in the focused column
                assert_eq!(item.status, ItemStatus::Packed);
            }
            other => panic!("unexpected {:?}", other),
        }

        handle_key(&mut state, KeyCode::Char('a'));
        type_text(&mut state, "Stove; status=lost");
        assert!(handle_key(&mut state, KeyCode::Enter).is_none());
        assert_eq!(state.mode, InputMode::Creating);
        assert_eq!(state.input_buffer, "Stove; status=lost");
        assert!(state.message.starts_with("Error"));
    }

    #[test]
    fn edit_form_is_prefilled_with_every_field() {
        let mut state = AppState::new();
        let mut stove = ChecklistItem::new("Stove", None);
        stove.id = "5".into();
        stove.category = "Kitchen".into();
        stove.assignee = Some("Sam".into());
        state.set_items(vec![stove]);

        handle_key(&mut state, KeyCode::Char('e'));
        assert_eq!(state.input_buffer, "Stove; category=Kitchen; status=To Pack; assignee=Sam");
        type_text(&mut state, "; status=delivered; assignee=");
        match handle_key(&mut state, KeyCode::Enter) {
            Some(Action::EditItem(item)) => {
                assert_eq!(item.id, "5");
                assert_eq!(item.status, ItemStatus::Delivered);
                assert_eq!(item.assignee, None);
                assert_eq!(item.category, "Kitchen");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(state.editing_id.is_none());
    }

    #[test]
    fn suggestion_review_adds_only_picked_with_chosen_status() {
        let mut state = AppState::new();
        apply_event(
            &mut state,
            AppEvent::SuggestionsLoaded(vec![
                Suggestion { title: "Sunscreen".into(), reason: "Sun".into() },
                Suggestion { title: "Towel".into(), reason: "Beach".into() },
                Suggestion { title: "Hat".into(), reason: "Sun".into() },
            ]),
        );
        assert_eq!(state.mode, InputMode::ReviewingSuggestions);

        handle_key(&mut state, KeyCode::Char('j'));
        handle_key(&mut state, KeyCode::Char(' '));
        handle_key(&mut state, KeyCode::Tab);
        handle_key(&mut state, KeyCode::Tab);
        match handle_key(&mut state, KeyCode::Enter) {
            Some(Action::AddSuggestions(list, status)) => {
                let titles: Vec<&str> = list.iter().map(|s| s.title.as_str()).collect();
                assert_eq!(titles, vec!["Sunscreen", "Hat"]);
                assert_eq!(status, ItemStatus::Delivered);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.mode, InputMode::Normal);
    }

    #[test]
    fn suggestion_review_needs_a_pick() {
        let mut state = AppState::new();
        apply_event(
            &mut state,
            AppEvent::SuggestionsLoaded(vec![Suggestion { title: "Towel".into(), reason: "Beach".into() }]),
        );
        handle_key(&mut state, KeyCode::Char(' '));
        assert!(handle_key(&mut state, KeyCode::Enter).is_none());
        assert_eq!(state.mode, InputMode::ReviewingSuggestions);
        assert_eq!(state.message, "Please select at least one item to add.");
    }

    #[test]
    fn space_twice_across_columns_emits_a_drop() {
        let mut state = AppState::new();
        let mut tent = ChecklistItem::new("Tent", None);
        tent.id = "1".into();
        state.set_items(vec![tent]);

        assert!(handle_key(&mut state, KeyCode::Char(' ')).is_none());
        handle_key(&mut state, KeyCode::Char('l'));
        match handle_key(&mut state, KeyCode::Char(' ')) {
            Some(Action::Drop(crate::drag::DropOutcome::Move { to, .. })) => {
                assert_eq!(to, ItemStatus::Packed)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn cycling_checklists_wraps_around() {
        let mut state = AppState::new();
        state.checklists = vec![
            Checklist { id: "1".into(), title: "Camping".into(), created_at: None },
            Checklist { id: "2".into(), title: "Beach".into(), created_at: None },
        ];
        state.checklist = Some(state.checklists[1].clone());
        match handle_key(&mut state, KeyCode::Char('c')) {
            Some(Action::SwitchChecklist(id)) => assert_eq!(id, "1"),
            other => panic!("unexpected {:?}", other),
        }

        state.checklists.clear();
        assert!(handle_key(&mut state, KeyCode::Char('c')).is_none());
    }

    #[test]
    fn deleting_a_checklist_needs_two_presses() {
        let mut state = AppState::new();
        state.checklist = Some(Checklist { id: "4".into(), title: "Ski".into(), created_at: None });

        assert!(handle_key(&mut state, KeyCode::Char('X')).is_none());
        assert_eq!(state.message, "Press X again to delete Ski");
        match handle_key(&mut state, KeyCode::Char('X')) {
            Some(Action::DeleteChecklist(id)) => assert_eq!(id, "4"),
            other => panic!("unexpected {:?}", other),
        }

        // any other key in between cancels
        handle_key(&mut state, KeyCode::Char('X'));
        handle_key(&mut state, KeyCode::Char('j'));
        assert!(handle_key(&mut state, KeyCode::Char('X')).is_none());
    }

    #[test]
    fn errors_show_in_status_bar() {
        let mut state = AppState::new();
        apply_event(&mut state, AppEvent::Error("error 500: boom".into()));
        assert!(state.message.starts_with("Error"));
        assert!(!state.loading);
    }
}
