use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use std::time::Instant;

use crate::app::{App, AppMode};

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: event::KeyEvent) {
  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  match app.mode {
    AppMode::Search => handle_search_key(app, key),
    AppMode::Browse => handle_browse_key(app, key),
    AppMode::Details => handle_details_key(app, key),
  }
}

fn handle_search_key(app: &mut App, key: event::KeyEvent) {
  app.clear_error();
  match key.code {
    KeyCode::Enter => {
      app.submit_input();
      app.mode = AppMode::Browse;
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
      app.on_input_changed(Instant::now());
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.on_input_changed(Instant::now());
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
        app.on_input_changed(Instant::now());
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if app.input.is_empty() {
        app.mode = AppMode::Browse;
      } else {
        app.clear_search();
      }
    }
    KeyCode::Down | KeyCode::Tab => {
      app.mode = AppMode::Browse;
    }
    _ => {}
  }
}

fn handle_browse_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Char('/') | KeyCode::Char('s') | KeyCode::Tab => {
      app.mode = AppMode::Search;
    }
    KeyCode::Down | KeyCode::Char('j') => app.move_focus(1),
    KeyCode::Up | KeyCode::Char('k') => {
      if app.focus == 0 {
        app.mode = AppMode::Search;
      } else {
        app.move_focus(-1);
      }
    }
    KeyCode::Right | KeyCode::Char('l') => app.move_selection(1),
    KeyCode::Left | KeyCode::Char('h') => app.move_selection(-1),
    KeyCode::Enter | KeyCode::Char('i') => app.open_selected_details(),
    KeyCode::Char('p') => app.play_selected(),
    KeyCode::Char('f') if app.active_query.is_none() => app.open_featured_details(),
    KeyCode::Char('P') if app.active_query.is_none() => app.play_featured(),
    KeyCode::Esc => {
      if app.active_query.is_some() || !app.input.is_empty() {
        app.clear_search();
      }
    }
    KeyCode::Char('q') => app.should_quit = true,
    _ => {}
  }
}

fn handle_details_key(app: &mut App, key: event::KeyEvent) {
  match key.code {
    KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('q') => return app.close_details(),
    KeyCode::Enter | KeyCode::Char('p') => return app.play_details(),
    _ => {}
  }
  let Some(view) = app.details.as_mut() else {
    app.mode = AppMode::Browse;
    return;
  };
  match key.code {
    KeyCode::Down | KeyCode::Char('j') => view.move_episode(1),
    KeyCode::Up | KeyCode::Char('k') => view.move_episode(-1),
    KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(']') => view.cycle_season(1),
    KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('[') => view.cycle_season(-1),
    _ => {}
  }
}
