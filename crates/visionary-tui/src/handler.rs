use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use visionary_core::{Action, Tab};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }
    if ctrl && key.code == KeyCode::Char('g') {
        app.start_generation();
        return;
    }
    if ctrl && key.code == KeyCode::Char('e') {
        app.start_assist();
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing if app.editing_field.is_some() => handle_field_editing(app, key),
        InputMode::Editing => handle_prompt_editing(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }

        // Tab switching
        KeyCode::Tab => {
            let tab = app.state().active_tab.next();
            app.set_tab(tab);
            return;
        }
        KeyCode::BackTab => {
            let tab = app.state().active_tab.prev();
            app.set_tab(tab);
            return;
        }
        KeyCode::Char(c @ '1'..='4') => {
            let idx = c as usize - '1' as usize;
            if let Some(tab) = Tab::all().get(idx).copied() {
                app.set_tab(tab);
            }
            return;
        }

        // Esc stops in-flight work first, then dismisses the error
        KeyCode::Esc => {
            if app.has_running_tasks() {
                app.cancel_tasks();
            } else if app.state().error.is_some() {
                app.dispatch(Action::SetError(None));
            }
            return;
        }

        KeyCode::Char('g') => {
            app.start_generation();
            return;
        }
        KeyCode::Char('e') => {
            app.start_assist();
            return;
        }
        KeyCode::Char('i') => {
            app.set_tab(Tab::Generate);
            app.prompt_cursor_end();
            app.input_mode = InputMode::Editing;
            return;
        }
        _ => {}
    }

    match app.state().active_tab {
        Tab::Generate => handle_generate_normal(app, key),
        Tab::History => handle_history_normal(app, key),
        Tab::Templates => handle_templates_normal(app, key),
        Tab::Settings => handle_settings_normal(app, key),
    }
}

fn handle_generate_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.prompt_cursor_end();
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('x') => app.prompt_clear(),
        _ => {}
    }
}

fn handle_history_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.history_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.history_nav_up(),
        KeyCode::Char('f') | KeyCode::Char(' ') => app.toggle_selected_favorite(),
        KeyCode::Char('p') | KeyCode::Enter => app.reuse_selected_prompt(),
        _ => {}
    }
}

fn handle_templates_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.templates_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.templates_nav_up(),
        KeyCode::Enter => app.apply_selected_template(),
        _ => {}
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.settings_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.settings_nav_up(),
        KeyCode::Char('l') | KeyCode::Right => app.adjust_selected_field(true),
        KeyCode::Char('h') | KeyCode::Left => app.adjust_selected_field(false),
        KeyCode::Char('r') => app.randomize_seed(),
        KeyCode::Enter => app.begin_field_edit(),
        _ => {}
    }
}

fn handle_prompt_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            app.start_generation();
        }
        KeyCode::Backspace => app.prompt_backspace(),
        KeyCode::Delete => app.prompt_delete(),
        KeyCode::Left => app.prompt_cursor_left(),
        KeyCode::Right => app.prompt_cursor_right(),
        KeyCode::Home => app.prompt_cursor_home(),
        KeyCode::End => app.prompt_cursor_end(),
        KeyCode::Char(c) => app.prompt_insert(c),
        _ => {}
    }
}

fn handle_field_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_field_edit(),
        KeyCode::Enter => app.commit_field_edit(),
        KeyCode::Backspace => app.field_backspace(),
        KeyCode::Left => app.field_cursor_left(),
        KeyCode::Right => app.field_cursor_right(),
        KeyCode::Char(c) => app.field_insert(c),
        _ => {}
    }
}
