use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, QUICK_ACTIONS};
use crate::tui::AppEvent;
use crate::voice::{VoiceEvent, VoiceState};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_request().await;
        }
        AppEvent::Nav(nav) => app.apply_nav(nav),
        AppEvent::Voice(voice) => handle_voice(app, voice),
        AppEvent::VoiceSubmit(transcript) => app.submit(&transcript),
    }
    Ok(())
}

fn handle_voice(app: &mut App, event: VoiceEvent) {
    // Every capture outcome leaves the Listening state first.
    app.voice.finish_listening();
    match event {
        VoiceEvent::Transcript(transcript) => {
            app.voice.queue_submit(transcript);
        }
        VoiceEvent::PermissionDenied => {
            app.notice = Some(
                "Microphone access denied. Allow microphone access to use voice commands."
                    .to_string(),
            );
        }
        VoiceEvent::Ended => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work anywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A blocking notice swallows the next key press.
    if app.notice.is_some() {
        app.notice = None;
        return;
    }

    if app.widget_open {
        handle_widget_key(app, key);
    } else {
        handle_page_key(app, key);
    }
}

fn handle_page_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,

        // Move between page sections
        KeyCode::Char('h') | KeyCode::Left => app.section_prev(),
        KeyCode::Char('l') | KeyCode::Right => app.section_next(),

        // Open the assistant widget
        KeyCode::Char('a') | KeyCode::Enter => app.widget_open = true,

        _ => {}
    }
}

fn handle_widget_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            if app.voice.state() == VoiceState::Listening {
                app.voice.stop();
            } else {
                app.widget_open = false;
            }
        }

        KeyCode::Enter => app.submit_input(),

        // Toggle voice capture
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if app.voice.state() == VoiceState::Listening {
                app.voice.stop();
            } else {
                app.voice.start(app.coordinator.state());
            }
        }

        // Clear chat history
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.reset_chat();
        }

        // Quick actions while the conversation is fresh
        KeyCode::F(n @ 1..=4) => {
            if app.show_quick_actions() {
                if let Some((_, prompt)) = QUICK_ACTIONS.get(n as usize - 1) {
                    app.submit(prompt);
                }
            }
        }

        KeyCode::Up => app.scroll_chat_up(),
        KeyCode::Down => app.scroll_chat_down(),

        // Input editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }

        _ => {}
    }
}
