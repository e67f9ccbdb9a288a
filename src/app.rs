use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::client::CompletionClient;
use crate::config::Config;
use crate::coordinator::{RequestCoordinator, RequestState};
use crate::nav::{NavEvent, NavigationDispatcher, Section};
use crate::session::{self, SessionStore};
use crate::tui::AppEvent;
use crate::voice::{VoiceCapability, VoiceInputController, VoiceState};

/// Canned prompts offered while the conversation is still fresh.
pub const QUICK_ACTIONS: &[(&str, &str)] = &[
    ("View Projects", "Show me the projects"),
    ("About", "Tell me about the author"),
    ("Contact Info", "How can I get in touch?"),
    ("Skills", "What are the skills?"),
];

pub struct App {
    // Core state
    pub should_quit: bool,
    pub widget_open: bool,
    pub current_section: Section,

    // Widget input state
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat display state
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Blocking notice (permission denial); dismissed with any key
    pub notice: Option<String>,

    // Orchestration
    pub store: SessionStore,
    pub coordinator: RequestCoordinator,
    pub voice: VoiceInputController,
    pub dispatcher: NavigationDispatcher,
}

impl App {
    pub fn new(config: &Config, tx: UnboundedSender<AppEvent>) -> anyhow::Result<Self> {
        let capability = VoiceCapability::probe(config.transcriber.as_deref());
        let voice_available = capability.is_supported();

        let store = SessionStore::open(session::default_session_path()?, voice_available);

        let client = CompletionClient::new(config.endpoint());
        let coordinator = RequestCoordinator::new(Arc::new(client));

        let mut voice = VoiceInputController::new(capability, tx.clone());
        if let Some(ms) = config.voice_debounce_ms {
            voice = voice.with_debounce(Duration::from_millis(ms));
        }

        let mut dispatcher = NavigationDispatcher::new(tx);
        if let Some(ms) = config.close_delay_ms {
            dispatcher = dispatcher.with_close_delay(Duration::from_millis(ms));
        }

        Ok(Self {
            should_quit: false,
            widget_open: false,
            current_section: Section::Hero,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,

            notice: None,

            store,
            coordinator,
            voice,
            dispatcher,
        })
    }

    /// The single send path for both typed and voice input.
    pub fn submit(&mut self, text: &str) {
        let before = self.coordinator.state();
        self.coordinator
            .submit(text, &mut self.store, self.voice.state());
        if before == RequestState::Idle && self.coordinator.state() == RequestState::Pending {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn submit_input(&mut self) {
        let text = self.input.clone();
        self.submit(&text);
        if self.coordinator.state() == RequestState::Pending {
            self.input.clear();
            self.cursor = 0;
        }
    }

    /// Check the in-flight request; on resolution, store the assistant turn
    /// and run any navigation directive.
    pub async fn poll_request(&mut self) {
        if let Some(result) = self.coordinator.poll().await {
            if let Some(section) = self.coordinator.finish(result, &mut self.store) {
                self.dispatcher.dispatch(&section);
            }
            self.scroll_chat_to_bottom();
        }
    }

    pub fn apply_nav(&mut self, event: NavEvent) {
        match event {
            NavEvent::ScrollTo(section) => self.current_section = section,
            NavEvent::CloseWidget => self.widget_open = false,
        }
    }

    pub fn toggle_widget(&mut self) {
        self.widget_open = !self.widget_open;
    }

    pub fn reset_chat(&mut self) {
        self.store.reset(self.voice.is_supported());
        self.chat_scroll = 0;
    }

    pub fn show_quick_actions(&self) -> bool {
        self.store.len() <= 1 && self.coordinator.state() == RequestState::Idle
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.coordinator.state() == RequestState::Pending
            || self.voice.state() == VoiceState::Listening
        {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Scroll chat so the newest message (or the thinking indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.store.messages() {
            total_lines += 1; // Role line ("You:" or "Assistant:")
            for line in msg.content.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1; // Empty line still takes one line
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.coordinator.state() == RequestState::Pending {
            total_lines += 2; // "Assistant:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn section_prev(&mut self) {
        let sections = Section::all();
        let idx = sections
            .iter()
            .position(|s| *s == self.current_section)
            .unwrap_or(0);
        self.current_section = sections[idx.saturating_sub(1)];
    }

    pub fn section_next(&mut self) {
        let sections = Section::all();
        let idx = sections
            .iter()
            .position(|s| *s == self.current_section)
            .unwrap_or(0);
        self.current_section = sections[(idx + 1).min(sections.len() - 1)];
    }
}
