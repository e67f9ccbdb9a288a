//! Page sections and the navigation dispatcher.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::tui::AppEvent;

const DEFAULT_CLOSE_DELAY: Duration = Duration::from_millis(500);

/// The closed set of scroll anchors the host page exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Hero,
    About,
    Projects,
    Skills,
    Contact,
}

impl Section {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "hero" => Some(Section::Hero),
            "about" => Some(Section::About),
            "projects" => Some(Section::Projects),
            "skills" => Some(Section::Skills),
            "contact" => Some(Section::Contact),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Hero => "hero",
            Section::About => "about",
            Section::Projects => "projects",
            Section::Skills => "skills",
            Section::Contact => "contact",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Section::Hero => "Home",
            Section::About => "About",
            Section::Projects => "Projects",
            Section::Skills => "Skills",
            Section::Contact => "Contact",
        }
    }

    pub fn all() -> [Section; 5] {
        [
            Section::Hero,
            Section::About,
            Section::Projects,
            Section::Skills,
            Section::Contact,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    ScrollTo(Section),
    CloseWidget,
}

/// Executes navigation directives against the live UI: scroll right away,
/// close the widget a beat later so the user sees the motion. The delayed
/// close runs on its own task and never blocks the caller; a newer dispatch
/// cancels a close that is still pending.
pub struct NavigationDispatcher {
    tx: UnboundedSender<AppEvent>,
    close_delay: Duration,
    close_task: Option<JoinHandle<()>>,
}

impl NavigationDispatcher {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            tx,
            close_delay: DEFAULT_CLOSE_DELAY,
            close_task: None,
        }
    }

    pub fn with_close_delay(mut self, close_delay: Duration) -> Self {
        self.close_delay = close_delay;
        self
    }

    /// Resolve `section_id` against the closed section set and act on it.
    /// Unknown ids are a silent no-op: no scroll, no close, no error.
    pub fn dispatch(&mut self, section_id: &str) {
        let Some(section) = Section::from_id(section_id) else {
            tracing::debug!(section = section_id, "ignoring unknown navigation target");
            return;
        };

        let _ = self.tx.send(AppEvent::Nav(NavEvent::ScrollTo(section)));

        if let Some(task) = self.close_task.take() {
            task.abort();
        }
        let tx = self.tx.clone();
        let delay = self.close_delay;
        self.close_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(AppEvent::Nav(NavEvent::CloseWidget));
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn next_nav(event: AppEvent) -> NavEvent {
        match event {
            AppEvent::Nav(nav) => nav,
            other => panic!("expected nav event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_scrolls_then_closes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher =
            NavigationDispatcher::new(tx).with_close_delay(Duration::from_millis(10));

        dispatcher.dispatch("projects");

        let first = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next_nav(first), NavEvent::ScrollTo(Section::Projects));

        let second = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next_nav(second), NavEvent::CloseWidget);
    }

    #[tokio::test]
    async fn test_unknown_section_is_a_no_op() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher =
            NavigationDispatcher::new(tx).with_close_delay(Duration::from_millis(5));

        dispatcher.dispatch("basement");

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_dispatch_cancels_pending_close() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut dispatcher =
            NavigationDispatcher::new(tx).with_close_delay(Duration::from_millis(40));

        dispatcher.dispatch("about");
        let first = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next_nav(first), NavEvent::ScrollTo(Section::About));

        // Re-dispatch before the first close fires.
        dispatcher.dispatch("contact");
        let second = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next_nav(second), NavEvent::ScrollTo(Section::Contact));

        // Exactly one close arrives, from the second dispatch.
        let third = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next_nav(third), NavEvent::CloseWidget);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_section_ids_round_trip() {
        for section in Section::all() {
            assert_eq!(Section::from_id(section.as_str()), Some(section));
        }
        assert_eq!(Section::from_id("Hero"), None);
    }
}
