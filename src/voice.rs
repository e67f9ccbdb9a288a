//! Voice input: capability probe, capture lifecycle, and the debounced
//! hand-off into the shared send path.
//!
//! Capture shells out to a transcriber program that records from the
//! microphone and prints the finalized transcript on stdout. The probe runs
//! once at construction; a missing program fixes the controller as
//! unsupported for the whole run, there is no re-probing.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::coordinator::RequestState;
use crate::tui::AppEvent;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Transcriber commands tried in order when none is configured.
const DEFAULT_TRANSCRIBERS: &[&str] = &["hear", "whisper-cli", "vosk-transcriber"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceCapability {
    Supported(PathBuf),
    Unsupported,
}

impl VoiceCapability {
    /// One-time probe: resolve the configured command, or walk the default
    /// candidates, on `PATH`.
    pub fn probe(configured: Option<&str>) -> Self {
        let candidates: Vec<&str> = match configured {
            Some(command) => vec![command],
            None => DEFAULT_TRANSCRIBERS.to_vec(),
        };
        for candidate in candidates {
            if let Some(path) = find_in_path(candidate) {
                tracing::debug!(program = %path.display(), "voice capture available");
                return VoiceCapability::Supported(path);
            }
        }
        tracing::debug!("no transcriber found, voice input disabled");
        VoiceCapability::Unsupported
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, VoiceCapability::Supported(_))
    }
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return path.is_file().then_some(path);
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Unsupported,
    Idle,
    Listening,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// Finalized transcript from a successful capture.
    Transcript(String),
    /// Microphone access was refused; the only voice error shown to the user.
    PermissionDenied,
    /// Capture ended with nothing usable (error or silence).
    Ended,
}

pub struct VoiceInputController {
    capability: VoiceCapability,
    listening: bool,
    tx: UnboundedSender<AppEvent>,
    debounce: Duration,
    capture_task: Option<JoinHandle<()>>,
    debounce_task: Option<JoinHandle<()>>,
}

impl VoiceInputController {
    pub fn new(capability: VoiceCapability, tx: UnboundedSender<AppEvent>) -> Self {
        Self {
            capability,
            listening: false,
            tx,
            debounce: DEFAULT_DEBOUNCE,
            capture_task: None,
            debounce_task: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn is_supported(&self) -> bool {
        self.capability.is_supported()
    }

    pub fn state(&self) -> VoiceState {
        if !self.capability.is_supported() {
            VoiceState::Unsupported
        } else if self.listening {
            VoiceState::Listening
        } else {
            VoiceState::Idle
        }
    }

    /// Begin a capture. Rejected without feedback while a completion request
    /// is pending, while already listening, or when unsupported.
    pub fn start(&mut self, request_state: RequestState) {
        let VoiceCapability::Supported(program) = &self.capability else {
            return;
        };
        if request_state == RequestState::Pending || self.listening {
            tracing::debug!("dropping voice start while busy");
            return;
        }

        self.listening = true;
        let program = program.clone();
        let tx = self.tx.clone();
        self.capture_task = Some(tokio::spawn(async move {
            let event = run_capture(&program).await;
            let _ = tx.send(AppEvent::Voice(event));
        }));
    }

    /// Abort an in-progress capture, if any.
    pub fn stop(&mut self) {
        if let Some(task) = self.capture_task.take() {
            task.abort();
        }
        self.listening = false;
    }

    /// Leave the Listening state. Called for every capture outcome before
    /// anything else happens with it.
    pub fn finish_listening(&mut self) {
        self.capture_task = None;
        self.listening = false;
    }

    /// Hand a finalized transcript to the send path after the fixed debounce.
    /// The controller is already Idle by the time this runs; the delayed
    /// submission arrives as an ordinary event.
    pub fn queue_submit(&mut self, transcript: String) {
        if let Some(task) = self.debounce_task.take() {
            task.abort();
        }
        let tx = self.tx.clone();
        let debounce = self.debounce;
        self.debounce_task = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let _ = tx.send(AppEvent::VoiceSubmit(transcript));
        }));
    }
}

async fn run_capture(program: &Path) -> VoiceEvent {
    match Command::new(program).kill_on_drop(true).output().await {
        Ok(output) => {
            let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if output.status.success() && !transcript.is_empty() {
                return VoiceEvent::Transcript(transcript);
            }
            let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
            if stderr.contains("permission") || stderr.contains("not allowed") {
                VoiceEvent::PermissionDenied
            } else {
                tracing::debug!(status = %output.status, "voice capture ended without transcript");
                VoiceEvent::Ended
            }
        }
        Err(err) => {
            tracing::debug!(%err, "voice capture failed to launch");
            VoiceEvent::Ended
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn supported_controller(
        tx: UnboundedSender<AppEvent>,
    ) -> VoiceInputController {
        // The probe is bypassed; the program is never launched in these tests.
        VoiceInputController::new(
            VoiceCapability::Supported(PathBuf::from("/nonexistent/transcriber")),
            tx,
        )
    }

    #[tokio::test]
    async fn test_start_while_request_pending_is_a_no_op() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut voice = supported_controller(tx);

        voice.start(RequestState::Pending);

        assert_eq!(voice.state(), VoiceState::Idle);
        assert!(voice.capture_task.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_controller_never_listens() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut voice = VoiceInputController::new(VoiceCapability::Unsupported, tx);

        assert_eq!(voice.state(), VoiceState::Unsupported);
        voice.start(RequestState::Idle);
        assert_eq!(voice.state(), VoiceState::Unsupported);
        assert!(voice.capture_task.is_none());
    }

    #[tokio::test]
    async fn test_start_transitions_to_listening_and_stop_returns_to_idle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut voice = supported_controller(tx);

        voice.start(RequestState::Idle);
        assert_eq!(voice.state(), VoiceState::Listening);

        // A second start while listening is dropped.
        voice.start(RequestState::Idle);
        assert_eq!(voice.state(), VoiceState::Listening);

        voice.stop();
        assert_eq!(voice.state(), VoiceState::Idle);
    }

    #[tokio::test]
    async fn test_queue_submit_debounces_into_the_event_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut voice = supported_controller(tx).with_debounce(Duration::from_millis(10));

        voice.queue_submit("show me the projects".to_string());

        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match event {
            AppEvent::VoiceSubmit(text) => assert_eq!(text, "show me the projects"),
            other => panic!("expected voice submit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_capture_reports_ended() {
        // The program path does not exist, so the spawn itself fails.
        let event = run_capture(Path::new("/nonexistent/transcriber")).await;
        assert_eq!(event, VoiceEvent::Ended);
    }

    #[test]
    fn test_probe_with_missing_command_is_unsupported() {
        let capability = VoiceCapability::probe(Some("/nonexistent/transcriber"));
        assert_eq!(capability, VoiceCapability::Unsupported);
    }
}
