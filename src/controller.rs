//! Turn Controller: sequences one chat turn end-to-end.
//!
//! Each accepted submission spawns a single cooperative task that awaits the
//! remote call, shapes the reply, and reveals it character by character. One
//! cancellation token covers the whole turn: cancelling aborts whichever
//! stage is running. Exactly one turn may be in flight per controller; a
//! second submit is refused, never queued.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::assembler::{self, GenerateRequest};
use crate::client::ModelTransport;
use crate::error::{SessionBusy, TransportError};
use crate::locale::{self, Language};
use crate::session::{Attachment, ConversationTurn, SessionState};
use crate::shaper::{self, ShapedResponse};

/// Observable phases of the per-turn state machine. Submission and shaping
/// are synchronous and never visible from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingRemote,
    Revealing,
}

/// Events a turn reports to the UI collaborator, in order: zero or more
/// reveal deltas followed by exactly one terminal event.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Next fragment of the shaped reply, paced at the reveal cadence.
    RevealDelta(String),
    /// Reveal finished; the turn was committed to history.
    Completed(ShapedResponse),
    /// The user cancelled the turn. Nothing was committed.
    Stopped,
    /// The remote call failed; carries the localized display text. Nothing
    /// was committed.
    Failed(String),
}

impl TurnEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnEvent::RevealDelta(_))
    }
}

/// Result of a submit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { request_id: Uuid },
    /// A turn is already in flight; the input was dropped, not queued.
    RejectedBusy,
    /// Blank input is swallowed without any state change.
    RejectedEmpty,
}

/// Cloneable handle for cancelling the turn it was taken from, usable while
/// the controller itself is borrowed by an event pump.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

struct ActiveTurn {
    request_id: Uuid,
    token: CancellationToken,
    events: mpsc::UnboundedReceiver<TurnEvent>,
    /// Staged user turn, committed together with the model reply only when
    /// the reveal completes.
    user_turn: ConversationTurn,
}

/// Owns the session state and drives one turn at a time against the
/// transport.
pub struct TurnController {
    transport: Arc<dyn ModelTransport>,
    session: SessionState,
    reveal_interval: Duration,
    active: Option<ActiveTurn>,
    phase: TurnPhase,
}

impl TurnController {
    pub fn new(
        transport: Arc<dyn ModelTransport>,
        language: Language,
        reveal_interval: Duration,
    ) -> Self {
        Self {
            transport,
            session: SessionState::new(language),
            reveal_interval,
            active: None,
            phase: TurnPhase::Idle,
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn language(&self) -> Language {
        self.session.language()
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Stage an attachment for the next submission.
    pub fn attach(&mut self, attachment: Attachment) {
        self.session.attach(attachment);
    }

    /// Drop the staged attachment, if any.
    pub fn detach_pending(&mut self) -> Option<Attachment> {
        self.session.detach()
    }

    /// Switch the display language: clears history and reseeds the greeting.
    /// Refused while a turn is in flight.
    pub fn set_language(&mut self, language: Language) -> Result<(), SessionBusy> {
        if self.session.in_flight() {
            return Err(SessionBusy);
        }
        self.session.reseed(language);
        Ok(())
    }

    /// Delete-chats: wipe the transcript and reseed in the current language.
    /// Refused while a turn is in flight.
    pub fn reset(&mut self) -> Result<(), SessionBusy> {
        if self.session.in_flight() {
            return Err(SessionBusy);
        }
        self.session.reseed(self.session.language());
        Ok(())
    }

    /// Start a turn. The explicit attachment, when given, takes precedence
    /// over the staged one; either way the pending slot is cleared.
    pub fn submit(&mut self, text: &str, attachment: Option<Attachment>) -> SubmitOutcome {
        if self.session.in_flight() {
            return SubmitOutcome::RejectedBusy;
        }
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::RejectedEmpty;
        }

        let attachment = match attachment {
            Some(attachment) => {
                self.session.detach();
                Some(attachment)
            }
            None => self.session.detach(),
        };

        let language = self.session.language();
        let annotated = assembler::annotate_user_text(text, language);
        let user_turn = ConversationTurn::user(annotated, attachment);
        let payload = assembler::build_request(self.session.history(), &user_turn);

        let request_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(%request_id, "turn submitted");
        tokio::spawn(run_turn(
            Arc::clone(&self.transport),
            payload,
            text.to_string(),
            language,
            self.reveal_interval,
            token.clone(),
            tx,
        ));

        self.session.set_in_flight(true);
        self.phase = TurnPhase::AwaitingRemote;
        self.active = Some(ActiveTurn {
            request_id,
            token,
            events: rx,
            user_turn,
        });
        SubmitOutcome::Accepted { request_id }
    }

    /// Cancel the in-flight turn. Covers both the network await and the
    /// reveal loop; a no-op when nothing is in flight.
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            debug!(request_id = %active.request_id, "turn cancelled");
            active.token.cancel();
        }
    }

    /// Handle for cancelling the current turn from outside the event pump.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.active.as_ref().map(|active| CancelHandle {
            token: active.token.clone(),
        })
    }

    /// Await the next event from the in-flight turn and apply terminal
    /// events to the session. Returns `None` when no turn is active.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        let event = {
            let active = self.active.as_mut()?;
            active.events.recv().await
        };
        let Some(event) = event else {
            warn!("turn task dropped its channel without a terminal event");
            self.finish_turn();
            return None;
        };
        match &event {
            TurnEvent::RevealDelta(_) => {
                self.phase = TurnPhase::Revealing;
            }
            TurnEvent::Completed(shaped) => {
                if let Some(active) = self.active.take() {
                    let model_turn = ConversationTurn::model(shaped.display_text());
                    self.session.commit_turns(active.user_turn, model_turn);
                }
                self.session.set_in_flight(false);
                self.phase = TurnPhase::Idle;
            }
            TurnEvent::Stopped | TurnEvent::Failed(_) => {
                self.finish_turn();
            }
        }
        Some(event)
    }

    fn finish_turn(&mut self) {
        self.active = None;
        self.session.set_in_flight(false);
        self.phase = TurnPhase::Idle;
    }
}

/// The single cooperative task for one turn: await the remote, shape, then
/// reveal at the configured cadence, all under one cancellation token.
async fn run_turn(
    transport: Arc<dyn ModelTransport>,
    payload: GenerateRequest,
    original_user_text: String,
    language: Language,
    reveal_interval: Duration,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<TurnEvent>,
) {
    let raw = tokio::select! {
        _ = token.cancelled() => {
            let _ = tx.send(TurnEvent::Stopped);
            return;
        }
        result = transport.generate(payload) => match result {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "remote call failed");
                let _ = tx.send(TurnEvent::Failed(display_error(&err, language)));
                return;
            }
        }
    };

    let shaped = shaper::shape(&raw, &original_user_text, language);
    let display = shaped.display_text();
    for ch in display.chars() {
        if token.is_cancelled() {
            let _ = tx.send(TurnEvent::Stopped);
            return;
        }
        if tx.send(TurnEvent::RevealDelta(ch.to_string())).is_err() {
            return;
        }
        if !reveal_interval.is_zero() {
            tokio::select! {
                _ = token.cancelled() => {
                    let _ = tx.send(TurnEvent::Stopped);
                    return;
                }
                _ = tokio::time::sleep(reveal_interval) => {}
            }
        }
    }
    let _ = tx.send(TurnEvent::Completed(shaped));
}

/// API-supplied messages are shown as-is; transport and parse failures fall
/// back to the localized generic error label.
fn display_error(err: &TransportError, language: Language) -> String {
    match err {
        TransportError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
        _ => locale::generic_error(language).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Behavior {
        Reply(&'static str),
        Fail,
        Hang,
    }

    struct StubTransport {
        behavior: Behavior,
        calls: AtomicUsize,
        captured: Mutex<Option<GenerateRequest>>,
    }

    impl StubTransport {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: AtomicUsize::new(0),
                captured: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelTransport for StubTransport {
        async fn generate(&self, request: GenerateRequest) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.captured.lock().unwrap() = Some(request);
            match &self.behavior {
                Behavior::Reply(text) => Ok(text.to_string()),
                Behavior::Fail => Err(TransportError::Api {
                    status: 429,
                    message: "quota exhausted".to_string(),
                }),
                Behavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }
    }

    fn make_controller(behavior: Behavior) -> (TurnController, Arc<StubTransport>) {
        let stub = StubTransport::new(behavior);
        let controller = TurnController::new(stub.clone(), Language::En, Duration::ZERO);
        (controller, stub)
    }

    async fn drain(controller: &mut TurnController) -> Vec<TurnEvent> {
        let mut events = Vec::new();
        while let Some(event) = controller.next_event().await {
            let terminal = event.is_terminal();
            events.push(event);
            if terminal {
                break;
            }
        }
        events
    }

    const FIVE_SENTENCES: &str =
        "One one. Two two. Three three. Four four. Five five.";

    #[tokio::test]
    async fn blank_submit_is_swallowed() {
        let (mut controller, stub) = make_controller(Behavior::Reply("hi"));
        assert_eq!(controller.submit("", None), SubmitOutcome::RejectedEmpty);
        assert_eq!(controller.submit("   \t", None), SubmitOutcome::RejectedEmpty);
        assert_eq!(stub.calls(), 0);
        assert_eq!(controller.session().history().len(), 1);
        assert!(!controller.session().in_flight());
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_refused() {
        let (mut controller, stub) = make_controller(Behavior::Hang);
        assert!(matches!(
            controller.submit("first", None),
            SubmitOutcome::Accepted { .. }
        ));
        assert_eq!(controller.submit("second", None), SubmitOutcome::RejectedBusy);
        assert_eq!(controller.session().history().len(), 1);

        controller.cancel();
        let events = drain(&mut controller).await;
        assert_eq!(events.last(), Some(&TurnEvent::Stopped));
        // The refused submission never reached the transport.
        assert!(stub.calls() <= 1);
    }

    #[tokio::test]
    async fn cancelled_turn_commits_nothing() {
        let (mut controller, _stub) = make_controller(Behavior::Hang);
        let before = controller.session().history().len();

        controller.submit("Am I eligible?", None);
        assert_eq!(controller.phase(), TurnPhase::AwaitingRemote);
        controller.cancel();

        let events = drain(&mut controller).await;
        assert_eq!(events, vec![TurnEvent::Stopped]);
        assert_eq!(controller.session().history().len(), before);
        assert!(!controller.session().in_flight());
        assert_eq!(controller.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn cancel_during_reveal_commits_nothing() {
        let stub = StubTransport::new(Behavior::Reply(FIVE_SENTENCES));
        let mut controller =
            TurnController::new(stub, Language::En, Duration::from_millis(10));
        let before = controller.session().history().len();
        controller.submit("Hello", None);

        let mut deltas = 0;
        let mut terminal = None;
        while let Some(event) = controller.next_event().await {
            match event {
                TurnEvent::RevealDelta(_) => {
                    deltas += 1;
                    if deltas == 3 {
                        assert_eq!(controller.phase(), TurnPhase::Revealing);
                        controller.cancel();
                    }
                }
                other => {
                    terminal = Some(other);
                    break;
                }
            }
        }

        assert_eq!(terminal, Some(TurnEvent::Stopped));
        assert!(deltas >= 3);
        assert_eq!(controller.session().history().len(), before);
        assert!(!controller.session().in_flight());
        assert_eq!(controller.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn successful_turn_reveals_then_commits_the_shaped_text() {
        let (mut controller, _stub) = make_controller(Behavior::Reply(FIVE_SENTENCES));
        controller.submit("Hello", None);

        let events = drain(&mut controller).await;
        let Some(TurnEvent::Completed(shaped)) = events.last() else {
            panic!("expected completion, got {:?}", events.last());
        };
        assert_eq!(shaped.body, "One one. Two two. Three three.");

        // What was revealed is exactly what was committed.
        let revealed: String = events
            .iter()
            .filter_map(|event| match event {
                TurnEvent::RevealDelta(chunk) => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(revealed, shaped.display_text());

        let history = controller.session().history();
        assert_eq!(history.len(), 3);
        assert_eq!(
            history[1].text,
            "[Language: en, Location: India] Hello"
        );
        assert_eq!(history[2].text, shaped.display_text());
        assert!(!controller.session().in_flight());
        assert_eq!(controller.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn failed_turn_surfaces_the_api_message_and_preserves_history() {
        let (mut controller, _stub) = make_controller(Behavior::Fail);
        controller.submit("Hello", None);

        let events = drain(&mut controller).await;
        assert_eq!(events, vec![TurnEvent::Failed("quota exhausted".to_string())]);
        assert_eq!(controller.session().history().len(), 1);
        assert!(!controller.session().in_flight());
    }

    #[tokio::test]
    async fn network_failure_falls_back_to_the_localized_label() {
        let err = TransportError::Network("connection refused".to_string());
        assert_eq!(
            display_error(&err, Language::Hi),
            locale::generic_error(Language::Hi)
        );
    }

    #[tokio::test]
    async fn language_switch_reseeds_history() {
        let (mut controller, _stub) = make_controller(Behavior::Reply("hi"));
        assert!(controller.set_language(Language::Hi).is_ok());
        assert_eq!(controller.language(), Language::Hi);
        let history = controller.session().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, locale::greeting(Language::Hi));
    }

    #[tokio::test]
    async fn session_operations_are_refused_while_in_flight() {
        let (mut controller, _stub) = make_controller(Behavior::Hang);
        controller.submit("first", None);

        assert_eq!(controller.set_language(Language::Hi), Err(SessionBusy));
        assert_eq!(controller.reset(), Err(SessionBusy));

        controller.cancel();
        drain(&mut controller).await;
        assert!(controller.set_language(Language::Hi).is_ok());
    }

    #[tokio::test]
    async fn pending_attachment_is_consumed_and_transmitted_stripped() {
        let (mut controller, stub) = make_controller(Behavior::Reply("Noted."));
        controller.attach(Attachment {
            file_name: "voter-id.png".to_string(),
            mime_type: "image/png".to_string(),
            data: vec![9, 9, 9],
            is_image: true,
        });

        controller.submit("see attached", None);
        assert!(controller.session().pending_attachment().is_none());
        drain(&mut controller).await;

        let captured = stub.captured.lock().unwrap().clone().unwrap();
        let wire = serde_json::to_string(&captured).unwrap();
        assert!(wire.contains("inline_data"));
        assert!(!wire.contains("file_name"));
        assert!(!wire.contains("is_image"));
        assert!(!wire.contains("voter-id.png"));

        // The committed user turn keeps the attachment for later replay.
        let history = controller.session().history();
        assert!(history[1].attachment.is_some());
    }

    #[tokio::test]
    async fn cancel_handle_cancels_from_outside_the_pump() {
        let (mut controller, _stub) = make_controller(Behavior::Hang);
        controller.submit("first", None);
        let handle = controller.cancel_handle().expect("turn in flight");
        handle.cancel();
        let events = drain(&mut controller).await;
        assert_eq!(events.last(), Some(&TurnEvent::Stopped));
    }
}
