//! Conversation state owned by the turn controller.

use chrono::{DateTime, Utc};

use crate::locale::{self, Language};

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Role name used on the wire.
    pub fn as_wire(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// A file the user attached to the pending turn, already decoded by the
/// ingestion collaborator. `file_name` and `is_image` are display-side
/// metadata only and never reach the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub is_image: bool,
}

/// One committed entry in the transcript.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            attachment,
            timestamp: Utc::now(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            attachment: None,
            timestamp: Utc::now(),
        }
    }
}

/// All mutable conversation state for one chat session.
///
/// Mutation goes through the [`TurnController`](crate::controller::TurnController)
/// and the guarded reset/language operations; nothing here is ambient or
/// shared. The system preamble is never stored as a history entry.
#[derive(Debug, Clone)]
pub struct SessionState {
    language: Language,
    history: Vec<ConversationTurn>,
    pending: Option<Attachment>,
    in_flight: bool,
}

impl SessionState {
    /// Create a session in the given language, seeded with the localized
    /// greeting as the first MODEL turn.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            history: vec![ConversationTurn::model(locale::greeting(language))],
            pending: None,
            in_flight: false,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Whether a turn is currently outstanding. Gates submission, language
    /// switching, and reset.
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn pending_attachment(&self) -> Option<&Attachment> {
        self.pending.as_ref()
    }

    /// Stage an attachment for the next turn, replacing any previous one.
    pub fn attach(&mut self, attachment: Attachment) {
        self.pending = Some(attachment);
    }

    /// Remove and return the staged attachment, if any.
    pub fn detach(&mut self) -> Option<Attachment> {
        self.pending.take()
    }

    pub(crate) fn set_in_flight(&mut self, in_flight: bool) {
        self.in_flight = in_flight;
    }

    /// Append the user turn and its model reply together. Commits are
    /// turn-atomic: cancelled and failed turns never reach this point.
    pub(crate) fn commit_turns(&mut self, user: ConversationTurn, model: ConversationTurn) {
        self.history.push(user);
        self.history.push(model);
    }

    /// Wipe the transcript and reseed the greeting in the given language.
    pub(crate) fn reseed(&mut self, language: Language) {
        self.language = language;
        self.history.clear();
        self.history.push(ConversationTurn::model(locale::greeting(language)));
        self.pending = None;
    }
}
