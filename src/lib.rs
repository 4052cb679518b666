//! Conversation pipeline for a bilingual (English/Hindi) voter-registration
//! assistant backed by a hosted generative-language API.
//!
//! The pipeline is split into three cooperating pieces:
//!
//! - [`assembler`] builds the outgoing request payload from the new user
//!   input, an optional attachment, and the accumulated history.
//! - [`shaper`] trims the raw model reply into a bounded display form and
//!   picks a localized follow-up question.
//! - [`controller`] sequences one turn end-to-end (submit, await, shape,
//!   reveal, commit) with user-initiated cancellation.
//!
//! Everything display-related (terminal, speech, theming) is an external
//! collaborator that drives the controller and renders its events.

pub mod assembler;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod locale;
pub mod prompts;
pub mod session;
pub mod shaper;

pub use controller::{SubmitOutcome, TurnController, TurnEvent, TurnPhase};
pub use locale::{FollowUpCategory, Language};
pub use session::{Attachment, ConversationTurn, Role, SessionState};
pub use shaper::ShapedResponse;
