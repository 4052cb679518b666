//! Turn Assembler: builds the outgoing `generateContent` payload.
//!
//! The remote model is stateless per call, so every request replays the full
//! transcript: the fixed preamble first, then the committed history in
//! original order, then the new annotated user turn.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::locale::Language;
use crate::prompts::SYSTEM_PREAMBLE;
use crate::session::{Attachment, ConversationTurn, Role};

/// JSON body of one `generateContent` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// The only attachment fields allowed on the wire. Local metadata
/// (`file_name`, `is_image`) is stripped by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline_data(attachment: &Attachment) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: attachment.mime_type.clone(),
                data: BASE64.encode(&attachment.data),
            }),
        }
    }
}

/// Prefix the user's text with the active display language and the fixed
/// locale tag. Applied once, when the turn is staged; the annotated form is
/// what history replays on later calls.
pub fn annotate_user_text(text: &str, language: Language) -> String {
    format!("[Language: {}, Location: India] {}", language, text)
}

/// Build the payload for one turn: preamble, committed history in original
/// relative order, then the new user turn. Assembly never fails; an empty
/// history and a missing attachment are both valid.
pub fn build_request(history: &[ConversationTurn], new_turn: &ConversationTurn) -> GenerateRequest {
    let mut contents = Vec::with_capacity(history.len() + 2);
    contents.push(Content {
        role: Role::User.as_wire().to_string(),
        parts: vec![Part::text(SYSTEM_PREAMBLE)],
    });
    for turn in history {
        contents.push(content_for_turn(turn));
    }
    contents.push(content_for_turn(new_turn));
    GenerateRequest { contents }
}

fn content_for_turn(turn: &ConversationTurn) -> Content {
    let mut parts = vec![Part::text(turn.text.clone())];
    if let Some(attachment) = &turn.attachment {
        parts.push(Part::inline_data(attachment));
    }
    Content {
        role: turn.role.as_wire().to_string(),
        parts,
    }
}
