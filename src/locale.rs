//! Fixed bilingual content tables and keyword classification.
//!
//! Every lookup is an exhaustive `match` over [`Language`], so the tables are
//! total by construction: adding a language without its strings is a compile
//! error, not a runtime hole.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Display language for the session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
}

/// Suggested-next-question category, keyword-classified from the user's
/// original input. Priority: documents > eligibility > status > default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUpCategory {
    Documents,
    Eligibility,
    Status,
    Default,
}

const ENUMERATION_KEYWORDS: &[&str] = &["what", "list", "require", "क्या", "सूची", "आवश्यक"];

const DOCUMENT_KEYWORDS: &[&str] = &["document", "proof", "id card", "दस्तावेज़", "प्रमाण"];
const ELIGIBILITY_KEYWORDS: &[&str] = &["eligible", "eligibility", "qualify", "पात्र", "योग्य"];
const STATUS_KEYWORDS: &[&str] = &["status", "track", "स्थिति"];

/// Whether the user's text asks for an enumeration (requirements, lists).
/// Enumeration requests are bullet-limited instead of sentence-limited.
pub fn is_enumeration_request(user_text: &str) -> bool {
    contains_any(&user_text.to_lowercase(), ENUMERATION_KEYWORDS)
}

/// Classify the user's original text into a follow-up category. The first
/// matching category in priority order wins.
pub fn classify_follow_up(user_text: &str) -> FollowUpCategory {
    let text = user_text.to_lowercase();
    if contains_any(&text, DOCUMENT_KEYWORDS) {
        FollowUpCategory::Documents
    } else if contains_any(&text, ELIGIBILITY_KEYWORDS) {
        FollowUpCategory::Eligibility
    } else if contains_any(&text, STATUS_KEYWORDS) {
        FollowUpCategory::Status
    } else {
        FollowUpCategory::Default
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::En => "Welcome! How can I assist you with voter registration today?",
        Language::Hi => "स्वागत है! मैं आपकी मतदाता पंजीकरण में कैसे सहायता कर सकता हूँ?",
    }
}

pub fn placeholder(language: Language) -> &'static str {
    match language {
        Language::En => "Ask me about voter registration...",
        Language::Hi => "मुझसे मतदाता पंजीकरण के बारे में पूछें...",
    }
}

pub fn processing(language: Language) -> &'static str {
    match language {
        Language::En => "Processing your request...",
        Language::Hi => "आपका अनुरोध प्रसंस्करण किया जा रहा है...",
    }
}

pub fn generic_error(language: Language) -> &'static str {
    match language {
        Language::En => "Sorry, I couldn't process your request. Please try again.",
        Language::Hi => "क्षमा करें, मैं आपका अनुरोध संसाधित नहीं कर सका। कृपया पुनः प्रयास करें।",
    }
}

pub fn stopped(language: Language) -> &'static str {
    match language {
        Language::En => "Response stopped.",
        Language::Hi => "प्रतिक्रिया रोक दी गई।",
    }
}

pub fn follow_up(category: FollowUpCategory, language: Language) -> &'static str {
    match (category, language) {
        (FollowUpCategory::Documents, Language::En) => {
            "Would you like to know where to submit these documents?"
        }
        (FollowUpCategory::Documents, Language::Hi) => {
            "क्या आप जानना चाहेंगे कि ये दस्तावेज़ कहाँ जमा करने हैं?"
        }
        (FollowUpCategory::Eligibility, Language::En) => {
            "Would you like to go over the registration steps next?"
        }
        (FollowUpCategory::Eligibility, Language::Hi) => {
            "क्या आप आगे पंजीकरण के चरण देखना चाहेंगे?"
        }
        (FollowUpCategory::Status, Language::En) => {
            "Would you like help checking your application status online?"
        }
        (FollowUpCategory::Status, Language::Hi) => {
            "क्या आप ऑनलाइन आवेदन की स्थिति जाँचने में मदद चाहेंगे?"
        }
        (FollowUpCategory::Default, Language::En) => "Did this help?",
        (FollowUpCategory::Default, Language::Hi) => "क्या यह मददगार था?",
    }
}
