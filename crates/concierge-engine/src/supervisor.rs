//! Turn routing: decide which flow owns the incoming message.

use std::sync::Arc;

use tracing::debug;

use concierge_core::types::{Branch, Mode, Session};
use concierge_provider::LlmProvider;

const CLASSIFY_PROMPT: &str = "Classify the user's message into exactly one of these \
    categories: services, projects, career. Reply with the single category word and \
    nothing else.";

/// Routing strategy for free-text messages in answering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    /// Deterministic: anything that is not a quick reply goes to Services.
    Menu,
    /// Model labels the message; unparseable output falls back.
    Llm,
}

impl Classifier {
    /// Parse the configured strategy name; unknown values mean Menu.
    pub fn from_config(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "llm" => Classifier::Llm,
            _ => Classifier::Menu,
        }
    }
}

/// Chooses the branch for each turn.
pub struct Supervisor {
    classifier: Classifier,
    llm: Arc<dyn LlmProvider>,
    fallback_message: String,
}

impl Supervisor {
    pub fn new(
        classifier: Classifier,
        llm: Arc<dyn LlmProvider>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            llm,
            fallback_message: fallback_message.into(),
        }
    }

    /// Pick the branch for this turn. Never fails: a broken classifier
    /// routes to `Fallback` instead of erroring.
    pub async fn classify(&self, session: &Session, user_text: &str) -> Branch {
        // Lead capture owns every turn until both fields are in.
        if session.mode == Mode::Introducing || !session.lead_complete() {
            return Branch::Introduction;
        }

        // Quick replies dispatch literally, no model involved.
        match user_text.trim().to_lowercase().as_str() {
            "explore services" | "start a project" => return Branch::Services,
            "looking for a job" => return Branch::Career,
            _ => {}
        }

        match self.classifier {
            Classifier::Menu => Branch::Services,
            Classifier::Llm => self.classify_with_llm(user_text).await,
        }
    }

    /// Fixed reply for unroutable messages. Touches no session state.
    pub fn fallback(&self) -> &str {
        &self.fallback_message
    }

    async fn classify_with_llm(&self, user_text: &str) -> Branch {
        let label = match self.llm.complete(CLASSIFY_PROMPT, &[], user_text).await {
            Ok(label) => label,
            Err(err) => {
                debug!(%err, "classifier call failed");
                return Branch::Fallback;
            }
        };

        // Strict parse: exactly one known label, nothing more.
        let label = label.trim().trim_matches(&['"', '.', '\''][..]).to_lowercase();
        match label.as_str() {
            "services" => Branch::Services,
            "projects" => Branch::Projects,
            "career" => Branch::Career,
            other => {
                debug!(label = %other, "classifier returned unknown label");
                Branch::Fallback
            }
        }
    }
}
