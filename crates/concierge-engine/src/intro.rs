//! Lead capture: collect the visitor's name and email before answering.

use std::sync::Arc;

use tracing::debug;

use concierge_core::config::ValidationConfig;
use concierge_core::error::ConciergeError;
use concierge_core::types::Session;
use concierge_provider::LlmProvider;

use crate::validate;

/// Runs the introduction flow for one turn.
///
/// Extraction is model-driven; everything after it is deterministic so
/// the prompts the visitor sees never depend on model phrasing.
pub struct LeadCapture {
    llm: Arc<dyn LlmProvider>,
    validation: ValidationConfig,
    quick_replies: Vec<String>,
}

#[derive(Debug, Default)]
struct Extraction {
    name: Option<String>,
    email: Option<String>,
}

impl LeadCapture {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        validation: ValidationConfig,
        quick_replies: Vec<String>,
    ) -> Self {
        Self {
            llm,
            validation,
            quick_replies,
        }
    }

    /// Process one introducing-mode turn and produce the reply.
    ///
    /// Valid candidates merge stickily into the session; once both fields
    /// are present the session is promoted and the configured quick
    /// replies are attached.
    pub async fn handle(
        &self,
        session: &mut Session,
        user_text: &str,
    ) -> Result<String, ConciergeError> {
        let extracted = self.extract(user_text).await?;

        session.merge_name(extracted.name.as_deref());

        let mut email_rejected = None;
        if let Some(candidate) = extracted.email.as_deref() {
            let candidate = candidate.trim();
            if !candidate.is_empty() {
                if validate::validate_email(candidate, &self.validation).await {
                    session.merge_email(Some(candidate));
                } else {
                    debug!(session_id = %session.session_id, "rejected invalid email candidate");
                    email_rejected = Some(candidate.to_string());
                }
            }
        }

        if let Some(bad) = email_rejected {
            return Ok(format!(
                "Hmm, \"{}\" doesn't look like a valid email address. Could you double-check it?",
                bad
            ));
        }

        if session.lead_complete() {
            session.promote();
            session.quick_replies = self.quick_replies.clone();
            let name = session.name.clone().unwrap_or_default();
            return Ok(format!(
                "Thanks, {}! You're all set. What would you like to do next?",
                name
            ));
        }

        Ok(match (&session.name, &session.email) {
            (None, None) => {
                "Hi there! Before we get started, could you share your name and email address?"
                    .to_string()
            }
            (Some(name), None) => format!(
                "Thanks, {}! Could you also share your email address?",
                name
            ),
            (None, Some(email)) => format!(
                "Got your email as {}. Could you also share your name?",
                email
            ),
            (Some(_), Some(_)) => unreachable!("lead_complete handled above"),
        })
    }

    /// Structured extraction of name/email candidates from the message.
    /// Malformed model output is treated as an empty extraction.
    async fn extract(&self, user_text: &str) -> Result<Extraction, ConciergeError> {
        let prompt = format!(
            "Extract the person's name and email address from this message: {:?}. \
             Reply with a JSON object of the form \
             {{\"name\": \"...\", \"email\": \"...\"}} using empty strings for anything \
             not present. Do not invent values.",
            user_text
        );

        let value = self.llm.complete_json(&prompt).await?;

        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Extraction {
            name: field("name"),
            email: field("email"),
        })
    }
}
