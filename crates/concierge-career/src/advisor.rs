//! Query-aware job recommendation.

use std::sync::Arc;

use tracing::{debug, warn};

use concierge_provider::LlmProvider;

use crate::listings::{JobListing, JobSource};

const FETCH_FAILURE_MESSAGE: &str =
    "I'm sorry, I can't fetch our current openings right now. Please try again in a \
     little while, or check our careers page directly.";

const NO_OPENINGS_MESSAGE: &str =
    "We don't have any open positions at the moment, but new roles are posted regularly. \
     Please check back soon!";

/// The career branch reply: rendered text plus the structured listings
/// it mentions, so callers can surface them separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CareerReply {
    pub answer: String,
    pub jobs: Vec<JobListing>,
}

/// Matches a user's stated role and location against live listings.
pub struct CareerAdvisor {
    source: Arc<dyn JobSource>,
    llm: Arc<dyn LlmProvider>,
}

impl CareerAdvisor {
    pub fn new(source: Arc<dyn JobSource>, llm: Arc<dyn LlmProvider>) -> Self {
        Self { source, llm }
    }

    /// Answer a career question. Never fails: fetch or extraction
    /// problems degrade to a fixed notice with no listings attached.
    pub async fn respond(&self, question: &str) -> CareerReply {
        let jobs = match self.source.fetch_jobs().await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(%err, "job listings unavailable");
                return CareerReply {
                    answer: FETCH_FAILURE_MESSAGE.to_string(),
                    jobs: Vec::new(),
                };
            }
        };

        if jobs.is_empty() {
            return CareerReply {
                answer: NO_OPENINGS_MESSAGE.to_string(),
                jobs: Vec::new(),
            };
        }

        let (role, location) = self.extract_intent(question).await;
        let matches = filter_jobs(&jobs, &role, &location);

        if matches.is_empty() {
            // Nothing matched the stated role; show everything instead.
            let answer = format!(
                "I couldn't find an opening matching that, but here is everything we \
                 have right now:\n{}",
                render_listings(&jobs)
            );
            return CareerReply { answer, jobs };
        }

        let answer = format!(
            "Here are the openings that match:\n{}",
            render_listings(&matches)
        );
        CareerReply {
            answer,
            jobs: matches,
        }
    }

    /// Pull the desired role and location out of the question. Unusable
    /// model output means no filter, so every listing is shown.
    async fn extract_intent(&self, question: &str) -> (String, String) {
        let prompt = format!(
            "Extract the job role and location the user is asking about from this \
             message: {:?}. Reply with a JSON object of the form \
             {{\"jobrole\": \"...\", \"location\": \"...\"}} using empty strings for \
             anything not mentioned.",
            question
        );

        let value = match self.llm.complete_json(&prompt).await {
            Ok(v) => v,
            Err(err) => {
                debug!(%err, "intent extraction failed; listing all openings");
                return (String::new(), String::new());
            }
        };

        let field = |key: &str| {
            value
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string()
        };
        (field("jobrole"), field("location"))
    }
}

/// Case-insensitive substring filter on title and location. Empty
/// criteria match everything.
fn filter_jobs(jobs: &[JobListing], role: &str, location: &str) -> Vec<JobListing> {
    let role = role.to_lowercase();
    let location = location.to_lowercase();
    jobs.iter()
        .filter(|job| {
            (role.is_empty() || job.title.to_lowercase().contains(&role))
                && (location.is_empty() || job.location.to_lowercase().contains(&location))
        })
        .cloned()
        .collect()
}

fn render_listings(jobs: &[JobListing]) -> String {
    jobs.iter()
        .map(|job| {
            if job.location.is_empty() {
                format!("<a href=\"{}\">{}</a>", job.link, job.title)
            } else {
                format!("<a href=\"{}\">{}</a> ({})", job.link, job.title, job.location)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
