//! Heuristic Q/A parser over extracted document page text.
//!
//! A trimmed line ending in `?` starts a new question; subsequent lines
//! accumulate into the answer until the next question or the end of the
//! page. Heading-like lines (all uppercase) and bare URLs are skipped.

use std::sync::OnceLock;

use regex::Regex;

use crate::cache::FaqEntry;

fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Leading "1. ", "2) ", "3.1 " style numbering on question lines.
    RE.get_or_init(|| Regex::new(r"^[\d\.\)\s]+").unwrap())
}

/// True for lines that look like section headings rather than content.
fn is_heading(line: &str) -> bool {
    let mut has_alpha = false;
    for c in line.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if c.is_lowercase() {
                return false;
            }
        }
    }
    has_alpha
}

/// True for lines that are just a link.
fn is_url(line: &str) -> bool {
    line.starts_with("http://") || line.starts_with("https://")
}

/// Parse pages of extracted text into FAQ entries.
pub fn parse_faqs(pages: &[String]) -> Vec<FaqEntry> {
    let mut faqs = Vec::new();
    let mut question = String::new();
    let mut answer = String::new();

    for page in pages {
        for raw_line in page.lines() {
            let line = raw_line.trim();

            if line.is_empty() || is_heading(line) {
                continue;
            }

            if line.ends_with('?') {
                // Flush the previous pair before starting a new question.
                if !question.is_empty() && !answer.is_empty() {
                    faqs.push(FaqEntry {
                        question: std::mem::take(&mut question),
                        answer: answer.trim().to_string(),
                    });
                    answer.clear();
                }

                question = numbering_re().replace(line, "").to_string();
                answer.clear();
            } else if !question.is_empty() {
                if is_url(line) {
                    continue;
                }
                answer.push_str(line);
                answer.push(' ');
            }
        }

        // End of page: flush any complete pair.
        if !question.is_empty() && !answer.is_empty() {
            faqs.push(FaqEntry {
                question: std::mem::take(&mut question),
                answer: answer.trim().to_string(),
            });
            answer.clear();
        }
    }

    faqs
}
