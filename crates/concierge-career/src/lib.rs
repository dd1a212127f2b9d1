//! Career branch: live job listings and query-aware filtering.
//!
//! Fetches open positions from a tenant's careers page, extracts the
//! role the user is asking about, and replies with matching listings
//! as links. Fetch or parse failures degrade to a polite notice rather
//! than an error.

pub mod advisor;
pub mod listings;

pub use advisor::{CareerAdvisor, CareerReply};
pub use listings::{HttpJobSource, JobListing, JobSource, MockJobSource};
