//! Report generation via the Google generative-language API.
//!
//! The service's only outbound dependency: given a company name, build a
//! research prompt, send it to the `generateContent` endpoint, and extract
//! the generated report text. The tracking core only cares about this call's
//! start and end instants, never its content.

mod client;
mod prompt;

pub use client::GenerativeClient;
pub use prompt::research_prompt;
