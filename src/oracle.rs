//! The AI oracle seam: prompt text in, free text out.

use std::{future::Future, time::Duration};

/// Purpose tag sent along with every game question.
pub const PURPOSE_TWENTY_QUESTIONS: &str = "twentyquestions";

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
  #[error("oracle unavailable: {0}")]
  Unavailable(String),
  #[error("oracle request failed: {0}")]
  Request(String),
  #[error("oracle HTTP {status}: {message}")]
  Http { status: u16, message: String },
  #[error("oracle did not answer within {0:?}")]
  Timeout(Duration),
  #[error("oracle returned an empty response")]
  Empty,
}

impl From<reqwest::Error> for OracleError {
  fn from(e: reqwest::Error) -> Self {
    OracleError::Request(e.to_string())
  }
}

pub trait Oracle {
  fn request(&self, prompt: &str, purpose: &str) -> impl Future<Output = Result<String, OracleError>> + Send;
}

/// A missing oracle (no API key configured) fails every request.
impl<O: Oracle + Sync> Oracle for Option<O> {
  async fn request(&self, prompt: &str, purpose: &str) -> Result<String, OracleError> {
    match self {
      Some(o) => o.request(prompt, purpose).await,
      None => Err(OracleError::Unavailable("no AI provider configured".into())),
    }
  }
}
