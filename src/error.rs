use thiserror::Error;

/// Failures produced while fetching feeds, analyzing articles or searching for research.
///
/// None of these are fatal to a batch: callers degrade a failed unit of work to an
/// empty or absent result and keep going.
#[derive(Error, Debug)]
pub enum Error {
    /// A feed or search request could not be completed.
    #[error("fetch failed for {target}: {reason}")]
    Fetch { target: String, reason: String },

    /// The completion endpoint failed or returned nothing.
    #[error("completion request failed: {0}")]
    Completion(String),

    /// Model output is not valid JSON after fence stripping.
    #[error("could not parse model output: {0}")]
    Parse(String),

    /// Model output parsed but does not have the required shape.
    #[error("model output failed validation: {0}")]
    Validation(String),

    /// A single feed entry carried nothing usable.
    #[error("unusable feed entry: {0}")]
    InvalidEntry(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn fetch(target: impl Into<String>, reason: impl ToString) -> Self {
        Error::Fetch {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
