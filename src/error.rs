// src/error.rs
use std::fmt;

#[derive(Debug)]
pub enum JobError {
    /// Missing or malformed job input (holdings file, image file).
    Input(String),
    /// Transport failure, non-success status or unusable pricing response.
    Http(String),
    /// A portfolio ticker had no quote in the pricing response.
    MissingQuote(String),
    /// Missing or malformed model artifact, or a shape mismatch while running it.
    Model(String),
    /// The label list does not line up with the model output, in size or order.
    LabelMismatch(String),
    /// Failure writing the report.
    Output(String),
}

pub type Result<T> = std::result::Result<T, JobError>;

impl JobError {
    pub fn input(message: impl Into<String>) -> Self {
        JobError::Input(message.into())
    }

    pub fn http(message: impl Into<String>) -> Self {
        JobError::Http(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        JobError::Model(message.into())
    }

    pub fn label_mismatch(labels: usize, outputs: usize) -> Self {
        JobError::LabelMismatch(format!(
            "label list has {} entries but the model produces {} scores",
            labels, outputs
        ))
    }

    pub fn output(message: impl Into<String>) -> Self {
        JobError::Output(message.into())
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Input(message) => write!(f, "invalid input: {}", message),
            JobError::Http(message) => write!(f, "pricing request failed: {}", message),
            JobError::MissingQuote(ticker) => write!(f, "no quote returned for {}", ticker),
            JobError::Model(message) => write!(f, "model error: {}", message),
            JobError::LabelMismatch(message) => write!(f, "label mismatch: {}", message),
            JobError::Output(message) => write!(f, "failed to write report: {}", message),
        }
    }
}

impl std::error::Error for JobError {}

impl From<reqwest::Error> for JobError {
    fn from(e: reqwest::Error) -> Self {
        JobError::Http(e.to_string())
    }
}

impl From<image::ImageError> for JobError {
    fn from(e: image::ImageError) -> Self {
        JobError::Input(format!("unreadable image: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_mismatch_names_both_sizes() {
        assert_eq!(
            JobError::label_mismatch(7, 5).to_string(),
            "label mismatch: label list has 7 entries but the model produces 5 scores"
        );
    }

    #[test]
    fn missing_quote_names_ticker() {
        assert_eq!(
            JobError::MissingQuote("DOGE".into()).to_string(),
            "no quote returned for DOGE"
        );
    }
}
