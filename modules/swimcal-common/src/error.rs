use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwimCalError {
    #[error("Input text is too short or empty")]
    InputTooShort,

    #[error(
        "No calendar events found in the input text. Please ensure your input \
         contains schedule information with dates and times."
    )]
    NoEventsFound,

    #[error("Extraction service did not return valid structured data: {0}")]
    MalformedResponse(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
