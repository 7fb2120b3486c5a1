pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid dialog state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Text shown in the blocking alert when an action fails.
    pub fn user_message(&self) -> String {
        match self {
            Error::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            Error::Api { status, .. } => format!("Request failed with status {}", status),
            Error::Reqwest(err) if err.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            Error::Reqwest(err) if err.is_connect() => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            Error::Validation(errors) => validation_summary(errors),
            Error::UnexpectedResponse(_) | Error::Json(_) => {
                "The server sent a response that could not be read.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Api { status: 404, .. })
    }
}

fn validation_summary(errors: &validator::ValidationErrors) -> String {
    let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
    fields.sort_unstable();
    if fields.is_empty() {
        return "Please check the form and try again.".to_string();
    }
    format!("Please fill in: {}", fields.join(", "))
}
