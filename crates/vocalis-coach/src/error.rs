use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoachError {
    /// A required credential is absent. Permanent for the client instance.
    #[error("missing Vapi credential: {0}")]
    CredentialsMissing(&'static str),

    /// Non-2xx status, network failure, timeout, or malformed payload.
    #[error("remote agent unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("no usable content found in agent response")]
    ExtractionMiss,
}

impl From<reqwest::Error> for CoachError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CoachError::RemoteUnavailable(format!("request timed out: {}", err))
        } else {
            CoachError::RemoteUnavailable(err.to_string())
        }
    }
}
