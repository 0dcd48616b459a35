use dshop_engine::traits::CollaboratorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The request timed out: {0}")]
    Timeout(String),
    #[error("Invalid request: {0}")]
    RequestError(String),
    #[error("Invalid response: {0}")]
    ResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for IntegrationError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IntegrationError::Timeout(e.to_string())
        } else if e.is_decode() {
            IntegrationError::JsonError(e.to_string())
        } else if e.is_builder() {
            IntegrationError::RequestError(e.to_string())
        } else {
            IntegrationError::ResponseError(e.to_string())
        }
    }
}

impl From<IntegrationError> for CollaboratorError {
    fn from(e: IntegrationError) -> Self {
        match e {
            IntegrationError::Timeout(s) => CollaboratorError::Timeout(s),
            IntegrationError::JsonError(s) => CollaboratorError::InvalidResponse(s),
            IntegrationError::QueryError { status, message } if (400..500).contains(&status) => {
                CollaboratorError::Rejected(format!("Error {status}. {message}"))
            },
            e @ IntegrationError::NotConfigured(_) => CollaboratorError::Rejected(e.to_string()),
            e => CollaboratorError::Unavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn client_errors_are_rejections() {
        let err = CollaboratorError::from(IntegrationError::QueryError { status: 404, message: "Unknown".into() });
        assert!(matches!(err, CollaboratorError::Rejected(_)));
        let err = CollaboratorError::from(IntegrationError::QueryError { status: 503, message: "Busy".into() });
        assert!(matches!(err, CollaboratorError::Unavailable(_)));
        let err = CollaboratorError::from(IntegrationError::Timeout("30s".into()));
        assert!(matches!(err, CollaboratorError::Timeout(_)));
    }
}
