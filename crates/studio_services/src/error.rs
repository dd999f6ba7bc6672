use thiserror::Error;

/// Input problems caught before any request leaves the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no knowledge base selected")]
    NoKnowledgeBase,
    #[error("a name is required")]
    EmptyName,
    #[error("expected a PDF file, got `{0}`")]
    NotPdf(String),
    #[error("expected an image file, got `{0}`")]
    NotImage(String),
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("a URL is required")]
    EmptyUrl,
    #[error("a title and content are required")]
    EmptyText,
    #[error("email and password are required")]
    MissingCredentials,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user not authenticated")]
    NotAuthenticated,
    #[error("{operation} failed: {source}")]
    Remote {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("{0}")]
    Extraction(String),
    #[error("{0}")]
    Agent(String),
}

impl ServiceError {
    pub fn remote(operation: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Remote { operation, source }
    }

    /// Text suitable for a toast description.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Remote { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn remote_errors_show_the_platform_message() {
        let err = ServiceError::remote("insert knowledge_items")(anyhow!("permission denied"));
        assert_eq!(err.user_message(), "permission denied");
        assert_eq!(
            err.to_string(),
            "insert knowledge_items failed: permission denied"
        );
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_converts_transparently() {
        let err: ServiceError = ValidationError::NotPdf("image/png".to_owned()).into();
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "expected a PDF file, got `image/png`");
    }
}
