use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limit exceeded. Retry after {}", fmt_retry_after(.retry_after_secs))]
    RateLimit { retry_after_secs: Option<u64> },

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error: {message}")]
    ApiFailure { message: String },

    #[error("Failed to write manifest {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

fn fmt_retry_after(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!("{}s", secs),
        None => "the default delay".to_string(),
    }
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn api_failure(message: &str) -> Self {
        Self::ApiFailure {
            message: message.to_string(),
        }
    }

    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DirectoryNotFound { path: path.into() }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Errors worth another upload attempt for the same file.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_)
                | AppError::RateLimit { .. }
                | AppError::Http { .. }
                | AppError::ApiFailure { .. }
                | AppError::Io(_)
                | AppError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_message_mentions_delay() {
        let err = AppError::RateLimit {
            retry_after_secs: Some(2),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded. Retry after 2s");

        let err = AppError::RateLimit {
            retry_after_secs: None,
        };
        assert!(err.to_string().contains("default delay"));
    }

    #[test]
    fn test_retryable_classification() {
        let transient = [
            AppError::Http {
                status: 500,
                body: String::new(),
            },
            AppError::api_failure("Upload failed"),
            AppError::RateLimit {
                retry_after_secs: None,
            },
        ];
        for err in &transient {
            assert!(err.is_retryable(), "{} should be retryable", err);
        }

        let persistence = AppError::persistence(
            "imgur_data.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        );
        assert!(!persistence.is_retryable());
        assert!(!AppError::Encoding("bad payload".to_string()).is_retryable());
        assert!(persistence.to_string().contains("imgur_data.json"));
    }
}
