use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeRagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Corpus error: {0}")]
    Corpus(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ResumeRagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats() {
        let error = ResumeRagError::Config("no config file found".to_string());
        assert_eq!(error.to_string(), "Configuration error: no config file found");

        let error = ResumeRagError::Http("connection refused".to_string());
        assert_eq!(error.to_string(), "HTTP error: connection refused");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: ResumeRagError = io.into();
        assert!(matches!(error, ResumeRagError::Io(_)));
    }
}
