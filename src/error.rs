pub type BanderoleResult<T> = Result<T, BanderoleError>;

#[derive(thiserror::Error, Debug)]
pub enum BanderoleError {
    /// The requested video could not be found or materialized locally.
    ///
    /// Remote fetch failures (timeout, non-zero exit, undersized payload) fold
    /// into this variant: the caller cannot usefully distinguish "does not
    /// exist" from "could not be fetched".
    #[error("video '{name}' not found (searched {searched})")]
    VideoNotFound { name: String, searched: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BanderoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }

    pub fn not_found(name: impl Into<String>, searched: impl Into<String>) -> Self {
        Self::VideoNotFound {
            name: name.into(),
            searched: searched.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            BanderoleError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            BanderoleError::pipeline("x")
                .to_string()
                .contains("pipeline error:")
        );
    }

    #[test]
    fn not_found_carries_name_and_location() {
        let err = BanderoleError::not_found("high-low", "/srv/library");
        let msg = err.to_string();
        assert!(msg.contains("high-low"));
        assert!(msg.contains("/srv/library"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = BanderoleError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
