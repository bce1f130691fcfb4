/// Errors returned by the marker locators.
///
/// A clean "no marker in this image" is not an error: both strategies
/// report it through their `Option` / [`crate::Detection::NotFound`] results.
#[derive(thiserror::Error, Debug)]
pub enum GcpError {
    #[error("failed to fetch classifier model '{model}': {source:#}")]
    ResourceFetch {
        model: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to parse classifier model '{model}': {reason}")]
    ModelParse { model: String, reason: String },
    #[error("classifier model '{model}' is not installed in the store")]
    ModelMissing { model: String },
    #[error("cascade strategy requested but no classifier store is configured")]
    CascadeUnavailable,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl GcpError {
    /// True for failures caused by classifier resources, which a caller may retry.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            GcpError::ResourceFetch { .. } | GcpError::ModelParse { .. } | GcpError::ModelMissing { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GcpError>;
