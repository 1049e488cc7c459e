/// Convenience result type used across the crate.
pub type PortraitResult<T> = Result<T, PortraitError>;

/// Top-level error taxonomy shared by the image store, render pipeline, repository and history.
#[derive(thiserror::Error, Debug)]
pub enum PortraitError {
    /// A source image, frame asset, slot or project could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// Image bytes are corrupt or use an unsupported encoding.
    #[error("decode error: {0}")]
    Decode(String),

    /// A filesystem copy, write, move or read failed.
    #[error("io failure: {context}")]
    IoFailure {
        /// What was being attempted.
        context: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Every slot in the project pool is occupied.
    #[error("project pool exhausted: all {0} slots are occupied")]
    PoolExhausted(usize),

    /// An undo/redo target cannot be applied because its location is occupied or gone.
    #[error("stale undo: {0}")]
    StaleUndo(String),

    /// The background-removal model is not installed or could not be initialized.
    #[error("background removal unavailable: {0}")]
    ModelUnavailable(String),

    /// Invalid user-provided parameters.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing project metadata or configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PortraitError {
    /// Build a [`PortraitError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`PortraitError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`PortraitError::IoFailure`] value from an OS error and a short context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoFailure {
            context: context.into(),
            source,
        }
    }

    /// Build a [`PortraitError::StaleUndo`] value.
    pub fn stale_undo(msg: impl Into<String>) -> Self {
        Self::StaleUndo(msg.into())
    }

    /// Build a [`PortraitError::ModelUnavailable`] value.
    pub fn model_unavailable(msg: impl Into<String>) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Build a [`PortraitError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PortraitError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that mean "nothing there", as opposed to a broken operation.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<serde_json::Error> for PortraitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
