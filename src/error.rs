use thiserror::Error;

/// Errors raised while configuring or loading a [UNet](crate::UNet).
#[derive(Debug, Error)]
pub enum UNetError {
    /// The hidden-class set leaves no output channel for the head.
    #[error("{hidden} hidden classes leave no output channel out of {classes} classes")]
    HiddenClassesExceedClasses { hidden: usize, classes: usize },

    /// A channel count that must be positive was zero.
    #[error("`{field}` must be greater than zero")]
    ZeroChannels { field: &'static str },

    /// Dropout probability outside `[0, 1)`.
    #[error("dropout probability must be in [0, 1), got {prob}")]
    InvalidDropout { prob: f64 },

    /// PyTorch weight import failed.
    #[error("failed to load model weights: {reason}")]
    Weights { reason: String },
}
