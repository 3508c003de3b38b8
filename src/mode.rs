use burn::tensor::backend::Backend;

/// Execution mode threaded through every block of the network.
///
/// `Train` enables dropout and normalizes with batch statistics (updating the
/// running estimates); `Eval` disables dropout and normalizes with the running
/// estimates, so samples of a batch never influence each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    Train,
    #[default]
    Eval,
}

impl Mode {
    /// `Train` on autodiff backends, `Eval` otherwise.
    pub fn for_backend<B: Backend>() -> Self {
        if B::ad_enabled() {
            Self::Train
        } else {
            Self::Eval
        }
    }

    pub fn is_train(&self) -> bool {
        matches!(self, Self::Train)
    }
}
