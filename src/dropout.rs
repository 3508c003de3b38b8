use burn::{prelude::*, tensor::Distribution};

use crate::Mode;

/// [Dropout](Dropout) configuration.
#[derive(Config, Debug)]
pub struct DropoutConfig {
    /// Probability of zeroing an element (or a whole channel).
    #[config(default = 0.5)]
    pub prob: f64,
    /// Drop entire feature maps instead of single elements.
    #[config(default = false)]
    pub channel_wise: bool,
}

impl DropoutConfig {
    pub fn init(&self) -> Dropout {
        Dropout {
            prob: self.prob,
            channel_wise: self.channel_wise,
        }
    }
}

/// Inverted dropout gated by an explicit [Mode].
///
/// With `channel_wise` set the mask has shape `[batch, channels, 1, ...]` and
/// is broadcast over the spatial dimensions.
#[derive(Module, Clone, Debug)]
pub struct Dropout {
    prob: f64,
    channel_wise: bool,
}

impl Dropout {
    pub fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>, mode: Mode) -> Tensor<B, D> {
        if !mode.is_train() || self.prob == 0.0 {
            return x;
        }
        let keep_prob = 1.0 - self.prob;

        let mut mask_shape = x.dims();
        if self.channel_wise {
            mask_shape.iter_mut().skip(2).for_each(|dim| *dim = 1);
        }

        let mask = Tensor::random(mask_shape, Distribution::Bernoulli(keep_prob), &x.device());
        x * mask / keep_prob
    }
}
