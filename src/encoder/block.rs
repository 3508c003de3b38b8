use burn::{
    nn::{
        pool::{MaxPool2d, MaxPool2dConfig},
        Initializer,
    },
    prelude::*,
};

use crate::{
    conv2drelu::{Conv2dReLU, Conv2dReLUConfig},
    Dropout, DropoutConfig, Mode,
};

/// Two conv/norm/ReLU stages followed by 2x2 max pooling.
///
/// Odd spatial sizes are floored by the pooling stage.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub(crate) conv1: Conv2dReLU<B>,
    pub(crate) conv2: Conv2dReLU<B>,
    dropout: Option<Dropout>,
    pool: MaxPool2d,
}

impl<B: Backend> EncoderBlock<B> {
    /// # Shapes
    /// - input: `[batch, in_channels, height, width]`
    /// - output: `[batch, out_channels, height / 2, width / 2]`
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.conv1.forward(x, mode);
        let mut x = self.conv2.forward(x, mode);

        if let Some(ref dropout) = self.dropout {
            x = dropout.forward(x, mode);
        }

        self.pool.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = false)]
    use_dropout: bool,
    #[config(default = 0.5)]
    dropout: f64,
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    initializer: Initializer,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            conv1: Conv2dReLUConfig::new(self.in_channels, self.out_channels)
                .with_initializer(self.initializer.clone())
                .init(device),
            conv2: Conv2dReLUConfig::new(self.out_channels, self.out_channels)
                .with_initializer(self.initializer.clone())
                .init(device),
            dropout: self
                .use_dropout
                .then(|| DropoutConfig::new().with_prob(self.dropout).init()),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::Distribution,
    };

    type TestBackend = NdArray;

    #[test]
    fn halves_even_resolution() {
        let device = NdArrayDevice::default();
        let block = EncoderBlockConfig::new(3, 8).init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random([2, 3, 16, 12], Distribution::Default, &device);

        assert_eq!(block.forward(x, Mode::Eval).dims(), [2, 8, 8, 6]);
    }

    #[test]
    fn floors_odd_resolution() {
        let device = NdArrayDevice::default();
        let block = EncoderBlockConfig::new(3, 4)
            .with_use_dropout(true)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random([1, 3, 13, 9], Distribution::Default, &device);

        assert_eq!(block.forward(x, Mode::Train).dims(), [1, 4, 6, 4]);
    }

    #[test]
    fn eval_mode_is_deterministic() {
        let device = NdArrayDevice::default();
        let block = EncoderBlockConfig::new(2, 4)
            .with_use_dropout(true)
            .init::<TestBackend>(&device);
        let x = Tensor::<TestBackend, 4>::random([1, 2, 8, 8], Distribution::Default, &device);

        let first = block.forward(x.clone(), Mode::Eval);
        let second = block.forward(x, Mode::Eval);

        assert_eq!((first - second).abs().sum().into_scalar(), 0.0);
    }
}
