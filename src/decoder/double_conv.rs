use burn::{nn::Initializer, prelude::*};

use crate::{
    conv2drelu::{Conv2dReLU, Conv2dReLUConfig},
    Dropout, DropoutConfig, Mode,
};

/// Channel-wise dropout followed by two conv/norm/ReLU stages.
///
/// Spatial size is preserved.
#[derive(Module, Debug)]
pub struct DoubleConv<B: Backend> {
    dropout: Dropout,
    pub(crate) conv1: Conv2dReLU<B>,
    pub(crate) conv2: Conv2dReLU<B>,
}

impl<B: Backend> DoubleConv<B> {
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.dropout.forward(x, mode);
        let x = self.conv1.forward(x, mode);
        self.conv2.forward(x, mode)
    }
}

#[derive(Config, Debug)]
pub struct DoubleConvConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = 0.5)]
    dropout: f64,
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    initializer: Initializer,
}

impl DoubleConvConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DoubleConv<B> {
        DoubleConv {
            dropout: DropoutConfig::new()
                .with_prob(self.dropout)
                .with_channel_wise(true)
                .init(),
            conv1: Conv2dReLUConfig::new(self.in_channels, self.out_channels)
                .with_initializer(self.initializer.clone())
                .init(device),
            conv2: Conv2dReLUConfig::new(self.out_channels, self.out_channels)
                .with_initializer(self.initializer.clone())
                .init(device),
        }
    }
}
