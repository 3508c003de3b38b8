use burn::{
    nn::{
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
        Initializer,
    },
    prelude::*,
};

use super::double_conv::{DoubleConv, DoubleConvConfig};
use crate::Mode;

/// [DoubleConv] followed by a learned 2x upsampling.
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub(crate) convs: DoubleConv<B>,
    pub(crate) up: ConvTranspose2d<B>,
}

impl<B: Backend> DecoderBlock<B> {
    /// # Shapes
    /// - input: `[batch, in_channels, height, width]`
    /// - output: `[batch, out_channels, 2 * height, 2 * width]`
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.convs.forward(x, mode);
        self.up.forward(x)
    }
}

#[derive(Config, Debug)]
pub struct DecoderBlockConfig {
    in_channels: usize,
    middle_channels: usize,
    out_channels: usize,
    #[config(default = 0.5)]
    dropout: f64,
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    initializer: Initializer,
}

impl DecoderBlockConfig {
    /// Returns the initialized block.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            convs: DoubleConvConfig::new(self.in_channels, self.middle_channels)
                .with_dropout(self.dropout)
                .with_initializer(self.initializer.clone())
                .init(device),
            up: ConvTranspose2dConfig::new([self.middle_channels, self.out_channels], [2, 2])
                .with_stride([2, 2])
                .with_initializer(self.initializer.clone())
                .init(device),
        }
    }
}
