use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        BatchNorm, BatchNormConfig, Initializer, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::Mode;

/// Convolution, batch normalization and ReLU.
#[derive(Module, Debug)]
pub struct Conv2dReLU<B: Backend> {
    pub(crate) conv: Conv2d<B>,
    pub(crate) norm: BatchNorm<B, 2>,
    relu: Relu,
}

impl<B: Backend> Conv2dReLU<B> {
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.normalize(x, mode);
        self.relu.forward(x)
    }

    /// Batch normalization driven by `mode` instead of the backend.
    fn normalize(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let [batch, channels, height, width] = x.dims();
        let stat_shape = [1, channels, 1, 1];

        let (mean, var) = match mode {
            Mode::Train => {
                let mean = x.clone().mean_dim(0).mean_dim(2).mean_dim(3);
                let var = (x.clone() - mean.clone())
                    .powf_scalar(2.0)
                    .mean_dim(0)
                    .mean_dim(2)
                    .mean_dim(3);
                self.update_running_stats(mean.clone(), var.clone(), batch * height * width);
                (mean, var)
            }
            Mode::Eval => (
                self.norm.running_mean.value_sync().reshape(stat_shape),
                self.norm.running_var.value_sync().reshape(stat_shape),
            ),
        };

        let gamma = self.norm.gamma.val().reshape(stat_shape);
        let beta = self.norm.beta.val().reshape(stat_shape);

        (x - mean) / (var + self.norm.epsilon).sqrt() * gamma + beta
    }

    /// Exponential moving average of the batch statistics; the variance is
    /// stored unbiased.
    fn update_running_stats(&self, mean: Tensor<B, 4>, var: Tensor<B, 4>, count: usize) {
        let channels = mean.dims()[1];
        let momentum = self.norm.momentum;
        let correction = if count > 1 {
            count as f64 / (count - 1) as f64
        } else {
            1.0
        };

        let mean = mean.detach().reshape([channels]);
        let var = var.detach().reshape([channels]).mul_scalar(correction);

        let running_mean = self.norm.running_mean.value_sync();
        let running_var = self.norm.running_var.value_sync();

        self.norm.running_mean.update(
            running_mean
                .mul_scalar(1.0 - momentum)
                .add(mean.mul_scalar(momentum)),
        );
        self.norm.running_var.update(
            running_var
                .mul_scalar(1.0 - momentum)
                .add(var.mul_scalar(momentum)),
        );
    }
}

#[derive(Config, Debug)]
pub struct Conv2dReLUConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "[3, 3]")]
    kernel_size: [usize; 2],
    #[config(default = "PaddingConfig2d::Explicit(1, 1)")]
    padding: PaddingConfig2d,
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    initializer: Initializer,
}

impl Conv2dReLUConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv2dReLU<B> {
        Conv2dReLU {
            conv: Conv2dConfig::new([self.in_channels, self.out_channels], self.kernel_size)
                .with_padding(self.padding.clone())
                .with_initializer(self.initializer.clone())
                .init(device),
            norm: BatchNormConfig::new(self.out_channels).init(device),
            relu: Relu::new(),
        }
    }
}
