use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Initializer, PaddingConfig2d,
    },
    tensor::{backend::Backend, Tensor},
};

/// Per-pixel class projection producing raw logits.
#[derive(Module, Debug)]
pub struct SegmentationHead<B: Backend> {
    pub(crate) conv: Conv2d<B>,
}

impl<B: Backend> SegmentationHead<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(x)
    }

    pub fn out_channels(&self) -> usize {
        self.conv.weight.dims()[0]
    }
}

#[derive(Config, Debug)]
pub struct SegmentationHeadConfig {
    in_channels: usize,
    out_channels: usize,
    #[config(default = "[1, 1]")]
    kernel_size: [usize; 2],
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    initializer: Initializer,
}

impl SegmentationHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SegmentationHead<B> {
        SegmentationHead {
            conv: Conv2dConfig::new([self.in_channels, self.out_channels], self.kernel_size)
                .with_padding(PaddingConfig2d::Same)
                .with_initializer(self.initializer.clone())
                .init(device),
        }
    }
}
