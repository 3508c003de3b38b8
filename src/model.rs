use burn::{nn::Initializer, prelude::*};
use tracing::{debug, trace};

use crate::{
    decoder::{DecoderBlock, DecoderBlockConfig, DoubleConv, DoubleConvConfig},
    encoder::{EncoderBlock, EncoderBlockConfig},
    resize::resize_bilinear,
    segmentation_head::{SegmentationHead, SegmentationHeadConfig},
    Mode, UNetError,
};

/// UNet with bilinear skip reconciliation.
///
/// Encoder features are resized to the running decoder resolution before each
/// concatenation, so inputs of any size (odd sizes included) are accepted and
/// the outputs are resized back to the input resolution.
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    pub(crate) enc1: EncoderBlock<B>,
    pub(crate) enc2: EncoderBlock<B>,
    pub(crate) enc3: EncoderBlock<B>,
    pub(crate) enc4: EncoderBlock<B>,
    pub(crate) center: DecoderBlock<B>,
    pub(crate) dec4: DecoderBlock<B>,
    pub(crate) dec3: DecoderBlock<B>,
    pub(crate) dec2: DecoderBlock<B>,
    pub(crate) dec1: DoubleConv<B>,
    pub(crate) head: SegmentationHead<B>,
}

/// Class scores together with the decoder feature maps.
///
/// Every tensor has the spatial size of the input.
#[derive(Debug, Clone)]
pub struct UNetFeatures<B: Backend> {
    pub logits: Tensor<B, 4>,
    pub dec1: Tensor<B, 4>,
    pub dec2: Tensor<B, 4>,
    pub dec3: Tensor<B, 4>,
    pub dec4: Tensor<B, 4>,
}

impl<B: Backend> UNet<B> {
    /// # Shapes
    /// - input: `[batch, input_channels, height, width]`
    /// - output: `[batch, head_channels, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>, mode: Mode) -> Tensor<B, 4> {
        let [_, _, height, width] = x.dims();
        let stages = self.forward_stages(x, mode);
        resize_bilinear(stages.logits, [height, width])
    }

    /// Same as [forward](Self::forward), also returning dec1..dec4.
    pub fn forward_features(&self, x: Tensor<B, 4>, mode: Mode) -> UNetFeatures<B> {
        let [_, _, height, width] = x.dims();
        let stages = self.forward_stages(x, mode);
        UNetFeatures {
            logits: resize_bilinear(stages.logits, [height, width]),
            dec1: resize_bilinear(stages.dec1, [height, width]),
            dec2: resize_bilinear(stages.dec2, [height, width]),
            dec3: resize_bilinear(stages.dec3, [height, width]),
            dec4: resize_bilinear(stages.dec4, [height, width]),
        }
    }

    /// Number of channels produced per pixel.
    pub fn out_channels(&self) -> usize {
        self.head.out_channels()
    }

    /// Runs the network, leaving every output at its native resolution.
    fn forward_stages(&self, x: Tensor<B, 4>, mode: Mode) -> UNetFeatures<B> {
        trace!(stage = "input", dims = ?x.dims());

        let enc1 = self.enc1.forward(x, mode);
        trace!(stage = "enc1", dims = ?enc1.dims());
        let enc2 = self.enc2.forward(enc1.clone(), mode);
        trace!(stage = "enc2", dims = ?enc2.dims());
        let enc3 = self.enc3.forward(enc2.clone(), mode);
        trace!(stage = "enc3", dims = ?enc3.dims());
        let enc4 = self.enc4.forward(enc3.clone(), mode);
        trace!(stage = "enc4", dims = ?enc4.dims());

        let center = self.center.forward(enc4.clone(), mode);
        trace!(stage = "center", dims = ?center.dims());

        let dec4 = self.dec4.forward(concat_skip(center, enc4), mode);
        trace!(stage = "dec4", dims = ?dec4.dims());
        let dec3 = self.dec3.forward(concat_skip(dec4.clone(), enc3), mode);
        trace!(stage = "dec3", dims = ?dec3.dims());
        let dec2 = self.dec2.forward(concat_skip(dec3.clone(), enc2), mode);
        trace!(stage = "dec2", dims = ?dec2.dims());
        let dec1 = self.dec1.forward(concat_skip(dec2.clone(), enc1), mode);
        trace!(stage = "dec1", dims = ?dec1.dims());

        let logits = self.head.forward(dec1.clone());
        trace!(stage = "final", dims = ?logits.dims());

        UNetFeatures {
            logits,
            dec1,
            dec2,
            dec3,
            dec4,
        }
    }
}

/// Concatenates `[decoder, encoder]` along channels after resizing the encoder
/// feature map to the decoder's spatial size.
fn concat_skip<B: Backend>(decoder: Tensor<B, 4>, encoder: Tensor<B, 4>) -> Tensor<B, 4> {
    let [_, _, height, width] = decoder.dims();
    let encoder = resize_bilinear(encoder, [height, width]);
    Tensor::cat(vec![decoder, encoder], 1)
}

#[derive(Config, Debug)]
pub struct UNetConfig {
    pub input_channels: usize,
    pub num_classes: usize,
    /// Classes left out of the output head. Only the count is used.
    pub hidden_classes: Option<Vec<usize>>,
    /// Width of the first encoder stage; stage `k` has `base_channels << k` channels.
    #[config(default = 64)]
    pub base_channels: usize,
    #[config(default = 0.5)]
    pub dropout: f64,
    #[config(
        default = "Initializer::KaimingNormal { gain: core::f64::consts::SQRT_2, fan_out_only: false }"
    )]
    pub initializer: Initializer,
}

impl UNetConfig {
    /// Output channels of the classification head.
    pub fn head_channels(&self) -> usize {
        let hidden = self.hidden_classes.as_ref().map_or(0, Vec::len);
        self.num_classes.saturating_sub(hidden)
    }

    pub fn validate(&self) -> Result<(), UNetError> {
        for (field, value) in [
            ("input_channels", self.input_channels),
            ("num_classes", self.num_classes),
            ("base_channels", self.base_channels),
        ] {
            if value == 0 {
                return Err(UNetError::ZeroChannels { field });
            }
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(UNetError::InvalidDropout { prob: self.dropout });
        }

        if self.head_channels() == 0 {
            return Err(UNetError::HiddenClassesExceedClasses {
                hidden: self.hidden_classes.as_ref().map_or(0, Vec::len),
                classes: self.num_classes,
            });
        }

        Ok(())
    }

    /// Returns the initialized model.
    ///
    /// # Panics
    /// If the configuration is invalid, see [validate](Self::validate).
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        match self.try_init(device) {
            Ok(model) => model,
            Err(err) => panic!("invalid UNet configuration: {err}"),
        }
    }

    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<UNet<B>, UNetError> {
        self.validate()?;

        let channels: [usize; 5] = core::array::from_fn(|stage| self.base_channels << stage);
        let [c1, c2, c3, c4, c5] = channels;

        let encoder = |in_channels, out_channels, use_dropout| {
            EncoderBlockConfig::new(in_channels, out_channels)
                .with_use_dropout(use_dropout)
                .with_dropout(self.dropout)
                .with_initializer(self.initializer.clone())
                .init(device)
        };
        let decoder = |in_channels, middle_channels, out_channels| {
            DecoderBlockConfig::new(in_channels, middle_channels, out_channels)
                .with_dropout(self.dropout)
                .with_initializer(self.initializer.clone())
                .init(device)
        };

        let model = UNet {
            enc1: encoder(self.input_channels, c1, false),
            enc2: encoder(c1, c2, false),
            enc3: encoder(c2, c3, false),
            enc4: encoder(c3, c4, true),
            center: decoder(c4, c5, c4),
            dec4: decoder(c5, c4, c3),
            dec3: decoder(c4, c3, c2),
            dec2: decoder(c3, c2, c1),
            dec1: DoubleConvConfig::new(c2, c1)
                .with_dropout(self.dropout)
                .with_initializer(self.initializer.clone())
                .init(device),
            head: SegmentationHeadConfig::new(c1, self.head_channels())
                .with_initializer(self.initializer.clone())
                .init(device),
        };

        debug!(
            input_channels = self.input_channels,
            head_channels = self.head_channels(),
            ?channels,
            num_params = model.num_params(),
            "initialized UNet"
        );

        Ok(model)
    }
}
