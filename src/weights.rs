use std::path::Path;

use burn::{
    module::Module,
    record::{FullPrecisionSettings, Recorder},
    tensor::{backend::Backend, Device},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use tracing::info;

use crate::{UNet, UNetError, UNetRecord};

/// Maps `nn.Sequential` indices of the PyTorch reference model onto named fields.
///
/// Applied in order, so the data-parallel prefix is stripped first. BatchNorm
/// `weight`/`bias` are renamed to `gamma`/`beta` by the PyTorch adapter.
const KEY_REMAPS: [(&str, &str); 15] = [
    ("^module\\.(.+)", "$1"),
    // enc[i].encode.{0,1,3,4}
    ("^(enc[1-4])\\.encode\\.0\\.(.+)", "$1.conv1.conv.$2"),
    ("^(enc[1-4])\\.encode\\.1\\.(.+)", "$1.conv1.norm.$2"),
    ("^(enc[1-4])\\.encode\\.3\\.(.+)", "$1.conv2.conv.$2"),
    ("^(enc[1-4])\\.encode\\.4\\.(.+)", "$1.conv2.norm.$2"),
    // center / dec[2-4].decode.{1,2,4,5,7}
    ("^(center|dec[2-4])\\.decode\\.1\\.(.+)", "$1.convs.conv1.conv.$2"),
    ("^(center|dec[2-4])\\.decode\\.2\\.(.+)", "$1.convs.conv1.norm.$2"),
    ("^(center|dec[2-4])\\.decode\\.4\\.(.+)", "$1.convs.conv2.conv.$2"),
    ("^(center|dec[2-4])\\.decode\\.5\\.(.+)", "$1.convs.conv2.norm.$2"),
    ("^(center|dec[2-4])\\.decode\\.7\\.(.+)", "$1.up.$2"),
    // dec1.{1,2,4,5}
    ("^dec1\\.1\\.(.+)", "dec1.conv1.conv.$1"),
    ("^dec1\\.2\\.(.+)", "dec1.conv1.norm.$1"),
    ("^dec1\\.4\\.(.+)", "dec1.conv2.conv.$1"),
    ("^dec1\\.5\\.(.+)", "dec1.conv2.norm.$1"),
    ("^final\\.(.+)", "head.conv.$1"),
];

/// Load a PyTorch `state_dict` of the reference network as a record.
pub fn load_pytorch_record<B: Backend, P: AsRef<Path>>(
    torch_weights: P,
    device: &Device<B>,
) -> Result<UNetRecord<B>, UNetError> {
    let load_args = KEY_REMAPS.iter().fold(
        LoadArgs::new(torch_weights.as_ref().into()),
        |args, (pattern, replacement)| args.with_key_remap(pattern, replacement),
    );

    PyTorchFileRecorder::<FullPrecisionSettings>::new()
        .load(load_args, device)
        .map_err(|err| UNetError::Weights {
            reason: err.to_string(),
        })
}

impl<B: Backend> UNet<B> {
    /// Replace the parameters with the ones stored in a PyTorch checkpoint.
    ///
    /// The model must have been built with the channel layout of the checkpoint.
    pub fn load_pytorch<P: AsRef<Path>>(
        self,
        torch_weights: P,
        device: &Device<B>,
    ) -> Result<Self, UNetError> {
        let path = torch_weights.as_ref();
        let record = load_pytorch_record(path, device)?;
        info!(path = %path.display(), "loaded PyTorch weights");
        Ok(self.load_record(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn remap(key: &str) -> String {
        KEY_REMAPS
            .iter()
            .fold(key.to_string(), |name, (pattern, replacement)| {
                let pattern = Regex::new(pattern).unwrap();
                pattern.replace_all(&name, *replacement).into_owned()
            })
    }

    #[test]
    fn encoder_keys_map_to_conv_and_norm_stages() {
        assert_eq!(remap("enc1.encode.0.weight"), "enc1.conv1.conv.weight");
        assert_eq!(remap("enc1.encode.1.running_var"), "enc1.conv1.norm.running_var");
        assert_eq!(remap("enc1.encode.3.bias"), "enc1.conv2.conv.bias");
        assert_eq!(remap("enc4.encode.4.weight"), "enc4.conv2.norm.weight");
    }

    #[test]
    fn decoder_keys_map_to_double_conv_and_upsampling() {
        assert_eq!(remap("center.decode.1.weight"), "center.convs.conv1.conv.weight");
        assert_eq!(remap("center.decode.2.bias"), "center.convs.conv1.norm.bias");
        assert_eq!(remap("center.decode.4.weight"), "center.convs.conv2.conv.weight");
        assert_eq!(
            remap("center.decode.5.running_mean"),
            "center.convs.conv2.norm.running_mean"
        );
        assert_eq!(remap("center.decode.7.weight"), "center.up.weight");
        assert_eq!(remap("dec4.decode.7.bias"), "dec4.up.bias");
        assert_eq!(remap("dec2.decode.4.bias"), "dec2.convs.conv2.conv.bias");
    }

    #[test]
    fn dec1_and_final_keys_map_to_named_fields() {
        assert_eq!(remap("dec1.1.weight"), "dec1.conv1.conv.weight");
        assert_eq!(remap("dec1.2.weight"), "dec1.conv1.norm.weight");
        assert_eq!(remap("dec1.4.bias"), "dec1.conv2.conv.bias");
        assert_eq!(remap("dec1.5.running_var"), "dec1.conv2.norm.running_var");
        assert_eq!(remap("final.weight"), "head.conv.weight");
        assert_eq!(remap("final.bias"), "head.conv.bias");
    }

    #[test]
    fn data_parallel_prefix_is_stripped() {
        assert_eq!(remap("module.enc2.encode.0.weight"), "enc2.conv1.conv.weight");
        assert_eq!(remap("module.dec3.decode.7.weight"), "dec3.up.weight");
        assert_eq!(remap("module.final.bias"), "head.conv.bias");
    }

    #[test]
    fn remapped_paths_exist_on_the_model() {
        use burn::backend::{ndarray::NdArrayDevice, NdArray};

        let device = NdArrayDevice::default();
        let model = crate::UNetConfig::new(3, 2)
            .with_base_channels(2)
            .init::<NdArray>(&device);

        // Field paths produced above, checked against the actual module tree.
        assert_eq!(model.enc1.conv1.conv.weight.dims(), [2, 3, 3, 3]);
        assert_eq!(model.enc4.conv2.norm.gamma.dims(), [16]);
        assert_eq!(model.center.convs.conv1.conv.weight.dims(), [32, 16, 3, 3]);
        assert_eq!(model.center.up.weight.dims(), [32, 16, 2, 2]);
        assert_eq!(model.dec1.conv2.norm.beta.dims(), [2]);
        assert_eq!(model.head.conv.weight.dims(), [2, 2, 1, 1]);
    }
}
