//! Bilinear resizing with half-pixel centers.
//!
//! Source coordinates follow `src = (dst + 0.5) * in / out - 0.5`, clamped at
//! zero, as in PyTorch's `interpolate(mode="bilinear")` default. burn's
//! `interpolate` aligns corners instead, so the resize is expressed as two
//! interpolation matrices applied with `matmul`.

use burn::prelude::*;

/// Resize the spatial dimensions of `x` to `size`.
///
/// # Shapes
/// - input: `[batch, channels, height, width]`
/// - output: `[batch, channels, size[0], size[1]]`
pub fn resize_bilinear<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [batch, channels, height, width] = x.dims();
    let [out_height, out_width] = size;
    let device = x.device();

    let x = if out_height == height {
        x
    } else {
        let rows = interpolation_matrix::<B>(height, out_height, &device)
            .reshape([1, 1, out_height, height])
            .expand([batch, channels, out_height, height]);
        rows.matmul(x)
    };

    if out_width == width {
        x
    } else {
        let cols = interpolation_matrix::<B>(width, out_width, &device)
            .transpose()
            .reshape([1, 1, width, out_width])
            .expand([batch, channels, width, out_width]);
        x.matmul(cols)
    }
}

/// `[output, input]` matrix whose rows hold the two linear weights of each
/// output sample.
fn interpolation_matrix<B: Backend>(input: usize, output: usize, device: &B::Device) -> Tensor<B, 2> {
    let scale = input as f64 / output as f64;
    let mut weights = vec![0.0f32; output * input];

    for (dst, row) in weights.chunks_mut(input).enumerate() {
        let src = ((dst as f64 + 0.5) * scale - 0.5).max(0.0);
        let lo = (src.floor() as usize).min(input - 1);
        let hi = (lo + 1).min(input - 1);
        let frac = (src - lo as f64) as f32;

        row[lo] += 1.0 - frac;
        row[hi] += frac;
    }

    Tensor::from_data(TensorData::new(weights, [output, input]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray;

    fn assert_close(actual: Tensor<TestBackend, 4>, expected: &[f32]) {
        let actual = actual.into_data().to_vec::<f32>().unwrap();
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn upsamples_with_half_pixel_centers() {
        let device = NdArrayDevice::default();
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0], &device).reshape([1, 1, 1, 2]);

        // torch.nn.functional.interpolate(..., mode="bilinear") -> [1.0, 1.25, 1.75, 2.0]
        assert_close(resize_bilinear(x, [1, 4]), &[1.0, 1.25, 1.75, 2.0]);
    }

    #[test]
    fn downsamples_with_half_pixel_centers() {
        let device = NdArrayDevice::default();
        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0, 5.0], &device)
            .reshape([1, 1, 5, 1]);

        // torch.nn.functional.interpolate(..., mode="bilinear") -> [1.75, 4.25]
        assert_close(resize_bilinear(x, [2, 1]), &[1.75, 4.25]);
    }

    #[test]
    fn resizes_both_axes_per_channel() {
        let device = NdArrayDevice::default();
        let x = Tensor::<TestBackend, 1>::from_floats(
            [0.0, 1.0, 2.0, 3.0, 10.0, 20.0, 30.0, 40.0],
            &device,
        )
        .reshape([1, 2, 2, 2]);

        let y = resize_bilinear(x, [3, 3]);

        assert_eq!(y.dims(), [1, 2, 3, 3]);
        // Rows/cols sample at [0, 0.5, 1] for a 2 -> 3 resize.
        assert_close(
            y,
            &[
                0.0, 0.5, 1.0, 1.0, 1.5, 2.0, 2.0, 2.5, 3.0, //
                10.0, 15.0, 20.0, 20.0, 25.0, 30.0, 30.0, 35.0, 40.0,
            ],
        );
    }

    #[test]
    fn same_size_is_identity() {
        let device = NdArrayDevice::default();
        let x = Tensor::<TestBackend, 4>::random(
            [2, 3, 5, 7],
            burn::tensor::Distribution::Default,
            &device,
        );

        let diff = (resize_bilinear(x.clone(), [5, 7]) - x).abs().sum();
        assert_eq!(diff.into_scalar(), 0.0);
    }
}
