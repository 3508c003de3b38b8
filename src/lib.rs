mod conv2drelu;
pub use conv2drelu::{Conv2dReLU, Conv2dReLUConfig};

pub mod decoder;
pub mod encoder;
pub mod segmentation_head;

mod dropout;
pub use dropout::{Dropout, DropoutConfig};

mod error;
pub use error::UNetError;

mod mode;
pub use mode::Mode;

mod model;
pub use model::*;

mod resize;
pub use resize::resize_bilinear;

#[cfg(feature = "pretrained")]
mod weights;
#[cfg(feature = "pretrained")]
pub use weights::load_pytorch_record;
