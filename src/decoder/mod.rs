mod block;
mod double_conv;

pub use block::*;
pub use double_conv::*;
