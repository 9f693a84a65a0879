#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use imbridge_tensor as tensor;

#[doc(inline)]
pub use imbridge_image as image;

#[doc(inline)]
pub use imbridge_io as io;
