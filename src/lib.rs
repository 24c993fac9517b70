//! # Animated GIF encoder
//!
//! Turns a sequence of equally sized RGBA frames into a looping GIF89a file.
//! All frames share one global color table built from the exact colors of the
//! input; pixels with low alpha map to a single transparent entry.
//!
//! ```
//! let frames = [[255u8, 0, 0, 255], [0, 0, 0, 0]];
//! let gif = gifanim::encode(1, 1, 200, &frames).unwrap();
//! assert_eq!(&gif[..6], b"GIF89a");
//! assert_eq!(gif.last(), Some(&0x3B));
//! ```

#[macro_use]
extern crate enum_primitive;

mod traits;
mod types;
mod writer;

pub use traits::{HasParameters, Parameter};
pub use types::{Block, DisposalMethod, Extension, Repeat};

pub use writer::{encode, AlphaThreshold, Delay, GifEncoder};
/// Lower level building blocks
pub use writer::{ColorKey, Encoder, EncodingError, ExtensionData, Palette, PaletteBuilder};
pub use writer::{lzw, palette};
