use std::borrow::Cow;
use std::io::prelude::*;

use log::debug;

use crate::traits::{HasParameters, Parameter};
use crate::types::Repeat;

mod encoder;
pub mod lzw;
pub mod palette;

pub use self::encoder::{Encoder, EncodingError, ExtensionData};
pub use self::palette::{ColorKey, Palette, PaletteBuilder};

/// Frame delay in milliseconds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Delay(pub u32);

impl Delay {
    /// Delay of one frame at `fps` frames per second, rounded to whole milliseconds.
    pub fn from_fps(fps: u32) -> Delay {
        let fps = fps.max(1);
        Delay((1000 + fps / 2) / fps)
    }

    /// GIF stores delays in hundredths of a second.
    pub fn centis(self) -> u16 {
        let cs = self.0 / 10 + u32::from(self.0 % 10 >= 5);
        cs.min(u32::from(u16::MAX)) as u16
    }
}

impl Default for Delay {
    fn default() -> Delay {
        Delay(100)
    }
}

/// Pixels with an alpha value below the threshold become transparent
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AlphaThreshold(pub u8);

impl Default for AlphaThreshold {
    fn default() -> AlphaThreshold {
        AlphaThreshold(palette::DEFAULT_ALPHA_THRESHOLD)
    }
}

impl<'a> Parameter<GifEncoder<'a>> for Delay {
    fn set_param(self, this: &mut GifEncoder<'a>) {
        this.delay = self
    }
}

impl<'a> Parameter<GifEncoder<'a>> for Repeat {
    fn set_param(self, this: &mut GifEncoder<'a>) {
        this.repeat = self
    }
}

impl<'a> Parameter<GifEncoder<'a>> for AlphaThreshold {
    fn set_param(self, this: &mut GifEncoder<'a>) {
        this.alpha_threshold = self
    }
}

/// Collects RGBA frames of one animation and encodes them into a GIF.
///
/// ```
/// use gifanim::{Delay, GifEncoder, HasParameters};
///
/// let red = [255u8, 0, 0, 255];
/// let blue = [0u8, 0, 255, 255];
/// let mut encoder = GifEncoder::new(1, 1);
/// encoder.set(Delay::from_fps(8));
/// encoder.add_frame(&red[..]).add_frame(&blue[..]);
/// let gif = encoder.encode().unwrap();
/// assert_eq!(&gif[..6], b"GIF89a");
/// ```
#[derive(Debug)]
pub struct GifEncoder<'a> {
    width: u16,
    height: u16,
    delay: Delay,
    repeat: Repeat,
    alpha_threshold: AlphaThreshold,
    frames: Vec<Cow<'a, [u8]>>,
}

impl<'a> HasParameters for GifEncoder<'a> {}

impl<'a> GifEncoder<'a> {
    pub fn new(width: u16, height: u16) -> GifEncoder<'a> {
        GifEncoder {
            width,
            height,
            delay: Delay::default(),
            repeat: Repeat::default(),
            alpha_threshold: AlphaThreshold::default(),
            frames: Vec::new(),
        }
    }

    /// Appends a frame of `width * height` RGBA pixels.
    pub fn add_frame<F: Into<Cow<'a, [u8]>>>(&mut self, frame: F) -> &mut Self {
        self.frames.push(frame.into());
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Encodes all frames into an in-memory GIF file.
    pub fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        self.encode_to(Vec::new())
    }

    /// Encodes all frames into `w`.
    ///
    /// Nothing is written if the frames are rejected.
    pub fn encode_to<W: Write>(&self, w: W) -> Result<W, EncodingError> {
        self.check_frames()?;
        let (palette, indexed) = palette::quantize(
            self.frames.iter().map(|frame| &frame[..]),
            self.alpha_threshold.0,
        );
        let delay = self.delay.centis();
        debug!(
            "encoding {} frames of {}x{}, delay {}cs, {:?}",
            self.frames.len(),
            self.width,
            self.height,
            delay,
            self.repeat
        );
        let mut encoder = Encoder::new(w, self.width, self.height, &palette)?;
        encoder.write_extension(ExtensionData::Repetitions(self.repeat))?;
        for frame in &indexed {
            encoder.write_frame(frame, delay)?;
        }
        Ok(encoder.finish()?)
    }

    fn check_frames(&self) -> Result<(), EncodingError> {
        if self.frames.is_empty() {
            return Err(EncodingError::NoFrames);
        }
        if self.width == 0 || self.height == 0 {
            return Err(EncodingError::ZeroSize {
                width: self.width,
                height: self.height,
            });
        }
        let expected = usize::from(self.width) * usize::from(self.height) * palette::N_CHANNELS;
        for (index, frame) in self.frames.iter().enumerate() {
            if frame.len() != expected {
                return Err(EncodingError::FrameSize {
                    index,
                    expected,
                    actual: frame.len(),
                });
            }
        }
        Ok(())
    }
}

/// Encodes RGBA `frames` into a GIF that loops forever.
///
/// Every frame is shown for `delay_ms` milliseconds, rounded to hundredths of a second.
pub fn encode<F: AsRef<[u8]>>(
    width: u16,
    height: u16,
    delay_ms: u32,
    frames: &[F],
) -> Result<Vec<u8>, EncodingError> {
    let mut encoder = GifEncoder::new(width, height);
    encoder.set(Delay(delay_ms));
    for frame in frames {
        encoder.add_frame(frame.as_ref());
    }
    encoder.encode()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delay_rounds_half_up() {
        assert_eq!(Delay(100).centis(), 10);
        assert_eq!(Delay(125).centis(), 13);
        assert_eq!(Delay(124).centis(), 12);
        assert_eq!(Delay(4).centis(), 0);
        assert_eq!(Delay(5).centis(), 1);
        assert_eq!(Delay(u32::MAX).centis(), u16::MAX);
    }

    #[test]
    fn delay_from_fps() {
        assert_eq!(Delay::from_fps(8), Delay(125));
        assert_eq!(Delay::from_fps(12), Delay(83));
        assert_eq!(Delay::from_fps(60), Delay(17));
        assert_eq!(Delay::from_fps(8).centis(), 13);
    }

    #[test]
    fn parameters_update_the_encoder() {
        let mut encoder = GifEncoder::new(2, 2);
        encoder
            .set(Delay(40))
            .set(Repeat::Finite(3))
            .set(AlphaThreshold(1));
        assert_eq!(encoder.delay, Delay(40));
        assert_eq!(encoder.repeat, Repeat::Finite(3));
        assert_eq!(encoder.alpha_threshold, AlphaThreshold(1));
    }

    #[test]
    fn rejected_input_writes_nothing() {
        let mut out: Vec<u8> = Vec::new();
        let frame = [0u8; 12];
        let mut encoder = GifEncoder::new(2, 2);
        encoder.add_frame(&frame[..]);
        match encoder.encode_to(&mut out) {
            Err(EncodingError::FrameSize { index: 0, expected: 16, actual: 12 }) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
        assert!(out.is_empty());
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = encode::<&[u8]>(0, 4, 100, &[&[]]).unwrap_err();
        assert!(matches!(err, EncodingError::ZeroSize { width: 0, height: 4 }));
        assert!(err.is_invalid_input());
    }
}
