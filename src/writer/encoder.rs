use std::io;
use std::io::prelude::*;

use log::trace;
use thiserror::Error;

use crate::traits::WriteBytesExt;
use crate::types::{Block, DisposalMethod, Extension, Repeat};

use super::lzw::{self, LsbWriter};
use super::palette::Palette;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("no frames to encode")]
    NoFrames,
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroSize { width: u16, height: u16 },
    #[error("frame {index} holds {actual} bytes, expected {expected}")]
    FrameSize {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EncodingError {
    /// The caller supplied frames the encoder cannot accept.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, EncodingError::Io(_))
    }
}

pub enum ExtensionData {
    Control { flags: u8, delay: u16, trns: u8 },
    Repetitions(Repeat),
}

impl ExtensionData {
    pub fn new_control_ext(delay: u16, dispose: DisposalMethod,
                           needs_user_input: bool, trns: Option<u8>) -> ExtensionData {
        let mut flags = 0;
        let trns = match trns {
            Some(trns) => {
                flags |= 1;
                trns
            },
            None => 0
        };
        flags |= (needs_user_input as u8) << 1;
        flags |= (dispose as u8) << 2;
        ExtensionData::Control { flags, delay, trns }
    }
}

/// Splits a data stream into sub-blocks of at most 255 bytes.
///
/// `finish` writes the final partial block and the block terminator.
struct BlockWriter<'a, W: Write> {
    w: &'a mut W,
    buf: [u8; 0xFF],
    len: usize,
}

impl<'a, W: Write> BlockWriter<'a, W> {
    fn new(w: &'a mut W) -> Self {
        BlockWriter { w, buf: [0; 0xFF], len: 0 }
    }

    fn write_block(&mut self) -> io::Result<()> {
        if self.len > 0 {
            self.w.write_le(self.len as u8)?;
            self.w.write_all(&self.buf[..self.len])?;
            self.len = 0;
        }
        Ok(())
    }

    fn finish(mut self) -> io::Result<()> {
        self.write_block()?;
        self.w.write_le(0u8)
    }
}

impl<'a, W: Write> Write for BlockWriter<'a, W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = data.len().min(self.buf.len() - self.len);
        self.buf[self.len..self.len + n].copy_from_slice(&data[..n]);
        self.len += n;
        if self.len == self.buf.len() {
            self.write_block()?;
        }
        Ok(n)
    }

    // Blocks are only emitted once full or on finish.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes the GIF container around frames that share one global palette.
///
/// Construction writes the header, the logical screen descriptor and the global color table.
pub struct Encoder<W: Write> {
    w: W,
    width: u16,
    height: u16,
    table_bits: u8,
    transparent: Option<u8>,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W, width: u16, height: u16, palette: &Palette) -> io::Result<Self> {
        let mut this = Encoder {
            w,
            width,
            height,
            table_bits: palette.table_bits(),
            transparent: palette.transparent(),
        };
        this.write_screen_desc()?;
        this.w.write_all(&palette.color_table())?;
        Ok(this)
    }

    /// Writes a complete frame of palette indices.
    ///
    /// Note: This function also writes the control extension of the frame.
    pub fn write_frame(&mut self, indices: &[u8], delay: u16) -> io::Result<()> {
        self.write_extension(ExtensionData::new_control_ext(
            delay,
            DisposalMethod::Background,
            false,
            self.transparent,
        ))?;
        self.w.write_le(Block::Image as u8)?;
        self.w.write_le(0u16)?; // left
        self.w.write_le(0u16)?; // top
        self.w.write_le(self.width)?;
        self.w.write_le(self.height)?;
        self.w.write_le(0u8)?; // no local table, not interlaced
        self.write_image_block(indices)
    }

    fn write_image_block(&mut self, data: &[u8]) -> io::Result<()> {
        self.w.write_le(self.table_bits)?;
        let mut blocks = BlockWriter::new(&mut self.w);
        let resets = {
            let mut packer = LsbWriter::new(&mut blocks);
            lzw::encode(data, self.table_bits, &mut packer)?
        };
        blocks.finish()?;
        trace!("frame: {} indices, {} dictionary resets", data.len(), resets);
        Ok(())
    }

    /// Writes an extension to the image
    pub fn write_extension(&mut self, extension: ExtensionData) -> io::Result<()> {
        use self::ExtensionData::*;
        self.w.write_le(Block::Extension as u8)?;
        match extension {
            Control { flags, delay, trns } => {
                self.w.write_le(Extension::Control as u8)?;
                self.w.write_le(4u8)?;
                self.w.write_le(flags)?;
                self.w.write_le(delay)?;
                self.w.write_le(trns)?;
            }
            Repetitions(repeat) => {
                self.w.write_le(Extension::Application as u8)?;
                self.w.write_le(11u8)?;
                self.w.write_all(b"NETSCAPE2.0")?;
                self.w.write_le(3u8)?;
                self.w.write_le(1u8)?;
                self.w.write_le(repeat.loop_count())?;
            }
        }
        self.w.write_le(0u8)
    }

    /// Writes the trailer and returns the inner writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.w.write_le(Block::Trailer as u8)?;
        self.w.flush()?;
        Ok(self.w)
    }

    /// Writes the logical screen descriptor
    fn write_screen_desc(&mut self) -> io::Result<()> {
        let size = self.table_bits - 1;
        self.w.write_all(b"GIF89a")?;
        self.w.write_le(self.width)?;
        self.w.write_le(self.height)?;
        // global table present, color resolution, table size
        self.w.write_le(0b1000_0000 | size << 4 | size)?;
        self.w.write_le(0u8)?; // bg index
        self.w.write_le(0u8) // aspect ratio
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::writer::palette::quantize;

    #[test]
    fn control_ext_flags() {
        match ExtensionData::new_control_ext(10, DisposalMethod::Background, false, Some(3)) {
            ExtensionData::Control { flags, delay, trns } => {
                assert_eq!((flags, delay, trns), (0x09, 10, 3));
            }
            _ => unreachable!(),
        }
        match ExtensionData::new_control_ext(10, DisposalMethod::Background, false, None) {
            ExtensionData::Control { flags, trns, .. } => assert_eq!((flags, trns), (0x08, 0)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn sub_blocks_hold_at_most_255_bytes() {
        let data: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let mut out: Vec<u8> = Vec::new();
        {
            let mut blocks = BlockWriter::new(&mut out);
            blocks.write_all(&data).unwrap();
            blocks.finish().unwrap();
        }
        assert_eq!(out.len(), 600 + 4);
        assert_eq!(out[0], 255);
        assert_eq!(&out[1..256], &data[..255]);
        assert_eq!(out[256], 255);
        assert_eq!(out[512], 90);
        assert_eq!(&out[513..603], &data[510..]);
        assert_eq!(out[603], 0);
    }

    #[test]
    fn empty_block_stream_is_only_terminator() {
        let mut out: Vec<u8> = Vec::new();
        BlockWriter::new(&mut out).finish().unwrap();
        assert_eq!(out, [0]);
    }

    #[test]
    fn screen_descriptor_and_loop_extension() {
        let pixels = [10u8, 20, 30, 255];
        let (palette, _) = quantize([&pixels[..]], 128);
        let mut encoder = Encoder::new(Vec::<u8>::new(), 3, 1, &palette).unwrap();
        encoder
            .write_extension(ExtensionData::Repetitions(Repeat::Infinite))
            .unwrap();
        let out = encoder.finish().unwrap();
        assert_eq!(&out[..6], b"GIF89a");
        assert_eq!(&out[6..13], &[3, 0, 1, 0, 0x91, 0, 0]);
        assert_eq!(&out[13..25], &[10, 20, 30, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&out[25..28], &[0x21, 0xFF, 0x0B]);
        assert_eq!(&out[28..39], b"NETSCAPE2.0");
        assert_eq!(&out[39..], &[3, 1, 0, 0, 0, 0x3B]);
    }
}
