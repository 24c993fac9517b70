//! Variable code width LZW compression as used by GIF
use std::collections::HashMap;
use std::io::{self, Write};

use log::trace;

/// Codes never grow beyond 12 bits
pub const MAX_CODESIZE: u8 = 12;
const MAX_ENTRIES: u16 = 1 << MAX_CODESIZE;

/// Packs codes least significant bit first.
///
/// Complete bytes are written to the inner writer as soon as they are available.
pub struct LsbWriter<W: Write> {
    w: W,
    acc: u32,
    bits: u8,
}

impl<W: Write> LsbWriter<W> {
    pub fn new(w: W) -> LsbWriter<W> {
        LsbWriter { w, acc: 0, bits: 0 }
    }

    pub fn write_bits(&mut self, code: u16, n: u8) -> io::Result<()> {
        self.acc |= u32::from(code) << self.bits;
        self.bits += n;
        while self.bits >= 8 {
            self.w.write_all(&[self.acc as u8])?;
            self.acc >>= 8;
            self.bits -= 8;
        }
        Ok(())
    }

    /// Writes the remaining bits, padded with zeros to a full byte.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.bits > 0 {
            self.w.write_all(&[self.acc as u8])?;
            self.acc = 0;
            self.bits = 0;
        }
        self.w.flush()
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}

/// Code dictionary of a single frame.
///
/// Sequences are keyed by their prefix code and the appended index.
struct CodeTable {
    codes: HashMap<(u16, u8), u16>,
    min_code_size: u8,
    code_size: u8,
    next_code: u16,
}

impl CodeTable {
    fn new(min_code_size: u8) -> CodeTable {
        let mut table = CodeTable {
            codes: HashMap::new(),
            min_code_size,
            code_size: 0,
            next_code: 0,
        };
        table.reset();
        table
    }

    fn clear_code(&self) -> u16 {
        1 << self.min_code_size
    }

    fn end_code(&self) -> u16 {
        self.clear_code() + 1
    }

    fn reset(&mut self) {
        self.codes.clear();
        self.code_size = self.min_code_size + 1;
        self.next_code = self.end_code() + 1;
    }

    fn is_full(&self) -> bool {
        self.next_code >= MAX_ENTRIES
    }

    fn get(&self, prefix: u16, index: u8) -> Option<u16> {
        self.codes.get(&(prefix, index)).copied()
    }

    fn insert(&mut self, prefix: u16, index: u8) {
        self.codes.insert((prefix, index), self.next_code);
        self.next_code += 1;
        if self.next_code > 1 << self.code_size && self.code_size < MAX_CODESIZE {
            self.code_size += 1;
        }
    }
}

/// Compresses `data` into `w` and returns the number of clear codes emitted after the first one.
///
/// # Panics
///
/// If `data` is empty or `min_code_size` is not in `2..=8`.
pub fn encode<W: Write>(data: &[u8], min_code_size: u8, w: &mut LsbWriter<W>) -> io::Result<usize> {
    assert!(!data.is_empty(), "no data to compress");
    assert!(
        (2..=8).contains(&min_code_size),
        "invalid minimum code size {}",
        min_code_size
    );
    let mut table = CodeTable::new(min_code_size);
    let mut resets = 0;
    w.write_bits(table.clear_code(), table.code_size)?;
    let mut current = u16::from(data[0]);
    for &index in &data[1..] {
        debug_assert!(u16::from(index) < table.clear_code());
        if let Some(code) = table.get(current, index) {
            current = code;
            continue;
        }
        w.write_bits(current, table.code_size)?;
        if table.is_full() {
            w.write_bits(table.clear_code(), table.code_size)?;
            table.reset();
            resets += 1;
        } else {
            table.insert(current, index);
        }
        current = u16::from(index);
    }
    w.write_bits(current, table.code_size)?;
    w.write_bits(table.end_code(), table.code_size)?;
    w.flush()?;
    if resets > 0 {
        trace!("lzw: {} dictionary resets in {} indices", resets, data.len());
    }
    Ok(resets)
}
