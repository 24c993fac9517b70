//! Block level types of the GIF format

/// Disposal method
///
/// Frames are always restored to the background before the next one is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum DisposalMethod {
    /// Restore to background color.
    Background = 2,
}

enum_from_primitive! {
/// Known block types
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Block {
    Image = 0x2C,
    Extension = 0x21,
    Trailer = 0x3B
}
}

enum_from_primitive! {
/// Known GIF extensions
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extension {
    Text = 0x01,
    Control = 0xF9,
    Comment = 0xFE,
    Application = 0xFF
}
}

/// Number of times the animation is played back
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Repeat {
    /// Loop forever
    #[default]
    Infinite,
    /// Loop `n` additional times after the first pass.
    ///
    /// The extension stores `0` for infinite playback, so `Finite(0)` loops forever too.
    Finite(u16),
}

impl Repeat {
    /// Loop count as stored in the NETSCAPE2.0 application extension.
    pub fn loop_count(self) -> u16 {
        match self {
            Repeat::Infinite => 0,
            Repeat::Finite(n) => n,
        }
    }
}
