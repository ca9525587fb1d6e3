//! Collaborator traits implemented by the embedder
//!
//! The runtime never talks to a terminal, an audio device, or the
//! filesystem directly.  Output, sound, and save data all pass through
//! these traits, so an embedder decides how (or whether) to render them.
use std::fmt;

use crate::error::RuntimeError;

/// Display surface
///
/// Text arrives as ZSCII values.  Row and column coordinates are 1-based,
/// with (1, 1) at the top left.
pub trait Screen {
    /// Screen height in rows
    fn rows(&self) -> u16;

    /// Screen width in columns
    fn columns(&self) -> u16;

    /// Print ZSCII text at the cursor position
    fn print(&mut self, text: &[u16]) -> Result<(), RuntimeError>;

    /// Advance the cursor to the start of the next line
    fn new_line(&mut self) -> Result<(), RuntimeError>;

    /// Append ZSCII text to the transcript, if one is open
    fn transcript(&mut self, text: &[u16]) -> Result<(), RuntimeError>;

    /// Split the upper window to `lines` rows; 0 unsplits
    fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError>;

    /// Select window 0 (lower) or 1 (upper)
    fn set_window(&mut self, window: u16) -> Result<(), RuntimeError>;

    /// Erase a window; -1 unsplits and clears the screen, -2 clears
    /// without unsplitting
    fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError>;

    /// Erase from the cursor to the end of the current line
    fn erase_line(&mut self) -> Result<(), RuntimeError>;

    /// Move the cursor
    fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError>;

    /// Current cursor position
    fn cursor(&mut self) -> Result<(u16, u16), RuntimeError>;

    /// Set the text style bitmap (roman, reverse, bold, italic, fixed)
    fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError>;

    /// Set foreground and background colours
    fn set_colour(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError>;

    /// Enable or disable output buffering (word wrap)
    fn buffer_mode(&mut self, mode: u16) -> Result<(), RuntimeError>;

    /// Select a font, returning the previous font or 0 if the font is
    /// unavailable
    fn set_font(&mut self, font: u16) -> Result<u16, RuntimeError>;

    /// Draw the status line from the prepared left and right fields
    fn status_line(&mut self, left: &[u16], right: &[u16]) -> Result<(), RuntimeError>;
}

/// Sound playback
pub trait Sound {
    /// Start an effect; volume 255 means "loudest possible"
    fn play(
        &mut self,
        number: u16,
        effect: u16,
        volume: u8,
        repeats: u8,
    ) -> Result<(), RuntimeError>;

    /// Stop any playing effect
    fn stop(&mut self) -> Result<(), RuntimeError>;

    /// The low "bleep" (effect 1) or high "boop" (effect 2)
    fn beep(&mut self) -> Result<(), RuntimeError>;
}

/// Save file storage
///
/// `name` is the story file's base name; the implementation chooses the
/// actual location and naming scheme.
pub trait Persistence {
    /// Write a save blob
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), RuntimeError>;

    /// Read a save blob back
    fn restore(&mut self, name: &str) -> Result<Vec<u8>, RuntimeError>;
}

impl fmt::Debug for dyn Screen {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{} screen", self.rows(), self.columns())
    }
}

impl fmt::Debug for dyn Sound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "sound")
    }
}

impl fmt::Debug for dyn Persistence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "persistence")
    }
}
