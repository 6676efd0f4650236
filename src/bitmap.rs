//! 1-bit-per-pixel frame encoding.
//!
//! A frame is an 8-byte header followed by the pixel payload. Pixels are
//! packed row-major with no per-row padding, most significant bit first:
//!
//! ```text
//! byte 0     pixel format tag (FORMAT_INDEXED_1BIT)
//! byte 1     header version
//! bytes 2-3  width in pixels, little endian
//! bytes 4-5  height in pixels, little endian
//! bytes 6-7  reserved, zero
//! ```

use crate::grid::Grid;
use thiserror::Error;

pub const HEADER_LEN: usize = 8;
pub const FORMAT_INDEXED_1BIT: u8 = 0x07;
pub const HEADER_VERSION: u8 = 1;
pub const BITS_PER_BYTE: usize = 8;
/// Width and height are stored as u16 in the header
pub const MAX_DIMENSION: usize = u16::MAX as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitmapError {
    #[error("bitmap dimensions must be non-zero, got {width}x{height}")]
    Empty { width: usize, height: usize },
    #[error("bitmap dimension {0} does not fit the 16-bit header field")]
    TooLarge(usize),
    #[error("frame shorter than the {HEADER_LEN}-byte header")]
    Truncated,
    #[error("unknown pixel format tag {0:#04x}")]
    Format(u8),
    #[error("frame is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
}

fn check_dimensions(width: usize, height: usize) -> Result<(), BitmapError> {
    if width == 0 || height == 0 {
        return Err(BitmapError::Empty { width, height });
    }
    if width > MAX_DIMENSION {
        return Err(BitmapError::TooLarge(width));
    }
    if height > MAX_DIMENSION {
        return Err(BitmapError::TooLarge(height));
    }
    Ok(())
}

/// Byte offset (from the start of the payload) and mask of a pixel
#[inline]
fn bit_position(width: usize, row: usize, col: usize) -> (usize, u8) {
    let index = row * width + col;
    (index / BITS_PER_BYTE, 0x80 >> (index % BITS_PER_BYTE))
}

/// Engine-owned frame buffer mirroring the grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedBitmap {
    width: usize,
    height: usize,
    bytes: Vec<u8>,
}

impl PackedBitmap {
    /// Payload size in bytes for the given pixel dimensions
    pub fn payload_len(width: usize, height: usize) -> usize {
        (width * height).div_ceil(BITS_PER_BYTE)
    }

    /// Cleared frame with a valid header
    pub fn new(width: usize, height: usize) -> Result<Self, BitmapError> {
        check_dimensions(width, height)?;

        let mut bytes = vec![0u8; HEADER_LEN + Self::payload_len(width, height)];
        bytes[0] = FORMAT_INDEXED_1BIT;
        bytes[1] = HEADER_VERSION;
        bytes[2..4].copy_from_slice(&(width as u16).to_le_bytes());
        bytes[4..6].copy_from_slice(&(height as u16).to_le_bytes());

        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    /// Full encode of a grid. Only used to build the initial frame; after
    /// that the engine toggles individual bits.
    pub fn from_grid(grid: &Grid) -> Result<Self, BitmapError> {
        let mut bitmap = Self::new(grid.cols(), grid.rows())?;
        for (row, col, cell) in grid.iter() {
            if cell.is_lit() {
                bitmap.toggle(row, col);
            }
        }
        Ok(bitmap)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance in bits between vertically adjacent pixels
    pub fn stride_bits(&self) -> usize {
        self.width
    }

    #[inline]
    fn locate(&self, row: usize, col: usize) -> (usize, u8) {
        debug_assert!(
            row < self.height && col < self.width,
            "pixel ({row}, {col}) outside {}x{} bitmap",
            self.width,
            self.height
        );
        let (offset, mask) = bit_position(self.width, row, col);
        (HEADER_LEN + offset, mask)
    }

    /// XOR-flip one pixel
    #[inline]
    pub fn toggle(&mut self, row: usize, col: usize) {
        let (byte, mask) = self.locate(row, col);
        self.bytes[byte] ^= mask;
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        let (byte, mask) = self.locate(row, col);
        self.bytes[byte] & mask != 0
    }

    /// Header plus payload, ready to hand to a render sink
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &[u8] {
        &self.bytes[..HEADER_LEN]
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[HEADER_LEN..]
    }

    pub fn count_set(&self) -> usize {
        self.payload().iter().map(|b| b.count_ones() as usize).sum()
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            payload: self.payload(),
        }
    }
}

/// Read-only decoder over an encoded frame
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    width: usize,
    height: usize,
    payload: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Validate the header and payload length of an encoded frame
    pub fn parse(bytes: &'a [u8]) -> Result<Self, BitmapError> {
        if bytes.len() < HEADER_LEN {
            return Err(BitmapError::Truncated);
        }
        if bytes[0] != FORMAT_INDEXED_1BIT {
            return Err(BitmapError::Format(bytes[0]));
        }

        let width = u16::from_le_bytes([bytes[2], bytes[3]]) as usize;
        let height = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
        check_dimensions(width, height)?;

        let expected = HEADER_LEN + PackedBitmap::payload_len(width, height);
        if bytes.len() != expected {
            return Err(BitmapError::Length {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            width,
            height,
            payload: &bytes[HEADER_LEN..],
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel lookup; coordinates outside the frame read as clear
    pub fn get(&self, row: usize, col: usize) -> bool {
        if row >= self.height || col >= self.width {
            return false;
        }
        let (offset, mask) = bit_position(self.width, row, col);
        self.payload[offset] & mask != 0
    }

    /// Coordinates of all set pixels as (row, col), row-major
    pub fn lit_pixels(&self) -> Vec<(usize, usize)> {
        let mut lit = Vec::new();
        for row in 0..self.height {
            for col in 0..self.width {
                if self.get(row, col) {
                    lit.push((row, col));
                }
            }
        }
        lit
    }
}
