//! Pixel formats and CPU frame buffers.
//!
//! Buffers are tightly packed, channel-interleaved, and row-major — the
//! layout render workers hand to the cache and the store encodes to disk.

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Pixel format of a rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit unsigned RGB
    Rgb8,
    /// 8-bit unsigned RGBA
    Rgba8,
    /// 16-bit unsigned RGB
    Rgb16U,
    /// 16-bit unsigned RGBA
    Rgba16U,
    /// 16-bit half-float RGB
    Rgb16F,
    /// 16-bit half-float RGBA
    Rgba16F,
    /// 32-bit float RGB
    Rgb32F,
    /// 32-bit float RGBA
    Rgba32F,
    /// Sentinel for frames with no usable format
    Invalid,
}

impl PixelFormat {
    /// Number of channels per pixel, 0 for the invalid sentinel.
    pub fn channel_count(self) -> usize {
        match self {
            Self::Rgb8 | Self::Rgb16U | Self::Rgb16F | Self::Rgb32F => 3,
            Self::Rgba8 | Self::Rgba16U | Self::Rgba16F | Self::Rgba32F => 4,
            Self::Invalid => 0,
        }
    }

    /// Bytes per channel sample, 0 for the invalid sentinel.
    pub fn bytes_per_channel(self) -> usize {
        match self {
            Self::Rgb8 | Self::Rgba8 => 1,
            Self::Rgb16U | Self::Rgba16U | Self::Rgb16F | Self::Rgba16F => 2,
            Self::Rgb32F | Self::Rgba32F => 4,
            Self::Invalid => 0,
        }
    }

    /// Bytes per pixel.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        self.channel_count() * self.bytes_per_channel()
    }

    /// True for half- and full-float formats.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Self::Rgb16F | Self::Rgba16F | Self::Rgb32F | Self::Rgba32F
        )
    }

    /// False only for the invalid sentinel.
    #[inline]
    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// Total bytes needed for a packed frame of this format.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }
}

/// Caller-supplied description of a frame buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoParams {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
}

impl VideoParams {
    /// Create a new frame description.
    #[inline]
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    /// Total bytes for a packed frame with these parameters.
    #[inline]
    pub fn frame_size(self) -> usize {
        self.format.frame_size(self.width, self.height)
    }

    /// True when the format is usable and the frame is non-degenerate.
    pub fn is_valid(self) -> bool {
        self.format.is_valid() && self.width > 0 && self.height > 0
    }
}

/// A rendered video frame in CPU memory.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    params: VideoParams,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a zero-filled frame buffer.
    pub fn new(params: VideoParams) -> Self {
        Self {
            data: vec![0u8; params.frame_size()],
            params,
        }
    }

    /// Wrap existing pixel bytes. The length must match the packed frame
    /// size exactly.
    pub fn from_data(params: VideoParams, data: Vec<u8>) -> Result<Self> {
        let expected = params.frame_size();
        if data.len() != expected {
            return Err(CacheError::InvalidParameter(format!(
                "frame data is {} bytes, expected {} for {}x{} {:?}",
                data.len(),
                expected,
                params.width,
                params.height,
                params.format
            )));
        }
        Ok(Self { params, data })
    }

    /// Build a full-float frame from interleaved f32 samples.
    pub fn from_f32_pixels(params: VideoParams, samples: &[f32]) -> Result<Self> {
        if !matches!(params.format, PixelFormat::Rgb32F | PixelFormat::Rgba32F) {
            return Err(CacheError::UnsupportedFormat(params.format));
        }
        Self::from_data(params, bytemuck::cast_slice(samples).to_vec())
    }

    /// Build a half-float frame from interleaved f16 sample bits.
    pub fn from_f16_bits(params: VideoParams, samples: &[u16]) -> Result<Self> {
        if !matches!(params.format, PixelFormat::Rgb16F | PixelFormat::Rgba16F) {
            return Err(CacheError::UnsupportedFormat(params.format));
        }
        Self::from_data(params, bytemuck::cast_slice(samples).to_vec())
    }

    /// The frame description.
    #[inline]
    pub fn params(&self) -> VideoParams {
        self.params
    }

    /// Packed pixel bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Packed pixel bytes, mutably.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Total memory used by the pixel data.
    #[inline]
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}
