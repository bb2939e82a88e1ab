//! Content-addressed persistence of rendered frames.

use crate::disk::DiskManager;
use framevault_core::hash::hex_of;
use framevault_core::{CacheError, ContentHash, FrameBuffer, PixelFormat, Result};
use half::f16;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::{self, File};
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Quality for integer-format cache files; the offline cache is lossy for
/// integer content.
const JPEG_QUALITY: u8 = 85;

/// File extension for a pixel-format class, `None` for the invalid
/// sentinel.
pub fn format_extension(format: PixelFormat) -> Option<&'static str> {
    if !format.is_valid() {
        return None;
    }
    // EXR is only fast with float buffers, so it is reserved for those.
    Some(if format.is_float() { "exr" } else { "jpg" })
}

/// Deterministic cache path: `<root>/<first-byte-hex>/<rest-hex>.<ext>`.
///
/// The leading hash byte names the directory, bounding fan-out to 256
/// shards; the remaining bytes name the file. Pure: identical inputs
/// always yield the identical path. `None` for an empty hash or the
/// invalid format.
pub fn cache_path(root: &Path, hash: &ContentHash, format: PixelFormat) -> Option<PathBuf> {
    let ext = format_extension(format)?;
    let (shard, rest) = hash.as_bytes().split_first()?;
    Some(
        root.join(hex_of(&[*shard]))
            .join(format!("{}.{}", hex_of(rest), ext)),
    )
}

/// Writes rendered frames to the content-addressed cache and reports new
/// files to the disk-space manager.
///
/// Encoding runs synchronously on the calling thread; callers keep it off
/// latency-critical paths.
pub struct FrameStore {
    root: PathBuf,
    disk: Arc<dyn DiskManager>,
}

impl FrameStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, disk: Arc<dyn DiskManager>) -> Self {
        Self {
            root: root.into(),
            disk,
        }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path a frame with `hash` and `format` is stored at.
    pub fn path_for(&self, hash: &ContentHash, format: PixelFormat) -> Option<PathBuf> {
        cache_path(&self.root, hash, format)
    }

    /// Encode `frame` to disk under `hash` and register the new file.
    ///
    /// Fails without touching the disk manager; a failed encode leaves no
    /// partial file behind.
    pub fn save_frame(&self, hash: &ContentHash, frame: &FrameBuffer) -> Result<PathBuf> {
        let params = frame.params();

        if hash.is_empty() {
            return Err(CacheError::InvalidParameter(
                "cannot cache a frame under an empty content hash".into(),
            ));
        }
        let path = self
            .path_for(hash, params.format)
            .ok_or(CacheError::UnsupportedFormat(params.format))?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let encoded = if params.format.is_float() {
            write_exr(&path, frame)
        } else {
            write_jpeg(&path, frame)
        };

        if let Err(err) = encoded {
            error!(path = %path.display(), %err, "failed to write cache frame");
            let _ = fs::remove_file(&path);
            return Err(err);
        }

        self.disk.created_file(&path, hash);
        debug!(
            path = %path.display(),
            width = params.width,
            height = params.height,
            format = ?params.format,
            "cached frame"
        );
        Ok(path)
    }
}

/// Integer formats are cached as JPEG: 8-bit, three channels. Alpha is
/// dropped and 16-bit samples narrowed to their high byte.
fn pack_rgb8(frame: &FrameBuffer) -> Result<Vec<u8>> {
    let params = frame.params();
    let data = frame.data();
    let channels = params.format.channel_count();
    let pixels = params.width as usize * params.height as usize;

    let mut rgb = Vec::with_capacity(pixels * 3);
    match params.format {
        PixelFormat::Rgb8 => rgb.extend_from_slice(data),
        PixelFormat::Rgba8 => {
            for px in data.chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
            }
        }
        PixelFormat::Rgb16U | PixelFormat::Rgba16U => {
            for px in data.chunks_exact(channels * 2) {
                for c in 0..3 {
                    let sample = u16::from_ne_bytes([px[c * 2], px[c * 2 + 1]]);
                    rgb.push((sample >> 8) as u8);
                }
            }
        }
        _ => return Err(CacheError::UnsupportedFormat(params.format)),
    }
    Ok(rgb)
}

fn write_jpeg(path: &Path, frame: &FrameBuffer) -> Result<()> {
    let params = frame.params();
    let rgb = pack_rgb8(frame)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .write_image(&rgb, params.width, params.height, ExtendedColorType::Rgb8)
        .map_err(|err| CacheError::Encode(err.to_string()))?;
    writer.flush()?;
    Ok(())
}

/// Float formats are cached as OpenEXR, half or full precision per format,
/// RLE-compressed — the fast-write end of the container's trade-off.
fn write_exr(path: &Path, frame: &FrameBuffer) -> Result<()> {
    use exr::prelude::*;

    let params = frame.params();
    let data = frame.data();
    let width = params.width as usize;
    let size = (width, params.height as usize);
    let channels = params.format.channel_count();

    let f16_at = |pos: Vec2<usize>, c: usize| -> f16 {
        let i = ((pos.y() * width) + pos.x()) * channels + c;
        f16::from_bits(u16::from_ne_bytes([data[i * 2], data[i * 2 + 1]]))
    };
    let f32_at = |pos: Vec2<usize>, c: usize| -> f32 {
        let i = (((pos.y() * width) + pos.x()) * channels + c) * 4;
        f32::from_ne_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]])
    };

    let encoding = Encoding::FAST_LOSSLESS;
    let attributes = LayerAttributes::default();

    let written = match params.format {
        PixelFormat::Rgb16F => Image::from_layer(Layer::new(
            size,
            attributes,
            encoding,
            SpecificChannels::rgb(|pos: Vec2<usize>| {
                (f16_at(pos, 0), f16_at(pos, 1), f16_at(pos, 2))
            }),
        ))
        .write()
        .to_file(path),
        PixelFormat::Rgba16F => Image::from_layer(Layer::new(
            size,
            attributes,
            encoding,
            SpecificChannels::rgba(|pos: Vec2<usize>| {
                (
                    f16_at(pos, 0),
                    f16_at(pos, 1),
                    f16_at(pos, 2),
                    f16_at(pos, 3),
                )
            }),
        ))
        .write()
        .to_file(path),
        PixelFormat::Rgb32F => Image::from_layer(Layer::new(
            size,
            attributes,
            encoding,
            SpecificChannels::rgb(|pos: Vec2<usize>| {
                (f32_at(pos, 0), f32_at(pos, 1), f32_at(pos, 2))
            }),
        ))
        .write()
        .to_file(path),
        PixelFormat::Rgba32F => Image::from_layer(Layer::new(
            size,
            attributes,
            encoding,
            SpecificChannels::rgba(|pos: Vec2<usize>| {
                (
                    f32_at(pos, 0),
                    f32_at(pos, 1),
                    f32_at(pos, 2),
                    f32_at(pos, 3),
                )
            }),
        ))
        .write()
        .to_file(path),
        _ => return Err(CacheError::UnsupportedFormat(params.format)),
    };

    written.map_err(|err| CacheError::Encode(err.to_string()))
}
