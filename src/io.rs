// Photo decoding and JPEG export through the `image` crate.
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};
use tracing::info;

use crate::error::Error;
use crate::types::RasterBuffer;

/// Decode a PNG or JPEG file into an RGBA raster at its native resolution.
pub fn load_photo(path: impl AsRef<Path>) -> Result<RasterBuffer, Error> {
    let path = path.as_ref();
    let img = image::open(path)?.to_rgba8();
    let photo = from_rgba_image(img)?;
    info!(path = %path.display(), width = photo.width, height = photo.height, "photo loaded");
    Ok(photo)
}

/// Decode an in-memory PNG or JPEG.
pub fn decode_photo(bytes: &[u8]) -> Result<RasterBuffer, Error> {
    from_rgba_image(image::load_from_memory(bytes)?.to_rgba8())
}

pub fn from_rgba_image(img: RgbaImage) -> Result<RasterBuffer, Error> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(Error::ImageDecode("photo has no pixels".into()));
    }
    RasterBuffer::from_rgba(w as usize, h as usize, img.into_raw())
        .ok_or_else(|| Error::ImageDecode("pixel data does not match dimensions".into()))
}

/// Encode a frame as baseline JPEG. Alpha is dropped; quality is clamped to 1..=100.
pub fn encode_jpeg(frame: &RasterBuffer, quality: u8) -> Result<Vec<u8>, Error> {
    let mut out = Vec::new();
    write_jpeg(frame, &mut out, quality)?;
    Ok(out)
}

pub fn export_jpeg(frame: &RasterBuffer, path: impl AsRef<Path>, quality: u8) -> Result<(), Error> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_jpeg(frame, &mut writer, quality)?;
    info!(path = %path.display(), quality, "exported look");
    Ok(())
}

fn write_jpeg<W: std::io::Write>(frame: &RasterBuffer, writer: &mut W, quality: u8) -> Result<(), Error> {
    let rgb: Vec<u8> = frame.data.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
    let mut encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100));
    encoder
        .encode(&rgb, frame.width as u32, frame.height as u32, ExtendedColorType::Rgb8)
        .map_err(|e| Error::ImageExport(e.to_string()))
}
