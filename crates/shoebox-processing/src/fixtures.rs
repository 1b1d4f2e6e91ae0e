//! Synthetic media files for tests.

/// A JPEG whose EXIF block carries `DateTimeOriginal = date` (`YYYY:MM:DD HH:MM:SS`).
///
/// The file has no image data; it is only meant for metadata readers.
pub fn jpeg_with_exif_date(date: &str) -> Vec<u8> {
    let mut value = date.as_bytes().to_vec();
    value.push(0);
    let value_len = value.len() as u32;

    // big-endian TIFF: header, IFD0 with an Exif pointer, Exif IFD with one ASCII entry
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"MM");
    tiff.extend_from_slice(&42u16.to_be_bytes());
    tiff.extend_from_slice(&8u32.to_be_bytes());

    let exif_ifd_offset: u32 = 8 + 2 + 12 + 4;
    tiff.extend_from_slice(&1u16.to_be_bytes());
    push_entry(&mut tiff, 0x8769, 4, 1, exif_ifd_offset);
    tiff.extend_from_slice(&0u32.to_be_bytes());

    let value_offset = exif_ifd_offset + 2 + 12 + 4;
    tiff.extend_from_slice(&1u16.to_be_bytes());
    push_entry(&mut tiff, 0x9003, 2, value_len, value_offset);
    tiff.extend_from_slice(&0u32.to_be_bytes());
    tiff.extend_from_slice(&value);

    let mut app1 = b"Exif\0\0".to_vec();
    app1.extend_from_slice(&tiff);

    let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
    jpeg.extend_from_slice(&((app1.len() + 2) as u16).to_be_bytes());
    jpeg.extend_from_slice(&app1);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn push_entry(buffer: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    buffer.extend_from_slice(&tag.to_be_bytes());
    buffer.extend_from_slice(&kind.to_be_bytes());
    buffer.extend_from_slice(&count.to_be_bytes());
    buffer.extend_from_slice(&value.to_be_bytes());
}

/// An MP4 with an `ftyp` box and a version 0 `moov/mvhd` carrying `creation_time`.
pub fn mp4_with_creation_time(creation_time: u64) -> Vec<u8> {
    let mut mvhd_payload = vec![0u8; 100];
    // version 0, flags 0, then creation and modification time
    mvhd_payload[4..8].copy_from_slice(&(creation_time as u32).to_be_bytes());
    mvhd_payload[8..12].copy_from_slice(&(creation_time as u32).to_be_bytes());
    mvhd_payload[12..16].copy_from_slice(&1000u32.to_be_bytes());

    let mut mvhd = ((mvhd_payload.len() + 8) as u32).to_be_bytes().to_vec();
    mvhd.extend_from_slice(b"mvhd");
    mvhd.extend_from_slice(&mvhd_payload);

    let mut data = 16u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&0u32.to_be_bytes());
    data.extend_from_slice(&((mvhd.len() + 8) as u32).to_be_bytes());
    data.extend_from_slice(b"moov");
    data.extend_from_slice(&mvhd);
    data
}

/// A RIFF/AVI header with an `IDIT` chunk holding `date` (`Sat May 25 12:09:04 2019`).
pub fn avi_with_idit(date: &str) -> Vec<u8> {
    let mut value = date.as_bytes().to_vec();
    value.extend_from_slice(&[0x0A, 0x00]);

    let mut data = b"RIFF".to_vec();
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(b"AVI LIST");
    data.extend_from_slice(&((value.len() + 12) as u32).to_le_bytes());
    data.extend_from_slice(b"hdrlIDIT");
    data.extend_from_slice(&(value.len() as u32).to_le_bytes());
    data.extend_from_slice(&value);
    data
}

/// A solid-color baseline JPEG of the given size.
#[cfg(feature = "image")]
pub fn solid_jpeg(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 120, 40])));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .expect("encode JPEG fixture");
    buffer
}
