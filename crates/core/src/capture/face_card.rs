use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// A cropped still of one captured face, ready for display.
#[derive(Clone, PartialEq, Eq)]
pub struct FaceCard {
    /// 1-based position in detector output order.
    pub index: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

impl std::fmt::Debug for FaceCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceCard")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_bytes", &self.jpeg.len())
            .finish()
    }
}

/// Builds one card per face, in the order given.
pub fn build_cards(
    frame: &Frame,
    faces: &[BoundingBox],
    padding: u32,
    quality: u8,
) -> Result<Vec<FaceCard>, Box<dyn std::error::Error>> {
    faces
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let crop = crop_face(frame, face, padding);
            Ok(FaceCard {
                index: i + 1,
                label: format!("Face {}", i + 1),
                width: crop.width(),
                height: crop.height(),
                jpeg: encode_jpeg(&crop, quality)?,
            })
        })
        .collect()
}

/// Copies the face plus `padding` pixels on every side out of `frame`.
///
/// The result is always `(w + 2·padding) × (h + 2·padding)` with the face
/// centred; whatever falls outside the frame stays black.
pub fn crop_face(frame: &Frame, face: &BoundingBox, padding: u32) -> Frame {
    let region = face.padded(padding as f32);
    let (out_w, out_h) = region.pixel_size();
    let channels = frame.channels() as usize;

    let origin_x = region.x_min.round() as i64;
    let origin_y = region.y_min.round() as i64;
    let frame_w = frame.width() as i64;
    let frame_h = frame.height() as i64;

    let mut data = vec![0u8; out_w as usize * out_h as usize * channels];

    // Destination columns that map inside the frame.
    let dx_start = (-origin_x).clamp(0, out_w as i64);
    let dx_end = (frame_w - origin_x).clamp(0, out_w as i64);
    if dx_start < dx_end {
        let span = (dx_end - dx_start) as u32;
        let src_x = (origin_x + dx_start) as u32;
        for dy in 0..out_h as i64 {
            let sy = origin_y + dy;
            if sy < 0 || sy >= frame_h {
                continue;
            }
            let src = frame.row_span(sy as u32, src_x, span);
            let dst = (dy as usize * out_w as usize + dx_start as usize) * channels;
            data[dst..dst + src.len()].copy_from_slice(src);
        }
    }

    Frame::new(data, out_w, out_h, channels as u8, frame.index())
}

fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let img = frame.to_rgb_image().ok_or("face crop is not RGB")?;
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&img)?;
    Ok(buf.into_inner())
}
