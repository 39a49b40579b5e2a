//! Camera frame source.
//!
//! One GET against the camera URL decides the mode: a multipart
//! Content-Type means a persistent MJPEG stream that frames are scanned
//! out of; anything else is treated as a single-JPEG snapshot endpoint
//! fetched once per cycle. Either way a frame comes back as decoded RGB.

use anyhow::{anyhow, Context, Result};
use image::GenericImageView;

/// Upper bound on one JPEG frame; streams handing back more than this are
/// misbehaving and get their buffer dropped.
const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

/// One decoded RGB8 frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

enum StreamMode {
    Mjpeg {
        response: reqwest::Response,
        buffer: Vec<u8>,
    },
    SingleJpeg,
}

/// An open camera stream handle.
pub struct CameraStream {
    client: reqwest::Client,
    url: String,
    mode: StreamMode,
}

impl CameraStream {
    /// Open the camera URL and pick the streaming mode from its Content-Type.
    pub async fn connect(client: reqwest::Client, url: &str) -> Result<Self> {
        let response = client
            .get(url)
            .send()
            .await
            .with_context(|| format!("connect to camera stream {url}"))?
            .error_for_status()
            .context("camera stream rejected the request")?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let mode = if content_type.contains("multipart") {
            StreamMode::Mjpeg {
                response,
                buffer: Vec::with_capacity(64 * 1024),
            }
        } else {
            StreamMode::SingleJpeg
        };

        Ok(Self {
            client,
            url: url.to_string(),
            mode,
        })
    }

    /// Read and decode the next frame.
    pub async fn next_frame(&mut self) -> Result<Frame> {
        let jpeg = match &mut self.mode {
            StreamMode::Mjpeg { response, buffer } => next_mjpeg_jpeg(response, buffer).await?,
            StreamMode::SingleJpeg => fetch_single_jpeg(&self.client, &self.url).await?,
        };
        decode_jpeg(&jpeg)
    }
}

async fn next_mjpeg_jpeg(response: &mut reqwest::Response, buffer: &mut Vec<u8>) -> Result<Vec<u8>> {
    loop {
        if let Some((start, end)) = find_jpeg_bounds(buffer) {
            let frame = buffer[start..end].to_vec();
            buffer.drain(..end);
            return Ok(frame);
        }

        let chunk = response
            .chunk()
            .await
            .context("read mjpeg chunk")?
            .ok_or_else(|| anyhow!("mjpeg stream ended"))?;
        buffer.extend_from_slice(&chunk);

        if buffer.len() > MAX_JPEG_BYTES * 2 {
            // no frame boundary in sight; keep only a marker-sized tail
            let keep = 2.min(buffer.len());
            let drain_len = buffer.len() - keep;
            buffer.drain(..drain_len);
        }
    }
}

async fn fetch_single_jpeg(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch jpeg snapshot from {url}"))?
        .error_for_status()
        .context("snapshot endpoint rejected the request")?
        .bytes()
        .await
        .context("read jpeg snapshot")?;

    if bytes.is_empty() {
        return Err(anyhow!("empty jpeg snapshot"));
    }
    Ok(bytes.to_vec())
}

fn decode_jpeg(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes).context("decode jpeg frame")?;
    let (width, height) = image.dimensions();
    let rgb = image.into_rgb8();
    Ok(Frame {
        pixels: rgb.into_raw(),
        width,
        height,
    })
}

/// Locate one complete JPEG (SOI..EOI) in the buffer.
fn find_jpeg_bounds(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut start = None;
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == 0xFF && buffer[i + 1] == 0xD8 {
            start = Some(i);
            break;
        }
        i += 1;
    }
    let start = start?;
    let mut j = start + 2;
    while j + 1 < buffer.len() {
        if buffer[j] == 0xFF && buffer[j + 1] == 0xD9 {
            return Some((start, j + 2));
        }
        j += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_bounds_found_inside_multipart_noise() {
        let mut buffer = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        let payload_start = buffer.len();
        buffer.extend_from_slice(&[0xFF, 0xD8, 0x01, 0x02, 0x03, 0xFF, 0xD9]);
        buffer.extend_from_slice(b"\r\n--frame");

        let (start, end) = find_jpeg_bounds(&buffer).unwrap();
        assert_eq!(start, payload_start);
        assert_eq!(&buffer[start..start + 2], &[0xFF, 0xD8]);
        assert_eq!(&buffer[end - 2..end], &[0xFF, 0xD9]);
    }

    #[test]
    fn incomplete_jpeg_yields_nothing() {
        assert!(find_jpeg_bounds(&[0xFF, 0xD8, 0x01, 0x02]).is_none());
        assert!(find_jpeg_bounds(b"no markers here at all").is_none());
        assert!(find_jpeg_bounds(&[]).is_none());
    }

    #[test]
    fn decode_round_trips_an_encoded_frame() {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([200, 40, 10]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut jpeg)
            .encode_image(&img)
            .unwrap();

        let frame = decode_jpeg(&jpeg).unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert_eq!(frame.pixels.len(), 8 * 6 * 3);
    }
}
