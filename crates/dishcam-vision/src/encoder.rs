//! JPEG 인코더.
//!
//! 카메라 RGB8 프레임을 저장/업로드용 JPEG 바이트로 변환한다.

use dishcam_core::error::CoreError;
use dishcam_core::models::capture::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use tracing::debug;

/// JPEG 인코딩
///
/// `quality`는 1~100 범위로 보정된다.
pub fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, CoreError> {
    let expected = Frame::rgb_len(frame.width, frame.height);
    if frame.data.len() != expected {
        return Err(CoreError::Encoding(format!(
            "프레임 크기 불일치: {}x{} → {} bytes 필요, {} bytes 수신",
            frame.width,
            frame.height,
            expected,
            frame.data.len()
        )));
    }

    let quality = quality.clamp(1, 100);
    let mut out = Vec::with_capacity(expected / 8);
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode(&frame.data, frame.width, frame.height, ExtendedColorType::Rgb8)
        .map_err(|e| CoreError::Encoding(format!("JPEG 인코딩 실패: {e}")))?;

    debug!(
        "JPEG 인코딩: {}x{} → {} bytes (품질 {})",
        frame.width,
        frame.height,
        out.len(),
        quality
    );

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn solid_frame(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(Frame::rgb_len(w, h))
            .collect();
        Frame {
            width: w,
            height: h,
            data,
            captured_at: Local::now(),
        }
    }

    #[test]
    fn encodes_valid_jpeg() {
        let frame = solid_frame(64, 48, [200, 120, 40]);
        let jpeg = encode_jpeg(&frame, 90).unwrap();

        // SOI / EOI 마커
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 64);
        assert_eq!(decoded.height(), 48);
    }

    #[test]
    fn same_frame_encodes_identically() {
        let frame = solid_frame(32, 32, [10, 20, 30]);
        assert_eq!(
            encode_jpeg(&frame, 85).unwrap(),
            encode_jpeg(&frame, 85).unwrap()
        );
    }

    #[test]
    fn short_buffer_rejected() {
        let mut frame = solid_frame(8, 8, [0, 0, 0]);
        frame.data.truncate(10);
        assert!(matches!(
            encode_jpeg(&frame, 90),
            Err(CoreError::Encoding(_))
        ));
    }
}
