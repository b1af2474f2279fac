//! 캡처 모델.
//!
//! 카메라 프레임 → 디스크에 저장된 사진 → 업로드 결과로 이어지는
//! 파이프라인 데이터 구조체.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 카메라에서 읽은 원시 프레임 (RGB8, 행 우선)
#[derive(Clone)]
pub struct Frame {
    /// 너비 (픽셀)
    pub width: u32,
    /// 높이 (픽셀)
    pub height: u32,
    /// RGB8 픽셀 버퍼 (`width * height * 3` 바이트)
    pub data: Vec<u8>,
    /// 읽은 시각
    pub captured_at: DateTime<Local>,
}

impl Frame {
    /// RGB8 한 프레임의 바이트 수
    pub fn rgb_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// 디스크에 저장된 캡처 사진
///
/// 생성 후 불변. 중복으로 판정된 경우에만 디스크에서 삭제된다.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// 저장된 JPEG 바이트
    pub bytes: Vec<u8>,
    /// 캡처 시각
    pub timestamp: DateTime<Local>,
    /// 주문 번호 (앞뒤 공백 제거됨, 비어 있으면 None)
    pub order_code: Option<String>,
    /// 저장 경로
    pub file_path: PathBuf,
}

/// 디스크 바이트의 SHA-256 지문
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; 32]);

impl Fingerprint {
    /// 소문자 16진 문자열
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

/// 업로드 1회 결과 (재시도/영속화 없음, 로그로만 남김)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// HTTP 2xx 여부
    pub success: bool,
    /// 응답 본문 또는 에러 메시지
    pub detail: String,
}

impl UploadOutcome {
    /// 성공 결과
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
        }
    }

    /// 실패 결과
    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_hex_is_64_chars() {
        let fp = Fingerprint([0xab; 32]);
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("abab"));
        assert_eq!(fp.to_string(), hex);
    }

    #[test]
    fn frame_debug_omits_pixels() {
        let frame = Frame {
            width: 2,
            height: 1,
            data: vec![0; Frame::rgb_len(2, 1)],
            captured_at: Local::now(),
        };
        let debug = format!("{frame:?}");
        assert!(debug.contains("bytes: 6"));
    }

    #[test]
    fn upload_outcome_constructors() {
        assert!(UploadOutcome::success("ok").success);
        let failed = UploadOutcome::failure("403 Forbidden");
        assert!(!failed.success);
        assert_eq!(failed.detail, "403 Forbidden");
    }
}
