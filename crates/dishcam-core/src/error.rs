//! dishcam 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 외부 에러를 `map_err`로 `CoreError`에 매핑한다.
//! 중복 캡처, 분석 실패, 업로드 실패는 에러가 아니라 정상 분기로 다룬다
//! (`GateVerdict::Duplicate`, 폴백 문자열, `UploadOutcome`).

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 카메라 장치를 열 수 없음 (시작 시 치명적)
    #[error("카메라 장치 사용 불가 — {device}: {reason}")]
    DeviceUnavailable {
        /// 장치 식별자 (예: "/dev/video0")
        device: String,
        /// 실패 사유
        reason: String,
    },

    /// 프레임 읽기 실패 (일시적, 루프는 계속)
    #[error("프레임 사용 불가: {0}")]
    FrameUnavailable(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 필수 시크릿(환경변수) 누락
    #[error("필수 환경변수 누락: {0}")]
    MissingSecret(String),

    /// 이미지 인코딩 실패
    #[error("이미지 인코딩 에러: {0}")]
    Encoding(String),

    /// 네트워크 에러 (연결 실패, 타임아웃, 비정상 응답)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_unavailable_message_names_device() {
        let err = CoreError::DeviceUnavailable {
            device: "/dev/video0".to_string(),
            reason: "ffmpeg 실행 실패".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/dev/video0"));
        assert!(msg.contains("ffmpeg 실행 실패"));
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
    }
}
