//! # dishcam-vision
//!
//! 카메라 측 이미지 처리 크레이트.
//! ffmpeg 기반 웹캠 프레임 소스, JPEG 인코딩, 연속 중복 캡처를 잡는
//! SHA-256 지문 게이트를 담당한다.

pub mod capture;
pub mod encoder;
pub mod fingerprint;
