//! dishcam 도메인 모델.
//!
//! 캡처 프레임, 저장된 사진, 지문(fingerprint), 업로드 결과를 정의한다.

pub mod capture;
