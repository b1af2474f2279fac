//! # dishcam-storage
//!
//! 로컬 사진 저장소 어댑터.
//! 캡처 JPEG를 파일명 규칙에 따라 저장하고, 중복 판정된 사진을 삭제한다.
//!
//! ## 모듈
//! - `photo_storage`: 사진 파일 저장소 및 파일명 규칙

pub mod photo_storage;
