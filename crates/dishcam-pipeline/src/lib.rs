//! # dishcam-pipeline
//!
//! 캡처 파이프라인.
//! 트리거 입력을 받아 프레임을 저장하고, 직전 캡처와 같은 사진은 지우며,
//! 고유한 사진만 캡션과 함께 분석/업로드 실행기로 넘긴다.
//!
//! ## 모듈
//! - `pipeline`: 상태 기계 (`CapturePipeline`)
//! - `dispatch`: 분석 + 업로드 작업과 실행기 (인라인 / 백그라운드)
//! - `caption`: 캡션 빌더
//! - `order_code`: 주문 번호 입력 버퍼

pub mod caption;
pub mod dispatch;
pub mod order_code;
pub mod pipeline;
