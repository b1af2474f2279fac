//! # dishcam-network
//!
//! 외부 서비스 네트워크 어댑터.
//! 캡처 사진의 품질 분석(비전 모델 API)과 메신저 봇 업로드를 담당한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use dishcam_network::bot_client::TelegramUploader;
//! use dishcam_network::vision_client::RemoteVisionAnalyzer;
//!
//! let uploader = TelegramUploader::new(&config.upload, &secrets.bot_token, &secrets.chat_id)?;
//! let outcome = uploader.upload(&path, &caption).await;
//! ```

pub mod bot_client;
pub mod vision_client;
