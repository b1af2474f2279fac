//! 사진 업로드 포트.
//!
//! 구현: `dishcam-network` crate (`TelegramUploader`)

use async_trait::async_trait;
use std::path::Path;

use crate::models::capture::UploadOutcome;

/// 메신저 사진 업로더
///
/// 한 번만 시도하고 재시도하지 않는다. 모든 실패는 `UploadOutcome`으로 반환하며
/// 호출 측으로 에러를 던지지 않는다.
#[async_trait]
pub trait PhotoUploader: Send + Sync {
    /// 사진 파일과 캡션 업로드
    async fn upload(&self, photo_path: &Path, caption: &str) -> UploadOutcome;
}
