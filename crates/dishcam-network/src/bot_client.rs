//! 메신저 봇 사진 업로드 클라이언트.
//!
//! `POST {api_base}/bot{token}/sendPhoto` 에 multipart 본문
//! (`chat_id`, `caption`, 파일 필드 `photo`)을 한 번 보낸다.
//! 성공 판정은 HTTP 2xx 여부뿐이며 재시도하지 않는다.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use tracing::{debug, info, warn};

use dishcam_core::config::UploadConfig;
use dishcam_core::error::CoreError;
use dishcam_core::models::capture::UploadOutcome;
use dishcam_core::ports::uploader::PhotoUploader;

/// 업로드 실패 상세에 담을 응답 본문 최대 길이
const DETAIL_MAX_CHARS: usize = 500;

/// 봇 API 사진 업로더
pub struct TelegramUploader {
    http_client: reqwest::Client,
    api_base: String,
    /// 봇 토큰 (URL 경로에 들어가므로 로그에 남기지 않음)
    bot_token: String,
    chat_id: String,
}

impl TelegramUploader {
    /// 새 업로더 생성
    pub fn new(config: &UploadConfig, bot_token: &str, chat_id: &str) -> Result<Self, CoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        debug!(api_base = %config.api_base, chat_id, "TelegramUploader 초기화");

        Ok(Self {
            http_client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }

    fn send_photo_url(&self) -> String {
        format!("{}/bot{}/sendPhoto", self.api_base, self.bot_token)
    }

    /// 토큰이 섞였을 수 있는 에러 문자열 마스킹
    fn redact(&self, message: String) -> String {
        if self.bot_token.is_empty() {
            message
        } else {
            message.replace(&self.bot_token, "***")
        }
    }

    async fn build_form(&self, photo_path: &Path, caption: &str) -> Result<Form, CoreError> {
        let bytes = tokio::fs::read(photo_path).await?;
        let file_name = photo_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "photo.jpg".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| CoreError::Internal(format!("multipart 구성 실패: {e}")))?;

        Ok(Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption.to_string())
            .part("photo", part))
    }
}

#[async_trait]
impl PhotoUploader for TelegramUploader {
    async fn upload(&self, photo_path: &Path, caption: &str) -> UploadOutcome {
        let form = match self.build_form(photo_path, caption).await {
            Ok(form) => form,
            Err(e) => {
                warn!("업로드 준비 실패: {}: {e}", photo_path.display());
                return UploadOutcome::failure(e.to_string());
            }
        };

        let response = match self
            .http_client
            .post(self.send_photo_url())
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let detail = self.redact(format!("업로드 요청 실패: {e}"));
                warn!("{detail}");
                return UploadOutcome::failure(detail);
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail: String = body.chars().take(DETAIL_MAX_CHARS).collect();

        if status.is_success() {
            info!("사진 업로드 완료: {}", photo_path.display());
            UploadOutcome::success(detail)
        } else {
            warn!(status = %status, "사진 업로드 실패: {detail}");
            UploadOutcome::failure(format!("HTTP {status}: {detail}"))
        }
    }
}

// ============================================================
// 테스트
// ============================================================
