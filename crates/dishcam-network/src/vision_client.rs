//! 원격 이미지 분석 클라이언트.
//!
//! 캡처 JPEG를 base64 데이터 URI로 인코딩해 고정 지시문과 함께
//! 비전 모델 API에 보내고, 짧은 품질 평가 텍스트를 받는다.
//! 분석은 부가 정보일 뿐이므로 실패는 호출자에게 전파하지 않고
//! 설정된 대체 문자열을 돌려준다.

use async_trait::async_trait;
use base64::Engine;
use tracing::{debug, warn};

use dishcam_core::config::{AiProviderType, AnalysisConfig};
use dishcam_core::error::CoreError;
use dishcam_core::ports::analyzer::ImageAnalyzer;

/// 분석 응답 최대 토큰
const MAX_TOKENS: u32 = 300;

// ============================================================
// RemoteVisionAnalyzer: 외부 비전 API 클라이언트
// ============================================================

/// 외부 비전 API 클라이언트
///
/// 지원 API:
/// - OpenAI 호환: `POST /v1/chat/completions` + `image_url` 데이터 URI
/// - Claude (Anthropic): `POST /v1/messages` + base64 image 블록
#[cfg_attr(test, derive(Debug))]
pub struct RemoteVisionAnalyzer {
    http_client: reqwest::Client,
    endpoint: String,
    /// API 키 (메모리에만 유지)
    api_key: String,
    model: String,
    prompt: String,
    fallback_text: String,
    provider_type: AiProviderType,
}

impl RemoteVisionAnalyzer {
    /// 새 분석 클라이언트 생성
    pub fn new(config: &AnalysisConfig, api_key: &str) -> Result<Self, CoreError> {
        if api_key.trim().is_empty() {
            return Err(CoreError::Config("분석 API 키 미설정".into()));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        debug!(
            endpoint = %config.endpoint,
            model = %config.model,
            provider = ?config.provider_type,
            timeout = config.timeout_secs,
            "RemoteVisionAnalyzer 초기화"
        );

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            fallback_text: config.fallback_text.clone(),
            provider_type: config.provider_type,
        })
    }

    /// 대체 문자열
    pub fn fallback_text(&self) -> &str {
        &self.fallback_text
    }

    /// 제공자 형식에 맞는 요청 본문 구성
    fn build_request_body(&self, encoded: &str) -> serde_json::Value {
        match self.provider_type {
            AiProviderType::OpenAi => serde_json::json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "messages": [{
                    "role": "user",
                    "content": [
                        { "type": "text", "text": self.prompt },
                        {
                            "type": "image_url",
                            "image_url": { "url": format!("data:image/jpeg;base64,{encoded}") }
                        }
                    ]
                }]
            }),
            AiProviderType::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": MAX_TOKENS,
                "messages": [{
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": "image/jpeg",
                                "data": encoded
                            }
                        },
                        { "type": "text", "text": self.prompt }
                    ]
                }]
            }),
        }
    }

    /// OpenAI 응답: choices[0].message.content
    fn parse_openai_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)?;
        response
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .map(|t| t.trim().to_string())
            .ok_or_else(|| CoreError::Internal("OpenAI 응답에서 텍스트를 찾을 수 없음".into()))
    }

    /// Claude 응답: content[].text 연결
    fn parse_claude_response(body: &str) -> Result<String, CoreError> {
        let response: serde_json::Value = serde_json::from_str(body)?;
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| CoreError::Internal("Claude 응답에 content 없음".into()))?;

        let text = blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(text.trim().to_string())
    }

    /// 실제 API 호출 (실패는 Err)
    async fn try_analyze(&self, image: &[u8]) -> Result<String, CoreError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let request_body = self.build_request_body(&encoded);

        debug!(
            endpoint = %self.endpoint,
            model = %self.model,
            image_size = image.len(),
            "이미지 분석 API 호출"
        );

        let mut builder = self.http_client.post(&self.endpoint).json(&request_body);
        builder = match self.provider_type {
            AiProviderType::Anthropic => builder
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            AiProviderType::OpenAi => {
                builder.header("Authorization", format!("Bearer {}", self.api_key))
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("분석 API 호출 실패: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("분석 API 응답 읽기 실패: {e}")))?;

        if !status.is_success() {
            return Err(CoreError::Network(format!(
                "분석 API 오류 ({status}): {}",
                body.chars().take(200).collect::<String>()
            )));
        }

        let text = match self.provider_type {
            AiProviderType::OpenAi => Self::parse_openai_response(&body)?,
            AiProviderType::Anthropic => Self::parse_claude_response(&body)?,
        };

        if text.is_empty() {
            return Err(CoreError::Internal("분석 결과가 비어 있음".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ImageAnalyzer for RemoteVisionAnalyzer {
    async fn analyze(&self, image: &[u8]) -> String {
        match self.try_analyze(image).await {
            Ok(text) => {
                debug!(chars = text.chars().count(), "분석 결과 수신");
                text
            }
            Err(e) => {
                warn!("이미지 분석 실패, 대체 문자열 사용: {e}");
                self.fallback_text.clone()
            }
        }
    }

    fn provider_name(&self) -> &str {
        match self.provider_type {
            AiProviderType::OpenAi => "openai",
            AiProviderType::Anthropic => "anthropic",
        }
    }
}

// ============================================================
// 테스트
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: String, provider_type: AiProviderType) -> AnalysisConfig {
        AnalysisConfig {
            endpoint,
            provider_type,
            timeout_secs: 5,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn empty_key_rejected() {
        let result = RemoteVisionAnalyzer::new(&AnalysisConfig::default(), "  ");
        assert!(result.unwrap_err().to_string().contains("미설정"));
    }

    #[test]
    fn openai_body_carries_data_uri_and_prompt() {
        let analyzer = RemoteVisionAnalyzer::new(&AnalysisConfig::default(), "k").unwrap();
        let body = analyzer.build_request_body("QUJD");

        assert_eq!(body["model"], "gpt-4o");
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["text"], analyzer.prompt.as_str());
        assert_eq!(
            content[1]["image_url"]["url"],
            "data:image/jpeg;base64,QUJD"
        );
    }

    #[test]
    fn parse_claude_joins_text_blocks() {
        let body = r#"{"content":[{"type":"text","text":"Fresh."},{"type":"text","text":"4/5"}]}"#;
        assert_eq!(
            RemoteVisionAnalyzer::parse_claude_response(body).unwrap(),
            "Fresh.\n4/5"
        );
    }

    #[tokio::test]
    async fn openai_success_returns_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":" Crisp and neat. Score 5. "}}]}"#)
            .create_async()
            .await;

        let analyzer = RemoteVisionAnalyzer::new(
            &config(
                format!("{}/v1/chat/completions", server.url()),
                AiProviderType::OpenAi,
            ),
            "sk-test",
        )
        .unwrap();

        assert_eq!(analyzer.analyze(b"jpeg").await, "Crisp and neat. Score 5.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn anthropic_uses_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "ak-test")
            .match_header("anthropic-version", "2023-06-01")
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"Slightly dry. 3/5"}]}"#)
            .create_async()
            .await;

        let analyzer = RemoteVisionAnalyzer::new(
            &config(
                format!("{}/v1/messages", server.url()),
                AiProviderType::Anthropic,
            ),
            "ak-test",
        )
        .unwrap();

        assert_eq!(analyzer.provider_name(), "anthropic");
        assert_eq!(analyzer.analyze(b"jpeg").await, "Slightly dry. 3/5");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let analyzer = RemoteVisionAnalyzer::new(
            &config(
                format!("{}/v1/chat/completions", server.url()),
                AiProviderType::OpenAi,
            ),
            "k",
        )
        .unwrap();

        assert_eq!(analyzer.analyze(b"jpeg").await, "Food image");
    }

    #[tokio::test]
    async fn malformed_body_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let analyzer = RemoteVisionAnalyzer::new(
            &config(
                format!("{}/v1/chat/completions", server.url()),
                AiProviderType::OpenAi,
            ),
            "k",
        )
        .unwrap();

        assert_eq!(analyzer.analyze(b"jpeg").await, analyzer.fallback_text());
    }

    #[tokio::test]
    async fn unreachable_endpoint_falls_back() {
        // 포트 1은 연결 거부
        let analyzer = RemoteVisionAnalyzer::new(
            &config(
                "http://127.0.0.1:1/v1/chat/completions".to_string(),
                AiProviderType::OpenAi,
            ),
            "k",
        )
        .unwrap();

        assert_eq!(analyzer.analyze(b"jpeg").await, "Food image");
    }
}
