//! 프로세스 환경변수에서 읽는 시크릿.
//!
//! 누락은 캡처 단위 에러가 아니라 시작 시 에러다.

use std::fmt;

use crate::error::CoreError;

/// 봇 토큰 환경변수
pub const BOT_TOKEN_VAR: &str = "BOT_TOKEN";
/// 채팅/채널 ID 환경변수
pub const CHAT_ID_VAR: &str = "CHAT_ID";
/// 분석 서비스 API 키 환경변수
pub const ANALYSIS_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// 런타임 시크릿 묶음
#[derive(Clone)]
pub struct Secrets {
    /// 메신저 봇 토큰
    pub bot_token: String,
    /// 업로드 대상 채팅/채널 ID
    pub chat_id: String,
    /// 분석 서비스 API 키 (분석 비활성화 시 None 허용)
    pub analysis_api_key: Option<String>,
}

impl Secrets {
    /// 프로세스 환경변수에서 로드
    pub fn from_env(require_analysis_key: bool) -> Result<Self, CoreError> {
        Self::from_lookup(|name| std::env::var(name).ok(), require_analysis_key)
    }

    /// 임의 조회 함수에서 로드 (공백뿐인 값은 누락으로 취급)
    pub fn from_lookup<F>(lookup: F, require_analysis_key: bool) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token =
            get(BOT_TOKEN_VAR).ok_or_else(|| CoreError::MissingSecret(BOT_TOKEN_VAR.into()))?;
        let chat_id =
            get(CHAT_ID_VAR).ok_or_else(|| CoreError::MissingSecret(CHAT_ID_VAR.into()))?;
        let analysis_api_key = get(ANALYSIS_API_KEY_VAR);

        if require_analysis_key && analysis_api_key.is_none() {
            return Err(CoreError::MissingSecret(ANALYSIS_API_KEY_VAR.into()));
        }

        Ok(Self {
            bot_token,
            chat_id,
            analysis_api_key,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("bot_token", &"***")
            .field("chat_id", &self.chat_id)
            .field(
                "analysis_api_key",
                &self.analysis_api_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}
