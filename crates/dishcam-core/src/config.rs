//! 애플리케이션 설정 구조체.
//!
//! 카메라 장치, 사진 저장 경로, 업장 설명, 파이프라인 플래그,
//! 분석/업로드 엔드포인트 등 런타임 설정을 정의한다.
//! 시크릿(봇 토큰, 채팅 ID, API 키)은 설정 파일에 두지 않고 환경변수에서 읽는다.

use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 카메라 설정
    #[serde(default)]
    pub camera: CameraConfig,
    /// 사진 저장 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 캡션에 들어가는 업장 설명
    #[serde(default)]
    pub venue: VenueConfig,
    /// 캡처 파이프라인 동작 플래그
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// 원격 이미지 분석 설정
    #[serde(default)]
    pub analysis: AnalysisConfig,
    /// 메신저 봇 업로드 설정
    #[serde(default)]
    pub upload: UploadConfig,
    /// 로그 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ============================================================
// 카메라 설정
// ============================================================

/// 카메라 설정: ffmpeg 입력 장치와 해상도
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// 장치 식별자 (Linux: "/dev/video0", macOS: "0", Windows: "video=USB Camera")
    #[serde(default = "default_camera_device")]
    pub device: String,
    /// 프레임 너비 (픽셀)
    #[serde(default = "default_camera_width")]
    pub width: u32,
    /// 프레임 높이 (픽셀)
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// 요청 프레임레이트
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
    /// 캡처 직전 버릴 버퍼 프레임 수 (2~5)
    #[serde(default = "default_flush_frames")]
    pub flush_frames: u32,
    /// ffmpeg 실행 파일 경로
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_camera_device(),
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
            flush_frames: default_flush_frames(),
            ffmpeg_path: default_ffmpeg_path(),
        }
    }
}

// ============================================================
// 저장소 설정
// ============================================================

/// 사진 저장 설정: 디렉토리, 파일명 라벨, 타임스탬프 형식
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 사진 저장 디렉토리
    #[serde(default = "default_photo_dir")]
    pub photo_dir: PathBuf,
    /// 모든 파일명에 붙는 고정 라벨
    #[serde(default = "default_label")]
    pub label: String,
    /// JPEG 품질 (1~100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// 파일명용 타임스탬프 형식 (chrono strftime)
    #[serde(default = "default_filename_timestamp_format")]
    pub filename_timestamp_format: String,
    /// 캡션용 타임스탬프 형식 (chrono strftime)
    #[serde(default = "default_caption_timestamp_format")]
    pub caption_timestamp_format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            photo_dir: default_photo_dir(),
            label: default_label(),
            jpeg_quality: default_jpeg_quality(),
            filename_timestamp_format: default_filename_timestamp_format(),
            caption_timestamp_format: default_caption_timestamp_format(),
        }
    }
}

/// 업장 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// 캡션 두 번째 줄에 고정으로 들어가는 설명
    #[serde(default = "default_venue_description")]
    pub description: String,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            description: default_venue_description(),
        }
    }
}

// ============================================================
// 파이프라인 설정
// ============================================================

/// 캡처 파이프라인 설정: 변형별 동작을 플래그로 선택
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 주문 번호 입력 활성화
    #[serde(default = "default_true")]
    pub code_entry: bool,
    /// 분석+업로드를 백그라운드 태스크로 실행
    #[serde(default = "default_true")]
    pub background_dispatch: bool,
    /// 원격 이미지 분석 활성화
    #[serde(default)]
    pub analysis_enabled: bool,
    /// 업로드 후 다음 캡처까지 대기 시간 (밀리초)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// 쿨다운 중 들어온 캡처 트리거를 버림 (false면 쿨다운 후 처리)
    #[serde(default)]
    pub drop_triggers_during_cooldown: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            code_entry: true,
            background_dispatch: true,
            analysis_enabled: false,
            cooldown_ms: default_cooldown_ms(),
            drop_triggers_during_cooldown: false,
        }
    }
}

// ============================================================
// AI 분석 / 업로드 설정
// ============================================================

/// AI API 제공자 타입: 요청/응답 형식 및 인증 헤더 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AiProviderType {
    /// Anthropic Claude API: `x-api-key` 헤더 + `/v1/messages` 형식
    Anthropic,
    /// OpenAI 호환 API: `Authorization: Bearer` 헤더 + `/v1/chat/completions` 형식
    #[default]
    OpenAi,
}

/// 원격 이미지 분석 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// API URL
    #[serde(default = "default_analysis_endpoint")]
    pub endpoint: String,
    /// 모델 이름
    #[serde(default = "default_analysis_model")]
    pub model: String,
    /// 제공자 타입
    #[serde(default)]
    pub provider_type: AiProviderType,
    /// 이미지와 함께 보내는 고정 지시문
    #[serde(default = "default_analysis_prompt")]
    pub prompt: String,
    /// 분석 실패 시 대신 쓰는 문자열
    #[serde(default = "default_fallback_text")]
    pub fallback_text: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_analysis_endpoint(),
            model: default_analysis_model(),
            provider_type: AiProviderType::default(),
            prompt: default_analysis_prompt(),
            fallback_text: default_fallback_text(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl AnalysisConfig {
    /// 분석 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 메신저 봇 업로드 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// 봇 API 기본 URL
    #[serde(default = "default_upload_api_base")]
    pub api_base: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            api_base: default_upload_api_base(),
            timeout_secs: default_api_timeout_secs(),
        }
    }
}

impl UploadConfig {
    /// 업로드 요청 타임아웃
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 로그 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 상태 로그를 덧붙일 파일 (None이면 콘솔만)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            camera: CameraConfig::default(),
            storage: StorageConfig::default(),
            venue: VenueConfig::default(),
            pipeline: PipelineConfig::default(),
            analysis: AnalysisConfig::default(),
            upload: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// 설정 불변식 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(2..=5).contains(&self.camera.flush_frames) {
            return Err(validation(
                "camera.flush_frames",
                format!("2~5 범위여야 함 (현재 {})", self.camera.flush_frames),
            ));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(validation(
                "camera.width/height",
                "해상도는 0보다 커야 함".to_string(),
            ));
        }
        if self.camera.device.trim().is_empty() {
            return Err(validation("camera.device", "비어 있음".to_string()));
        }
        if self.storage.label.trim().is_empty() {
            return Err(validation("storage.label", "비어 있음".to_string()));
        }
        if self
            .storage
            .label
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
        {
            return Err(validation(
                "storage.label",
                "경로 구분자나 공백을 포함할 수 없음".to_string(),
            ));
        }
        if !(1..=100).contains(&self.storage.jpeg_quality) {
            return Err(validation(
                "storage.jpeg_quality",
                format!("1~100 범위여야 함 (현재 {})", self.storage.jpeg_quality),
            ));
        }
        for (field, format) in [
            (
                "storage.filename_timestamp_format",
                &self.storage.filename_timestamp_format,
            ),
            (
                "storage.caption_timestamp_format",
                &self.storage.caption_timestamp_format,
            ),
        ] {
            if format.trim().is_empty()
                || StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
            {
                return Err(validation(
                    field,
                    format!("잘못된 타임스탬프 형식: {format:?}"),
                ));
            }
        }
        if self.venue.description.trim().is_empty() {
            return Err(validation("venue.description", "비어 있음".to_string()));
        }
        Ok(())
    }

    /// 쿨다운을 Duration으로 반환
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.pipeline.cooldown_ms)
    }
}

fn validation(field: &str, message: String) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message,
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_camera_device() -> String {
    if cfg!(target_os = "linux") {
        "/dev/video0".to_string()
    } else {
        "0".to_string()
    }
}
fn default_camera_width() -> u32 {
    1280
}
fn default_camera_height() -> u32 {
    720
}
fn default_camera_fps() -> u32 {
    30
}
fn default_flush_frames() -> u32 {
    2
}
fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_photo_dir() -> PathBuf {
    PathBuf::from("./image")
}
fn default_label() -> String {
    "food".to_string()
}
fn default_jpeg_quality() -> u8 {
    90
}
fn default_filename_timestamp_format() -> String {
    "%Y%m%d_%H%M%S".to_string()
}
fn default_caption_timestamp_format() -> String {
    "%b %-d, %Y %-I:%M:%S %p".to_string()
}
fn default_venue_description() -> String {
    "Chinese Dragon Cafe - Milagiriya Branch".to_string()
}
fn default_cooldown_ms() -> u64 {
    2_000
}
fn default_analysis_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_analysis_model() -> String {
    "gpt-4o".to_string()
}
fn default_analysis_prompt() -> String {
    "You are a food quality inspector. Analyze the following image and report on:\n\
     - Visual freshness (e.g. browning, wilting, dryness, burn marks)\n\
     - Presentation (is it neat, messy, well-arranged?)\n\
     - Anything unusual or problematic (foreign objects, wrong portion size, etc.)\n\
     Give your answer in 2-3 sentences and a 1-5 quality score."
        .to_string()
}
fn default_fallback_text() -> String {
    "Food image".to_string()
}
fn default_api_timeout_secs() -> u64 {
    30
}
fn default_upload_api_base() -> String {
    "https://api.telegram.org".to_string()
}
