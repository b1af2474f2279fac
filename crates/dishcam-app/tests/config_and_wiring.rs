//! 설정 및 DI 와이어링 통합 테스트.
//!
//! AppConfig → ConfigManager 영속화 → 어댑터 생성 검증.

use dishcam_core::config::AppConfig;
use dishcam_core::config_manager::ConfigManager;
use dishcam_core::error::CoreError;
use dishcam_core::secrets::Secrets;
use dishcam_network::bot_client::TelegramUploader;
use dishcam_network::vision_client::RemoteVisionAnalyzer;
use dishcam_pipeline::pipeline::PipelineOptions;
use dishcam_storage::photo_storage::PhotoStorage;
use dishcam_vision::capture::build_ffmpeg_args;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn config_defaults_are_valid() {
    let config = AppConfig::default_config();
    assert!(config.validate().is_ok());

    // 카메라
    assert!((2..=5).contains(&config.camera.flush_frames));
    assert!(config.camera.width > 0 && config.camera.height > 0);

    // 저장소
    assert_eq!(config.storage.label, "food");
    assert_eq!(config.storage.photo_dir, std::path::PathBuf::from("./image"));

    // 파이프라인 기본값: 주문 번호 입력 + 백그라운드 업로드, 분석 꺼짐
    assert!(config.pipeline.code_entry);
    assert!(config.pipeline.background_dispatch);
    assert!(!config.pipeline.analysis_enabled);
}

#[test]
fn pipeline_options_follow_config() {
    let mut config = AppConfig::default_config();
    config.pipeline.cooldown_ms = 3000;
    config.camera.flush_frames = 5;

    let options = PipelineOptions::from_config(&config);
    assert_eq!(options.cooldown, Duration::from_secs(3));
    assert_eq!(options.flush_frames, 5);
    assert_eq!(options.jpeg_quality, config.storage.jpeg_quality);
}

#[test]
fn config_manager_writes_defaults_and_loads_edits() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nested").join("config.json");

    let manager = ConfigManager::with_path(path.clone()).unwrap();
    assert!(path.exists());

    let mut config = manager.get();
    config.venue.description = "Test Kitchen".to_string();
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

    let reopened = ConfigManager::with_path(path).unwrap();
    assert_eq!(reopened.get().venue.description, "Test Kitchen");
}

#[test]
fn invalid_config_file_fails_validation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.json");
    std::fs::write(&path, r#"{ "camera": { "flush_frames": 9 } }"#).unwrap();

    let config = ConfigManager::with_path(path).unwrap().get();
    assert!(matches!(
        config.validate(),
        Err(CoreError::Validation { field, .. }) if field == "camera.flush_frames"
    ));
}

#[tokio::test]
async fn all_adapters_instantiate_from_config() {
    let tmp = TempDir::new().unwrap();
    let mut config = AppConfig::default_config();
    config.storage.photo_dir = tmp.path().join("image");

    let secrets = Secrets::from_lookup(
        |name| match name {
            "BOT_TOKEN" => Some("1:x".to_string()),
            "CHAT_ID" => Some("42".to_string()),
            "OPENAI_API_KEY" => Some("sk-x".to_string()),
            _ => None,
        },
        true,
    )
    .unwrap();

    // 저장소 (디렉토리 생성)
    let storage = PhotoStorage::new(&config.storage).await.unwrap();
    assert!(storage.photo_dir().is_dir());

    // 업로더 / 분석기
    let _uploader =
        TelegramUploader::new(&config.upload, &secrets.bot_token, &secrets.chat_id).unwrap();
    let key = secrets.analysis_api_key.as_deref().unwrap();
    let _analyzer = RemoteVisionAnalyzer::new(&config.analysis, key).unwrap();

    // 카메라 명령줄
    let args = build_ffmpeg_args(&config.camera);
    assert!(args.contains(&config.camera.device));
}

#[test]
fn config_serde_roundtrip() {
    let config = AppConfig::default_config();

    let json = serde_json::to_string(&config).unwrap();
    let deserialized: AppConfig = serde_json::from_str(&json).unwrap();

    assert_eq!(deserialized.storage.label, config.storage.label);
    assert_eq!(deserialized.pipeline.cooldown_ms, config.pipeline.cooldown_ms);
    assert_eq!(
        deserialized.analysis.provider_type,
        config.analysis.provider_type
    );
}
