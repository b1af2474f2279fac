//! # dishcam
//!
//! 주방 음식 사진 캡처 바이너리 진입점.
//! 설정/시크릿 로드, 어댑터 생성(DI), 트리거 소스 연결, 라이프사이클 관리.

mod lifecycle;
mod logging;
mod trigger;

use anyhow::{Context, Result};
use clap::Parser;
use dishcam_core::config::AppConfig;
use dishcam_core::config_manager::ConfigManager;
use dishcam_core::ports::analyzer::ImageAnalyzer;
use dishcam_core::secrets::Secrets;
use dishcam_network::bot_client::TelegramUploader;
use dishcam_network::vision_client::RemoteVisionAnalyzer;
use dishcam_pipeline::caption::CaptionBuilder;
use dishcam_pipeline::dispatch::{BackgroundExecutor, Dispatch, DispatchExecutor, InlineExecutor};
use dishcam_pipeline::pipeline::{CapturePipeline, PipelineOptions};
use dishcam_storage::photo_storage::PhotoStorage;
use dishcam_vision::capture::FfmpegFrameSource;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::lifecycle::LifecycleManager;
use crate::trigger::{PromptLine, RawModeGuard, TriggerMode};

/// 트리거 입력 채널 용량
const TRIGGER_CHANNEL_CAPACITY: usize = 64;

/// 주방 음식 사진 캡처 → 중복 제거 → 메신저 업로드
#[derive(Parser, Debug)]
#[command(name = "dishcam")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 트리거 입력 방식
    #[arg(long, short = 't', value_enum, default_value_t = TriggerMode::Keyboard)]
    trigger: TriggerMode,

    /// 카메라 장치 (예: /dev/video0)
    #[arg(long, short = 'd')]
    device: Option<String>,

    /// 사진 저장 디렉토리
    #[arg(long)]
    photo_dir: Option<PathBuf>,

    /// 업로드 후 쿨다운 (밀리초)
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// 원격 이미지 분석 사용
    #[arg(long, conflicts_with = "no_analysis")]
    analysis: bool,

    /// 원격 이미지 분석 끄기
    #[arg(long)]
    no_analysis: bool,

    /// 업로드를 캡처 루프에서 기다림
    #[arg(long, conflicts_with = "background")]
    foreground: bool,

    /// 업로드를 백그라운드 태스크로 실행
    #[arg(long)]
    background: bool,

    /// 주문 번호 입력 끄기
    #[arg(long)]
    no_code_entry: bool,

    /// 적용된 설정을 JSON으로 출력하고 종료
    #[arg(long)]
    print_config: bool,
}

/// CLI 인자로 설정 덮어쓰기
fn apply_overrides(args: &Args, config: &mut AppConfig) {
    if let Some(device) = &args.device {
        config.camera.device = device.clone();
    }
    if let Some(dir) = &args.photo_dir {
        config.storage.photo_dir = dir.clone();
    }
    if let Some(ms) = args.cooldown_ms {
        config.pipeline.cooldown_ms = ms;
    }
    if args.analysis {
        config.pipeline.analysis_enabled = true;
    }
    if args.no_analysis {
        config.pipeline.analysis_enabled = false;
    }
    if args.foreground {
        config.pipeline.background_dispatch = false;
    }
    if args.background {
        config.pipeline.background_dispatch = true;
    }
    if args.no_code_entry {
        config.pipeline.code_entry = false;
    }
}

fn load_config_manager(path: Option<PathBuf>) -> Result<ConfigManager> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    Ok(manager)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_manager = load_config_manager(args.config.clone()).context("설정 로드 실패")?;
    let mut config = config_manager.get();
    apply_overrides(&args, &mut config);
    config.validate().context("설정 검증 실패")?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let prompt = (args.trigger == TriggerMode::Keyboard).then(PromptLine::new);
    logging::init(&args.log_level, config.logging.file.as_deref(), prompt.clone())?;

    info!("dishcam 시작 (v{})", env!("CARGO_PKG_VERSION"));
    info!("설정 파일: {}", config_manager.config_path().display());

    // ── 시크릿 (누락은 시작 에러) ──
    let secrets = Secrets::from_env(config.pipeline.analysis_enabled)?;
    info!(chat_id = %secrets.chat_id, "시크릿 로드 완료");

    // ── 어댑터 생성 (DI 와이어링) ──

    // 1. 사진 저장소
    let storage = PhotoStorage::new(&config.storage).await?;

    // 2. 업로더
    let uploader = Arc::new(TelegramUploader::new(
        &config.upload,
        &secrets.bot_token,
        &secrets.chat_id,
    )?);

    // 3. 분석기 (선택)
    let analyzer: Option<Arc<dyn ImageAnalyzer>> = match &secrets.analysis_api_key {
        Some(key) if config.pipeline.analysis_enabled => {
            let analyzer = RemoteVisionAnalyzer::new(&config.analysis, key)?;
            info!(
                provider = analyzer.provider_name(),
                model = %config.analysis.model,
                "이미지 분석 활성화"
            );
            Some(Arc::new(analyzer))
        }
        _ => None,
    };

    // 4. 디스패치 + 실행기
    let dispatch = Arc::new(Dispatch::new(
        analyzer,
        uploader,
        CaptionBuilder::new(config.venue.description.clone()),
    ));
    let executor: Arc<dyn DispatchExecutor> = if config.pipeline.background_dispatch {
        Arc::new(BackgroundExecutor)
    } else {
        Arc::new(InlineExecutor)
    };

    // 5. 카메라 (열기 실패는 치명적)
    let source = FfmpegFrameSource::open(&config.camera).await?;

    let mut pipeline = CapturePipeline::new(
        Box::new(source),
        storage,
        dispatch,
        executor,
        PipelineOptions::from_config(&config),
    );

    // ── 라이프사이클 ──
    let lifecycle = Arc::new(LifecycleManager::new());
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move {
            lifecycle.wait_for_signal().await;
        });
    }

    // ── 트리거 소스 ──
    let (trigger_tx, trigger_rx) = mpsc::channel(TRIGGER_CHANNEL_CAPACITY);
    let raw_guard = match args.trigger {
        TriggerMode::Keyboard => {
            let guard = RawModeGuard::enable().context("터미널 raw 모드 전환 실패")?;
            trigger::spawn_keyboard(trigger_tx);
            tokio::spawn(trigger::run_prompt(
                pipeline.subscribe_order_code(),
                prompt.clone().unwrap_or_default(),
            ));
            info!("주문 번호 입력 후 Enter: 캡처, Backspace: 지우기, Esc: 종료");
            Some(guard)
        }
        TriggerMode::Line => {
            trigger::spawn_lines(trigger_tx);
            info!("한 줄 입력마다 캡처 (줄 내용 = 주문 번호), EOF: 종료");
            None
        }
    };

    let stats = pipeline.run(trigger_rx, lifecycle.subscribe()).await;
    if let Some(prompt) = &prompt {
        prompt.hide();
    }
    drop(raw_guard);

    if config.pipeline.background_dispatch && stats.dispatched > 0 {
        warn!("진행 중인 백그라운드 업로드는 종료와 함께 중단될 수 있음");
    }
    info!(
        "dishcam 종료: 업로드 {}건, 중복 {}건, 프레임 실패 {}건",
        stats.dispatched, stats.duplicates, stats.frame_failures
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dishcam").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_leave_config_untouched() {
        let args = parse(&[]);
        let mut config = AppConfig::default_config();
        apply_overrides(&args, &mut config);

        assert_eq!(args.trigger, TriggerMode::Keyboard);
        assert!(config.pipeline.background_dispatch);
        assert!(!config.pipeline.analysis_enabled);
        assert!(config.pipeline.code_entry);
    }

    #[test]
    fn flags_override_config() {
        let args = parse(&[
            "--trigger",
            "line",
            "--device",
            "/dev/video3",
            "--cooldown-ms",
            "3000",
            "--analysis",
            "--foreground",
            "--no-code-entry",
        ]);
        let mut config = AppConfig::default_config();
        apply_overrides(&args, &mut config);

        assert_eq!(args.trigger, TriggerMode::Line);
        assert_eq!(config.camera.device, "/dev/video3");
        assert_eq!(config.pipeline.cooldown_ms, 3000);
        assert!(config.pipeline.analysis_enabled);
        assert!(!config.pipeline.background_dispatch);
        assert!(!config.pipeline.code_entry);
    }

    #[test]
    fn conflicting_flags_rejected() {
        let result = Args::try_parse_from(["dishcam", "--analysis", "--no-analysis"]);
        assert!(result.is_err());
    }
}
