//! 웹캠 캡처.
//!
//! ffmpeg 자식 프로세스가 카메라를 열고 rawvideo(rgb24) 프레임을
//! stdout 파이프로 계속 흘려보낸다. 전용 리더 태스크가 파이프를 쉬지 않고
//! 비우며 최신 프레임 하나만 `watch` 채널에 남긴다.
//!
//! 파이프를 캡처 때만 읽으면 유휴 중에 파이프와 드라이버 버퍼가 가득 차
//! ffmpeg가 멈추고, 나중에 읽는 프레임은 직전 캡처 직후의 장면이 된다.
//! `read()`는 아직 돌려주지 않은 최신 프레임을 반환하고,
//! 없으면 다음 프레임이 도착할 때까지 기다린다.

use async_trait::async_trait;
use chrono::Local;
use dishcam_core::config::CameraConfig;
use dishcam_core::error::CoreError;
use dishcam_core::models::capture::Frame;
use dishcam_core::ports::frame_source::FrameSource;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 첫 프레임 대기 한도 (장치 열기 판정)
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// ffmpeg 입력 포맷 인자 (플랫폼별)
fn input_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "video4linux2"
    }
}

/// ffmpeg 명령줄 인자 구성
pub fn build_ffmpeg_args(config: &CameraConfig) -> Vec<String> {
    let size = format!("{}x{}", config.width, config.height);
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-f".into(),
        input_format().into(),
        "-framerate".into(),
        config.fps.to_string(),
        "-video_size".into(),
        size,
        "-i".into(),
        config.device.clone(),
        "-an".into(),
        // 장치가 요청 해상도를 무시해도 출력 크기는 고정
        "-vf".into(),
        format!("scale={}:{}", config.width, config.height),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-f".into(),
        "rawvideo".into(),
        "-".into(),
    ]
}

/// 리더 태스크가 갱신하는 최신 프레임 슬롯
#[derive(Default)]
struct LatestFrame {
    /// 수신한 프레임 수 (0 = 아직 없음)
    seq: u64,
    frame: Option<Frame>,
    /// 스트림 종료 사유
    ended: Option<String>,
}

/// stdout을 끝까지 비우며 최신 프레임만 남긴다
async fn pump_frames(
    mut stdout: ChildStdout,
    width: u32,
    height: u32,
    latest: watch::Sender<LatestFrame>,
) {
    let frame_len = Frame::rgb_len(width, height);
    loop {
        let mut data = vec![0u8; frame_len];
        if let Err(e) = stdout.read_exact(&mut data).await {
            let reason = if e.kind() == std::io::ErrorKind::UnexpectedEof {
                "프레임 스트림 종료".to_string()
            } else {
                format!("프레임 읽기 실패: {e}")
            };
            debug!("프레임 리더 종료: {reason}");
            latest.send_modify(|slot| slot.ended = Some(reason));
            return;
        }

        let frame = Frame {
            width,
            height,
            data,
            captured_at: Local::now(),
        };
        latest.send_modify(|slot| {
            slot.seq += 1;
            slot.frame = Some(frame);
        });
    }
}

/// ffmpeg 기반 카메라 프레임 소스: `FrameSource` 포트 구현
pub struct FfmpegFrameSource {
    device: String,
    child: Option<Child>,
    reader: Option<JoinHandle<()>>,
    frames: Option<watch::Receiver<LatestFrame>>,
    /// 마지막으로 돌려준 프레임 번호
    last_seq: u64,
}

impl FfmpegFrameSource {
    /// 카메라 열기.
    ///
    /// ffmpeg를 띄우고 첫 프레임이 도착할 때까지 기다린다.
    /// 실행 실패, 첫 프레임 전 종료, 타임아웃은 모두 `DeviceUnavailable`.
    pub async fn open(config: &CameraConfig) -> Result<Self, CoreError> {
        let mut command = Command::new(&config.ffmpeg_path);
        command.args(build_ffmpeg_args(config));

        info!(
            device = %config.device,
            size = %format!("{}x{}", config.width, config.height),
            "카메라 열기 (ffmpeg)"
        );

        Self::spawn_with(command, &config.device, config.width, config.height).await
    }

    /// 임의 명령으로 프레임 소스 생성 (stdout이 rgb24 프레임 스트림이어야 함)
    pub async fn spawn_with(
        mut command: Command,
        device: &str,
        width: u32,
        height: u32,
    ) -> Result<Self, CoreError> {
        let unavailable = |reason: String| CoreError::DeviceUnavailable {
            device: device.to_string(),
            reason,
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| unavailable(format!("프로세스 실행 실패: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| unavailable("stdout 파이프 없음".to_string()))?;

        let (latest_tx, latest_rx) = watch::channel(LatestFrame::default());
        let reader = tokio::spawn(pump_frames(stdout, width, height, latest_tx));

        let mut source = Self {
            device: device.to_string(),
            child: Some(child),
            reader: Some(reader),
            frames: Some(latest_rx),
            last_seq: 0,
        };

        match tokio::time::timeout(OPEN_TIMEOUT, source.read_frame()).await {
            Ok(Ok(_)) => {
                debug!("카메라 첫 프레임 수신: {}", source.device);
                Ok(source)
            }
            Ok(Err(e)) => {
                source.release().await;
                Err(unavailable(e.to_string()))
            }
            Err(_) => {
                source.release().await;
                Err(unavailable(format!("{OPEN_TIMEOUT:?} 내 첫 프레임 없음")))
            }
        }
    }

    async fn read_frame(&mut self) -> Result<Frame, CoreError> {
        let frames = self
            .frames
            .as_mut()
            .ok_or_else(|| CoreError::FrameUnavailable("카메라가 해제됨".to_string()))?;

        loop {
            {
                let slot = frames.borrow_and_update();
                if slot.seq > self.last_seq {
                    if let Some(frame) = &slot.frame {
                        self.last_seq = slot.seq;
                        return Ok(frame.clone());
                    }
                }
                if let Some(reason) = &slot.ended {
                    return Err(CoreError::FrameUnavailable(reason.clone()));
                }
            }
            if frames.changed().await.is_err() {
                return Err(CoreError::FrameUnavailable(
                    "프레임 리더 중단".to_string(),
                ));
            }
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn read(&mut self) -> Result<Frame, CoreError> {
        self.read_frame().await
    }

    async fn release(&mut self) {
        self.frames.take();
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                warn!("ffmpeg 종료 실패: {e}");
            }
            info!("카메라 해제: {}", self.device);
        }
    }

    fn device(&self) -> &str {
        &self.device
    }
}
