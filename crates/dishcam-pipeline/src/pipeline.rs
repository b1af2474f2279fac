//! 캡처 파이프라인 상태 기계.
//!
//! ```text
//! Idle → AwaitingTrigger → Capturing → Deduping → Dispatching → Cooldown → AwaitingTrigger
//!                 └──────────────────────────────────────────────→ Exiting
//! ```
//!
//! 캡처 루프는 단일 순차 태스크다. 프레임 획득, 파일 쓰기, 지문 비교는
//! 모두 루프 위에서 끝난 뒤에 다음 트리거를 받는다. 동시성은 디스패치
//! 단계(분석 + 업로드)에만 있고 실행기가 결정한다.
//! 직전 지문은 루프만 읽고 쓴다.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use dishcam_core::config::AppConfig;
use dishcam_core::error::CoreError;
use dishcam_core::models::capture::{CapturedImage, Frame};
use dishcam_core::ports::frame_source::FrameSource;
use dishcam_storage::photo_storage::PhotoStorage;
use dishcam_vision::encoder::encode_jpeg;
use dishcam_vision::fingerprint::{GateVerdict, HashGate};

use crate::caption::format_timestamp;
use crate::dispatch::{Dispatch, DispatchExecutor, DispatchJob};
use crate::order_code::OrderCodeBuffer;

/// 파이프라인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// 생성 직후
    Idle,
    /// 트리거 대기 (주문 번호 입력 가능)
    AwaitingTrigger,
    /// 버퍼 프레임 버림 + 새 프레임 읽기 + 저장
    Capturing,
    /// 지문 비교
    Deduping,
    /// 분석/업로드 실행기로 전달
    Dispatching,
    /// 다음 캡처까지 고정 대기
    Cooldown,
    /// 종료 (카메라 해제됨)
    Exiting,
}

/// 트리거 소스가 보내는 입력
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerInput {
    /// 주문 번호에 문자 추가
    Char(char),
    /// 주문 번호 마지막 문자 삭제
    Backspace,
    /// 주문 번호 전체 삭제
    ClearCode,
    /// 캡처
    Capture,
    /// 종료
    Exit,
}

/// 캡처 1회 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// 고유 캡처: 실행기로 넘어감
    Dispatched { path: PathBuf },
    /// 직전 캡처와 동일: 파일 삭제됨
    Duplicate { path: PathBuf },
    /// 프레임 읽기 실패: 주문 번호 유지
    FrameUnavailable,
    /// 인코딩/저장 실패
    SaveFailed(String),
}

impl CaptureOutcome {
    /// 쿨다운 적용 대상 여부 (실제로 업로드가 나간 경우만)
    pub fn charges_cooldown(&self) -> bool {
        matches!(self, CaptureOutcome::Dispatched { .. })
    }
}

/// 실행 통계
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub dispatched: u32,
    pub duplicates: u32,
    pub frame_failures: u32,
    pub save_failures: u32,
    /// 쿨다운 중 버려진 트리거
    pub rejected_triggers: u32,
}

/// 파이프라인 동작 옵션
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// 주문 번호 입력 사용
    pub code_entry: bool,
    /// 캡처 전 버리는 프레임 수
    pub flush_frames: u32,
    /// JPEG 품질
    pub jpeg_quality: u8,
    /// 업로드 후 대기
    pub cooldown: Duration,
    /// 쿨다운 중 캡처 트리거를 버림 (false면 대기 후 처리)
    pub drop_triggers_during_cooldown: bool,
    /// 캡션 타임스탬프 형식
    pub caption_timestamp_format: String,
}

impl PipelineOptions {
    /// 앱 설정에서 생성
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            code_entry: config.pipeline.code_entry,
            flush_frames: config.camera.flush_frames,
            jpeg_quality: config.storage.jpeg_quality,
            cooldown: config.cooldown(),
            drop_triggers_during_cooldown: config.pipeline.drop_triggers_during_cooldown,
            caption_timestamp_format: config.storage.caption_timestamp_format.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

/// 캡처 → 중복 제거 → 디스패치 파이프라인
pub struct CapturePipeline {
    source: Box<dyn FrameSource>,
    storage: PhotoStorage,
    gate: HashGate,
    dispatch: Arc<Dispatch>,
    executor: Arc<dyn DispatchExecutor>,
    options: PipelineOptions,
    order_code: OrderCodeBuffer,
    code_tx: watch::Sender<String>,
    state: PipelineState,
    stats: PipelineStats,
}

impl CapturePipeline {
    /// 새 파이프라인 생성
    pub fn new(
        source: Box<dyn FrameSource>,
        storage: PhotoStorage,
        dispatch: Arc<Dispatch>,
        executor: Arc<dyn DispatchExecutor>,
        options: PipelineOptions,
    ) -> Self {
        let (code_tx, _) = watch::channel(String::new());
        Self {
            source,
            storage,
            gate: HashGate::new(),
            dispatch,
            executor,
            options,
            order_code: OrderCodeBuffer::new(),
            code_tx,
            state: PipelineState::Idle,
            stats: PipelineStats::default(),
        }
    }

    /// 현재 상태
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 누적 통계
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// 대기 중인 주문 번호 (공백 제거, 비어 있으면 None)
    pub fn pending_order_code(&self) -> Option<String> {
        self.order_code.value()
    }

    /// 주문 번호 입력 상태 구독 (프롬프트 표시용)
    pub fn subscribe_order_code(&self) -> watch::Receiver<String> {
        self.code_tx.subscribe()
    }

    /// 트리거 입력을 받아 종료될 때까지 실행.
    ///
    /// 입력 채널이 닫히거나, `Exit` 입력 또는 종료 신호를 받으면
    /// 카메라를 해제하고 통계를 반환한다.
    pub async fn run(
        &mut self,
        mut inputs: mpsc::Receiver<TriggerInput>,
        mut shutdown: watch::Receiver<bool>,
    ) -> PipelineStats {
        info!(device = self.source.device(), "캡처 대기 시작");

        loop {
            self.state = PipelineState::AwaitingTrigger;

            let input = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => None,
                input = inputs.recv() => input,
            };

            match input {
                None | Some(TriggerInput::Exit) => break,
                Some(TriggerInput::Capture) => {
                    let outcome = self.capture_once().await;
                    if outcome.charges_cooldown()
                        && self.cooldown(&mut inputs, &mut shutdown).await == Flow::Exit
                    {
                        break;
                    }
                }
                Some(edit) => self.apply_edit(edit),
            }
        }

        self.state = PipelineState::Exiting;
        self.source.release().await;
        info!(
            dispatched = self.stats.dispatched,
            duplicates = self.stats.duplicates,
            frame_failures = self.stats.frame_failures,
            "캡처 루프 종료"
        );
        self.stats
    }

    /// 캡처 1회: 프레임 → 저장 → 지문 비교 → 디스패치
    pub async fn capture_once(&mut self) -> CaptureOutcome {
        self.state = PipelineState::Capturing;

        for _ in 0..self.options.flush_frames {
            if let Err(e) = self.source.read().await {
                debug!("버퍼 프레임 버림 실패: {e}");
            }
        }

        let frame = match self.source.read().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!("프레임 읽기 실패, 다음 트리거 대기: {e}");
                self.stats.frame_failures += 1;
                return CaptureOutcome::FrameUnavailable;
            }
        };

        let order_code = if self.options.code_entry {
            self.order_code.value()
        } else {
            None
        };

        let (path, bytes) = match self.persist(&frame, order_code.as_deref()).await {
            Ok(saved) => saved,
            Err(e) => {
                warn!("캡처 저장 실패: {e}");
                self.stats.save_failures += 1;
                return CaptureOutcome::SaveFailed(e.to_string());
            }
        };
        info!("사진 저장: {}", path.display());

        self.state = PipelineState::Deduping;
        if let GateVerdict::Duplicate(fingerprint) = self.gate.check(&bytes) {
            info!(
                "중복 캡처, 업로드 생략 및 삭제: {} ({fingerprint:?})",
                path.display()
            );
            if let Err(e) = self.storage.remove(&path).await {
                warn!("중복 사진 삭제 실패: {}: {e}", path.display());
            }
            self.clear_order_code();
            self.stats.duplicates += 1;
            return CaptureOutcome::Duplicate { path };
        }

        self.state = PipelineState::Dispatching;
        let timestamp = frame.captured_at;
        let job = DispatchJob {
            caption_timestamp: format_timestamp(
                &timestamp,
                &self.options.caption_timestamp_format,
            ),
            image: CapturedImage {
                bytes,
                timestamp,
                order_code,
                file_path: path.clone(),
            },
        };
        self.executor.execute(self.dispatch.clone(), job).await;

        self.clear_order_code();
        self.stats.dispatched += 1;
        CaptureOutcome::Dispatched { path }
    }

    /// 인코딩 + 저장 + 디스크 바이트 재읽기.
    /// 재읽기에 실패하면 저장한 파일을 지운다.
    async fn persist(
        &self,
        frame: &Frame,
        order_code: Option<&str>,
    ) -> Result<(PathBuf, Vec<u8>), CoreError> {
        let jpeg = encode_jpeg(frame, self.options.jpeg_quality)?;
        let path = self
            .storage
            .save(&frame.captured_at, order_code, &jpeg)
            .await?;

        match self.storage.read(&path).await {
            Ok(bytes) => Ok((path, bytes)),
            Err(e) => {
                if let Err(remove_err) = self.storage.remove(&path).await {
                    warn!("읽을 수 없는 사진 삭제 실패: {}: {remove_err}", path.display());
                }
                Err(e)
            }
        }
    }

    async fn cooldown(
        &mut self,
        inputs: &mut mpsc::Receiver<TriggerInput>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Flow {
        if self.options.cooldown.is_zero() {
            return Flow::Continue;
        }
        self.state = PipelineState::Cooldown;
        debug!("쿨다운 {:?}", self.options.cooldown);

        let sleep = tokio::time::sleep(self.options.cooldown);
        tokio::pin!(sleep);

        if !self.options.drop_triggers_during_cooldown {
            // 입력은 채널에 남겨 두고 대기 후 처리
            return tokio::select! {
                _ = &mut sleep => Flow::Continue,
                _ = wait_for_shutdown(shutdown) => Flow::Exit,
            };
        }

        loop {
            tokio::select! {
                _ = &mut sleep => return Flow::Continue,
                _ = wait_for_shutdown(shutdown) => return Flow::Exit,
                input = inputs.recv() => match input {
                    None | Some(TriggerInput::Exit) => return Flow::Exit,
                    Some(TriggerInput::Capture) => {
                        self.stats.rejected_triggers += 1;
                        info!("쿨다운 중, 잠시 후 다시 시도하세요");
                    }
                    Some(edit) => self.apply_edit(edit),
                },
            }
        }
    }

    fn apply_edit(&mut self, input: TriggerInput) {
        if !self.options.code_entry {
            return;
        }
        let changed = match input {
            TriggerInput::Char(c) => self.order_code.push(c),
            TriggerInput::Backspace => self.order_code.backspace(),
            TriggerInput::ClearCode => {
                let had_code = !self.order_code.as_str().is_empty();
                self.order_code.clear();
                had_code
            }
            TriggerInput::Capture | TriggerInput::Exit => false,
        };
        if changed {
            self.code_tx.send_replace(self.order_code.as_str().to_string());
        }
    }

    fn clear_order_code(&mut self) {
        self.order_code.clear();
        self.code_tx.send_replace(String::new());
    }
}

/// 종료 신호가 true가 될 때까지 대기.
/// 발신자가 사라지면 신호가 올 수 없으므로 영원히 대기한다.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
