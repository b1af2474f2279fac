//! 분석 + 업로드 디스패치.
//!
//! 고유 캡처 하나에 대해 (선택) 분석 → 캡션 → 업로드를 순서대로 실행한다.
//! 작업(`DispatchJob`)은 생성 후 변경되지 않는 스냅샷이고, 실행기에 넘기면
//! 소유권이 통째로 넘어간다. 실패는 로그와 `UploadOutcome`으로만 남으며
//! 캡처 루프로 돌아가지 않는다.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use dishcam_core::models::capture::{CapturedImage, UploadOutcome};
use dishcam_core::ports::analyzer::ImageAnalyzer;
use dishcam_core::ports::uploader::PhotoUploader;

use crate::caption::CaptionBuilder;

/// 디스패치 작업 (불변 스냅샷)
#[derive(Debug, Clone)]
pub struct DispatchJob {
    /// 저장된 캡처
    pub image: CapturedImage,
    /// 캡션에 들어갈 타임스탬프 문자열
    pub caption_timestamp: String,
}

/// 분석기 + 업로더 + 캡션 빌더 묶음
pub struct Dispatch {
    analyzer: Option<Arc<dyn ImageAnalyzer>>,
    uploader: Arc<dyn PhotoUploader>,
    captions: CaptionBuilder,
}

impl Dispatch {
    /// 생성. `analyzer`가 None이면 분석 단계를 건너뛴다.
    pub fn new(
        analyzer: Option<Arc<dyn ImageAnalyzer>>,
        uploader: Arc<dyn PhotoUploader>,
        captions: CaptionBuilder,
    ) -> Self {
        Self {
            analyzer,
            uploader,
            captions,
        }
    }

    /// 작업 실행: 분석 → 캡션 → 업로드
    pub async fn run(&self, job: DispatchJob) -> UploadOutcome {
        let DispatchJob {
            image,
            caption_timestamp,
        } = job;

        let analysis = match &self.analyzer {
            Some(analyzer) => {
                debug!(provider = analyzer.provider_name(), "이미지 분석 요청");
                Some(analyzer.analyze(&image.bytes).await)
            }
            None => None,
        };

        let caption = self.captions.build(
            image.order_code.as_deref(),
            &caption_timestamp,
            analysis.as_deref(),
        );
        info!("업로드 전송: {}\n{caption}", image.file_path.display());

        let outcome = self.uploader.upload(&image.file_path, &caption).await;
        if outcome.success {
            info!("업로드 성공: {}", image.file_path.display());
        } else {
            warn!(
                "업로드 실패 (재시도 없음): {}: {}",
                image.file_path.display(),
                outcome.detail
            );
        }
        outcome
    }
}

// ============================================================
// 실행기
// ============================================================

/// 디스패치 실행 정책
#[async_trait]
pub trait DispatchExecutor: Send + Sync {
    /// 작업 실행 (또는 실행 예약). 에러를 반환하지 않는다.
    async fn execute(&self, dispatch: Arc<Dispatch>, job: DispatchJob);
}

/// 캡처 루프에서 바로 기다리는 실행기
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineExecutor;

#[async_trait]
impl DispatchExecutor for InlineExecutor {
    async fn execute(&self, dispatch: Arc<Dispatch>, job: DispatchJob) {
        let _ = dispatch.run(job).await;
    }
}

/// 분리된 tokio 태스크로 넘기는 실행기.
///
/// 완료 순서는 캡처 순서와 다를 수 있고, 프로세스 종료 시 진행 중인
/// 업로드는 버려진다.
#[derive(Debug, Default, Clone, Copy)]
pub struct BackgroundExecutor;

#[async_trait]
impl DispatchExecutor for BackgroundExecutor {
    async fn execute(&self, dispatch: Arc<Dispatch>, job: DispatchJob) {
        let path = job.image.file_path.clone();
        tokio::spawn(async move {
            let _ = dispatch.run(job).await;
        });
        debug!("백그라운드 업로드 시작: {}", path.display());
    }
}
