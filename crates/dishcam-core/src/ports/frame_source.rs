//! 프레임 소스 포트.
//!
//! 구현: `dishcam-vision` crate (`FfmpegFrameSource`)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::capture::Frame;

/// 카메라 프레임 소스
///
/// 열기 실패는 어댑터 생성자에서 `CoreError::DeviceUnavailable`로 보고한다.
#[async_trait]
pub trait FrameSource: Send {
    /// 다음 프레임 읽기.
    ///
    /// 드라이버 버퍼에 쌓인 프레임이 순서대로 반환되므로, 오래 쉬었다가
    /// 처음 읽은 프레임은 현재 장면이 아닐 수 있다. 호출 측이 몇 장을 버린다.
    async fn read(&mut self) -> Result<Frame, CoreError>;

    /// 장치 해제 (멱등)
    async fn release(&mut self);

    /// 장치 식별자 (로그용)
    fn device(&self) -> &str;
}
