//! 이미지 분석 포트.
//!
//! 구현: `dishcam-network` crate (`RemoteVisionAnalyzer`)

use async_trait::async_trait;

/// 원격 이미지 품질 분석기
///
/// 분석은 업로드를 풍부하게 만드는 부가 단계일 뿐이므로 실패를 전파하지 않는다.
/// 구현체는 전송/응답 에러 시 경고 로그를 남기고 폴백 문자열을 반환해야 한다.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    /// JPEG 바이트를 분석하여 짧은 텍스트 보고서 반환
    async fn analyze(&self, image: &[u8]) -> String;

    /// 제공자 이름 (로그용)
    fn provider_name(&self) -> &str;
}
