//! 중복 캡처 게이트.
//!
//! 저장된 사진 바이트 전체의 SHA-256을 직전 캡처의 지문과 비교한다.
//! 기억하는 지문은 하나뿐이라 연속 중복(실수로 두 번 누른 경우)만 잡는다.
//! A → B → A 순서의 두 번째 A는 중복이 아니다.

use dishcam_core::models::capture::Fingerprint;
use sha2::{Digest, Sha256};
use tracing::debug;

/// 게이트 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// 직전 캡처와 동일: 호출 측이 파일을 지우고 이후 단계를 건너뛴다
    Duplicate(Fingerprint),
    /// 새 캡처: 지문이 보관 슬롯을 대체했다
    Unique(Fingerprint),
}

impl GateVerdict {
    /// 중복 여부
    pub fn is_duplicate(&self) -> bool {
        matches!(self, GateVerdict::Duplicate(_))
    }
}

/// 단일 슬롯 지문 게이트
///
/// 파이프라인 인스턴스가 소유한다 (전역 상태 아님).
#[derive(Debug, Default)]
pub struct HashGate {
    last: Option<Fingerprint>,
}

impl HashGate {
    /// 빈 게이트 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 바이트 지문 계산
    pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Fingerprint(out)
    }

    /// 직전 지문과 비교. Unique면 지문을 보관한다.
    pub fn check(&mut self, bytes: &[u8]) -> GateVerdict {
        let current = Self::fingerprint(bytes);

        if self.last == Some(current) {
            debug!("중복 지문: {current}");
            return GateVerdict::Duplicate(current);
        }

        self.last = Some(current);
        GateVerdict::Unique(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_consecutive_bytes_are_duplicate() {
        let mut gate = HashGate::new();
        assert!(!gate.check(b"plate-1").is_duplicate());
        assert!(gate.check(b"plate-1").is_duplicate());
    }

    #[test]
    fn differing_bytes_are_unique() {
        let mut gate = HashGate::new();
        assert!(!gate.check(b"plate-1").is_duplicate());
        assert!(!gate.check(b"plate-2").is_duplicate());
    }

    #[test]
    fn only_immediate_predecessor_is_remembered() {
        let mut gate = HashGate::new();
        assert!(!gate.check(b"A").is_duplicate());
        assert!(!gate.check(b"B").is_duplicate());
        assert!(!gate.check(b"A").is_duplicate());
    }

    #[test]
    fn duplicate_does_not_replace_slot() {
        let mut gate = HashGate::new();
        let GateVerdict::Unique(first) = gate.check(b"x") else {
            panic!("첫 캡처는 Unique여야 함");
        };
        assert_eq!(gate.check(b"x"), GateVerdict::Duplicate(first));
        assert_eq!(gate.check(b"x"), GateVerdict::Duplicate(first));
    }

    #[test]
    fn fingerprint_is_sha256() {
        // sha256("abc")
        assert_eq!(
            HashGate::fingerprint(b"abc").to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
