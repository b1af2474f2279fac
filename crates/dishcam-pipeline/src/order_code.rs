//! 주문 번호 입력 버퍼.

/// 입력 버퍼 최대 길이
const MAX_LEN: usize = 32;

/// 키 입력으로 쌓이는 대기 중 주문 번호
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderCodeBuffer {
    buf: String,
}

impl OrderCodeBuffer {
    /// 빈 버퍼
    pub fn new() -> Self {
        Self::default()
    }

    /// 출력 가능한 ASCII(0x20~0x7E)만 덧붙인다. 반영되면 true.
    pub fn push(&mut self, c: char) -> bool {
        if !(' '..='~').contains(&c) || self.buf.len() >= MAX_LEN {
            return false;
        }
        self.buf.push(c);
        true
    }

    /// 마지막 문자 제거. 제거했으면 true.
    pub fn backspace(&mut self) -> bool {
        self.buf.pop().is_some()
    }

    /// 비우기
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// 입력 그대로의 문자열 (화면 표시용)
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// 앞뒤 공백을 제거한 값. 비어 있으면 None.
    pub fn value(&self) -> Option<String> {
        let trimmed = self.buf.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}
