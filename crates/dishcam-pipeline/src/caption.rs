//! 캡션 빌더.
//!
//! 주문 번호(선택) → 매장 설명 → `Captured at {ts}` → 분석 텍스트(선택)
//! 순서로 줄을 고정해 하나의 문자열로 합친다.

use chrono::{DateTime, Local};
use std::fmt::Write as _;

/// 메신저 사진 캡션 최대 길이 (문자 수)
pub const CAPTION_MAX_CHARS: usize = 1024;

/// 캡션용 타임스탬프 문자열 (형식이 잘못되면 RFC 3339로 대체)
pub fn format_timestamp(timestamp: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(format)).is_err() {
        return timestamp.to_rfc3339();
    }
    out
}

/// 캡션 빌더
#[derive(Debug, Clone)]
pub struct CaptionBuilder {
    venue: String,
}

impl CaptionBuilder {
    /// 매장 설명으로 생성
    pub fn new(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
        }
    }

    /// 캡션 생성. 빈 선택 항목은 줄 자체를 생략한다.
    pub fn build(
        &self,
        order_code: Option<&str>,
        timestamp: &str,
        analysis: Option<&str>,
    ) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(4);

        if let Some(code) = order_code.map(str::trim).filter(|c| !c.is_empty()) {
            lines.push(format!("Order Number: {code}"));
        }
        lines.push(self.venue.clone());
        lines.push(format!("Captured at {timestamp}"));
        if let Some(text) = analysis.map(str::trim).filter(|t| !t.is_empty()) {
            lines.push(text.to_string());
        }

        truncate_chars(lines.join("\n"), CAPTION_MAX_CHARS)
    }
}

fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((byte_idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_idx);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const VENUE: &str = "Chinese Dragon Cafe - Milagiriya Branch";

    #[test]
    fn no_code_no_analysis() {
        let builder = CaptionBuilder::new(VENUE);
        assert_eq!(
            builder.build(None, "T", None),
            format!("{VENUE}\nCaptured at T")
        );
    }

    #[test]
    fn trimmed_code_and_analysis_in_order() {
        let builder = CaptionBuilder::new(VENUE);
        assert_eq!(
            builder.build(Some("  42 "), "T", Some("A")),
            format!("Order Number: 42\n{VENUE}\nCaptured at T\nA")
        );
    }

    #[test]
    fn blank_optionals_are_omitted() {
        let builder = CaptionBuilder::new("V");
        assert_eq!(
            builder.build(Some("   "), "T", Some("")),
            "V\nCaptured at T"
        );
    }

    #[test]
    fn long_caption_truncated_on_char_boundary() {
        let builder = CaptionBuilder::new("V");
        let analysis = "맛".repeat(2000);
        let caption = builder.build(None, "T", Some(&analysis));
        assert_eq!(caption.chars().count(), CAPTION_MAX_CHARS);
        assert!(caption.starts_with("V\nCaptured at T\n맛"));
    }

    #[test]
    fn caption_timestamp_format() {
        let ts = Local.with_ymd_and_hms(2026, 3, 7, 9, 4, 5).unwrap();
        assert_eq!(
            format_timestamp(&ts, "%b %-d, %Y %-I:%M:%S %p"),
            "Mar 7, 2026 9:04:05 AM"
        );
    }
}
