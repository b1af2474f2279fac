//! tracing 초기화.
//!
//! 콘솔(stderr) 레이어 + 선택적 파일 레이어.
//! 키보드 모드에서는 터미널이 raw 모드라 `\n`만으로는 줄 첫 칸으로
//! 돌아가지 않으므로 콘솔 출력의 개행을 `\r\n`으로 바꾸고,
//! 주문 번호 프롬프트 위에 로그를 찍는다.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::trigger::PromptLine;

/// 로그 대상 크레이트
const TARGETS: &[&str] = &[
    "dishcam",
    "dishcam_core",
    "dishcam_vision",
    "dishcam_storage",
    "dishcam_network",
    "dishcam_pipeline",
];

/// `--log-level` 기반 필터 문자열
pub fn filter_directives(log_level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// `\n` → `\r\n` 변환 writer
pub struct CrlfWriter<W: Write> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut start = 0;
        for (i, byte) in buf.iter().enumerate() {
            if *byte == b'\n' {
                self.inner.write_all(&buf[start..i])?;
                self.inner.write_all(b"\r\n")?;
                start = i + 1;
            }
        }
        self.inner.write_all(&buf[start..])?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// raw 모드 콘솔 writer: CRLF 변환 후 프롬프트 위에 출력
pub struct PromptAwareWriter {
    prompt: PromptLine,
}

impl Write for PromptAwareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut text = Vec::with_capacity(buf.len() + 8);
        CrlfWriter::new(&mut text).write_all(buf)?;
        self.prompt.write_above(&mut io::stderr().lock(), &text)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// 전역 subscriber 설치.
///
/// `prompt`가 있으면 터미널이 raw 모드인 것으로 본다.
/// `RUST_LOG`가 있으면 `log_level`보다 우선한다.
pub fn init(log_level: &str, log_file: Option<&Path>, prompt: Option<PromptLine>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    let console = fmt::layer().with_writer(move || -> Box<dyn Write> {
        match &prompt {
            Some(prompt) => Box::new(PromptAwareWriter {
                prompt: prompt.clone(),
            }),
            None => Box::new(io::stderr()),
        }
    });

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("로그 디렉토리 생성 실패: {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("로그 파일 열기 실패: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .context("tracing 초기화 실패")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_translation() {
        let mut out = Vec::new();
        {
            let mut writer = CrlfWriter::new(&mut out);
            writer.write_all(b"a\nb\n\nc").unwrap();
        }
        assert_eq!(out, b"a\r\nb\r\n\r\nc");
    }

    #[test]
    fn directives_cover_all_crates() {
        let directives = filter_directives("debug");
        assert!(directives.contains("dishcam_pipeline=debug"));
        assert!(directives.contains("dishcam=debug"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
