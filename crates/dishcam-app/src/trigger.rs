//! 트리거 소스.
//!
//! - 키보드: crossterm raw 모드로 키를 하나씩 읽어 `TriggerInput`으로 변환
//! - 줄 입력: 표준 입력 한 줄 = 주문 번호 + 캡처 (바코드 스캐너, 파이프)
//!
//! 키보드 모드의 프롬프트와 콘솔 로그는 모두 stderr에 쓴다.
//! 로그 한 줄을 찍을 때마다 `PromptLine`이 프롬프트를 지우고 다시 그린다.

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use dishcam_pipeline::pipeline::TriggerInput;
use parking_lot::Mutex;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// 키 이벤트 폴링 간격 (채널 닫힘 확인 주기)
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 프롬프트 접두사
const PROMPT: &str = "주문 번호> ";

/// 트리거 입력 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TriggerMode {
    /// 키 단위 입력 (Enter 캡처, Esc 종료)
    Keyboard,
    /// 줄 단위 입력 (한 줄 = 주문 번호 + 캡처, EOF 종료)
    Line,
}

// ============================================================
// 키보드
// ============================================================

/// 키 이벤트 → 트리거 입력
pub fn map_key(key: KeyEvent) -> Option<TriggerInput> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TriggerInput::Exit)
        }
        KeyCode::Char(_) if key.modifiers.contains(KeyModifiers::CONTROL) => None,
        KeyCode::Char(c) => Some(TriggerInput::Char(c)),
        KeyCode::Backspace | KeyCode::Delete => Some(TriggerInput::Backspace),
        KeyCode::Enter => Some(TriggerInput::Capture),
        KeyCode::Esc => Some(TriggerInput::Exit),
        _ => None,
    }
}

/// raw 모드 가드 (drop 시 복구)
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        // 프롬프트 줄 정리
        let _ = writeln!(io::stderr());
    }
}

/// 키보드 읽기 스레드 시작.
///
/// crossterm 이벤트 읽기는 블로킹이라 전용 스레드에서 돈다.
/// 수신 측이 닫히면 스레드도 끝난다.
pub fn spawn_keyboard(tx: mpsc::Sender<TriggerInput>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                warn!("키 입력 폴링 실패: {e}");
                let _ = tx.blocking_send(TriggerInput::Exit);
                break;
            }
        }
        let input = match event::read() {
            Ok(Event::Key(key)) => map_key(key),
            Ok(_) => None,
            Err(e) => {
                warn!("키 입력 읽기 실패: {e}");
                Some(TriggerInput::Exit)
            }
        };
        if let Some(input) = input {
            let exit = input == TriggerInput::Exit;
            if tx.blocking_send(input).is_err() || exit {
                break;
            }
        }
    })
}

/// 프롬프트 한 줄 다시 그리기
pub fn render_prompt<W: Write>(out: &mut W, code: &str) -> io::Result<()> {
    crossterm::queue!(
        out,
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(PROMPT),
        Print(code)
    )?;
    out.flush()
}

/// 화면에 떠 있는 프롬프트 줄 (None = 숨김).
///
/// 프롬프트 그리기와 로그 출력이 같은 잠금을 거치므로
/// 로그가 그리다 만 프롬프트 중간에 끼어들지 않는다.
#[derive(Clone, Default)]
pub struct PromptLine {
    code: Arc<Mutex<Option<String>>>,
}

impl PromptLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 주문 번호를 반영해 프롬프트 표시
    pub fn show<W: Write>(&self, out: &mut W, code: &str) -> io::Result<()> {
        let mut current = self.code.lock();
        *current = Some(code.to_string());
        render_prompt(out, code)
    }

    /// 프롬프트 숨김. 이후 로그는 그대로 출력된다.
    pub fn hide(&self) {
        *self.code.lock() = None;
    }

    /// 프롬프트 줄을 지우고 `text`를 쓴 뒤 프롬프트를 다시 그린다
    pub fn write_above<W: Write>(&self, out: &mut W, text: &[u8]) -> io::Result<()> {
        let current = self.code.lock();
        match current.as_deref() {
            Some(code) => {
                crossterm::queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
                out.write_all(text)?;
                render_prompt(out, code)
            }
            None => {
                out.write_all(text)?;
                out.flush()
            }
        }
    }
}

/// 주문 번호가 바뀔 때마다 프롬프트 갱신
pub async fn run_prompt(mut code_rx: watch::Receiver<String>, prompt: PromptLine) {
    loop {
        let code = code_rx.borrow_and_update().clone();
        if let Err(e) = prompt.show(&mut io::stderr(), &code) {
            debug!("프롬프트 출력 실패: {e}");
        }
        if code_rx.changed().await.is_err() {
            break;
        }
    }
}

// ============================================================
// 줄 입력
// ============================================================

/// 줄 단위 입력 전달 (블로킹). 한 줄마다 ClearCode → 문자들 → Capture,
/// EOF에서 Exit. 수신 측이 닫히면 바로 끝난다.
pub fn forward_lines<R: BufRead>(reader: R, tx: mpsc::Sender<TriggerInput>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("표준 입력 읽기 실패: {e}");
                break;
            }
        };

        let inputs = std::iter::once(TriggerInput::ClearCode)
            .chain(line.trim().chars().map(TriggerInput::Char))
            .chain(std::iter::once(TriggerInput::Capture));
        for input in inputs {
            if tx.blocking_send(input).is_err() {
                return;
            }
        }
    }
    let _ = tx.blocking_send(TriggerInput::Exit);
}

/// 표준 입력 줄 읽기 스레드 시작
pub fn spawn_lines(tx: mpsc::Sender<TriggerInput>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || forward_lines(io::stdin().lock(), tx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn key_mapping() {
        assert_eq!(
            map_key(press(KeyCode::Char('7'))),
            Some(TriggerInput::Char('7'))
        );
        assert_eq!(
            map_key(press(KeyCode::Backspace)),
            Some(TriggerInput::Backspace)
        );
        assert_eq!(map_key(press(KeyCode::Delete)), Some(TriggerInput::Backspace));
        assert_eq!(map_key(press(KeyCode::Enter)), Some(TriggerInput::Capture));
        assert_eq!(map_key(press(KeyCode::Esc)), Some(TriggerInput::Exit));
        assert_eq!(map_key(press(KeyCode::F(1))), None);
    }

    #[test]
    fn ctrl_c_exits_in_raw_mode() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key), Some(TriggerInput::Exit));

        let other = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(map_key(other), None);
    }

    #[test]
    fn release_events_ignored() {
        let mut key = press(KeyCode::Enter);
        key.kind = KeyEventKind::Release;
        assert_eq!(map_key(key), None);
    }

    #[test]
    fn prompt_contains_code() {
        let mut out = Vec::new();
        render_prompt(&mut out, "7A").unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("주문 번호> 7A"));
    }

    #[test]
    fn log_line_is_written_above_prompt() {
        let prompt = PromptLine::new();
        let mut out = Vec::new();
        prompt.show(&mut out, "12").unwrap();
        out.clear();

        prompt.write_above(&mut out, b"INFO saved\r\n").unwrap();
        let text = String::from_utf8_lossy(&out);

        let log_at = text.find("INFO saved").unwrap();
        let prompt_at = text.rfind("주문 번호> 12").unwrap();
        assert!(log_at < prompt_at, "로그 뒤에 프롬프트가 다시 그려져야 함: {text:?}");
    }

    #[test]
    fn hidden_prompt_passes_log_through() {
        let prompt = PromptLine::new();
        prompt.show(&mut Vec::new(), "7").unwrap();
        prompt.hide();

        let mut out = Vec::new();
        prompt.write_above(&mut out, b"bye\n").unwrap();
        assert_eq!(out, b"bye\n");
    }

    #[test]
    fn lines_become_code_then_capture() {
        let (tx, mut rx) = mpsc::channel(32);
        let input: &[u8] = b" 42 \n\n";
        forward_lines(input, tx);

        let mut got = Vec::new();
        while let Ok(item) = rx.try_recv() {
            got.push(item);
        }
        assert_eq!(
            got,
            vec![
                TriggerInput::ClearCode,
                TriggerInput::Char('4'),
                TriggerInput::Char('2'),
                TriggerInput::Capture,
                TriggerInput::ClearCode,
                TriggerInput::Capture,
                TriggerInput::Exit,
            ]
        );
    }
}
