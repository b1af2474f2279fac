//! 캡처 사진 파일 저장소.
//!
//! JPEG 사진을 설정된 디렉토리에 저장/조회/삭제한다.
//! 파일명: `captured_<timestamp>[_<orderCode>]_<label>.jpg`
//!
//! 같은 이름이 이미 있으면 타임스탬프 뒤에 `-N`을 붙인다. 같은 초에 찍힌
//! 중복 사진을 지울 때 앞서 저장된(업로드 중일 수 있는) 사진을 덮어쓰거나
//! 지우지 않기 위함이다.

use chrono::{DateTime, Local};
use dishcam_core::config::StorageConfig;
use dishcam_core::error::CoreError;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// 같은 이름 충돌 시 시도할 최대 접미사
const MAX_NAME_COLLISIONS: u32 = 1000;

/// 파일명에 쓸 수 없는 문자
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// 주문 번호를 파일명에 안전한 형태로 변환.
///
/// 앞뒤 공백 제거 후 공백/경로 문자를 `_`로 바꾸고 제어 문자는 버린다.
/// 결과가 비면 `None`.
pub fn sanitize_order_code(code: &str) -> Option<String> {
    let safe: String = code
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| {
            if c.is_whitespace() || UNSAFE_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    (!safe.is_empty()).then_some(safe)
}

/// 파일명용 타임스탬프 (콜론·경로 구분자·공백 치환)
pub fn filename_timestamp(timestamp: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", timestamp.format("%Y%m%d_%H%M%S"));
    }
    out.chars()
        .map(|c| match c {
            ':' | '/' | '\\' => '-',
            ',' => '_',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect::<String>()
        .replace("__", "_")
}

/// 캡처 사진 파일 저장소
#[derive(Debug, Clone)]
pub struct PhotoStorage {
    photo_dir: PathBuf,
    label: String,
    timestamp_format: String,
}

impl PhotoStorage {
    /// 저장소 생성 (디렉토리가 없으면 만든다)
    pub async fn new(config: &StorageConfig) -> Result<Self, CoreError> {
        fs::create_dir_all(&config.photo_dir).await.map_err(|e| {
            CoreError::Config(format!(
                "사진 디렉토리 생성 실패: {}: {e}",
                config.photo_dir.display()
            ))
        })?;

        info!("사진 저장소 초기화: {}", config.photo_dir.display());

        Ok(Self {
            photo_dir: config.photo_dir.clone(),
            label: config.label.clone(),
            timestamp_format: config.filename_timestamp_format.clone(),
        })
    }

    /// 사진 디렉토리
    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    /// 파일명 생성 (`collision`이 0보다 크면 타임스탬프 뒤에 `-N`)
    pub fn file_name(
        &self,
        timestamp: &DateTime<Local>,
        order_code: Option<&str>,
        collision: u32,
    ) -> String {
        let mut name = format!(
            "captured_{}",
            filename_timestamp(timestamp, &self.timestamp_format)
        );
        if collision > 0 {
            let _ = write!(name, "-{collision}");
        }
        if let Some(code) = order_code.and_then(sanitize_order_code) {
            let _ = write!(name, "_{code}");
        }
        let _ = write!(name, "_{}.jpg", self.label);
        name
    }

    /// JPEG 저장. 기존 파일을 덮어쓰지 않으며 실제 저장 경로를 반환한다.
    pub async fn save(
        &self,
        timestamp: &DateTime<Local>,
        order_code: Option<&str>,
        jpeg: &[u8],
    ) -> Result<PathBuf, CoreError> {
        for collision in 0..MAX_NAME_COLLISIONS {
            let path = self
                .photo_dir
                .join(self.file_name(timestamp, order_code, collision));

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(CoreError::Io(std::io::Error::new(
                        e.kind(),
                        format!("사진 파일 생성 실패: {}: {e}", path.display()),
                    )))
                }
            };

            write_or_discard(&path, &mut file, jpeg).await?;

            debug!("사진 저장: {} ({} bytes)", path.display(), jpeg.len());
            return Ok(path);
        }

        Err(CoreError::Internal(format!(
            "사용 가능한 파일명 없음 ({MAX_NAME_COLLISIONS}회 충돌)"
        )))
    }

    /// 저장된 사진 바이트 읽기
    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, CoreError> {
        Ok(fs::read(path).await?)
    }

    /// 사진 삭제 (이미 없으면 성공으로 취급)
    pub async fn remove(&self, path: &Path) -> Result<(), CoreError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("사진 삭제: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// 바이트 기록. 실패하면 만들다 만 파일을 지우고 에러를 돌려준다.
async fn write_or_discard<W>(path: &Path, writer: &mut W, jpeg: &[u8]) -> Result<(), CoreError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(jpeg).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        if let Err(remove_err) = fs::remove_file(path).await {
            if remove_err.kind() != ErrorKind::NotFound {
                warn!("불완전한 사진 삭제 실패: {}: {remove_err}", path.display());
            }
        }
        return Err(CoreError::Io(std::io::Error::new(
            e.kind(),
            format!("사진 기록 실패: {}: {e}", path.display()),
        )));
    }
    Ok(())
}
