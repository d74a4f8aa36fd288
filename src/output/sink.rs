// 结果交付 - 把编码后的字节按结果通道交给调用方

use base64::Engine as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::trace;
use url::Url;

use crate::error::SnapshotError;
use crate::models::{OutputFormat, ResultChannel, SnapshotOutput};

/// 把文件路径转换为 file:// URI，路径部分按 URI 规则转义
pub fn file_uri(path: &Path) -> Result<String, SnapshotError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| {
            SnapshotError::IoFailure(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("无法转换为文件 URI: {}", absolute.display()),
            ))
        })
}

/// 按结果通道交付编码结果
pub fn deliver(
    bytes: Vec<u8>,
    format: OutputFormat,
    channel: &ResultChannel,
) -> Result<SnapshotOutput, SnapshotError> {
    match channel {
        ResultChannel::TmpFile { path } => {
            write_file(path, &bytes)?;
            trace!("截图已写入: {}", path.display());
            Ok(SnapshotOutput::FileUri(file_uri(path)?))
        }
        ResultChannel::RawBytes => Ok(SnapshotOutput::Bytes(bytes)),
        ResultChannel::Base64 => Ok(SnapshotOutput::Inline(
            base64::engine::general_purpose::STANDARD.encode(&bytes),
        )),
        ResultChannel::DataUri => {
            let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
            Ok(SnapshotOutput::Inline(format!(
                "data:image/{};base64,{}",
                format.mime_subtype(),
                data
            )))
        }
    }
}

/// 写入文件，任何返回路径上文件句柄都会被关闭
fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(bytes)?;
    writer.flush()?;
    Ok(())
}
