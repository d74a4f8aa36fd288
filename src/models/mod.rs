// 数据模型模块 - 定义截图请求、输出格式与结果

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::SnapshotError;

// 重新导出其他模块的类型
pub use crate::error::SnapshotFailure;

/// 视图标识（由视图树宿主分配）
pub type ViewTag = i32;

/// 表示“整个可见屏幕”的哨兵标识
pub const FULL_SCREEN_TAG: ViewTag = -1;

/// 截图根节点选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSelector {
    /// 当前显示界面的内容根节点
    FullScreen,
    /// 指定标识的节点
    Node(ViewTag),
}

impl RootSelector {
    /// 从宿主传入的标识构造，`-1` 表示整个屏幕
    pub fn from_tag(tag: ViewTag) -> Self {
        if tag == FULL_SCREEN_TAG {
            Self::FullScreen
        } else {
            Self::Node(tag)
        }
    }
}

impl std::fmt::Display for RootSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullScreen => write!(f, "全屏"),
            Self::Node(tag) => write!(f, "{}", tag),
        }
    }
}

/// 输出图像格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    #[serde(alias = "jpeg")]
    Jpg,
    Webp,
}

impl OutputFormat {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }

    /// MIME 子类型，jpg 必须报告为 jpeg
    pub fn mime_subtype(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// 是否为有损格式（只有有损格式使用 quality）
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpg)
    }
}

/// 缩放目标尺寸，宽高总是同时出现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

/// 结果通道类型（线上字符串枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    #[serde(rename = "tmpfile")]
    TmpFile,
    #[serde(rename = "raw")]
    RawBytes,
    #[serde(rename = "base64")]
    Base64,
    #[serde(rename = "data-uri")]
    DataUri,
}

/// 结果通道
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultChannel {
    /// 写入调用方预先指定的文件并返回 file:// URI
    TmpFile { path: PathBuf },
    /// 直接返回编码后的字节
    RawBytes,
    /// 返回 base64 文本（不换行）
    Base64,
    /// 返回带 `data:image/<type>;base64,` 前缀的 base64 文本
    DataUri,
}

/// 一次截图请求，构造后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    /// 截图根节点
    pub root_selector: RootSelector,
    /// 输出格式
    pub output_format: OutputFormat,
    /// 编码质量 [0.0, 1.0]，只对有损格式生效
    pub quality: f64,
    /// 截图后缩放的目标尺寸，None 表示保持原尺寸
    pub target_size: Option<TargetSize>,
    /// 为 true 时根节点高度取其直接子节点高度之和（截取完整滚动内容）
    pub treat_as_scrollable_content: bool,
    /// 结果通道
    pub result_channel: ResultChannel,
}

impl CaptureRequest {
    /// 使用默认参数创建请求：PNG、质量 1.0、原尺寸、返回字节
    pub fn new(root_selector: RootSelector) -> Self {
        Self {
            root_selector,
            output_format: OutputFormat::Png,
            quality: 1.0,
            target_size: None,
            treat_as_scrollable_content: false,
            result_channel: ResultChannel::RawBytes,
        }
    }

    pub fn with_format(mut self, format: OutputFormat, quality: f64) -> Self {
        self.output_format = format;
        self.quality = quality;
        self
    }

    pub fn with_target_size(mut self, width: u32, height: u32) -> Self {
        self.target_size = Some(TargetSize { width, height });
        self
    }

    pub fn with_scrollable_content(mut self, enabled: bool) -> Self {
        self.treat_as_scrollable_content = enabled;
        self
    }

    pub fn with_result(mut self, channel: ResultChannel) -> Self {
        self.result_channel = channel;
        self
    }

    /// 校验请求参数
    pub fn validate(&self) -> Result<(), SnapshotError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(SnapshotError::InvalidRequest(format!(
                "quality 必须在 [0, 1] 之间: {}",
                self.quality
            )));
        }

        if let Some(size) = self.target_size {
            if size.width == 0 || size.height == 0 {
                return Err(SnapshotError::InvalidRequest(format!(
                    "目标尺寸无效: {}x{}",
                    size.width, size.height
                )));
            }
        }

        Ok(())
    }
}

/// 截图成功的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutput {
    /// tmpfile 通道：文件 URI
    FileUri(String),
    /// raw 通道：编码后的字节
    Bytes(Vec<u8>),
    /// base64 / data-uri 通道：文本
    Inline(String),
}

/// 未指定参数时使用的默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDefaults {
    /// 默认输出格式
    pub format: OutputFormat,
    /// 默认质量
    pub quality: f64,
    /// 默认结果通道
    pub result: ResultKind,
}

impl Default for SnapshotDefaults {
    fn default() -> Self {
        Self {
            format: OutputFormat::Png,
            quality: 1.0,
            result: ResultKind::TmpFile,
        }
    }
}

/// 调用方传入的截图参数（JSON，所有字段可选）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub format: Option<OutputFormat>,
    pub quality: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub result: Option<ResultKind>,
    pub snapshot_content_container: Option<bool>,
    /// tmpfile 通道的目标文件
    pub path: Option<PathBuf>,
}

impl CaptureOptions {
    /// 用默认值补全参数并转换为截图请求
    pub fn into_request(
        self,
        root_selector: RootSelector,
        defaults: &SnapshotDefaults,
    ) -> Result<CaptureRequest, SnapshotError> {
        let target_size = match (self.width, self.height) {
            (Some(width), Some(height)) => Some(TargetSize { width, height }),
            (None, None) => None,
            _ => {
                return Err(SnapshotError::InvalidRequest(
                    "width 和 height 必须同时指定".to_string(),
                ))
            }
        };

        let result_channel = match self.result.unwrap_or(defaults.result) {
            ResultKind::TmpFile => {
                let path = self.path.ok_or_else(|| {
                    SnapshotError::InvalidRequest("tmpfile 通道需要指定 path".to_string())
                })?;
                ResultChannel::TmpFile { path }
            }
            ResultKind::RawBytes => ResultChannel::RawBytes,
            ResultKind::Base64 => ResultChannel::Base64,
            ResultKind::DataUri => ResultChannel::DataUri,
        };

        let request = CaptureRequest {
            root_selector,
            output_format: self.format.unwrap_or(defaults.format),
            quality: self.quality.unwrap_or(defaults.quality),
            target_size,
            treat_as_scrollable_content: self.snapshot_content_container.unwrap_or(false),
            result_channel,
        };
        request.validate()?;
        Ok(request)
    }
}
