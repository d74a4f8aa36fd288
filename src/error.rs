// 错误定义 - 截图流程中所有可能的失败原因
//
// 对调用方只暴露一个固定错误码，调用方只能通过消息文本区分具体原因

use serde::Serialize;

/// 对外统一的错误码
pub const ERROR_UNABLE_TO_SNAPSHOT: &str = "E_UNABLE_TO_SNAPSHOT";

/// 截图错误
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// 请求的视图标识没有对应的存活节点
    #[error("未找到视图: {0}")]
    NodeNotFound(String),

    /// 节点（或其有效尺寸）宽高不大于 0
    #[error("无法截取视图，尺寸无效: {width}x{height}")]
    InvalidGeometry { width: i64, height: i64 },

    /// 编码器拒绝了图像
    #[error("图像编码失败: {0}")]
    EncodeFailure(String),

    /// 输出文件写入失败
    #[error("写入截图文件失败: {0}")]
    IoFailure(#[from] std::io::Error),

    /// 请求参数无效
    #[error("截图参数无效: {0}")]
    InvalidRequest(String),
}

impl SnapshotError {
    /// 所有错误共用同一个错误码
    pub fn code(&self) -> &'static str {
        ERROR_UNABLE_TO_SNAPSHOT
    }
}

/// 返回给调用方的失败结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotFailure {
    pub code: String,
    pub message: String,
}

impl From<SnapshotError> for SnapshotFailure {
    fn from(err: SnapshotError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for SnapshotFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for SnapshotFailure {}
