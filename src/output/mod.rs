//! 输出模块
//!
//! 把最终位图编码为指定格式，并通过请求的结果通道交付：
//! - `encoder`: 调用 image 编解码器
//! - `sink`: 写文件 / 返回字节 / base64 文本
//! - `tmpfile`: tmpfile 通道使用的临时文件管理

pub mod encoder;
pub mod sink;
pub mod tmpfile;

pub use encoder::{encode, quality_percent};
pub use sink::{deliver, file_uri};
pub use tmpfile::{cleanup_temp_files, create_temp_file, release_capture};
