// 视图截图库 - 把视图子树（含独立合成表面）截取为编码后的图像

// 声明模块
pub mod capture;
pub mod error;
pub mod host;
pub mod logger;
pub mod models;
pub mod output;
pub mod settings;

use tracing::{error, info};

// 导入必要的类型
use capture::Compositor;
use error::{SnapshotError, SnapshotFailure};
use host::{RasterBuffer, ViewTreeHost};
use models::{CaptureRequest, SnapshotOutput};

/// 编码最终位图并按请求的通道交付
///
/// 只操作已经完成的位图，可以在视图树线程之外执行
pub fn finish(
    buffer: &RasterBuffer,
    request: &CaptureRequest,
) -> Result<SnapshotOutput, SnapshotError> {
    let bytes = output::encode(buffer, request.output_format, request.quality)?;
    output::deliver(bytes, request.output_format, &request.result_channel)
}

fn capture_on_host<H: ViewTreeHost>(
    host: &mut H,
    request: &CaptureRequest,
) -> Result<RasterBuffer, SnapshotError> {
    request.validate()?;
    Compositor::new(host).capture(request)
}

/// 同步截图：合成、编码、交付都在调用线程上完成
///
/// 必须在持有视图树的线程上调用
pub fn snapshot<H: ViewTreeHost>(
    host: &mut H,
    request: &CaptureRequest,
) -> Result<SnapshotOutput, SnapshotFailure> {
    let result = capture_on_host(host, request).and_then(|buffer| finish(&buffer, request));

    match result {
        Ok(output) => {
            info!("视图 {} 截图已交付", request.root_selector);
            Ok(output)
        }
        Err(err) => {
            error!("视图 {} 截图失败: {}", request.root_selector, err);
            Err(err.into())
        }
    }
}

/// 异步截图：在调用线程上合成，编码和交付交给阻塞线程池
pub async fn snapshot_async<H: ViewTreeHost>(
    host: &mut H,
    request: CaptureRequest,
) -> Result<SnapshotOutput, SnapshotFailure> {
    let buffer = capture_on_host(host, &request).map_err(|err| {
        error!("视图 {} 截图失败: {}", request.root_selector, err);
        SnapshotFailure::from(err)
    })?;

    let selector = request.root_selector;
    let result = tokio::task::spawn_blocking(move || finish(&buffer, &request))
        .await
        .map_err(|e| SnapshotFailure {
            code: error::ERROR_UNABLE_TO_SNAPSHOT.to_string(),
            message: format!("编码任务异常退出: {}", e),
        })?;

    match result {
        Ok(output) => {
            info!("视图 {} 截图已交付", selector);
            Ok(output)
        }
        Err(err) => {
            error!("视图 {} 截图失败: {}", selector, err);
            Err(err.into())
        }
    }
}
