// 日志初始化 - 控制台 + 按天轮转的文件，并可把日志转发给宿主

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// 日志消息
#[derive(Clone, Debug, serde::Serialize)]
pub struct LogMessage {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

type LogCallback = Box<dyn Fn(&LogMessage) + Send + Sync>;

/// 日志转发器 - 把日志交给宿主注册的回调
pub struct LogForwarder {
    callback: RwLock<Option<LogCallback>>,
    enabled: RwLock<bool>,
}

impl Default for LogForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogForwarder {
    pub fn new() -> Self {
        Self {
            callback: RwLock::new(None),
            enabled: RwLock::new(true),
        }
    }

    /// 注册宿主回调
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(&LogMessage) + Send + Sync + 'static,
    {
        if let Ok(mut slot) = self.callback.write() {
            *slot = Some(Box::new(callback));
        }
    }

    /// 设置日志转发开关
    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut e) = self.enabled.write() {
            *e = enabled;
        }
    }

    /// 获取日志转发状态
    pub fn is_enabled(&self) -> bool {
        self.enabled.read().map(|e| *e).unwrap_or(false)
    }

    fn forward(&self, log: &LogMessage) {
        if !self.is_enabled() {
            return;
        }

        if let Ok(slot) = self.callback.read() {
            if let Some(callback) = slot.as_ref() {
                callback(log);
            }
        }
    }
}

/// 把事件转发给宿主的日志层
pub struct HostLogLayer {
    forwarder: Arc<LogForwarder>,
}

impl HostLogLayer {
    pub fn new(forwarder: Arc<LogForwarder>) -> Self {
        Self { forwarder }
    }
}

impl<S: Subscriber> Layer<S> for HostLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        struct MessageVisitor {
            message: String,
        }

        impl tracing::field::Visit for MessageVisitor {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = value.to_string();
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = format!("{:?}", value);
                }
            }
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        let log = LogMessage {
            timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message: visitor.message,
        };

        self.forwarder.forward(&log);
    }
}

/// 默认日志目录
///
/// - macOS: ~/Library/Logs/view-snapshot
/// - Windows: %APPDATA%/view-snapshot/logs
/// - Linux: ~/.local/share/view-snapshot/logs
pub fn default_log_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("Library/Logs/view-snapshot")
    } else if cfg!(target_os = "windows") {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata).join("view-snapshot").join("logs")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".local/share/view-snapshot/logs")
    }
}

/// 初始化日志系统（带宿主转发）
pub fn init_with_forwarder(
    log_dir: PathBuf,
    forwarder: Arc<LogForwarder>,
) -> Result<(), SetGlobalDefaultError> {
    use tracing_subscriber::fmt::time::LocalTime;
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir.clone(), "snapshot.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // 保持 guard 在整个程序生命周期
    std::mem::forget(_guard);

    let writer = std::io::stdout.and(non_blocking);

    let timer = LocalTime::new(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(writer)
        .with_timer(timer)
        .with_ansi(cfg!(debug_assertions))
        .finish()
        .with(HostLogLayer::new(forwarder));

    tracing::subscriber::set_global_default(subscriber)?;

    eprintln!("日志文件位置: {:?}", log_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_forwards_messages() {
        let forwarder = Arc::new(LogForwarder::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        forwarder.set_callback(move |log| sink.lock().unwrap().push(log.clone()));

        let subscriber = tracing_subscriber::registry().with(HostLogLayer::new(forwarder.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("截图完成 {}", 3);
            forwarder.set_enabled(false);
            tracing::info!("不应转发");
        });

        let logs = received.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].level, "INFO");
        assert_eq!(logs[0].message, "截图完成 3");
    }

    #[test]
    fn test_disabled_forwarder_reports_state() {
        let forwarder = LogForwarder::new();
        assert!(forwarder.is_enabled());
        forwarder.set_enabled(false);
        assert!(!forwarder.is_enabled());
    }
}
