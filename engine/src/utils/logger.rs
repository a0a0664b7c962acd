use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// 初始化日志系统
///
/// 配置结构化日志输出:
/// - JSON格式文件: 按天轮转,便于日志分析工具解析
/// - 控制台: 人类可读格式,便于开发调试
/// - 环境变量控制: RUST_LOG=debug 可调整日志级别,默认 info
///
/// # 日志级别
/// - ERROR: 连接失败、持久化读写失败
/// - WARN: 丢弃的畸形消息、可恢复的远程失败
/// - INFO: 生命周期事件 (登录、开始/停止监控、广告任务启停)
/// - DEBUG: 逐条事件
///
/// # 重要提示
/// 返回的guard必须被调用者保存,直到应用退出。
/// 如果guard被drop,文件写入器将被关闭。
pub fn init(config: &LogConfig) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.dir)?;

    // 文件命名格式: live-monitor.2025-10-05.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.dir)?;

    // 非阻塞写入,避免日志I/O拖慢弹幕处理
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false);

    let console_layer = fmt::layer()
        .with_writer(io::stdout)
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(guard)
}
