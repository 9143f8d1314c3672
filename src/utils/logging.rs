/// 日志工具模块
///
/// 提供日志初始化和生命周期日志的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；否则 verbose 时为 debug，默认 info
///
/// # 参数
/// - `verbose`: 是否显示详细日志
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 重复初始化（如测试中）时忽略错误
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录环境启动信息
///
/// # 参数
/// - `launch_file`: launch 文件路径
/// - `port`: roscore 端口
pub fn log_startup(launch_file: &str, port: u16) {
    info!("{}", "=".repeat(60));
    info!("🚀 启动 ROPOD 仿真环境 - {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("📄 launch 文件: {}", launch_file);
    info!("🔌 roscore 端口: {}", port);
    info!("{}", "=".repeat(60));
}

/// 记录环境关闭信息
pub fn log_shutdown() {
    info!("{}", "─".repeat(60));
    info!("🛑 ROPOD 仿真环境已关闭 - {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "─".repeat(60));
}
