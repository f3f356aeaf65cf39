// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// RUST_LOG 控制级别;DEPLOY_SUPERVISOR_LOG_JSON=1 输出 JSON 行
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_JSON_ENV: &str = "DEPLOY_SUPERVISOR_LOG_JSON";

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: info）
///   例如: RUST_LOG=deploy_supervisor=debug,slow_sql=warn
///
/// # 示例
/// ```no_run
/// use deploy_supervisor::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var(LOG_JSON_ENV)
        .map(|v| matches!(v.trim(), "1" | "true"))
        .unwrap_or(false);

    if json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .with_line_number(true)
            .init();
    }
}

/// 初始化测试环境的日志系统 (可重复调用)
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
