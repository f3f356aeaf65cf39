// ==========================================
// 光纤部署监理系统 - 配置层
// ==========================================
// 职责: 启动时加载不可变配置
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, AppConfig, ConfigManager};
