// ==========================================
// 光纤部署监理系统 - 配置管理器
// ==========================================
// 职责: 启动时一次性加载 AppConfig
// 优先级: 默认值 < config_kv (scope_id='global') < 环境变量 DEPLOY_SUPERVISOR_*
// 存储: config_kv 表 (key-value + scope)
// 加载完成后 AppConfig 不可变,经 Arc 共享
// ==========================================

use crate::app::state::get_default_db_path;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "DEPLOY_SUPERVISOR_";

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// AppConfig - 应用配置 (不可变)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub db_path: String,
    pub site_header: String,
    pub site_title: String,
    /// 内部施工的执行方名称
    pub internal_executor_label: String,
    /// 用户层级遍历深度上限
    pub hierarchy_max_depth: usize,
    /// 慢 SQL 阈值 (毫秒),0 = 不告警
    pub slow_sql_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: get_default_db_path(),
            site_header: "光纤部署监理系统".to_string(),
            site_title: "光纤部署监理 - 后台".to_string(),
            internal_executor_label: "AI Venture".to_string(),
            hierarchy_max_depth: 32,
            slow_sql_ms: 200,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    /// 写入全局配置 (已存在则覆盖)
    ///
    /// 只影响下一次 load,已加载的 AppConfig 不变
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO config_kv (scope_id, key, value, updated_at)
               VALUES (?1, ?2, ?3, datetime('now'))
               ON CONFLICT(scope_id, key) DO UPDATE SET
                   value = excluded.value,
                   updated_at = excluded.updated_at"#,
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 加载配置: 默认值 ← config_kv ← 进程环境变量
    pub fn load(&self) -> RepositoryResult<AppConfig> {
        self.load_with_env(|name| std::env::var(name).ok())
    }

    /// 加载配置,环境变量来源由调用方提供 (测试时注入)
    pub fn load_with_env<F>(&self, env: F) -> RepositoryResult<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = AppConfig::default();

        // 逐层覆盖: 先库后环境
        let lookup = |key: &str| -> RepositoryResult<Option<String>> {
            let env_name = format!("{}{}", ENV_PREFIX, key.to_uppercase());
            if let Some(v) = env(&env_name).filter(|v| !v.trim().is_empty()) {
                return Ok(Some(v.trim().to_string()));
            }
            self.get_global_config_value(key)
        };

        if let Some(v) = lookup(config_keys::DB_PATH)? {
            cfg.db_path = v;
        }
        if let Some(v) = lookup(config_keys::SITE_HEADER)? {
            cfg.site_header = v;
        }
        if let Some(v) = lookup(config_keys::SITE_TITLE)? {
            cfg.site_title = v;
        }
        if let Some(v) = lookup(config_keys::INTERNAL_EXECUTOR_LABEL)? {
            cfg.internal_executor_label = v;
        }
        if let Some(v) = lookup(config_keys::HIERARCHY_MAX_DEPTH)? {
            cfg.hierarchy_max_depth = parse_or_keep(config_keys::HIERARCHY_MAX_DEPTH, &v, cfg.hierarchy_max_depth);
        }
        if let Some(v) = lookup(config_keys::SLOW_SQL_MS)? {
            cfg.slow_sql_ms = parse_or_keep(config_keys::SLOW_SQL_MS, &v, cfg.slow_sql_ms);
        }

        if cfg.hierarchy_max_depth == 0 {
            tracing::warn!("hierarchy_max_depth 不能为 0,回退为 1");
            cfg.hierarchy_max_depth = 1;
        }

        tracing::debug!(?cfg, "配置加载完成");
        Ok(cfg)
    }
}

/// 数值解析失败时保留原值并告警
fn parse_or_keep<T>(key: &str, raw: &str, current: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(config_key = key, value = raw, fallback = %current, "配置值无法解析,使用默认值");
            current
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    pub const DB_PATH: &str = "db_path";
    pub const SITE_HEADER: &str = "site_header";
    pub const SITE_TITLE: &str = "site_title";
    pub const INTERNAL_EXECUTOR_LABEL: &str = "internal_executor_label";
    pub const HIERARCHY_MAX_DEPTH: &str = "hierarchy_max_depth";
    pub const SLOW_SQL_MS: &str = "slow_sql_ms";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use std::collections::HashMap;

    fn manager() -> ConfigManager {
        let conn = open_in_memory().unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_overrides() {
        let cfg = manager().load_with_env(no_env).unwrap();
        assert_eq!(cfg.internal_executor_label, "AI Venture");
        assert_eq!(cfg.hierarchy_max_depth, 32);
        assert!(cfg.db_path.ends_with(".db"));
    }

    #[test]
    fn test_config_kv_overrides_defaults() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::SITE_TITLE, "监理后台").unwrap();
        mgr.set_global_config_value(config_keys::SLOW_SQL_MS, "50").unwrap();
        // 覆盖写
        mgr.set_global_config_value(config_keys::SLOW_SQL_MS, "75").unwrap();

        let cfg = mgr.load_with_env(no_env).unwrap();
        assert_eq!(cfg.site_title, "监理后台");
        assert_eq!(cfg.slow_sql_ms, 75);
    }

    #[test]
    fn test_env_overrides_config_kv() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::HIERARCHY_MAX_DEPTH, "8").unwrap();

        let env: HashMap<&str, &str> = HashMap::from([
            ("DEPLOY_SUPERVISOR_HIERARCHY_MAX_DEPTH", "4"),
            ("DEPLOY_SUPERVISOR_DB_PATH", "/tmp/x.db"),
        ]);
        let cfg = mgr
            .load_with_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(cfg.hierarchy_max_depth, 4);
        assert_eq!(cfg.db_path, "/tmp/x.db");
    }

    #[test]
    fn test_unparsable_value_keeps_default() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::HIERARCHY_MAX_DEPTH, "deep").unwrap();
        mgr.set_global_config_value(config_keys::SLOW_SQL_MS, "0").unwrap();

        let cfg = mgr.load_with_env(no_env).unwrap();
        assert_eq!(cfg.hierarchy_max_depth, 32);
        assert_eq!(cfg.slow_sql_ms, 0);
    }
}
