// ==========================================
// 光纤部署监理系统 - SQLite 连接初始化与 schema
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键必须每个连接单独开启)
// - 唯一约束全部落在数据库唯一索引上,并发插入由存储层裁决
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 2;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建好 schema (测试/演示用)
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表 (幂等)
///
/// 删除语义:
/// - 严格从属的子表 ON DELETE CASCADE (项目 → 计划 → 任务 → 日报)
/// - 受保护引用 ON DELETE RESTRICT (BOQ 条目、任务定义、分包商、运营商)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 启动时校验 schema 版本 (只告警,不自动迁移)
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    match read_schema_version(conn)? {
        None => {
            tracing::info!("数据库为空,初始化 schema v{}", CURRENT_SCHEMA_VERSION);
            init_schema(conn)?;
        }
        Some(v) if v < CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema 版本落后"
            );
            init_schema(conn)?;
        }
        Some(v) => {
            tracing::debug!(db_version = v, "schema 版本检查通过");
        }
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS profile (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    last_name TEXT NOT NULL,
    first_names TEXT NOT NULL,
    role TEXT NOT NULL,
    superior_id TEXT REFERENCES profile(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_profile_code ON profile(code);
CREATE INDEX IF NOT EXISTS ix_profile_superior ON profile(superior_id);

CREATE TABLE IF NOT EXISTS operator (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT '#000000',
    contact_name TEXT NOT NULL DEFAULT '',
    contact_email TEXT NOT NULL DEFAULT '',
    contact_phone TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_operator_code ON operator(code);

CREATE TABLE IF NOT EXISTS boq_category (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_boq_category_code ON boq_category(code);

CREATE TABLE IF NOT EXISTS boq_item (
    id TEXT PRIMARY KEY,
    operator_id TEXT NOT NULL REFERENCES operator(id) ON DELETE RESTRICT,
    category_id TEXT NOT NULL REFERENCES boq_category(id) ON DELETE RESTRICT,
    code TEXT NOT NULL,
    label TEXT NOT NULL,
    unit TEXT NOT NULL,
    unit_price TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_boq_item_operator_code ON boq_item(operator_id, code);
CREATE INDEX IF NOT EXISTS ix_boq_item_operator_category ON boq_item(operator_id, category_id);

CREATE TABLE IF NOT EXISTS task_definition (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    label TEXT NOT NULL,
    unit TEXT NOT NULL,
    kpi TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_task_definition_code ON task_definition(code);

CREATE TABLE IF NOT EXISTS task_definition_boq_item (
    task_definition_id TEXT NOT NULL REFERENCES task_definition(id) ON DELETE CASCADE,
    boq_item_id TEXT NOT NULL REFERENCES boq_item(id) ON DELETE CASCADE,
    PRIMARY KEY (task_definition_id, boq_item_id)
);
CREATE INDEX IF NOT EXISTS ix_tdbi_boq_item ON task_definition_boq_item(boq_item_id);

CREATE TABLE IF NOT EXISTS subcontractor (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    address TEXT NOT NULL DEFAULT '',
    phone TEXT NOT NULL DEFAULT '',
    email TEXT NOT NULL DEFAULT '',
    main_contact_name TEXT NOT NULL DEFAULT '',
    main_contact_phone TEXT NOT NULL DEFAULT '',
    specialities TEXT NOT NULL DEFAULT '',
    trade_register_number TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    collaboration_start TEXT,
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_subcontractor_code ON subcontractor(code);

CREATE TABLE IF NOT EXISTS project (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    operator_id TEXT NOT NULL REFERENCES operator(id) ON DELETE RESTRICT,
    project_type TEXT NOT NULL,
    zone TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'planifie',
    start_date TEXT NOT NULL,
    expected_end_date TEXT NOT NULL,
    actual_end_date TEXT,
    delivery_date TEXT,
    works_ok INTEGER NOT NULL DEFAULT 0,
    environment_ok INTEGER NOT NULL DEFAULT 0,
    technical_visit_ok INTEGER NOT NULL DEFAULT 0,
    report_ok INTEGER NOT NULL DEFAULT 0,
    supervisor_id TEXT,
    operator_supervisor TEXT NOT NULL DEFAULT '',
    budget TEXT,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_project_code ON project(code);
CREATE INDEX IF NOT EXISTS ix_project_operator_status ON project(operator_id, status);
CREATE INDEX IF NOT EXISTS ix_project_start_date ON project(start_date);

CREATE TABLE IF NOT EXISTS project_planning (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(id) ON DELETE CASCADE,
    boq_item_id TEXT NOT NULL REFERENCES boq_item(id) ON DELETE RESTRICT,
    unit_value INTEGER NOT NULL DEFAULT 1,
    planned_quantity TEXT NOT NULL,
    deadline_days INTEGER NOT NULL,
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_project_planning_item ON project_planning(project_id, boq_item_id);

CREATE TABLE IF NOT EXISTS task_planning (
    id TEXT PRIMARY KEY,
    project_planning_id TEXT NOT NULL REFERENCES project_planning(id) ON DELETE CASCADE,
    task_definition_id TEXT NOT NULL REFERENCES task_definition(id) ON DELETE RESTRICT,
    unit_value INTEGER NOT NULL DEFAULT 1,
    planned_quantity TEXT NOT NULL,
    deadline_days INTEGER NOT NULL,
    planned_start TEXT NOT NULL,
    planned_end TEXT NOT NULL,
    actual_start TEXT,
    actual_end TEXT,
    status TEXT NOT NULL DEFAULT 'non_commence',
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_task_planning_pp ON task_planning(project_planning_id, display_order);

CREATE TABLE IF NOT EXISTS daily_report (
    id TEXT PRIMARY KEY,
    task_planning_id TEXT NOT NULL REFERENCES task_planning(id) ON DELETE CASCADE,
    report_date TEXT NOT NULL,
    unit_value INTEGER NOT NULL DEFAULT 1,
    quantity TEXT NOT NULL,
    subcontractor_id TEXT REFERENCES subcontractor(id) ON DELETE RESTRICT,
    referent_id TEXT NOT NULL,
    observations TEXT NOT NULL DEFAULT '',
    photos_json TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
-- 内部施工以空串作为哨兵,避免 NULL != NULL 使槽位唯一性失效
CREATE UNIQUE INDEX IF NOT EXISTS ux_daily_report_slot
    ON daily_report(task_planning_id, report_date, COALESCE(subcontractor_id, ''));
CREATE INDEX IF NOT EXISTS ix_daily_report_date ON daily_report(report_date);
CREATE INDEX IF NOT EXISTS ix_daily_report_subcontractor ON daily_report(subcontractor_id);

CREATE TABLE IF NOT EXISTS cartography_point (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(id) ON DELETE CASCADE,
    point_date TEXT NOT NULL,
    locality TEXT NOT NULL,
    infrastructure_type TEXT NOT NULL,
    latitude TEXT NOT NULL,
    longitude TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    photo TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_cartography_project_type ON cartography_point(project_id, infrastructure_type);

CREATE TABLE IF NOT EXISTS delivery_phase (
    id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES project(id) ON DELETE CASCADE,
    phase TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'en_cours',
    start_date TEXT NOT NULL,
    end_date TEXT,
    responsible_id TEXT,
    observations TEXT NOT NULL DEFAULT '',
    documents_json TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_delivery_phase ON delivery_phase(project_id, phase);

CREATE TABLE IF NOT EXISTS correction (
    id TEXT PRIMARY KEY,
    delivery_phase_id TEXT NOT NULL REFERENCES delivery_phase(id) ON DELETE CASCADE,
    correction_date TEXT NOT NULL,
    boq_item_id TEXT NOT NULL REFERENCES boq_item(id) ON DELETE RESTRICT,
    task_definition_id TEXT REFERENCES task_definition(id) ON DELETE RESTRICT,
    status TEXT NOT NULL,
    observations TEXT NOT NULL,
    photos_json TEXT NOT NULL DEFAULT '[]',
    corrector_id TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS ix_correction_phase ON correction(delivery_phase_id, correction_date);

-- v2: 施工人员
CREATE TABLE IF NOT EXISTS speciality (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#000000',
    is_active INTEGER NOT NULL DEFAULT 1,
    display_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_speciality_code ON speciality(code);

CREATE TABLE IF NOT EXISTS technician (
    id TEXT PRIMARY KEY,
    matricule TEXT NOT NULL,
    last_name TEXT NOT NULL,
    first_names TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT NOT NULL DEFAULT '',
    address TEXT NOT NULL DEFAULT '',
    speciality_id TEXT REFERENCES speciality(id) ON DELETE RESTRICT,
    skill_level TEXT NOT NULL DEFAULT 'junior',
    hire_date TEXT NOT NULL,
    birth_date TEXT,
    national_id_number TEXT NOT NULL DEFAULT '',
    is_site_lead INTEGER NOT NULL DEFAULT 0,
    certifications TEXT NOT NULL DEFAULT '',
    equipment_json TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    notes TEXT NOT NULL DEFAULT '',
    photo TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_technician_matricule ON technician(matricule);
CREATE INDEX IF NOT EXISTS ix_technician_speciality ON technician(speciality_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = open_in_memory().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
