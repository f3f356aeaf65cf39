// ==========================================
// 光纤部署监理系统 - 任务定义数据仓储
// ==========================================
// 任务定义 ↔ BOQ 条目 多对多,边存于 task_definition_boq_item
// 两侧均可查询,不在实体中嵌入对方列表
// ==========================================

use crate::domain::catalog::{BoqItem, TaskDefinition};
use crate::domain::types::Unit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, fmt_decimal, get_datetime, get_decimal, get_enum};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, code, label, unit, kpi, description, is_active, created_at
  FROM task_definition"#;

pub struct TaskDefinitionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TaskDefinitionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入任务定义 (code 全局唯一)
    pub fn insert(&self, def: &TaskDefinition) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO task_definition (id, code, label, unit, kpi, description, is_active, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            params![
                def.id,
                def.code,
                def.label,
                def.unit.to_db_str(),
                fmt_decimal(def.kpi),
                def.description,
                def.is_active,
                fmt_datetime(def.created_at),
            ],
        )?;
        Ok(def.id.clone())
    }

    pub fn update(&self, def: &TaskDefinition) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE task_definition
               SET code = ?1, label = ?2, unit = ?3, kpi = ?4, description = ?5, is_active = ?6
               WHERE id = ?7"#,
            params![
                def.code,
                def.label,
                def.unit.to_db_str(),
                fmt_decimal(def.kpi),
                def.description,
                def.is_active,
                def.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("TaskDefinition", &def.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<TaskDefinition>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<TaskDefinition>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_row).optional()?)
    }

    /// 列表,按 code 排序
    pub fn list(&self, active_only: bool) -> RepositoryResult<Vec<TaskDefinition>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE (?1 = 0 OR is_active = 1) ORDER BY code", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![active_only], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 删除 (被任务计划/整改引用时 → ForeignKeyViolation)
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM task_definition WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("TaskDefinition", id));
        }
        Ok(())
    }

    // ==========================================
    // 多对多边
    // ==========================================

    /// 建立关联 (已存在时静默忽略)
    pub fn link_boq_item(&self, task_definition_id: &str, boq_item_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT OR IGNORE INTO task_definition_boq_item (task_definition_id, boq_item_id)
               VALUES (?1, ?2)"#,
            params![task_definition_id, boq_item_id],
        )?;
        Ok(())
    }

    /// 解除关联,返回是否真的删除了边
    pub fn unlink_boq_item(&self, task_definition_id: &str, boq_item_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM task_definition_boq_item WHERE task_definition_id = ?1 AND boq_item_id = ?2",
            params![task_definition_id, boq_item_id],
        )?;
        Ok(rows > 0)
    }

    pub fn count_boq_items(&self, task_definition_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM task_definition_boq_item WHERE task_definition_id = ?1",
            params![task_definition_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 任务定义关联的 BOQ 条目
    pub fn list_boq_items(&self, task_definition_id: &str) -> RepositoryResult<Vec<BoqItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT b.id, b.operator_id, b.category_id, b.code, b.label, b.unit,
                      b.unit_price, b.description, b.is_active, b.created_at, b.updated_at
               FROM boq_item b
               JOIN task_definition_boq_item e ON e.boq_item_id = b.id
               WHERE e.task_definition_id = ?1
               ORDER BY b.code"#,
        )?;
        let rows = stmt
            .query_map(params![task_definition_id], |row| {
                Ok(BoqItem {
                    id: row.get(0)?,
                    operator_id: row.get(1)?,
                    category_id: row.get(2)?,
                    code: row.get(3)?,
                    label: row.get(4)?,
                    unit: get_enum(row, 5, Unit::from_db_str)?,
                    unit_price: get_decimal(row, 6)?,
                    description: row.get(7)?,
                    is_active: row.get(8)?,
                    created_at: get_datetime(row, 9)?,
                    updated_at: get_datetime(row, 10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 反向: 可服务某 BOQ 条目的任务定义
    pub fn list_for_boq_item(&self, boq_item_id: &str) -> RepositoryResult<Vec<TaskDefinition>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT t.id, t.code, t.label, t.unit, t.kpi, t.description, t.is_active, t.created_at
               FROM task_definition t
               JOIN task_definition_boq_item e ON e.task_definition_id = t.id
               WHERE e.boq_item_id = ?1
               ORDER BY t.code"#,
        )?;
        let rows = stmt
            .query_map(params![boq_item_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TaskDefinition> {
    Ok(TaskDefinition {
        id: row.get(0)?,
        code: row.get(1)?,
        label: row.get(2)?,
        unit: get_enum(row, 3, Unit::from_db_str)?,
        kpi: get_decimal(row, 4)?,
        description: row.get(5)?,
        is_active: row.get(6)?,
        created_at: get_datetime(row, 7)?,
    })
}
