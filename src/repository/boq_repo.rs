// ==========================================
// 光纤部署监理系统 - BOQ 类别/条目数据仓储
// ==========================================
// 不变量 (由唯一索引保证):
// - boq_category.code 唯一
// - (boq_item.operator_id, boq_item.code) 唯一
// ==========================================

use crate::domain::catalog::{BoqCategory, BoqItem};
use crate::domain::types::Unit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::operator_repo::UpsertOutcome;
use crate::repository::row_utils::{fmt_datetime, fmt_decimal, get_datetime, get_decimal, get_enum};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// BoqCategoryRepository - 工程类别仓储
// ==========================================
pub struct BoqCategoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BoqCategoryRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, category: &BoqCategory) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO boq_category (id, code, name, description, is_active, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                category.id,
                category.code,
                category.name,
                category.description,
                category.is_active,
                fmt_datetime(category.created_at),
            ],
        )?;
        Ok(category.id.clone())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<BoqCategory>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                r#"SELECT id, code, name, description, is_active, created_at
                   FROM boq_category WHERE id = ?1"#,
                params![id],
                map_category_row,
            )
            .optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<BoqCategory>> {
        let conn = self.get_conn()?;
        Ok(conn
            .query_row(
                r#"SELECT id, code, name, description, is_active, created_at
                   FROM boq_category WHERE code = ?1"#,
                params![code],
                map_category_row,
            )
            .optional()?)
    }

    /// 全部类别,按名称排序
    pub fn list_all(&self) -> RepositoryResult<Vec<BoqCategory>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT id, code, name, description, is_active, created_at
               FROM boq_category ORDER BY name"#,
        )?;
        let rows = stmt
            .query_map([], map_category_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 类别下条目数
    pub fn count_items(&self, category_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM boq_item WHERE category_id = ?1",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_category_row(row: &rusqlite::Row) -> rusqlite::Result<BoqCategory> {
    Ok(BoqCategory {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get(4)?,
        created_at: get_datetime(row, 5)?,
    })
}

// ==========================================
// BoqItemRepository - BOQ 条目仓储
// ==========================================

const ITEM_COLUMNS: &str = r#"SELECT id, operator_id, category_id, code, label, unit,
       unit_price, description, is_active, created_at, updated_at
  FROM boq_item"#;

/// 条目列表过滤
#[derive(Debug, Clone, Default)]
pub struct BoqItemFilter {
    pub operator_id: Option<String>,
    pub category_id: Option<String>,
    pub active_only: bool,
}

pub struct BoqItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl BoqItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入条目
    ///
    /// # 返回
    /// - `Err(UniqueConstraintViolation)`: 同一运营商下 code 重复
    /// - `Err(ForeignKeyViolation)`: 运营商或类别不存在
    pub fn insert(&self, item: &BoqItem) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_item(&conn, item)?;
        Ok(item.id.clone())
    }

    pub fn update(&self, item: &BoqItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE boq_item
               SET category_id = ?1, code = ?2, label = ?3, unit = ?4, unit_price = ?5,
                   description = ?6, is_active = ?7, updated_at = ?8
               WHERE id = ?9"#,
            params![
                item.category_id,
                item.code,
                item.label,
                item.unit.to_db_str(),
                fmt_decimal(item.unit_price),
                item.description,
                item.is_active,
                fmt_datetime(item.updated_at),
                item.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("BoqItem", &item.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<BoqItem>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", ITEM_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_item_row).optional()?)
    }

    pub fn find_by_operator_code(&self, operator_id: &str, code: &str) -> RepositoryResult<Option<BoqItem>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE operator_id = ?1 AND code = ?2", ITEM_COLUMNS);
        Ok(conn
            .query_row(&sql, params![operator_id, code], map_item_row)
            .optional()?)
    }

    /// 条目列表,按 (运营商, 类别, code) 排序
    pub fn list(&self, filter: &BoqItemFilter) -> RepositoryResult<Vec<BoqItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
               WHERE (?1 IS NULL OR operator_id = ?1)
                 AND (?2 IS NULL OR category_id = ?2)
                 AND (?3 = 0 OR is_active = 1)
               ORDER BY operator_id, category_id, code"#,
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![filter.operator_id, filter.category_id, filter.active_only],
                map_item_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 删除条目 (被计划/整改引用时 → ForeignKeyViolation)
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM boq_item WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("BoqItem", id));
        }
        Ok(())
    }

    /// 关联的任务定义数
    pub fn count_tasks(&self, boq_item_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM task_definition_boq_item WHERE boq_item_id = ?1",
            params![boq_item_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 批量按 (operator_id, code) upsert (单事务)
    ///
    /// 已存在的条目保留原 id,只覆盖可变字段
    pub fn upsert_batch(&self, items: &[BoqItem]) -> RepositoryResult<Vec<UpsertOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(items.len());

        for item in items {
            let updated = tx.execute(
                r#"UPDATE boq_item
                   SET category_id = ?1, label = ?2, unit = ?3, unit_price = ?4,
                       description = ?5, is_active = ?6, updated_at = ?7
                   WHERE operator_id = ?8 AND code = ?9"#,
                params![
                    item.category_id,
                    item.label,
                    item.unit.to_db_str(),
                    fmt_decimal(item.unit_price),
                    item.description,
                    item.is_active,
                    fmt_datetime(item.updated_at),
                    item.operator_id,
                    item.code,
                ],
            )?;
            if updated > 0 {
                outcomes.push(UpsertOutcome::Updated);
            } else {
                insert_item(&tx, item)?;
                outcomes.push(UpsertOutcome::Created);
            }
        }

        tx.commit()?;
        Ok(outcomes)
    }
}

fn insert_item(conn: &Connection, item: &BoqItem) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO boq_item (
            id, operator_id, category_id, code, label, unit, unit_price,
            description, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
        params![
            item.id,
            item.operator_id,
            item.category_id,
            item.code,
            item.label,
            item.unit.to_db_str(),
            fmt_decimal(item.unit_price),
            item.description,
            item.is_active,
            fmt_datetime(item.created_at),
            fmt_datetime(item.updated_at),
        ],
    )?;
    Ok(())
}

fn map_item_row(row: &rusqlite::Row) -> rusqlite::Result<BoqItem> {
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
}
