// ==========================================
// 光纤部署监理系统 - 运营商数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 运营商只做软停用 (is_active = 0)
// ==========================================

use crate::domain::catalog::Operator;
use crate::domain::types::ProjectStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, code, name, color, contact_name, contact_email,
       contact_phone, is_active, created_at, updated_at
  FROM operator"#;

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

// ==========================================
// OperatorRepository - 运营商仓储
// ==========================================
pub struct OperatorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OperatorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入运营商 (code 重复 → UniqueConstraintViolation)
    pub fn insert(&self, op: &Operator) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, op)?;
        Ok(op.id.clone())
    }

    fn insert_with(conn: &Connection, op: &Operator) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO operator (
                id, code, name, color, contact_name, contact_email,
                contact_phone, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                op.id,
                op.code,
                op.name,
                op.color,
                op.contact_name,
                op.contact_email,
                op.contact_phone,
                op.is_active,
                fmt_datetime(op.created_at),
                fmt_datetime(op.updated_at),
            ],
        )?;
        Ok(())
    }

    /// 更新基础信息 (code 不可改)
    pub fn update(&self, op: &Operator) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE operator
               SET name = ?1, color = ?2, contact_name = ?3, contact_email = ?4,
                   contact_phone = ?5, is_active = ?6, updated_at = ?7
               WHERE id = ?8"#,
            params![
                op.name,
                op.color,
                op.contact_name,
                op.contact_email,
                op.contact_phone,
                op.is_active,
                fmt_datetime(op.updated_at),
                op.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Operator", &op.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Operator>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Operator>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_row).optional()?)
    }

    /// 全部运营商,按名称排序
    pub fn list_all(&self) -> RepositoryResult<Vec<Operator>> {
        self.query_list(&format!("{} ORDER BY name", SELECT_COLUMNS))
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Operator>> {
        self.query_list(&format!("{} WHERE is_active = 1 ORDER BY name", SELECT_COLUMNS))
    }

    fn query_list(&self, sql: &str) -> RepositoryResult<Vec<Operator>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 软停用/启用
    pub fn set_active(&self, id: &str, active: bool, updated_at: chrono::NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE operator SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, fmt_datetime(updated_at), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Operator", id));
        }
        Ok(())
    }

    /// 活跃项目数 (planned / in_progress / in_delivery)
    pub fn count_active_projects(&self, operator_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let [a, b, c] = ProjectStatus::active_statuses();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM project WHERE operator_id = ?1 AND status IN (?2, ?3, ?4)",
            params![operator_id, a.to_db_str(), b.to_db_str(), c.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 批量按 code upsert (单事务,任一失败整体回滚)
    ///
    /// # 返回
    /// - 每条记录的 upsert 结果,顺序与输入一致
    pub fn upsert_batch_by_code(&self, operators: &[Operator]) -> RepositoryResult<Vec<UpsertOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(operators.len());

        for op in operators {
            let updated = tx.execute(
                r#"UPDATE operator
                   SET name = ?1, color = ?2, contact_name = ?3, contact_email = ?4,
                       contact_phone = ?5, is_active = ?6, updated_at = ?7
                   WHERE code = ?8"#,
                params![
                    op.name,
                    op.color,
                    op.contact_name,
                    op.contact_email,
                    op.contact_phone,
                    op.is_active,
                    fmt_datetime(op.updated_at),
                    op.code,
                ],
            )?;
            if updated > 0 {
                outcomes.push(UpsertOutcome::Updated);
            } else {
                Self::insert_with(&tx, op)?;
                outcomes.push(UpsertOutcome::Created);
            }
        }

        tx.commit()?;
        Ok(outcomes)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Operator> {
    Ok(Operator {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        contact_name: row.get(4)?,
        contact_email: row.get(5)?,
        contact_phone: row.get(6)?,
        is_active: row.get(7)?,
        created_at: get_datetime(row, 8)?,
        updated_at: get_datetime(row, 9)?,
    })
}
