// ==========================================
// 光纤部署监理系统 - 用户档案数据仓储
// ==========================================
// 只提供平铺的 (id, superior_id) 边,层级遍历交给 engine::hierarchy
// ==========================================

use crate::domain::profile::Profile;
use crate::domain::types::ProfileRole;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, get_datetime, get_enum};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, code, last_name, first_names, role, superior_id, created_at
  FROM profile"#;

pub struct ProfileRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProfileRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, p: &Profile) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO profile (id, code, last_name, first_names, role, superior_id, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                p.id,
                p.code,
                p.last_name,
                p.first_names,
                p.role.to_db_str(),
                p.superior_id,
                fmt_datetime(p.created_at),
            ],
        )?;
        Ok(p.id.clone())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Profile>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Profile>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_row).optional()?)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Profile>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY last_name, first_names", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 直属下级
    pub fn list_direct_reports(&self, superior_id: &str) -> RepositoryResult<Vec<Profile>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE superior_id = ?1 ORDER BY last_name, first_names", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![superior_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 全部 (id, superior_id) 边
    pub fn load_edges(&self) -> RepositoryResult<Vec<(String, Option<String>)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, superior_id FROM profile")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 在同一事务内读取全部边、执行校验并写入新上级
    ///
    /// check 返回 Err 时不写入,原样返回给调用方
    pub fn set_superior_checked<E, F>(
        &self,
        id: &str,
        superior_id: Option<&str>,
        check: F,
    ) -> RepositoryResult<Result<(), E>>
    where
        F: FnOnce(&[(String, Option<String>)]) -> Result<(), E>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let edges = {
            let mut stmt = tx.prepare("SELECT id, superior_id FROM profile")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };
        if let Err(rejected) = check(&edges) {
            return Ok(Err(rejected));
        }

        let rows = tx.execute(
            "UPDATE profile SET superior_id = ?1 WHERE id = ?2",
            params![superior_id, id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Profile", id));
        }
        tx.commit()?;
        Ok(Ok(()))
    }

    pub fn set_superior(&self, id: &str, superior_id: Option<&str>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE profile SET superior_id = ?1 WHERE id = ?2",
            params![superior_id, id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Profile", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        code: row.get(1)?,
        last_name: row.get(2)?,
        first_names: row.get(3)?,
        role: get_enum(row, 4, ProfileRole::from_db_str)?,
        superior_id: row.get(5)?,
        created_at: get_datetime(row, 6)?,
    })
}
