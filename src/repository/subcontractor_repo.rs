// ==========================================
// 光纤部署监理系统 - 分包商数据仓储
// ==========================================
// 分包商被日报引用 (RESTRICT),只做软停用
// ==========================================

use crate::domain::catalog::Subcontractor;
use crate::domain::types::ProjectStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, fmt_opt_date, get_datetime, get_opt_date};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, code, name, address, phone, email, main_contact_name,
       main_contact_phone, specialities, trade_register_number, is_active,
       collaboration_start, notes, created_at, updated_at
  FROM subcontractor"#;

pub struct SubcontractorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SubcontractorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, s: &Subcontractor) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO subcontractor (
                id, code, name, address, phone, email, main_contact_name,
                main_contact_phone, specialities, trade_register_number, is_active,
                collaboration_start, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"#,
            params![
                s.id,
                s.code,
                s.name,
                s.address,
                s.phone,
                s.email,
                s.main_contact_name,
                s.main_contact_phone,
                s.specialities,
                s.trade_register_number,
                s.is_active,
                fmt_opt_date(s.collaboration_start),
                s.notes,
                fmt_datetime(s.created_at),
                fmt_datetime(s.updated_at),
            ],
        )?;
        Ok(s.id.clone())
    }

    pub fn update(&self, s: &Subcontractor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE subcontractor
               SET name = ?1, address = ?2, phone = ?3, email = ?4, main_contact_name = ?5,
                   main_contact_phone = ?6, specialities = ?7, trade_register_number = ?8,
                   is_active = ?9, collaboration_start = ?10, notes = ?11, updated_at = ?12
               WHERE id = ?13"#,
            params![
                s.name,
                s.address,
                s.phone,
                s.email,
                s.main_contact_name,
                s.main_contact_phone,
                s.specialities,
                s.trade_register_number,
                s.is_active,
                fmt_opt_date(s.collaboration_start),
                s.notes,
                fmt_datetime(s.updated_at),
                s.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Subcontractor", &s.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Subcontractor>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Subcontractor>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_row).optional()?)
    }

    /// 列表,按名称排序
    pub fn list(&self, active_only: bool) -> RepositoryResult<Vec<Subcontractor>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE (?1 = 0 OR is_active = 1) ORDER BY name", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![active_only], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_active(&self, id: &str, active: bool, updated_at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE subcontractor SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, fmt_datetime(updated_at), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Subcontractor", id));
        }
        Ok(())
    }

    /// 施工中的项目里,至少有一份该分包商日报的项目数 (去重)
    pub fn count_active_projects(&self, subcontractor_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"SELECT COUNT(DISTINCT p.id)
               FROM project p
               JOIN project_planning pp ON pp.project_id = p.id
               JOIN task_planning tp ON tp.project_planning_id = pp.id
               JOIN daily_report dr ON dr.task_planning_id = tp.id
               WHERE dr.subcontractor_id = ?1 AND p.status = ?2"#,
            params![subcontractor_id, ProjectStatus::InProgress.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Subcontractor> {
    Ok(Subcontractor {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        address: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        main_contact_name: row.get(6)?,
        main_contact_phone: row.get(7)?,
        specialities: row.get(8)?,
        trade_register_number: row.get(9)?,
        is_active: row.get(10)?,
        collaboration_start: get_opt_date(row, 11)?,
        notes: row.get(12)?,
        created_at: get_datetime(row, 13)?,
        updated_at: get_datetime(row, 14)?,
    })
}
