// ==========================================
// 光纤部署监理系统 - GPS 测绘点数据仓储
// ==========================================

use crate::domain::cartography::CartographyPoint;
use crate::domain::types::InfrastructureType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_decimal, get_date, get_datetime, get_decimal, get_enum,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, project_id, point_date, locality, infrastructure_type,
       latitude, longitude, description, photo, created_by, created_at
  FROM cartography_point"#;

pub struct CartographyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CartographyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, p: &CartographyPoint) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO cartography_point (
                id, project_id, point_date, locality, infrastructure_type,
                latitude, longitude, description, photo, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                p.id,
                p.project_id,
                fmt_date(p.point_date),
                p.locality,
                p.infrastructure_type.to_db_str(),
                fmt_decimal(p.latitude),
                fmt_decimal(p.longitude),
                p.description,
                p.photo,
                p.created_by,
                fmt_datetime(p.created_at),
            ],
        )?;
        Ok(p.id.clone())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<CartographyPoint>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    /// 项目测绘点,可按设施类型过滤;日期倒序
    pub fn list_by_project(
        &self,
        project_id: &str,
        infrastructure_type: Option<InfrastructureType>,
    ) -> RepositoryResult<Vec<CartographyPoint>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{} WHERE project_id = ?1 AND (?2 IS NULL OR infrastructure_type = ?2)
               ORDER BY point_date DESC, created_at DESC"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![project_id, infrastructure_type.map(|t| t.to_db_str())],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM cartography_point WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("CartographyPoint", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<CartographyPoint> {
    Ok(CartographyPoint {
        id: row.get(0)?,
        project_id: row.get(1)?,
        point_date: get_date(row, 2)?,
        locality: row.get(3)?,
        infrastructure_type: get_enum(row, 4, InfrastructureType::from_db_str)?,
        latitude: get_decimal(row, 5)?,
        longitude: get_decimal(row, 6)?,
        description: row.get(7)?,
        photo: row.get(8)?,
        created_by: row.get(9)?,
        created_at: get_datetime(row, 10)?,
    })
}
