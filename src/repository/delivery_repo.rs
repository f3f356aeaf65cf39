// ==========================================
// 光纤部署监理系统 - 交付阶段/整改数据仓储
// ==========================================
// 不变量: (project_id, phase) 唯一,由 ux_delivery_phase 裁决
// 删除阶段级联删除其整改记录
// ==========================================

use crate::domain::delivery::{Correction, DeliveryPhase};
use crate::domain::types::{CorrectionStatus, DeliveryPhaseKind, PhaseStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_json_list, fmt_opt_date, get_date, get_datetime, get_enum,
    get_json_list, get_opt_date,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const PHASE_COLUMNS: &str = r#"SELECT id, project_id, phase, status, start_date, end_date,
       responsible_id, observations, documents_json, created_at, updated_at
  FROM delivery_phase"#;

const CORRECTION_COLUMNS: &str = r#"SELECT c.id, c.delivery_phase_id, c.correction_date, c.boq_item_id,
       c.task_definition_id, c.status, c.observations, c.photos_json, c.corrector_id, c.created_at
  FROM correction c"#;

// ==========================================
// DeliveryPhaseRepository - 交付阶段仓储
// ==========================================
pub struct DeliveryPhaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliveryPhaseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入阶段 (同一项目同一阶段重复 → UniqueConstraintViolation)
    pub fn insert(&self, ph: &DeliveryPhase) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO delivery_phase (
                id, project_id, phase, status, start_date, end_date, responsible_id,
                observations, documents_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                ph.id,
                ph.project_id,
                ph.phase.to_db_str(),
                ph.status.to_db_str(),
                fmt_date(ph.start_date),
                fmt_opt_date(ph.end_date),
                ph.responsible_id,
                ph.observations,
                fmt_json_list(&ph.documents),
                fmt_datetime(ph.created_at),
                fmt_datetime(ph.updated_at),
            ],
        )?;
        Ok(ph.id.clone())
    }

    /// 更新负责人/备注/文档/日期 (状态走 set_status)
    pub fn update_details(&self, ph: &DeliveryPhase) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE delivery_phase
               SET start_date = ?1, end_date = ?2, responsible_id = ?3, observations = ?4,
                   documents_json = ?5, updated_at = ?6
               WHERE id = ?7"#,
            params![
                fmt_date(ph.start_date),
                fmt_opt_date(ph.end_date),
                ph.responsible_id,
                ph.observations,
                fmt_json_list(&ph.documents),
                fmt_datetime(ph.updated_at),
                ph.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("DeliveryPhase", &ph.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<DeliveryPhase>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", PHASE_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_phase_row).optional()?)
    }

    pub fn find_by_project_phase(
        &self,
        project_id: &str,
        phase: DeliveryPhaseKind,
    ) -> RepositoryResult<Option<DeliveryPhase>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE project_id = ?1 AND phase = ?2", PHASE_COLUMNS);
        Ok(conn
            .query_row(&sql, params![project_id, phase.to_db_str()], map_phase_row)
            .optional()?)
    }

    /// 项目的阶段,按开始日期
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<DeliveryPhase>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE project_id = ?1 ORDER BY start_date, created_at", PHASE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id], map_phase_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 原子写入状态与结束日期
    ///
    /// `expected` 为 Some 时做比较并交换;返回是否写入
    pub fn set_status(
        &self,
        id: &str,
        expected: Option<PhaseStatus>,
        to: PhaseStatus,
        end_date: Option<NaiveDate>,
        updated_at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE delivery_phase
               SET status = ?1, end_date = ?2, updated_at = ?3
               WHERE id = ?4 AND (?5 IS NULL OR status = ?5)"#,
            params![
                to.to_db_str(),
                fmt_opt_date(end_date),
                fmt_datetime(updated_at),
                id,
                expected.map(|s| s.to_db_str()),
            ],
        )?;
        Ok(rows > 0)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM delivery_phase WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("DeliveryPhase", id));
        }
        Ok(())
    }
}

fn map_phase_row(row: &rusqlite::Row) -> rusqlite::Result<DeliveryPhase> {
    Ok(DeliveryPhase {
        id: row.get(0)?,
        project_id: row.get(1)?,
        phase: get_enum(row, 2, DeliveryPhaseKind::from_db_str)?,
        status: get_enum(row, 3, PhaseStatus::from_db_str)?,
        start_date: get_date(row, 4)?,
        end_date: get_opt_date(row, 5)?,
        responsible_id: row.get(6)?,
        observations: row.get(7)?,
        documents: get_json_list(row, 8)?,
        created_at: get_datetime(row, 9)?,
        updated_at: get_datetime(row, 10)?,
    })
}

// ==========================================
// CorrectionRepository - 整改记录仓储
// ==========================================
pub struct CorrectionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CorrectionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, c: &Correction) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO correction (
                id, delivery_phase_id, correction_date, boq_item_id, task_definition_id,
                status, observations, photos_json, corrector_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
            params![
                c.id,
                c.delivery_phase_id,
                fmt_date(c.correction_date),
                c.boq_item_id,
                c.task_definition_id,
                c.status.to_db_str(),
                c.observations,
                fmt_json_list(&c.photos),
                c.corrector_id,
                fmt_datetime(c.created_at),
            ],
        )?;
        Ok(c.id.clone())
    }

    pub fn update(&self, c: &Correction) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE correction
               SET correction_date = ?1, boq_item_id = ?2, task_definition_id = ?3, status = ?4,
                   observations = ?5, photos_json = ?6, corrector_id = ?7
               WHERE id = ?8"#,
            params![
                fmt_date(c.correction_date),
                c.boq_item_id,
                c.task_definition_id,
                c.status.to_db_str(),
                c.observations,
                fmt_json_list(&c.photos),
                c.corrector_id,
                c.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Correction", &c.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Correction>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE c.id = ?1", CORRECTION_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_correction_row).optional()?)
    }

    /// 阶段下整改,日期倒序
    pub fn list_by_phase(&self, delivery_phase_id: &str) -> RepositoryResult<Vec<Correction>> {
        self.query_list(
            &format!(
                "{} WHERE c.delivery_phase_id = ?1 ORDER BY c.correction_date DESC, c.created_at DESC",
                CORRECTION_COLUMNS
            ),
            delivery_phase_id,
        )
    }

    /// 项目下全部整改 (跨阶段),日期倒序
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<Correction>> {
        self.query_list(
            &format!(
                r#"{}
                   JOIN delivery_phase dp ON dp.id = c.delivery_phase_id
                   WHERE dp.project_id = ?1
                   ORDER BY c.correction_date DESC, c.created_at DESC"#,
                CORRECTION_COLUMNS
            ),
            project_id,
        )
    }

    fn query_list(&self, sql: &str, key: &str) -> RepositoryResult<Vec<Correction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key], map_correction_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_by_phase(&self, delivery_phase_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM correction WHERE delivery_phase_id = ?1",
            params![delivery_phase_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM correction WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Correction", id));
        }
        Ok(())
    }
}

fn map_correction_row(row: &rusqlite::Row) -> rusqlite::Result<Correction> {
    Ok(Correction {
        id: row.get(0)?,
        delivery_phase_id: row.get(1)?,
        correction_date: get_date(row, 2)?,
        boq_item_id: row.get(3)?,
        task_definition_id: row.get(4)?,
        status: get_enum(row, 5, CorrectionStatus::from_db_str)?,
        observations: row.get(6)?,
        photos: get_json_list(row, 7)?,
        corrector_id: row.get(8)?,
        created_at: get_datetime(row, 9)?,
    })
}
