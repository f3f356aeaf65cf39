// ==========================================
// 光纤部署监理系统 - 项目数据仓储
// ==========================================
// 红线: 状态流转规则在 API 层判断,此处只做原子写入
// 删除项目级联删除 计划/任务/日报/测绘点/交付阶段/整改
// ==========================================

use crate::domain::project::{DeliveryGates, DeliveryGatesPatch, Project, ProjectFilter};
use crate::domain::types::{ProjectStatus, ProjectType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_decimal, fmt_opt_date, get_date, get_datetime, get_enum, get_opt_date,
    get_opt_decimal,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, code, name, operator_id, project_type, zone, status,
       start_date, expected_end_date, actual_end_date, delivery_date,
       works_ok, environment_ok, technical_visit_ok, report_ok,
       supervisor_id, operator_supervisor, budget, description, created_at, updated_at
  FROM project"#;

/// 状态写入参数 (一次 UPDATE 内完成)
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub from: ProjectStatus,
    pub to: ProjectStatus,
    pub actual_end_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// ProjectRepository - 项目仓储
// ==========================================
pub struct ProjectRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, p: &Project) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO project (
                id, code, name, operator_id, project_type, zone, status,
                start_date, expected_end_date, actual_end_date, delivery_date,
                works_ok, environment_ok, technical_visit_ok, report_ok,
                supervisor_id, operator_supervisor, budget, description, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20, ?21)"#,
            params![
                p.id,
                p.code,
                p.name,
                p.operator_id,
                p.project_type.to_db_str(),
                p.zone,
                p.status.to_db_str(),
                fmt_date(p.start_date),
                fmt_date(p.expected_end_date),
                fmt_opt_date(p.actual_end_date),
                fmt_opt_date(p.delivery_date),
                p.gates.works_ok,
                p.gates.environment_ok,
                p.gates.technical_visit_ok,
                p.gates.report_ok,
                p.supervisor_id,
                p.operator_supervisor,
                p.budget.map(fmt_decimal),
                p.description,
                fmt_datetime(p.created_at),
                fmt_datetime(p.updated_at),
            ],
        )?;
        Ok(p.id.clone())
    }

    /// 更新基础信息 (状态与开关走专用方法)
    pub fn update_details(&self, p: &Project) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE project
               SET name = ?1, project_type = ?2, zone = ?3, start_date = ?4,
                   expected_end_date = ?5, supervisor_id = ?6, operator_supervisor = ?7,
                   budget = ?8, description = ?9, updated_at = ?10
               WHERE id = ?11"#,
            params![
                p.name,
                p.project_type.to_db_str(),
                p.zone,
                fmt_date(p.start_date),
                fmt_date(p.expected_end_date),
                p.supervisor_id,
                p.operator_supervisor,
                p.budget.map(fmt_decimal),
                p.description,
                fmt_datetime(p.updated_at),
                p.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Project", &p.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Project>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_row).optional()?)
    }

    /// 按过滤条件列出,开工日期倒序
    pub fn list(&self, filter: &ProjectFilter) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
               WHERE (?1 IS NULL OR operator_id = ?1)
                 AND (?2 IS NULL OR project_type = ?2)
                 AND (?3 IS NULL OR status = ?3)
                 AND (?4 IS NULL OR zone = ?4)
                 AND (?5 IS NULL OR supervisor_id = ?5)
               ORDER BY start_date DESC, code"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.operator_id,
                    filter.project_type.map(|t| t.to_db_str()),
                    filter.status.map(|s| s.to_db_str()),
                    filter.zone,
                    filter.supervisor_id,
                ],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 活跃项目 (planned / in_progress / in_delivery)
    pub fn list_active(&self) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;
        let [a, b, c] = ProjectStatus::active_statuses();
        let sql = format!(
            "{} WHERE status IN (?1, ?2, ?3) ORDER BY start_date DESC, code",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![a.to_db_str(), b.to_db_str(), c.to_db_str()], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 延期候选: 非终态且预计完工日早于 today
    pub fn list_past_due(&self, today: NaiveDate) -> RepositoryResult<Vec<Project>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{} WHERE status NOT IN (?1, ?2) AND expected_end_date < ?3
               ORDER BY expected_end_date, code"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    ProjectStatus::Delivered.to_db_str(),
                    ProjectStatus::Cancelled.to_db_str(),
                    fmt_date(today),
                ],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 原子状态写入 (比较并交换)
    ///
    /// # 返回
    /// - `Ok(true)`: 写入成功
    /// - `Ok(false)`: 当前状态已不是 `change.from` (并发修改或项目不存在)
    pub fn update_status(&self, id: &str, change: &StatusChange) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE project
               SET status = ?1,
                   actual_end_date = COALESCE(?2, actual_end_date),
                   delivery_date = COALESCE(?3, delivery_date),
                   updated_at = ?4
               WHERE id = ?5 AND status = ?6"#,
            params![
                change.to.to_db_str(),
                fmt_opt_date(change.actual_end_date),
                fmt_opt_date(change.delivery_date),
                fmt_datetime(change.updated_at),
                id,
                change.from.to_db_str(),
            ],
        )?;
        Ok(rows > 0)
    }

    /// 交付开关部分更新 (单条 UPDATE,未给出的开关保持原值)
    pub fn update_gates(&self, id: &str, patch: &DeliveryGatesPatch, updated_at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE project
               SET works_ok = COALESCE(?1, works_ok),
                   environment_ok = COALESCE(?2, environment_ok),
                   technical_visit_ok = COALESCE(?3, technical_visit_ok),
                   report_ok = COALESCE(?4, report_ok),
                   updated_at = ?5
               WHERE id = ?6"#,
            params![
                patch.works_ok,
                patch.environment_ok,
                patch.technical_visit_ok,
                patch.report_ok,
                fmt_datetime(updated_at),
                id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Project", id));
        }
        Ok(())
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM project WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Project", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        operator_id: row.get(3)?,
        project_type: get_enum(row, 4, ProjectType::from_db_str)?,
        zone: row.get(5)?,
        status: get_enum(row, 6, ProjectStatus::from_db_str)?,
        start_date: get_date(row, 7)?,
        expected_end_date: get_date(row, 8)?,
        actual_end_date: get_opt_date(row, 9)?,
        delivery_date: get_opt_date(row, 10)?,
        gates: DeliveryGates {
            works_ok: row.get(11)?,
            environment_ok: row.get(12)?,
            technical_visit_ok: row.get(13)?,
            report_ok: row.get(14)?,
        },
        supervisor_id: row.get(15)?,
        operator_supervisor: row.get(16)?,
        budget: get_opt_decimal(row, 17)?,
        description: row.get(18)?,
        created_at: get_datetime(row, 19)?,
        updated_at: get_datetime(row, 20)?,
    })
}
