use crate::domain::planning::TaskPlanning;
use crate::domain::types::TaskStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_decimal, fmt_opt_date, get_date, get_datetime, get_decimal,
    get_enum, get_opt_date,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT tp.id, tp.project_planning_id, tp.task_definition_id,
       tp.unit_value, tp.planned_quantity, tp.deadline_days, tp.planned_start, tp.planned_end,
       tp.actual_start, tp.actual_end, tp.status, tp.display_order, tp.created_at, tp.updated_at
  FROM task_planning tp"#;

/// 任务状态写入参数
///
/// `allowed_from` 为空时不校验当前状态
#[derive(Debug, Clone)]
pub struct TaskStatusChange {
    pub allowed_from: Vec<TaskStatus>,
    pub to: TaskStatus,
    /// 仅在 actual_start 为空时写入
    pub stamp_actual_start: Option<NaiveDate>,
    pub stamp_actual_end: Option<NaiveDate>,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// TaskPlanningRepository - 任务计划仓储
// ==========================================
pub struct TaskPlanningRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TaskPlanningRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, tp: &TaskPlanning) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO task_planning (
                id, project_planning_id, task_definition_id, unit_value, planned_quantity,
                deadline_days, planned_start, planned_end, actual_start, actual_end,
                status, display_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"#,
            params![
                tp.id,
                tp.project_planning_id,
                tp.task_definition_id,
                tp.unit_value,
                fmt_decimal(tp.planned_quantity),
                tp.deadline_days,
                fmt_date(tp.planned_start),
                fmt_date(tp.planned_end),
                fmt_opt_date(tp.actual_start),
                fmt_opt_date(tp.actual_end),
                tp.status.to_db_str(),
                tp.display_order,
                fmt_datetime(tp.created_at),
                fmt_datetime(tp.updated_at),
            ],
        )?;
        Ok(tp.id.clone())
    }

    /// 更新计划字段 (状态走 transition_status)
    pub fn update_plan(&self, tp: &TaskPlanning) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE task_planning
               SET unit_value = ?1, planned_quantity = ?2, deadline_days = ?3,
                   planned_start = ?4, planned_end = ?5, display_order = ?6, updated_at = ?7
               WHERE id = ?8"#,
            params![
                tp.unit_value,
                fmt_decimal(tp.planned_quantity),
                tp.deadline_days,
                fmt_date(tp.planned_start),
                fmt_date(tp.planned_end),
                tp.display_order,
                fmt_datetime(tp.updated_at),
                tp.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("TaskPlanning", &tp.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<TaskPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE tp.id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    pub fn list_by_project_planning(&self, project_planning_id: &str) -> RepositoryResult<Vec<TaskPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE tp.project_planning_id = ?1 ORDER BY tp.display_order, tp.created_at",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_planning_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 项目下全部任务 (经由工作项计划)
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<TaskPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
               JOIN project_planning pp ON pp.id = tp.project_planning_id
               WHERE pp.project_id = ?1
               ORDER BY pp.display_order, tp.display_order, tp.created_at"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 项目任务总数
    pub fn count_by_project(&self, project_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM task_planning tp
               JOIN project_planning pp ON pp.id = tp.project_planning_id
               WHERE pp.project_id = ?1"#,
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 项目已完成任务数
    pub fn count_done_by_project(&self, project_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"SELECT COUNT(*)
               FROM task_planning tp
               JOIN project_planning pp ON pp.id = tp.project_planning_id
               WHERE pp.project_id = ?1 AND tp.status = ?2"#,
            params![project_id, TaskStatus::Done.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 延期任务: 未开始/进行中 且 计划完成日早于 today
    pub fn list_past_due(&self, today: NaiveDate) -> RepositoryResult<Vec<TaskPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{} WHERE tp.status IN (?1, ?2) AND tp.planned_end < ?3
               ORDER BY tp.planned_end, tp.id"#,
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    TaskStatus::NotStarted.to_db_str(),
                    TaskStatus::InProgress.to_db_str(),
                    fmt_date(today),
                ],
                map_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 原子状态流转 (单条 UPDATE,状态与实际日期同时写入)
    ///
    /// # 返回
    /// - `Ok(true)`: 写入成功
    /// - `Ok(false)`: 当前状态不在 `allowed_from` 中,或任务不存在
    pub fn transition_status(&self, id: &str, change: &TaskStatusChange) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let mut sql = String::from(
            r#"UPDATE task_planning
               SET status = ?1,
                   actual_start = COALESCE(actual_start, ?2),
                   actual_end = COALESCE(?3, actual_end),
                   updated_at = ?4
               WHERE id = ?5"#,
        );
        let mut values: Vec<Value> = vec![
            Value::from(change.to.to_db_str().to_string()),
            fmt_opt_date(change.stamp_actual_start).map_or(Value::Null, Value::from),
            fmt_opt_date(change.stamp_actual_end).map_or(Value::Null, Value::from),
            Value::from(fmt_datetime(change.updated_at)),
            Value::from(id.to_string()),
        ];

        if !change.allowed_from.is_empty() {
            let start_idx = values.len() + 1;
            let placeholders: Vec<String> = (0..change.allowed_from.len())
                .map(|i| format!("?{}", start_idx + i))
                .collect();
            sql.push_str(&format!(" AND status IN ({})", placeholders.join(", ")));
            for status in &change.allowed_from {
                values.push(Value::from(status.to_db_str().to_string()));
            }
        }

        let rows = conn.execute(&sql, params_from_iter(values))?;
        Ok(rows > 0)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM task_planning WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("TaskPlanning", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<TaskPlanning> {
    Ok(TaskPlanning {
        id: row.get(0)?,
        project_planning_id: row.get(1)?,
        task_definition_id: row.get(2)?,
        unit_value: row.get(3)?,
        planned_quantity: get_decimal(row, 4)?,
        deadline_days: row.get(5)?,
        planned_start: get_date(row, 6)?,
        planned_end: get_date(row, 7)?,
        actual_start: get_opt_date(row, 8)?,
        actual_end: get_opt_date(row, 9)?,
        status: get_enum(row, 10, TaskStatus::from_db_str)?,
        display_order: row.get(11)?,
        created_at: get_datetime(row, 12)?,
        updated_at: get_datetime(row, 13)?,
    })
}
