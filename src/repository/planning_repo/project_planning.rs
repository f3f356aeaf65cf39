use crate::domain::planning::ProjectPlanning;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{fmt_datetime, fmt_decimal, get_datetime, get_decimal};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT id, project_id, boq_item_id, unit_value, planned_quantity,
       deadline_days, display_order, created_at, updated_at
  FROM project_planning"#;

// ==========================================
// ProjectPlanningRepository - 工作项计划仓储
// ==========================================
// 不变量: (project_id, boq_item_id) 唯一,由 ux_project_planning_item 裁决
pub struct ProjectPlanningRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProjectPlanningRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入工作项计划
    ///
    /// # 返回
    /// - `Err(UniqueConstraintViolation)`: 该项目已计划过此 BOQ 条目
    /// - `Err(ForeignKeyViolation)`: 项目或 BOQ 条目不存在
    pub fn insert(&self, pp: &ProjectPlanning) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO project_planning (
                id, project_id, boq_item_id, unit_value, planned_quantity,
                deadline_days, display_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                pp.id,
                pp.project_id,
                pp.boq_item_id,
                pp.unit_value,
                fmt_decimal(pp.planned_quantity),
                pp.deadline_days,
                pp.display_order,
                fmt_datetime(pp.created_at),
                fmt_datetime(pp.updated_at),
            ],
        )?;
        Ok(pp.id.clone())
    }

    /// 更新数量/期限/排序 (项目与条目不可改)
    pub fn update(&self, pp: &ProjectPlanning) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE project_planning
               SET unit_value = ?1, planned_quantity = ?2, deadline_days = ?3,
                   display_order = ?4, updated_at = ?5
               WHERE id = ?6"#,
            params![
                pp.unit_value,
                fmt_decimal(pp.planned_quantity),
                pp.deadline_days,
                pp.display_order,
                fmt_datetime(pp.updated_at),
                pp.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("ProjectPlanning", &pp.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<ProjectPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    /// 项目下全部工作项计划,按 display_order
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<ProjectPlanning>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE project_id = ?1 ORDER BY display_order, created_at",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 删除 (级联删除任务计划与日报)
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM project_planning WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("ProjectPlanning", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<ProjectPlanning> {
    Ok(ProjectPlanning {
        id: row.get(0)?,
        project_id: row.get(1)?,
        boq_item_id: row.get(2)?,
        unit_value: row.get(3)?,
        planned_quantity: get_decimal(row, 4)?,
        deadline_days: row.get(5)?,
        display_order: row.get(6)?,
        created_at: get_datetime(row, 7)?,
        updated_at: get_datetime(row, 8)?,
    })
}
