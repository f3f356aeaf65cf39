// ==========================================
// 光纤部署监理系统 - 日报 (执行台账) 数据仓储
// ==========================================
// 红线:
// - 槽位 (task_planning_id, report_date, executor) 唯一,由 ux_daily_report_slot 裁决
// - 只做显式插入/更新/删除,不做隐式覆盖 (禁止 INSERT OR REPLACE)
// - 数量汇总在 Rust 侧用 Decimal 完成
// ==========================================

use crate::domain::report::{executor_key, DailyReport};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_decimal, fmt_json_list, get_date, get_datetime, get_decimal,
    get_json_list,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"SELECT dr.id, dr.task_planning_id, dr.report_date, dr.unit_value,
       dr.quantity, dr.subcontractor_id, dr.referent_id, dr.observations, dr.photos_json,
       dr.created_at, dr.updated_at
  FROM daily_report dr"#;

pub struct DailyReportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DailyReportRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入日报
    ///
    /// # 返回
    /// - `Err(UniqueConstraintViolation)`: 槽位已有日报
    /// - `Err(ForeignKeyViolation)`: 任务或分包商不存在
    pub fn insert(&self, r: &DailyReport) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO daily_report (
                id, task_planning_id, report_date, unit_value, quantity, subcontractor_id,
                referent_id, observations, photos_json, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                r.id,
                r.task_planning_id,
                fmt_date(r.report_date),
                r.unit_value,
                fmt_decimal(r.quantity),
                r.subcontractor_id,
                r.referent_id,
                r.observations,
                fmt_json_list(&r.photos),
                fmt_datetime(r.created_at),
                fmt_datetime(r.updated_at),
            ],
        )?;
        Ok(r.id.clone())
    }

    /// 显式更新 (日期/执行方变化时唯一索引重新裁决槽位)
    pub fn update(&self, r: &DailyReport) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE daily_report
               SET report_date = ?1, unit_value = ?2, quantity = ?3, subcontractor_id = ?4,
                   referent_id = ?5, observations = ?6, photos_json = ?7, updated_at = ?8
               WHERE id = ?9"#,
            params![
                fmt_date(r.report_date),
                r.unit_value,
                fmt_decimal(r.quantity),
                r.subcontractor_id,
                r.referent_id,
                r.observations,
                fmt_json_list(&r.photos),
                fmt_datetime(r.updated_at),
                r.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("DailyReport", &r.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<DailyReport>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE dr.id = ?1", SELECT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_row).optional()?)
    }

    /// 按槽位查找 (subcontractor_id = None 表示内部施工)
    pub fn find_by_slot(
        &self,
        task_planning_id: &str,
        report_date: NaiveDate,
        subcontractor_id: Option<&str>,
    ) -> RepositoryResult<Option<DailyReport>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{} WHERE dr.task_planning_id = ?1 AND dr.report_date = ?2
                  AND COALESCE(dr.subcontractor_id, '') = ?3"#,
            SELECT_COLUMNS
        );
        Ok(conn
            .query_row(
                &sql,
                params![task_planning_id, fmt_date(report_date), executor_key(subcontractor_id)],
                map_row,
            )
            .optional()?)
    }

    /// 任务的全部日报,日期倒序
    pub fn list_for_task(&self, task_planning_id: &str) -> RepositoryResult<Vec<DailyReport>> {
        self.query_list(
            &format!(
                "{} WHERE dr.task_planning_id = ?1 ORDER BY dr.report_date DESC, dr.created_at DESC",
                SELECT_COLUMNS
            ),
            task_planning_id,
        )
    }

    /// 项目的全部日报 (经由 计划 → 任务),日期倒序
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<DailyReport>> {
        self.query_list(
            &format!(
                r#"{}
                   JOIN task_planning tp ON tp.id = dr.task_planning_id
                   JOIN project_planning pp ON pp.id = tp.project_planning_id
                   WHERE pp.project_id = ?1
                   ORDER BY dr.report_date DESC, dr.created_at DESC"#,
                SELECT_COLUMNS
            ),
            project_id,
        )
    }

    /// 某日的全部日报
    pub fn list_by_date(&self, report_date: NaiveDate) -> RepositoryResult<Vec<DailyReport>> {
        self.query_list(
            &format!(
                "{} WHERE dr.report_date = ?1 ORDER BY dr.task_planning_id, dr.created_at",
                SELECT_COLUMNS
            ),
            &fmt_date(report_date),
        )
    }

    fn query_list(&self, sql: &str, key: &str) -> RepositoryResult<Vec<DailyReport>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ==========================================
    // 汇总输入 (只取数量列,汇总交给 engine::progress)
    // ==========================================

    pub fn quantities_for_task(&self, task_planning_id: &str) -> RepositoryResult<Vec<Decimal>> {
        self.query_quantities(
            "SELECT quantity FROM daily_report WHERE task_planning_id = ?1",
            task_planning_id,
        )
    }

    pub fn quantities_for_project_planning(&self, project_planning_id: &str) -> RepositoryResult<Vec<Decimal>> {
        self.query_quantities(
            r#"SELECT dr.quantity
               FROM daily_report dr
               JOIN task_planning tp ON tp.id = dr.task_planning_id
               WHERE tp.project_planning_id = ?1"#,
            project_planning_id,
        )
    }

    fn query_quantities(&self, sql: &str, key: &str) -> RepositoryResult<Vec<Decimal>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params![key], |row| get_decimal(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 项目下 (task_planning_id, quantity) 全量,供一次性汇总
    pub fn task_quantities_for_project(&self, project_id: &str) -> RepositoryResult<Vec<(String, Decimal)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT dr.task_planning_id, dr.quantity
               FROM daily_report dr
               JOIN task_planning tp ON tp.id = dr.task_planning_id
               JOIN project_planning pp ON pp.id = tp.project_planning_id
               WHERE pp.project_id = ?1"#,
        )?;
        let rows = stmt
            .query_map(params![project_id], |row| Ok((row.get(0)?, get_decimal(row, 1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 显式删除
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM daily_report WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("DailyReport", id));
        }
        Ok(())
    }
}

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<DailyReport> {
    Ok(DailyReport {
        id: row.get(0)?,
        task_planning_id: row.get(1)?,
        report_date: get_date(row, 2)?,
        unit_value: row.get(3)?,
        quantity: get_decimal(row, 4)?,
        subcontractor_id: row.get(5)?,
        referent_id: row.get(6)?,
        observations: row.get(7)?,
        photos: get_json_list(row, 8)?,
        created_at: get_datetime(row, 9)?,
        updated_at: get_datetime(row, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::{date, plan_tree, ts};
    use rust_decimal_macros::dec;

    fn report(id: &str, task_id: &str, d: NaiveDate, sub: Option<&str>, qty: Decimal) -> DailyReport {
        DailyReport {
            id: id.to_string(),
            task_planning_id: task_id.to_string(),
            report_date: d,
            unit_value: 1,
            quantity: qty,
            subcontractor_id: sub.map(|s| s.to_string()),
            referent_id: "user-1".to_string(),
            observations: String::new(),
            photos: vec!["https://files.local/p1.jpg".to_string()],
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn test_two_internal_reports_same_day_collide() {
        let tree = plan_tree();
        let repo = DailyReportRepository::new(tree.conn.clone());
        let d = date(2024, 1, 12);

        repo.insert(&report("r1", &tree.task_planning_id, d, None, dec!(30))).unwrap();
        let err = repo
            .insert(&report("r2", &tree.task_planning_id, d, None, dec!(45)))
            .unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        let quantities = repo.quantities_for_task(&tree.task_planning_id).unwrap();
        assert_eq!(quantities, vec![dec!(30)]);
    }

    #[test]
    fn test_internal_and_subcontractor_share_a_day() {
        let tree = plan_tree();
        let repo = DailyReportRepository::new(tree.conn.clone());
        let d = date(2024, 1, 12);

        repo.insert(&report("r1", &tree.task_planning_id, d, None, dec!(30))).unwrap();
        repo.insert(&report("r2", &tree.task_planning_id, d, Some(&tree.subcontractor_id), dec!(45)))
            .unwrap();

        let internal = repo.find_by_slot(&tree.task_planning_id, d, None).unwrap().unwrap();
        assert_eq!(internal.id, "r1");
        let sub = repo
            .find_by_slot(&tree.task_planning_id, d, Some(&tree.subcontractor_id))
            .unwrap()
            .unwrap();
        assert_eq!(sub.id, "r2");
        assert_eq!(sub.photos.len(), 1);

        let total: Decimal = repo
            .quantities_for_project_planning(&tree.project_planning_id)
            .unwrap()
            .into_iter()
            .sum();
        assert_eq!(total, dec!(75));
    }

    #[test]
    fn test_update_into_taken_slot_is_rejected() {
        let tree = plan_tree();
        let repo = DailyReportRepository::new(tree.conn.clone());

        repo.insert(&report("r1", &tree.task_planning_id, date(2024, 1, 12), None, dec!(30)))
            .unwrap();
        repo.insert(&report("r2", &tree.task_planning_id, date(2024, 1, 13), None, dec!(10)))
            .unwrap();

        let mut moved = repo.find_by_id("r2").unwrap().unwrap();
        moved.report_date = date(2024, 1, 12);
        let err = repo.update(&moved).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_list_by_project_is_date_descending() {
        let tree = plan_tree();
        let repo = DailyReportRepository::new(tree.conn.clone());
        repo.insert(&report("r1", &tree.task_planning_id, date(2024, 1, 12), None, dec!(1)))
            .unwrap();
        repo.insert(&report("r2", &tree.task_planning_id, date(2024, 1, 14), None, dec!(2)))
            .unwrap();

        let rows = repo.list_by_project(&tree.project_id).unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
        assert_eq!(repo.list_by_date(date(2024, 1, 14)).unwrap().len(), 1);
    }

    #[test]
    fn test_subcontractor_with_reports_cannot_be_deleted() {
        let tree = plan_tree();
        let repo = DailyReportRepository::new(tree.conn.clone());
        repo.insert(&report("r1", &tree.task_planning_id, date(2024, 1, 12), Some(&tree.subcontractor_id), dec!(1)))
            .unwrap();

        let conn = tree.conn.lock().unwrap();
        let err: RepositoryError = conn
            .execute("DELETE FROM subcontractor WHERE id = ?1", params![tree.subcontractor_id])
            .unwrap_err()
            .into();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    }
}
