// ==========================================
// 光纤部署监理系统 - 日报 (执行台账) API
// ==========================================
// 职责: 日报登记 / 显式更新 / 显式删除 / 查询读模型
// 红线:
// - 同一槽位 (任务, 日期, 执行方) 只能有一条日报,冲突返回 DuplicateReport
// - 不做隐式覆盖;修改必须走 update_daily_report
// - 登记日报不触发任何状态重算,进度在读取时计算
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    blank_to_none, normalize_fixed, require_at_least, require_non_blank, require_non_negative,
    REPORT_QUANTITY_MAX_DIGITS,
};
use crate::api::{new_id, now};
use crate::domain::report::DailyReport;
use crate::repository::{
    DailyReportRepository, RepositoryError, SubcontractorRepository, TaskPlanningRepository,
};

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportInput {
    pub task_planning_id: String,
    pub report_date: NaiveDate,
    pub unit_value: i32,
    pub quantity: Decimal,
    /// None = 内部施工
    pub subcontractor_id: Option<String>,
    pub referent_id: String,
    pub observations: String,
    pub photos: Vec<String>,
}

/// 日报可变字段 (任务不可改;日期/执行方可改,槽位重新校验)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReportUpdate {
    pub report_date: NaiveDate,
    pub unit_value: i32,
    pub quantity: Decimal,
    pub subcontractor_id: Option<String>,
    pub observations: String,
    pub photos: Vec<String>,
}

// ==========================================
// 读模型
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: DailyReport,
    pub executor_label: String,
    pub is_internal: bool,
    pub photos_count: usize,
}

// ==========================================
// ReportApi - 日报 API
// ==========================================
pub struct ReportApi {
    report_repo: Arc<DailyReportRepository>,
    task_planning_repo: Arc<TaskPlanningRepository>,
    subcontractor_repo: Arc<SubcontractorRepository>,
    internal_executor_label: String,
}

impl ReportApi {
    pub fn new(
        report_repo: Arc<DailyReportRepository>,
        task_planning_repo: Arc<TaskPlanningRepository>,
        subcontractor_repo: Arc<SubcontractorRepository>,
        internal_executor_label: String,
    ) -> Self {
        Self {
            report_repo,
            task_planning_repo,
            subcontractor_repo,
            internal_executor_label,
        }
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 登记日报
    ///
    /// # 错误
    /// - ValidationError: 数量为负或超出定点上限、单位倍数 < 1、填报人为空
    /// - ReferenceError: 任务不存在,或分包商不存在/已停用
    /// - DuplicateReport: 该槽位已有日报
    pub fn record_daily_report(&self, input: DailyReportInput) -> ApiResult<DailyReport> {
        let quantity = normalize_quantity(input.quantity)?;
        require_at_least("单位倍数", input.unit_value, 1)?;
        let referent_id = require_non_blank("填报人", &input.referent_id)?;

        if self
            .task_planning_repo
            .find_by_id(&input.task_planning_id)?
            .is_none()
        {
            return Err(ApiError::ReferenceError(format!(
                "任务计划不存在: {}",
                input.task_planning_id
            )));
        }
        let subcontractor_id = blank_to_none(input.subcontractor_id);
        let executor = self.resolve_executor(subcontractor_id.as_deref())?;

        let ts = now();
        let report = DailyReport {
            id: new_id(),
            task_planning_id: input.task_planning_id,
            report_date: input.report_date,
            unit_value: input.unit_value,
            quantity,
            subcontractor_id,
            referent_id,
            observations: input.observations.trim().to_string(),
            photos: clean_photos(input.photos),
            created_at: ts,
            updated_at: ts,
        };

        self.report_repo
            .insert(&report)
            .map_err(|e| self.slot_error(e, &report, &executor))?;
        info!(
            report_id = %report.id,
            task_planning_id = %report.task_planning_id,
            date = %report.report_date,
            executor = %executor,
            quantity = %report.quantity,
            "日报已登记"
        );
        Ok(report)
    }

    /// 显式更新日报 (校验规则同登记)
    pub fn update_daily_report(&self, id: &str, update: DailyReportUpdate) -> ApiResult<DailyReport> {
        let quantity = normalize_quantity(update.quantity)?;
        require_at_least("单位倍数", update.unit_value, 1)?;

        let current = self.get_report(id)?;
        let subcontractor_id = blank_to_none(update.subcontractor_id);
        let executor = if subcontractor_id == current.subcontractor_id {
            self.executor_label_for(subcontractor_id.as_deref())?
        } else {
            self.resolve_executor(subcontractor_id.as_deref())?
        };

        let report = DailyReport {
            report_date: update.report_date,
            unit_value: update.unit_value,
            quantity,
            subcontractor_id,
            observations: update.observations.trim().to_string(),
            photos: clean_photos(update.photos),
            updated_at: now(),
            ..current
        };

        self.report_repo
            .update(&report)
            .map_err(|e| self.slot_error(e, &report, &executor))?;
        info!(report_id = %report.id, quantity = %report.quantity, "日报已更新");
        Ok(report)
    }

    /// 显式删除 (台账不做隐式删除)
    pub fn delete_daily_report(&self, id: &str) -> ApiResult<()> {
        self.report_repo.delete(id)?;
        info!(report_id = %id, "日报已删除");
        Ok(())
    }

    fn slot_error(&self, err: RepositoryError, report: &DailyReport, executor: &str) -> ApiError {
        match err {
            RepositoryError::UniqueConstraintViolation(_) => {
                warn!(
                    task_planning_id = %report.task_planning_id,
                    date = %report.report_date,
                    executor = %executor,
                    "日报槽位已被占用"
                );
                ApiError::DuplicateReport {
                    task_planning_id: report.task_planning_id.clone(),
                    date: report.report_date,
                    executor: executor.to_string(),
                }
            }
            other => other.into(),
        }
    }

    /// 新指定的执行方必须存在且启用
    fn resolve_executor(&self, subcontractor_id: Option<&str>) -> ApiResult<String> {
        let Some(id) = subcontractor_id else {
            return Ok(self.internal_executor_label.clone());
        };
        match self.subcontractor_repo.find_by_id(id)? {
            Some(s) if s.is_active => Ok(s.name),
            Some(_) => Err(ApiError::ReferenceError(format!("分包商已停用: {}", id))),
            None => Err(ApiError::ReferenceError(format!("分包商不存在: {}", id))),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_report(&self, id: &str) -> ApiResult<DailyReport> {
        self.report_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("DailyReport", id))
    }

    pub fn get_report_view(&self, id: &str) -> ApiResult<ReportView> {
        let report = self.get_report(id)?;
        let executor_label = self.executor_label_for(report.subcontractor_id.as_deref())?;
        Ok(to_view(report, executor_label))
    }

    /// 按槽位查找 (subcontractor_id = None 为内部施工)
    pub fn find_report_by_slot(
        &self,
        task_planning_id: &str,
        report_date: NaiveDate,
        subcontractor_id: Option<&str>,
    ) -> ApiResult<Option<DailyReport>> {
        Ok(self
            .report_repo
            .find_by_slot(task_planning_id, report_date, subcontractor_id)?)
    }

    pub fn list_reports_for_task(&self, task_planning_id: &str) -> ApiResult<Vec<ReportView>> {
        let reports = self.report_repo.list_for_task(task_planning_id)?;
        self.to_views(reports)
    }

    pub fn list_reports_by_project(&self, project_id: &str) -> ApiResult<Vec<ReportView>> {
        let reports = self.report_repo.list_by_project(project_id)?;
        self.to_views(reports)
    }

    pub fn list_reports_by_date(&self, report_date: NaiveDate) -> ApiResult<Vec<ReportView>> {
        let reports = self.report_repo.list_by_date(report_date)?;
        self.to_views(reports)
    }

    /// 执行方名称: 内部施工返回配置的内部名称,否则为分包商名称
    pub fn executor_label(&self, report: &DailyReport) -> ApiResult<String> {
        self.executor_label_for(report.subcontractor_id.as_deref())
    }

    /// 已入账日报的执行方名称 (停用的分包商仍显示原名)
    fn executor_label_for(&self, subcontractor_id: Option<&str>) -> ApiResult<String> {
        match subcontractor_id {
            None => Ok(self.internal_executor_label.clone()),
            Some(id) => Ok(self
                .subcontractor_repo
                .find_by_id(id)?
                .map(|s| s.name)
                .unwrap_or_else(|| id.to_string())),
        }
    }

    fn to_views(&self, reports: Vec<DailyReport>) -> ApiResult<Vec<ReportView>> {
        let names: HashMap<String, String> = self
            .subcontractor_repo
            .list(false)?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        Ok(reports
            .into_iter()
            .map(|report| {
                let label = match report.subcontractor_id.as_deref() {
                    None => self.internal_executor_label.clone(),
                    Some(id) => names.get(id).cloned().unwrap_or_else(|| id.to_string()),
                };
                to_view(report, label)
            })
            .collect())
    }
}

fn to_view(report: DailyReport, executor_label: String) -> ReportView {
    ReportView {
        is_internal: report.is_internal_work(),
        photos_count: report.photos_count(),
        executor_label,
        report,
    }
}

/// 去掉空白 URL
/// 当日完成量: 2 位小数,非负
fn normalize_quantity(quantity: Decimal) -> ApiResult<Decimal> {
    let quantity = normalize_fixed("当日完成量", quantity, REPORT_QUANTITY_MAX_DIGITS)?;
    require_non_negative("当日完成量", quantity)?;
    Ok(quantity)
}

fn clean_photos(photos: Vec<String>) -> Vec<String> {
    photos
        .into_iter()
        .filter_map(|p| blank_to_none(Some(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TaskStatus;
    use crate::engine::ProgressEngine;
    use crate::repository::test_fixtures::{date, plan_tree, PlanTree};
    use rust_decimal_macros::dec;

    fn api(tree: &PlanTree) -> ReportApi {
        let conn = tree.conn.clone();
        ReportApi::new(
            Arc::new(DailyReportRepository::new(conn.clone())),
            Arc::new(TaskPlanningRepository::new(conn.clone())),
            Arc::new(SubcontractorRepository::new(conn)),
            "AI Venture".to_string(),
        )
    }

    fn input(tree: &PlanTree, day: u32, qty: Decimal, sub: Option<&str>) -> DailyReportInput {
        DailyReportInput {
            task_planning_id: tree.task_planning_id.clone(),
            report_date: date(2024, 1, day),
            unit_value: 1,
            quantity: qty,
            subcontractor_id: sub.map(str::to_string),
            referent_id: "u-ref".to_string(),
            observations: String::new(),
            photos: vec!["https://cdn/p1.jpg".to_string(), "  ".to_string()],
        }
    }

    #[test]
    fn test_second_report_in_slot_is_duplicate() {
        let tree = plan_tree();
        let api = api(&tree);
        api.record_daily_report(input(&tree, 12, dec!(30), None)).unwrap();

        let err = api.record_daily_report(input(&tree, 12, dec!(45), None)).unwrap_err();
        match &err {
            ApiError::DuplicateReport { executor, date: d, .. } => {
                assert_eq!(executor, "AI Venture");
                assert_eq!(*d, date(2024, 1, 12));
            }
            other => panic!("Expected DuplicateReport, got {:?}", other),
        }
        assert!(err.is_constraint_violation());

        // 台账只保留第一次
        let quantities = api.report_repo.quantities_for_task(&tree.task_planning_id).unwrap();
        assert_eq!(ProgressEngine::new().realized_quantity(&quantities), Some(dec!(30)));
    }

    #[test]
    fn test_internal_and_subcontractor_views() {
        let tree = plan_tree();
        let api = api(&tree);
        api.record_daily_report(input(&tree, 12, dec!(30), None)).unwrap();
        api.record_daily_report(input(&tree, 12, dec!(45), Some(&tree.subcontractor_id)))
            .unwrap();

        let views = api.list_reports_for_task(&tree.task_planning_id).unwrap();
        assert_eq!(views.len(), 2);
        let internal = views.iter().find(|v| v.is_internal).unwrap();
        assert_eq!(internal.executor_label, "AI Venture");
        assert_eq!(internal.photos_count, 1);
        let sub = views.iter().find(|v| !v.is_internal).unwrap();
        assert_eq!(sub.executor_label, "Sous-traitant ST1");
    }

    #[test]
    fn test_validation_and_references() {
        let tree = plan_tree();
        let api = api(&tree);
        assert!(matches!(
            api.record_daily_report(input(&tree, 12, dec!(-1), None)),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.record_daily_report(input(&tree, 12, dec!(1), Some("sc-missing"))),
            Err(ApiError::ReferenceError(_))
        ));
        let mut orphan = input(&tree, 12, dec!(1), None);
        orphan.task_planning_id = "tp-missing".to_string();
        assert!(matches!(api.record_daily_report(orphan), Err(ApiError::ReferenceError(_))));

        // 零数量合法
        assert!(api.record_daily_report(input(&tree, 13, Decimal::ZERO, None)).is_ok());
    }

    #[test]
    fn test_quantity_is_stored_with_two_decimals() {
        let tree = plan_tree();
        let api = api(&tree);
        let report = api.record_daily_report(input(&tree, 12, dec!(12.345), None)).unwrap();
        assert_eq!(report.quantity, dec!(12.34));
        assert_eq!(api.get_report(&report.id).unwrap().quantity.to_string(), "12.34");

        // 10 位定点: 整数部分最多 8 位
        assert!(matches!(
            api.record_daily_report(input(&tree, 13, dec!(100000000), None)),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.record_daily_report(input(&tree, 13, Decimal::MAX, None)),
            Err(ApiError::ValidationError(_))
        ));
    }

    #[test]
    fn test_update_rechecks_slot() {
        let tree = plan_tree();
        let api = api(&tree);
        api.record_daily_report(input(&tree, 12, dec!(30), None)).unwrap();
        let second = api.record_daily_report(input(&tree, 13, dec!(10), None)).unwrap();

        let moved = api.update_daily_report(
            &second.id,
            DailyReportUpdate {
                report_date: date(2024, 1, 12),
                unit_value: 1,
                quantity: dec!(10),
                subcontractor_id: None,
                observations: String::new(),
                photos: vec![],
            },
        );
        assert!(matches!(moved, Err(ApiError::DuplicateReport { .. })));

        let updated = api
            .update_daily_report(
                &second.id,
                DailyReportUpdate {
                    report_date: date(2024, 1, 13),
                    unit_value: 1,
                    quantity: dec!(15),
                    subcontractor_id: Some(" ".to_string()),
                    observations: "reprise".to_string(),
                    photos: vec![],
                },
            )
            .unwrap();
        assert_eq!(updated.quantity, dec!(15));
        assert!(updated.is_internal_work());

        api.delete_daily_report(&second.id).unwrap();
        assert!(matches!(api.get_report(&second.id), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_recording_does_not_touch_task_status() {
        let tree = plan_tree();
        let api = api(&tree);
        api.record_daily_report(input(&tree, 12, dec!(100), None)).unwrap();
        let task = api
            .task_planning_repo
            .find_by_id(&tree.task_planning_id)
            .unwrap()
            .unwrap();
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(api.list_reports_by_date(date(2024, 1, 12)).unwrap().len(), 1);
        assert_eq!(api.list_reports_by_project(&tree.project_id).unwrap().len(), 1);
    }
}
