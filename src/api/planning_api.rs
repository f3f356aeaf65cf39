// ==========================================
// 光纤部署监理系统 - 计划 API
// ==========================================
// 职责: 工作项计划 / 任务计划维护,任务生命周期,进度读模型
// 红线:
// - (project, boq_item) 唯一性以数据库唯一索引为准,API 不做预查
// - 进度/金额/延期只在读取时计算
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    normalize_fixed, require_at_least, require_date_order, require_positive,
    PLANNED_QUANTITY_MAX_DIGITS,
};
use crate::api::{new_id, now};
use crate::domain::planning::{ProjectPlanning, TaskPlanning};
use crate::domain::types::TaskStatus;
use crate::engine::{DelayEngine, ProgressEngine, ProjectRollup, TaskProgress};
use crate::perf::PerfGuard;
use crate::repository::{
    BoqItemRepository, DailyReportRepository, ProjectPlanningRepository, ProjectRepository,
    TaskDefinitionRepository, TaskPlanningRepository, TaskStatusChange,
};

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPlanningInput {
    pub project_id: String,
    pub boq_item_id: String,
    pub unit_value: i32,
    pub planned_quantity: Decimal,
    pub deadline_days: i32,
    pub display_order: i32,
}

/// 工作项计划可变字段
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectPlanningUpdate {
    pub unit_value: i32,
    pub planned_quantity: Decimal,
    pub deadline_days: i32,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlanningInput {
    pub project_planning_id: String,
    pub task_definition_id: String,
    pub unit_value: i32,
    pub planned_quantity: Decimal,
    pub deadline_days: i32,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlanningUpdate {
    pub unit_value: i32,
    pub planned_quantity: Decimal,
    pub deadline_days: i32,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub display_order: i32,
}

// ==========================================
// 读模型
// ==========================================

/// 工作项计划进度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningProgress {
    pub project_planning_id: String,
    pub boq_item_id: String,
    pub planned_quantity: Decimal,
    pub realized_quantity: Decimal,
    pub progress_percentage: Decimal,
    pub unit_price: Decimal,
    /// 计划量 × 单价,与完成量无关
    pub total_amount: Decimal,
}

// ==========================================
// PlanningApi - 计划 API
// ==========================================
pub struct PlanningApi {
    project_repo: Arc<ProjectRepository>,
    item_repo: Arc<BoqItemRepository>,
    task_definition_repo: Arc<TaskDefinitionRepository>,
    project_planning_repo: Arc<ProjectPlanningRepository>,
    task_planning_repo: Arc<TaskPlanningRepository>,
    report_repo: Arc<DailyReportRepository>,
    progress_engine: Arc<ProgressEngine>,
    delay_engine: DelayEngine,
}

impl PlanningApi {
    pub fn new(
        project_repo: Arc<ProjectRepository>,
        item_repo: Arc<BoqItemRepository>,
        task_definition_repo: Arc<TaskDefinitionRepository>,
        project_planning_repo: Arc<ProjectPlanningRepository>,
        task_planning_repo: Arc<TaskPlanningRepository>,
        report_repo: Arc<DailyReportRepository>,
        progress_engine: Arc<ProgressEngine>,
    ) -> Self {
        Self {
            project_repo,
            item_repo,
            task_definition_repo,
            project_planning_repo,
            task_planning_repo,
            report_repo,
            progress_engine,
            delay_engine: DelayEngine::new(),
        }
    }

    // ==========================================
    // 工作项计划 (ProjectPlanning)
    // ==========================================

    /// 创建工作项计划
    ///
    /// # 错误
    /// - ValidationError: 计划量 <= 0、期限 < 1 天、单位倍数 < 1
    /// - ReferenceError: 项目不存在,或 BOQ 条目不存在/已停用
    /// - ConstraintViolation: 该项目已计划过此 BOQ 条目
    pub fn create_project_planning(&self, input: ProjectPlanningInput) -> ApiResult<ProjectPlanning> {
        let planned_quantity =
            validate_quantities(input.unit_value, input.planned_quantity, input.deadline_days)?;

        if self.project_repo.find_by_id(&input.project_id)?.is_none() {
            return Err(ApiError::ReferenceError(format!("项目不存在: {}", input.project_id)));
        }
        match self.item_repo.find_by_id(&input.boq_item_id)? {
            Some(item) if item.is_active => {}
            Some(_) => {
                return Err(ApiError::ReferenceError(format!("BOQ 条目已停用: {}", input.boq_item_id)))
            }
            None => {
                return Err(ApiError::ReferenceError(format!("BOQ 条目不存在: {}", input.boq_item_id)))
            }
        }

        let ts = now();
        let pp = ProjectPlanning {
            id: new_id(),
            project_id: input.project_id,
            boq_item_id: input.boq_item_id,
            unit_value: input.unit_value,
            planned_quantity,
            deadline_days: input.deadline_days,
            display_order: input.display_order,
            created_at: ts,
            updated_at: ts,
        };

        self.project_planning_repo.insert(&pp).map_err(|e| {
            warn!(
                project_id = %pp.project_id,
                boq_item_id = %pp.boq_item_id,
                error = %e,
                "工作项计划创建失败"
            );
            ApiError::from(e)
        })?;
        info!(project_planning_id = %pp.id, project_id = %pp.project_id, "工作项计划已创建");
        Ok(pp)
    }

    pub fn update_project_planning(&self, id: &str, update: ProjectPlanningUpdate) -> ApiResult<ProjectPlanning> {
        let planned_quantity =
            validate_quantities(update.unit_value, update.planned_quantity, update.deadline_days)?;
        let current = self.get_project_planning(id)?;
        let pp = ProjectPlanning {
            unit_value: update.unit_value,
            planned_quantity,
            deadline_days: update.deadline_days,
            display_order: update.display_order,
            updated_at: now(),
            ..current
        };
        self.project_planning_repo.update(&pp)?;
        info!(project_planning_id = %pp.id, "工作项计划已更新");
        Ok(pp)
    }

    /// 删除工作项计划 (其任务与日报级联删除)
    pub fn delete_project_planning(&self, id: &str) -> ApiResult<()> {
        self.project_planning_repo.delete(id)?;
        info!(project_planning_id = %id, "工作项计划已删除");
        Ok(())
    }

    pub fn get_project_planning(&self, id: &str) -> ApiResult<ProjectPlanning> {
        self.project_planning_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("ProjectPlanning", id))
    }

    pub fn list_project_plannings(&self, project_id: &str) -> ApiResult<Vec<ProjectPlanning>> {
        Ok(self.project_planning_repo.list_by_project(project_id)?)
    }

    // ==========================================
    // 任务计划 (TaskPlanning)
    // ==========================================

    /// 创建任务计划 (初始状态 not_started)
    ///
    /// 计划完成日不得早于计划开始日
    pub fn create_task_planning(&self, input: TaskPlanningInput) -> ApiResult<TaskPlanning> {
        let planned_quantity =
            validate_quantities(input.unit_value, input.planned_quantity, input.deadline_days)?;
        require_date_order("计划开始日", input.planned_start, "计划完成日", input.planned_end)?;

        if self
            .project_planning_repo
            .find_by_id(&input.project_planning_id)?
            .is_none()
        {
            return Err(ApiError::ReferenceError(format!(
                "工作项计划不存在: {}",
                input.project_planning_id
            )));
        }
        match self.task_definition_repo.find_by_id(&input.task_definition_id)? {
            Some(def) if def.is_active => {}
            Some(_) => {
                return Err(ApiError::ReferenceError(format!(
                    "任务定义已停用: {}",
                    input.task_definition_id
                )))
            }
            None => {
                return Err(ApiError::ReferenceError(format!(
                    "任务定义不存在: {}",
                    input.task_definition_id
                )))
            }
        }

        let ts = now();
        let tp = TaskPlanning {
            id: new_id(),
            project_planning_id: input.project_planning_id,
            task_definition_id: input.task_definition_id,
            unit_value: input.unit_value,
            planned_quantity,
            deadline_days: input.deadline_days,
            planned_start: input.planned_start,
            planned_end: input.planned_end,
            actual_start: None,
            actual_end: None,
            status: TaskStatus::NotStarted,
            display_order: input.display_order,
            created_at: ts,
            updated_at: ts,
        };
        self.task_planning_repo.insert(&tp)?;
        info!(task_planning_id = %tp.id, project_planning_id = %tp.project_planning_id, "任务计划已创建");
        Ok(tp)
    }

    pub fn update_task_planning(&self, id: &str, update: TaskPlanningUpdate) -> ApiResult<TaskPlanning> {
        let planned_quantity =
            validate_quantities(update.unit_value, update.planned_quantity, update.deadline_days)?;
        require_date_order("计划开始日", update.planned_start, "计划完成日", update.planned_end)?;
        let current = self.get_task_planning(id)?;
        let tp = TaskPlanning {
            unit_value: update.unit_value,
            planned_quantity,
            deadline_days: update.deadline_days,
            planned_start: update.planned_start,
            planned_end: update.planned_end,
            display_order: update.display_order,
            updated_at: now(),
            ..current
        };
        self.task_planning_repo.update_plan(&tp)?;
        info!(task_planning_id = %tp.id, "任务计划已更新");
        Ok(tp)
    }

    pub fn delete_task_planning(&self, id: &str) -> ApiResult<()> {
        self.task_planning_repo.delete(id)?;
        info!(task_planning_id = %id, "任务计划已删除");
        Ok(())
    }

    pub fn get_task_planning(&self, id: &str) -> ApiResult<TaskPlanning> {
        self.task_planning_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("TaskPlanning", id))
    }

    pub fn list_task_plannings(&self, project_planning_id: &str) -> ApiResult<Vec<TaskPlanning>> {
        Ok(self
            .task_planning_repo
            .list_by_project_planning(project_planning_id)?)
    }

    pub fn list_project_tasks(&self, project_id: &str) -> ApiResult<Vec<TaskPlanning>> {
        Ok(self.task_planning_repo.list_by_project(project_id)?)
    }

    // ==========================================
    // 任务生命周期 (每步一条原子 UPDATE)
    // ==========================================

    /// not_started → in_progress,首次开工时写入实际开始日
    pub fn start_task(&self, id: &str, today: NaiveDate) -> ApiResult<TaskPlanning> {
        self.transition_task(
            id,
            TaskStatusChange {
                allowed_from: vec![TaskStatus::NotStarted],
                to: TaskStatus::InProgress,
                stamp_actual_start: Some(today),
                stamp_actual_end: None,
                updated_at: now(),
            },
        )
    }

    /// not_started / in_progress → done,同时写入实际完成日
    pub fn complete_task(&self, id: &str, today: NaiveDate) -> ApiResult<TaskPlanning> {
        self.transition_task(
            id,
            TaskStatusChange {
                allowed_from: vec![TaskStatus::NotStarted, TaskStatus::InProgress],
                to: TaskStatus::Done,
                stamp_actual_start: Some(today),
                stamp_actual_end: Some(today),
                updated_at: now(),
            },
        )
    }

    pub fn suspend_task(&self, id: &str) -> ApiResult<TaskPlanning> {
        self.transition_task(
            id,
            TaskStatusChange {
                allowed_from: vec![TaskStatus::NotStarted, TaskStatus::InProgress],
                to: TaskStatus::Suspended,
                stamp_actual_start: None,
                stamp_actual_end: None,
                updated_at: now(),
            },
        )
    }

    pub fn resume_task(&self, id: &str) -> ApiResult<TaskPlanning> {
        self.transition_task(
            id,
            TaskStatusChange {
                allowed_from: vec![TaskStatus::Suspended],
                to: TaskStatus::InProgress,
                stamp_actual_start: None,
                stamp_actual_end: None,
                updated_at: now(),
            },
        )
    }

    fn transition_task(&self, id: &str, change: TaskStatusChange) -> ApiResult<TaskPlanning> {
        if !self.task_planning_repo.transition_status(id, &change)? {
            let current = self.get_task_planning(id)?;
            warn!(task_planning_id = %id, from = %current.status, to = %change.to, "任务状态流转被拒绝");
            return Err(ApiError::transition(current.status, change.to));
        }
        info!(task_planning_id = %id, to = %change.to, "任务状态已变更");
        self.get_task_planning(id)
    }

    /// 延期任务: 未开始/进行中 且 计划完成日早于 today
    pub fn list_delayed_tasks(&self, today: NaiveDate) -> ApiResult<Vec<TaskPlanning>> {
        Ok(self.task_planning_repo.list_past_due(today)?)
    }

    // ==========================================
    // 进度读模型
    // ==========================================

    /// 任务实际完成量 (无日报为 0)
    pub fn realized_quantity_for_task(&self, task_planning_id: &str) -> ApiResult<Decimal> {
        let quantities = self.report_repo.quantities_for_task(task_planning_id)?;
        self.progress_engine
            .realized_quantity(&quantities)
            .ok_or_else(|| ApiError::overflow("任务完成量"))
    }

    /// 工作项计划实际完成量 (其全部任务的日报之和)
    pub fn realized_quantity_for_project_planning(&self, project_planning_id: &str) -> ApiResult<Decimal> {
        let quantities = self
            .report_repo
            .quantities_for_project_planning(project_planning_id)?;
        self.progress_engine
            .realized_quantity(&quantities)
            .ok_or_else(|| ApiError::overflow("工作项完成量"))
    }

    /// 工作项计划金额 = 计划量 × BOQ 单价
    pub fn total_amount(&self, project_planning_id: &str) -> ApiResult<Decimal> {
        let pp = self.get_project_planning(project_planning_id)?;
        let item = self
            .item_repo
            .find_by_id(&pp.boq_item_id)?
            .ok_or_else(|| ApiError::not_found("BoqItem", &pp.boq_item_id))?;
        self.progress_engine
            .total_amount(pp.planned_quantity, item.unit_price)
            .ok_or_else(|| ApiError::overflow("计划金额"))
    }

    pub fn project_planning_progress(&self, project_planning_id: &str) -> ApiResult<PlanningProgress> {
        let _perf = PerfGuard::new("project_planning_progress");

        let pp = self.get_project_planning(project_planning_id)?;
        let item = self
            .item_repo
            .find_by_id(&pp.boq_item_id)?
            .ok_or_else(|| ApiError::not_found("BoqItem", &pp.boq_item_id))?;
        let realized = self.realized_quantity_for_project_planning(&pp.id)?;
        let total_amount = self
            .progress_engine
            .total_amount(pp.planned_quantity, item.unit_price)
            .ok_or_else(|| ApiError::overflow("计划金额"))?;

        Ok(PlanningProgress {
            progress_percentage: self
                .progress_engine
                .progress_percentage(realized, pp.planned_quantity),
            total_amount,
            project_planning_id: pp.id,
            boq_item_id: pp.boq_item_id,
            planned_quantity: pp.planned_quantity,
            realized_quantity: realized,
            unit_price: item.unit_price,
        })
    }

    pub fn task_progress(&self, task_planning_id: &str, today: NaiveDate) -> ApiResult<TaskProgress> {
        let task = self.get_task_planning(task_planning_id)?;
        let realized = self.realized_quantity_for_task(task_planning_id)?;
        Ok(self.progress_engine.task_progress(&task, realized, today))
    }

    /// 项目全部任务的读模型 (两次查询,内存汇总)
    pub fn project_task_progress(&self, project_id: &str, today: NaiveDate) -> ApiResult<Vec<TaskProgress>> {
        let _perf = PerfGuard::new("project_task_progress");

        let tasks = self.task_planning_repo.list_by_project(project_id)?;
        let quantities = self.report_repo.task_quantities_for_project(project_id)?;
        self.progress_engine
            .task_progress_batch(&tasks, &quantities, today)
            .ok_or_else(|| ApiError::overflow("任务完成量"))
    }

    /// 项目任务汇总: 总数 / 已完成 / 百分比
    pub fn project_rollup(&self, project_id: &str) -> ApiResult<ProjectRollup> {
        let total = self.task_planning_repo.count_by_project(project_id)?;
        let done = self.task_planning_repo.count_done_by_project(project_id)?;
        Ok(self.progress_engine.rollup_from_counts(total, done))
    }

    pub fn is_task_delayed(&self, task_planning_id: &str, today: NaiveDate) -> ApiResult<bool> {
        let task = self.get_task_planning(task_planning_id)?;
        Ok(self.delay_engine.is_task_delayed(&task, today))
    }
}

/// 校验计划数值,返回规整到 2 位小数后的计划量
fn validate_quantities(unit_value: i32, planned_quantity: Decimal, deadline_days: i32) -> ApiResult<Decimal> {
    require_at_least("单位倍数", unit_value, 1)?;
    let planned_quantity = normalize_fixed("计划量", planned_quantity, PLANNED_QUANTITY_MAX_DIGITS)?;
    require_positive("计划量", planned_quantity)?;
    require_at_least("期限天数", deadline_days, 1)?;
    Ok(planned_quantity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::{date, plan_tree, PlanTree};
    use rust_decimal_macros::dec;

    fn api(tree: &PlanTree) -> PlanningApi {
        let conn = tree.conn.clone();
        PlanningApi::new(
            Arc::new(ProjectRepository::new(conn.clone())),
            Arc::new(BoqItemRepository::new(conn.clone())),
            Arc::new(TaskDefinitionRepository::new(conn.clone())),
            Arc::new(ProjectPlanningRepository::new(conn.clone())),
            Arc::new(TaskPlanningRepository::new(conn.clone())),
            Arc::new(DailyReportRepository::new(conn)),
            Arc::new(ProgressEngine::new()),
        )
    }

    fn pp_input(tree: &PlanTree, qty: Decimal, deadline: i32) -> ProjectPlanningInput {
        ProjectPlanningInput {
            project_id: tree.project_id.clone(),
            boq_item_id: tree.boq_item_id.clone(),
            unit_value: 1,
            planned_quantity: qty,
            deadline_days: deadline,
            display_order: 0,
        }
    }

    #[test]
    fn test_duplicate_project_item_is_a_constraint_violation() {
        let tree = plan_tree();
        let api = api(&tree);
        // plan_tree 已计划 (p1, bi-x1)
        let err = api.create_project_planning(pp_input(&tree, dec!(10), 5)).unwrap_err();
        assert!(matches!(err, ApiError::ConstraintViolation(_)));
    }

    #[test]
    fn test_project_planning_numeric_validation() {
        let tree = plan_tree();
        let api = api(&tree);
        assert!(matches!(
            api.create_project_planning(pp_input(&tree, Decimal::ZERO, 5)),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.create_project_planning(pp_input(&tree, dec!(10), 0)),
            Err(ApiError::ValidationError(_))
        ));

        let mut missing = pp_input(&tree, dec!(10), 5);
        missing.boq_item_id = "bi-missing".to_string();
        assert!(matches!(
            api.create_project_planning(missing),
            Err(ApiError::ReferenceError(_))
        ));
    }

    #[test]
    fn test_planned_quantity_is_bounded_and_rounded() {
        let tree = plan_tree();
        let api = api(&tree);
        assert!(matches!(
            api.create_project_planning(pp_input(&tree, Decimal::MAX, 5)),
            Err(ApiError::ValidationError(_))
        ));
        // 四舍五入后为 0 视为非正
        assert!(matches!(
            api.create_project_planning(pp_input(&tree, dec!(0.004), 5)),
            Err(ApiError::ValidationError(_))
        ));

        let updated = api
            .update_project_planning(
                &tree.project_planning_id,
                ProjectPlanningUpdate {
                    unit_value: 1,
                    planned_quantity: dec!(10.12345),
                    deadline_days: 5,
                    display_order: 0,
                },
            )
            .unwrap();
        assert_eq!(updated.planned_quantity, dec!(10.12));
        let reloaded = api.get_project_planning(&tree.project_planning_id).unwrap();
        assert_eq!(reloaded.planned_quantity.to_string(), "10.12");
    }

    #[test]
    fn test_unvalidated_row_overflow_is_an_error_not_a_panic() {
        let tree = plan_tree();
        let api = api(&tree);
        // 绕过 API 直接写入超界数据
        let repo = ProjectPlanningRepository::new(tree.conn.clone());
        let mut pp = repo.find_by_id(&tree.project_planning_id).unwrap().unwrap();
        pp.planned_quantity = Decimal::MAX;
        repo.update(&pp).unwrap();

        assert!(matches!(
            api.total_amount(&tree.project_planning_id),
            Err(ApiError::InternalError(_))
        ));
        assert!(matches!(
            api.project_planning_progress(&tree.project_planning_id),
            Err(ApiError::InternalError(_))
        ));
    }

    #[test]
    fn test_total_amount_is_exact_decimal() {
        let tree = plan_tree();
        let api = api(&tree);
        api.update_project_planning(
            &tree.project_planning_id,
            ProjectPlanningUpdate {
                unit_value: 1,
                planned_quantity: dec!(10),
                deadline_days: 5,
                display_order: 0,
            },
        )
        .unwrap();
        let amount = api.total_amount(&tree.project_planning_id).unwrap();
        assert_eq!(amount, dec!(15000.00));
        assert_eq!(amount.to_string(), "15000.00");
    }

    #[test]
    fn test_task_window_must_be_ordered() {
        let tree = plan_tree();
        let api = api(&tree);
        let input = TaskPlanningInput {
            project_planning_id: tree.project_planning_id.clone(),
            task_definition_id: tree.task_definition_id.clone(),
            unit_value: 1,
            planned_quantity: dec!(50),
            deadline_days: 3,
            planned_start: date(2024, 2, 10),
            planned_end: date(2024, 2, 9),
            display_order: 1,
        };
        assert!(matches!(
            api.create_task_planning(input.clone()),
            Err(ApiError::ValidationError(_))
        ));

        let ok = api
            .create_task_planning(TaskPlanningInput {
                planned_end: date(2024, 2, 10),
                ..input
            })
            .unwrap();
        assert_eq!(ok.status, TaskStatus::NotStarted);
        assert_eq!(api.list_task_plannings(&tree.project_planning_id).unwrap().len(), 2);
    }

    #[test]
    fn test_task_lifecycle() {
        let tree = plan_tree();
        let api = api(&tree);
        let id = tree.task_planning_id.as_str();

        let started = api.start_task(id, date(2024, 1, 11)).unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);
        assert_eq!(started.actual_start, Some(date(2024, 1, 11)));

        // 已开工不能再次开工
        assert!(matches!(
            api.start_task(id, date(2024, 1, 12)),
            Err(ApiError::InvalidStateTransition { .. })
        ));

        api.suspend_task(id).unwrap();
        assert!(matches!(api.suspend_task(id), Err(ApiError::InvalidStateTransition { .. })));
        let resumed = api.resume_task(id).unwrap();
        assert_eq!(resumed.actual_start, Some(date(2024, 1, 11)));

        let done = api.complete_task(id, date(2024, 1, 25)).unwrap();
        assert_eq!(done.status, TaskStatus::Done);
        assert_eq!(done.actual_end, Some(date(2024, 1, 25)));
        assert!(!api.is_task_delayed(id, date(2024, 6, 1)).unwrap());

        // done 为终态
        assert!(matches!(api.resume_task(id), Err(ApiError::InvalidStateTransition { .. })));
        assert!(matches!(api.start_task("missing", date(2024, 1, 1)), Err(ApiError::NotFound(_))));

        let rollup = api.project_rollup(&tree.project_id).unwrap();
        assert_eq!(rollup.total_tasks, 1);
        assert_eq!(rollup.completed_tasks, 1);
        assert_eq!(rollup.progress_percentage, dec!(100));
    }

    #[test]
    fn test_progress_without_reports_is_zero() {
        let tree = plan_tree();
        let api = api(&tree);
        let progress = api.project_planning_progress(&tree.project_planning_id).unwrap();
        assert_eq!(progress.realized_quantity, Decimal::ZERO);
        assert_eq!(progress.progress_percentage, Decimal::ZERO);
        assert_eq!(progress.total_amount, dec!(150000.00));

        let delayed = api.list_delayed_tasks(date(2024, 1, 21)).unwrap();
        assert_eq!(delayed.len(), 1);
        assert!(api.list_delayed_tasks(date(2024, 1, 20)).unwrap().is_empty());
    }
}
