// ==========================================
// 光纤部署监理系统 - 项目 API
// ==========================================
// 职责: 项目维护、状态流转、交付开关、项目统计读模型
// 状态机: planned → in_progress → in_delivery → delivered
//         任一非终态 → cancelled;delivered / cancelled 为终态
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    blank_to_none, normalize_fixed, require_date_order, require_non_blank, require_non_negative,
    BUDGET_MAX_DIGITS,
};
use crate::api::{new_id, now};
use crate::domain::project::{DeliveryGates, DeliveryGatesPatch, Project, ProjectFilter};
use crate::domain::types::{ProjectStatus, ProjectType};
use crate::engine::{DelayEngine, ProgressEngine};
use crate::perf::PerfGuard;
use crate::repository::{OperatorRepository, ProjectRepository, StatusChange, TaskPlanningRepository};

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInput {
    pub code: String,
    pub name: String,
    pub operator_id: String,
    pub project_type: ProjectType,
    pub zone: String,
    pub start_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    pub supervisor_id: Option<String>,
    pub operator_supervisor: String,
    pub budget: Option<Decimal>,
    pub description: String,
}

// ==========================================
// 读模型
// ==========================================

/// 项目统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatistics {
    pub project_id: String,
    pub code: String,
    pub name: String,
    pub status: ProjectStatus,
    pub progress_percentage: Decimal,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub is_delayed: bool,
    pub gates: DeliveryGates,
}

/// 项目列表行 (附延期标记)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectView {
    #[serde(flatten)]
    pub project: Project,
    pub is_delayed: bool,
}

// ==========================================
// ProjectApi - 项目 API
// ==========================================
pub struct ProjectApi {
    project_repo: Arc<ProjectRepository>,
    operator_repo: Arc<OperatorRepository>,
    task_planning_repo: Arc<TaskPlanningRepository>,
    progress_engine: Arc<ProgressEngine>,
    delay_engine: DelayEngine,
}

impl ProjectApi {
    pub fn new(
        project_repo: Arc<ProjectRepository>,
        operator_repo: Arc<OperatorRepository>,
        task_planning_repo: Arc<TaskPlanningRepository>,
        progress_engine: Arc<ProgressEngine>,
    ) -> Self {
        Self {
            project_repo,
            operator_repo,
            task_planning_repo,
            progress_engine,
            delay_engine: DelayEngine::new(),
        }
    }

    // ==========================================
    // 维护
    // ==========================================

    /// 创建项目 (初始状态 planned,四个交付开关全部为 false)
    pub fn create_project(&self, input: ProjectInput) -> ApiResult<Project> {
        let budget = self.validate_input(&input)?;
        self.require_active_operator(&input.operator_id)?;

        let ts = now();
        let project = Project {
            id: new_id(),
            code: require_non_blank("项目代码", &input.code)?,
            name: require_non_blank("项目名称", &input.name)?,
            operator_id: input.operator_id,
            project_type: input.project_type,
            zone: require_non_blank("区域", &input.zone)?,
            status: ProjectStatus::Planned,
            start_date: input.start_date,
            expected_end_date: input.expected_end_date,
            actual_end_date: None,
            delivery_date: None,
            gates: DeliveryGates::default(),
            supervisor_id: blank_to_none(input.supervisor_id),
            operator_supervisor: input.operator_supervisor.trim().to_string(),
            budget,
            description: input.description.trim().to_string(),
            created_at: ts,
            updated_at: ts,
        };

        self.project_repo.insert(&project).map_err(|e| {
            warn!(code = %project.code, error = %e, "项目创建失败");
            ApiError::from(e)
        })?;
        info!(project_id = %project.id, code = %project.code, "项目已创建");
        Ok(project)
    }

    /// 更新项目基本信息 (不涉及状态与交付开关)
    pub fn update_project(&self, id: &str, input: ProjectInput) -> ApiResult<Project> {
        let budget = self.validate_input(&input)?;
        let current = self.get_project(id)?;
        if current.operator_id != input.operator_id {
            self.require_active_operator(&input.operator_id)?;
        }

        let project = Project {
            code: require_non_blank("项目代码", &input.code)?,
            name: require_non_blank("项目名称", &input.name)?,
            operator_id: input.operator_id,
            project_type: input.project_type,
            zone: require_non_blank("区域", &input.zone)?,
            start_date: input.start_date,
            expected_end_date: input.expected_end_date,
            supervisor_id: blank_to_none(input.supervisor_id),
            operator_supervisor: input.operator_supervisor.trim().to_string(),
            budget,
            description: input.description.trim().to_string(),
            updated_at: now(),
            ..current
        };
        self.project_repo.update_details(&project)?;
        info!(project_id = %project.id, "项目已更新");
        Ok(project)
    }

    /// 删除项目 (计划/任务/日报/测绘点/交付阶段级联删除)
    pub fn delete_project(&self, id: &str) -> ApiResult<()> {
        self.project_repo.delete(id)?;
        info!(project_id = %id, "项目已删除");
        Ok(())
    }

    /// 校验日期与预算,返回规整后的预算
    fn validate_input(&self, input: &ProjectInput) -> ApiResult<Option<Decimal>> {
        require_date_order("开始日期", input.start_date, "预计完工日期", input.expected_end_date)?;
        input
            .budget
            .map(|budget| {
                let budget = normalize_fixed("预算", budget, BUDGET_MAX_DIGITS)?;
                require_non_negative("预算", budget)?;
                Ok(budget)
            })
            .transpose()
    }

    fn require_active_operator(&self, id: &str) -> ApiResult<()> {
        match self.operator_repo.find_by_id(id)? {
            Some(op) if op.is_active => Ok(()),
            Some(_) => Err(ApiError::ReferenceError(format!("运营商已停用: {}", id))),
            None => Err(ApiError::ReferenceError(format!("运营商不存在: {}", id))),
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn get_project(&self, id: &str) -> ApiResult<Project> {
        self.project_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Project", id))
    }

    pub fn get_project_by_code(&self, code: &str) -> ApiResult<Project> {
        self.project_repo
            .find_by_code(code)?
            .ok_or_else(|| ApiError::not_found("Project", code))
    }

    /// 按过滤条件列出项目,开始日期倒序
    pub fn list_projects(&self, filter: &ProjectFilter, today: NaiveDate) -> ApiResult<Vec<ProjectView>> {
        let projects = self.project_repo.list(filter)?;
        Ok(self.with_delay(projects, today))
    }

    /// 活跃项目: planned / in_progress / in_delivery
    pub fn list_active_projects(&self, today: NaiveDate) -> ApiResult<Vec<ProjectView>> {
        let projects = self.project_repo.list_active()?;
        Ok(self.with_delay(projects, today))
    }

    /// 延期项目: 非终态且预计完工日早于 today
    pub fn list_delayed_projects(&self, today: NaiveDate) -> ApiResult<Vec<Project>> {
        Ok(self.project_repo.list_past_due(today)?)
    }

    pub fn is_delayed(&self, id: &str, today: NaiveDate) -> ApiResult<bool> {
        let project = self.get_project(id)?;
        Ok(self.delay_engine.is_project_delayed(&project, today))
    }

    fn with_delay(&self, projects: Vec<Project>, today: NaiveDate) -> Vec<ProjectView> {
        projects
            .into_iter()
            .map(|project| {
                let is_delayed = self.delay_engine.is_project_delayed(&project, today);
                ProjectView { project, is_delayed }
            })
            .collect()
    }

    /// 项目统计: 进度 / 任务数 / 延期 / 交付开关
    pub fn project_statistics(&self, id: &str, today: NaiveDate) -> ApiResult<ProjectStatistics> {
        let _perf = PerfGuard::new("project_statistics");

        let project = self.get_project(id)?;
        let total = self.task_planning_repo.count_by_project(id)?;
        let done = self.task_planning_repo.count_done_by_project(id)?;
        let rollup = self.progress_engine.rollup_from_counts(total, done);

        Ok(ProjectStatistics {
            is_delayed: self.delay_engine.is_project_delayed(&project, today),
            project_id: project.id,
            code: project.code,
            name: project.name,
            status: project.status,
            progress_percentage: rollup.progress_percentage,
            total_tasks: rollup.total_tasks,
            completed_tasks: rollup.completed_tasks,
            gates: project.gates,
        })
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// 状态流转
    ///
    /// 转为 delivered 时在同一条 UPDATE 内写入 actual_end_date 与 delivery_date
    ///
    /// # 错误
    /// - InvalidStateTransition: 当前状态不允许流转到 `to`,或并发修改导致当前状态已变化
    pub fn transition_project(&self, id: &str, to: ProjectStatus, today: NaiveDate) -> ApiResult<Project> {
        let current = self.get_project(id)?;
        if !current.status.can_transition_to(to) {
            warn!(project_id = %id, from = %current.status, to = %to, "项目状态流转被拒绝");
            return Err(ApiError::transition(current.status, to));
        }

        let stamp = (to == ProjectStatus::Delivered).then_some(today);
        let change = StatusChange {
            from: current.status,
            to,
            actual_end_date: stamp,
            delivery_date: stamp,
            updated_at: now(),
        };

        if !self.project_repo.update_status(id, &change)? {
            // 读到的状态已被并发修改
            let latest = self.get_project(id)?;
            warn!(project_id = %id, from = %latest.status, to = %to, "项目状态并发变更,流转失败");
            return Err(ApiError::transition(latest.status, to));
        }

        info!(project_id = %id, from = %current.status, to = %to, "项目状态已变更");
        self.get_project(id)
    }

    pub fn start_project(&self, id: &str, today: NaiveDate) -> ApiResult<Project> {
        self.transition_project(id, ProjectStatus::InProgress, today)
    }

    pub fn move_to_delivery(&self, id: &str, today: NaiveDate) -> ApiResult<Project> {
        self.transition_project(id, ProjectStatus::InDelivery, today)
    }

    pub fn deliver_project(&self, id: &str, today: NaiveDate) -> ApiResult<Project> {
        self.transition_project(id, ProjectStatus::Delivered, today)
    }

    pub fn cancel_project(&self, id: &str, today: NaiveDate) -> ApiResult<Project> {
        self.transition_project(id, ProjectStatus::Cancelled, today)
    }

    // ==========================================
    // 交付开关
    // ==========================================

    /// 设置任意子集的交付开关 (单条 UPDATE)
    ///
    /// 开关由调用方手工设置,不从交付阶段推导
    pub fn set_delivery_gates(&self, id: &str, patch: DeliveryGatesPatch) -> ApiResult<DeliveryGates> {
        if patch.is_empty() {
            return Ok(self.get_project(id)?.gates);
        }
        self.project_repo.update_gates(id, &patch, now())?;
        let gates = self.get_project(id)?.gates;
        info!(project_id = %id, ?gates, "交付开关已更新");
        Ok(gates)
    }
}
