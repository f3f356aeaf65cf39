// ==========================================
// 光纤部署监理系统 - 交付流程 API
// ==========================================
// 职责: 交付阶段 (环境检查 / 报告编写 / 技术巡检) 与整改记录
// 阶段状态: not_started → in_progress → done
// - advance_phase 只允许向前一步
// - set_phase_status 为自由设置 (不校验顺序)
// 交付阶段与项目的四个交付开关互不推导
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{blank_to_none, require_date_order, require_non_blank};
use crate::api::{new_id, now};
use crate::domain::delivery::{Correction, DeliveryPhase};
use crate::domain::types::{CorrectionStatus, DeliveryPhaseKind, PhaseStatus};
use crate::repository::{
    BoqItemRepository, CorrectionRepository, DeliveryPhaseRepository, ProjectRepository,
    TaskDefinitionRepository,
};

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPhaseInput {
    pub project_id: String,
    pub phase: DeliveryPhaseKind,
    /// 缺省为 in_progress
    pub status: Option<PhaseStatus>,
    pub start_date: NaiveDate,
    pub responsible_id: Option<String>,
    pub observations: String,
    pub documents: Vec<String>,
}

/// 阶段可变字段 (状态走 advance_phase / set_phase_status)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryPhaseDetails {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub responsible_id: Option<String>,
    pub observations: String,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrectionInput {
    pub delivery_phase_id: String,
    pub correction_date: NaiveDate,
    pub boq_item_id: String,
    pub task_definition_id: Option<String>,
    pub status: CorrectionStatus,
    pub observations: String,
    pub photos: Vec<String>,
    pub corrector_id: Option<String>,
}

// ==========================================
// 读模型
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseView {
    #[serde(flatten)]
    pub phase: DeliveryPhase,
    pub corrections_count: usize,
    pub documents_count: usize,
}

// ==========================================
// DeliveryApi - 交付流程 API
// ==========================================
pub struct DeliveryApi {
    phase_repo: Arc<DeliveryPhaseRepository>,
    correction_repo: Arc<CorrectionRepository>,
    project_repo: Arc<ProjectRepository>,
    item_repo: Arc<BoqItemRepository>,
    task_definition_repo: Arc<TaskDefinitionRepository>,
}

impl DeliveryApi {
    pub fn new(
        phase_repo: Arc<DeliveryPhaseRepository>,
        correction_repo: Arc<CorrectionRepository>,
        project_repo: Arc<ProjectRepository>,
        item_repo: Arc<BoqItemRepository>,
        task_definition_repo: Arc<TaskDefinitionRepository>,
    ) -> Self {
        Self {
            phase_repo,
            correction_repo,
            project_repo,
            item_repo,
            task_definition_repo,
        }
    }

    // ==========================================
    // 交付阶段
    // ==========================================

    /// 创建交付阶段 ((项目, 阶段) 重复 → ConstraintViolation)
    pub fn create_phase(&self, input: DeliveryPhaseInput) -> ApiResult<DeliveryPhase> {
        if self.project_repo.find_by_id(&input.project_id)?.is_none() {
            return Err(ApiError::ReferenceError(format!("项目不存在: {}", input.project_id)));
        }

        let status = input.status.unwrap_or(PhaseStatus::InProgress);
        let ts = now();
        let phase = DeliveryPhase {
            id: new_id(),
            project_id: input.project_id,
            phase: input.phase,
            status,
            start_date: input.start_date,
            end_date: None,
            responsible_id: blank_to_none(input.responsible_id),
            observations: input.observations.trim().to_string(),
            documents: clean_urls(input.documents),
            created_at: ts,
            updated_at: ts,
        };

        self.phase_repo.insert(&phase).map_err(|e| {
            warn!(project_id = %phase.project_id, phase = %phase.phase, error = %e, "交付阶段创建失败");
            ApiError::from(e)
        })?;
        info!(phase_id = %phase.id, project_id = %phase.project_id, phase = %phase.phase, "交付阶段已创建");
        Ok(phase)
    }

    pub fn update_phase_details(&self, id: &str, details: DeliveryPhaseDetails) -> ApiResult<DeliveryPhase> {
        let current = self.get_phase(id)?;
        if let Some(end) = details.end_date {
            require_date_order("开始日期", details.start_date, "结束日期", end)?;
        }
        let phase = DeliveryPhase {
            start_date: details.start_date,
            end_date: details.end_date,
            responsible_id: blank_to_none(details.responsible_id),
            observations: details.observations.trim().to_string(),
            documents: clean_urls(details.documents),
            updated_at: now(),
            ..current
        };
        self.phase_repo.update_details(&phase)?;
        info!(phase_id = %phase.id, "交付阶段已更新");
        Ok(phase)
    }

    /// 向前推进一步;推进到 done 时写入结束日期
    ///
    /// # 错误
    /// - InvalidStateTransition: 已是 done,或并发修改导致当前状态已变化
    pub fn advance_phase(&self, id: &str, today: NaiveDate) -> ApiResult<DeliveryPhase> {
        let current = self.get_phase(id)?;
        let Some(next) = current.status.next() else {
            warn!(phase_id = %id, "交付阶段已完成,无法继续推进");
            return Err(ApiError::transition(current.status, current.status));
        };

        let end_date = if next == PhaseStatus::Done {
            Some(today)
        } else {
            current.end_date
        };
        if !self
            .phase_repo
            .set_status(id, Some(current.status), next, end_date, now())?
        {
            let latest = self.get_phase(id)?;
            warn!(phase_id = %id, from = %latest.status, to = %next, "交付阶段并发变更,推进失败");
            return Err(ApiError::transition(latest.status, next));
        }

        info!(phase_id = %id, from = %current.status, to = %next, "交付阶段已推进");
        self.get_phase(id)
    }

    /// 自由设置阶段状态 (不校验顺序)
    ///
    /// done 时补写结束日期,其他状态清空结束日期
    pub fn set_phase_status(&self, id: &str, status: PhaseStatus, today: NaiveDate) -> ApiResult<DeliveryPhase> {
        let current = self.get_phase(id)?;
        let end_date = match status {
            PhaseStatus::Done => current.end_date.or(Some(today)),
            _ => None,
        };
        if !self.phase_repo.set_status(id, None, status, end_date, now())? {
            return Err(ApiError::not_found("DeliveryPhase", id));
        }
        info!(phase_id = %id, from = %current.status, to = %status, "交付阶段状态已设置");
        self.get_phase(id)
    }

    pub fn delete_phase(&self, id: &str) -> ApiResult<()> {
        self.phase_repo.delete(id)?;
        info!(phase_id = %id, "交付阶段已删除");
        Ok(())
    }

    pub fn get_phase(&self, id: &str) -> ApiResult<DeliveryPhase> {
        self.phase_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("DeliveryPhase", id))
    }

    pub fn find_phase(&self, project_id: &str, phase: DeliveryPhaseKind) -> ApiResult<Option<DeliveryPhase>> {
        Ok(self.phase_repo.find_by_project_phase(project_id, phase)?)
    }

    pub fn list_phases(&self, project_id: &str) -> ApiResult<Vec<PhaseView>> {
        self.phase_repo
            .list_by_project(project_id)?
            .into_iter()
            .map(|phase| {
                let corrections_count = self.correction_repo.count_by_phase(&phase.id)?;
                Ok(PhaseView {
                    documents_count: phase.documents_count(),
                    corrections_count,
                    phase,
                })
            })
            .collect()
    }

    // ==========================================
    // 整改记录
    // ==========================================

    /// 登记整改
    ///
    /// # 错误
    /// - ValidationError: observations 为空
    /// - ReferenceError: 阶段 / BOQ 条目 / 任务定义不存在
    pub fn create_correction(&self, input: CorrectionInput) -> ApiResult<Correction> {
        let observations = require_non_blank("整改说明", &input.observations)?;
        self.get_phase(&input.delivery_phase_id).map_err(|e| match e {
            ApiError::NotFound(_) => {
                ApiError::ReferenceError(format!("交付阶段不存在: {}", input.delivery_phase_id))
            }
            other => other,
        })?;
        let task_definition_id = blank_to_none(input.task_definition_id);
        self.require_references(&input.boq_item_id, task_definition_id.as_deref())?;

        let correction = Correction {
            id: new_id(),
            delivery_phase_id: input.delivery_phase_id,
            correction_date: input.correction_date,
            boq_item_id: input.boq_item_id,
            task_definition_id,
            status: input.status,
            observations,
            photos: clean_urls(input.photos),
            corrector_id: blank_to_none(input.corrector_id),
            created_at: now(),
        };
        self.correction_repo.insert(&correction)?;
        info!(
            correction_id = %correction.id,
            phase_id = %correction.delivery_phase_id,
            status = %correction.status,
            "整改记录已登记"
        );
        Ok(correction)
    }

    /// 更新整改 (所属阶段不可改)
    pub fn update_correction(&self, id: &str, input: CorrectionInput) -> ApiResult<Correction> {
        let observations = require_non_blank("整改说明", &input.observations)?;
        let current = self.get_correction(id)?;
        let task_definition_id = blank_to_none(input.task_definition_id);
        self.require_references(&input.boq_item_id, task_definition_id.as_deref())?;

        let correction = Correction {
            correction_date: input.correction_date,
            boq_item_id: input.boq_item_id,
            task_definition_id,
            status: input.status,
            observations,
            photos: clean_urls(input.photos),
            corrector_id: blank_to_none(input.corrector_id),
            ..current
        };
        self.correction_repo.update(&correction)?;
        info!(correction_id = %correction.id, status = %correction.status, "整改记录已更新");
        Ok(correction)
    }

    pub fn delete_correction(&self, id: &str) -> ApiResult<()> {
        self.correction_repo.delete(id)?;
        info!(correction_id = %id, "整改记录已删除");
        Ok(())
    }

    pub fn get_correction(&self, id: &str) -> ApiResult<Correction> {
        self.correction_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Correction", id))
    }

    /// 阶段下整改,日期倒序
    pub fn list_corrections_by_phase(&self, delivery_phase_id: &str) -> ApiResult<Vec<Correction>> {
        Ok(self.correction_repo.list_by_phase(delivery_phase_id)?)
    }

    pub fn list_corrections_by_project(&self, project_id: &str) -> ApiResult<Vec<Correction>> {
        Ok(self.correction_repo.list_by_project(project_id)?)
    }

    pub fn corrections_count(&self, delivery_phase_id: &str) -> ApiResult<usize> {
        Ok(self.correction_repo.count_by_phase(delivery_phase_id)?)
    }

    fn require_references(&self, boq_item_id: &str, task_definition_id: Option<&str>) -> ApiResult<()> {
        if self.item_repo.find_by_id(boq_item_id)?.is_none() {
            return Err(ApiError::ReferenceError(format!("BOQ 条目不存在: {}", boq_item_id)));
        }
        if let Some(td) = task_definition_id {
            if self.task_definition_repo.find_by_id(td)?.is_none() {
                return Err(ApiError::ReferenceError(format!("任务定义不存在: {}", td)));
            }
        }
        Ok(())
    }
}

fn clean_urls(urls: Vec<String>) -> Vec<String> {
    urls.into_iter()
        .filter_map(|u| blank_to_none(Some(u)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::{date, plan_tree, PlanTree};

    fn api(tree: &PlanTree) -> DeliveryApi {
        let conn = tree.conn.clone();
        DeliveryApi::new(
            Arc::new(DeliveryPhaseRepository::new(conn.clone())),
            Arc::new(CorrectionRepository::new(conn.clone())),
            Arc::new(ProjectRepository::new(conn.clone())),
            Arc::new(BoqItemRepository::new(conn.clone())),
            Arc::new(TaskDefinitionRepository::new(conn)),
        )
    }

    fn phase_input(tree: &PlanTree, kind: DeliveryPhaseKind, status: Option<PhaseStatus>) -> DeliveryPhaseInput {
        DeliveryPhaseInput {
            project_id: tree.project_id.clone(),
            phase: kind,
            status,
            start_date: date(2024, 3, 1),
            responsible_id: None,
            observations: String::new(),
            documents: vec!["https://cdn/pv.pdf".to_string()],
        }
    }

    fn correction_input(tree: &PlanTree, phase_id: &str, observations: &str) -> CorrectionInput {
        CorrectionInput {
            delivery_phase_id: phase_id.to_string(),
            correction_date: date(2024, 3, 5),
            boq_item_id: tree.boq_item_id.clone(),
            task_definition_id: None,
            status: CorrectionStatus::NotOk,
            observations: observations.to_string(),
            photos: vec![],
            corrector_id: Some("u-1".to_string()),
        }
    }

    #[test]
    fn test_phase_is_unique_per_project() {
        let tree = plan_tree();
        let api = api(&tree);
        api.create_phase(phase_input(&tree, DeliveryPhaseKind::TechnicalVisit, None))
            .unwrap();
        let err = api
            .create_phase(phase_input(&tree, DeliveryPhaseKind::TechnicalVisit, None))
            .unwrap_err();
        assert!(matches!(err, ApiError::ConstraintViolation(_)));
        api.create_phase(phase_input(&tree, DeliveryPhaseKind::ReportWriting, None))
            .unwrap();
        assert_eq!(api.list_phases(&tree.project_id).unwrap().len(), 2);
    }

    #[test]
    fn test_advance_phase_is_forward_only() {
        let tree = plan_tree();
        let api = api(&tree);
        let phase = api
            .create_phase(phase_input(
                &tree,
                DeliveryPhaseKind::EnvironmentControl,
                Some(PhaseStatus::NotStarted),
            ))
            .unwrap();

        let p = api.advance_phase(&phase.id, date(2024, 3, 2)).unwrap();
        assert_eq!(p.status, PhaseStatus::InProgress);
        assert_eq!(p.end_date, None);

        let p = api.advance_phase(&phase.id, date(2024, 3, 9)).unwrap();
        assert_eq!(p.status, PhaseStatus::Done);
        assert_eq!(p.end_date, Some(date(2024, 3, 9)));

        assert!(matches!(
            api.advance_phase(&phase.id, date(2024, 3, 10)),
            Err(ApiError::InvalidStateTransition { .. })
        ));

        // 自由设置可回退,结束日期随之清空
        let p = api
            .set_phase_status(&phase.id, PhaseStatus::InProgress, date(2024, 3, 11))
            .unwrap();
        assert_eq!(p.status, PhaseStatus::InProgress);
        assert_eq!(p.end_date, None);
    }

    #[test]
    fn test_correction_requires_observations() {
        let tree = plan_tree();
        let api = api(&tree);
        let phase = api
            .create_phase(phase_input(&tree, DeliveryPhaseKind::TechnicalVisit, None))
            .unwrap();

        assert!(matches!(
            api.create_correction(correction_input(&tree, &phase.id, "   ")),
            Err(ApiError::ValidationError(_))
        ));

        let mut bad_item = correction_input(&tree, &phase.id, "Boîtier mal fixé");
        bad_item.boq_item_id = "bi-missing".to_string();
        assert!(matches!(api.create_correction(bad_item), Err(ApiError::ReferenceError(_))));

        let c = api
            .create_correction(correction_input(&tree, &phase.id, "Boîtier mal fixé"))
            .unwrap();
        assert_eq!(c.task_definition_id, None);
        assert_eq!(api.corrections_count(&phase.id).unwrap(), 1);

        let mut fixed = correction_input(&tree, &phase.id, "Boîtier refixé");
        fixed.status = CorrectionStatus::Ok;
        fixed.task_definition_id = Some(tree.task_definition_id.clone());
        let updated = api.update_correction(&c.id, fixed).unwrap();
        assert_eq!(updated.status, CorrectionStatus::Ok);

        let views = api.list_phases(&tree.project_id).unwrap();
        assert_eq!(views[0].corrections_count, 1);
        assert_eq!(views[0].documents_count, 1);
        assert_eq!(api.list_corrections_by_project(&tree.project_id).unwrap().len(), 1);
    }

    #[test]
    fn test_correction_phase_lookup_keeps_storage_errors() {
        let tree = plan_tree();
        let api = api(&tree);

        assert!(matches!(
            api.create_correction(correction_input(&tree, "dp-missing", "Boîtier mal fixé")),
            Err(ApiError::ReferenceError(_))
        ));

        // 存储层故障不应被伪装成引用错误
        tree.conn
            .lock()
            .unwrap()
            .execute_batch("DROP TABLE correction; DROP TABLE delivery_phase;")
            .unwrap();
        assert!(matches!(
            api.create_correction(correction_input(&tree, "dp-missing", "Boîtier mal fixé")),
            Err(ApiError::DatabaseError(_))
        ));
    }
}
