// ==========================================
// 光纤部署监理系统 - 目录 (参考数据) API
// ==========================================
// 职责: 运营商 / BOQ 类别 / BOQ 条目 / 任务定义 / 分包商的维护与查询
// 红线: 唯一性由存储层裁决,API 只做数值/文本校验与错误归类
// ==========================================

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{
    normalize_fixed, require_hex_color, require_non_blank, require_non_negative, require_positive,
    KPI_MAX_DIGITS, PRICE_MAX_DIGITS,
};
use crate::api::{new_id, now};
use crate::domain::catalog::{BoqCategory, BoqItem, Operator, Subcontractor, TaskDefinition};
use crate::domain::types::Unit;
use crate::repository::{
    BoqCategoryRepository, BoqItemFilter, BoqItemRepository, OperatorRepository,
    SubcontractorRepository, TaskDefinitionRepository, UpsertOutcome,
};
use chrono::NaiveDate;

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorInput {
    pub code: String,
    pub name: String,
    pub color: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoqCategoryInput {
    pub code: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItemInput {
    pub operator_id: String,
    pub category_id: String,
    pub code: String,
    pub label: String,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub description: String,
}

/// BOQ 条目可变字段 (operator/code 构成唯一键,不允许修改)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItemUpdate {
    pub category_id: String,
    pub label: String,
    pub unit: Unit,
    pub unit_price: Decimal,
    pub description: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinitionInput {
    pub code: String,
    pub label: String,
    pub unit: Unit,
    pub kpi: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubcontractorInput {
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub main_contact_name: String,
    pub main_contact_phone: String,
    pub specialities: String,
    pub trade_register_number: String,
    pub collaboration_start: Option<NaiveDate>,
    pub notes: String,
}

// ==========================================
// 读模型
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorView {
    #[serde(flatten)]
    pub operator: Operator,
    /// 计划中/进行中/交付中 的项目数
    pub active_projects_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqCategoryView {
    #[serde(flatten)]
    pub category: BoqCategory,
    pub items_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoqItemView {
    #[serde(flatten)]
    pub item: BoqItem,
    pub tasks_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinitionView {
    #[serde(flatten)]
    pub definition: TaskDefinition,
    pub boq_items_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcontractorView {
    #[serde(flatten)]
    pub subcontractor: Subcontractor,
    pub active_projects_count: usize,
}

/// 运营商初始化结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub created: usize,
    pub updated: usize,
}

impl SeedSummary {
    pub fn from_outcomes(outcomes: &[UpsertOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut acc, o| {
            match o {
                UpsertOutcome::Created => acc.created += 1,
                UpsertOutcome::Updated => acc.updated += 1,
            }
            acc
        })
    }
}

/// 内置运营商
pub fn default_operators() -> Vec<OperatorInput> {
    vec![
        OperatorInput {
            code: "ORA".to_string(),
            name: "Orange CI".to_string(),
            color: "#FF7900".to_string(),
            contact_name: "Service Technique Orange".to_string(),
            contact_email: "technique@orange.ci".to_string(),
            contact_phone: "+225 07 08 09 10 11".to_string(),
        },
        OperatorInput {
            code: "MOV".to_string(),
            name: "Moov Africa".to_string(),
            color: "#00A9E0".to_string(),
            contact_name: "Service Technique Moov".to_string(),
            contact_email: "technique@moov.ci".to_string(),
            contact_phone: "+225 05 04 03 02 01".to_string(),
        },
    ]
}

// ==========================================
// CatalogApi - 目录 API
// ==========================================
pub struct CatalogApi {
    operator_repo: Arc<OperatorRepository>,
    category_repo: Arc<BoqCategoryRepository>,
    item_repo: Arc<BoqItemRepository>,
    task_definition_repo: Arc<TaskDefinitionRepository>,
    subcontractor_repo: Arc<SubcontractorRepository>,
}

impl CatalogApi {
    pub fn new(
        operator_repo: Arc<OperatorRepository>,
        category_repo: Arc<BoqCategoryRepository>,
        item_repo: Arc<BoqItemRepository>,
        task_definition_repo: Arc<TaskDefinitionRepository>,
        subcontractor_repo: Arc<SubcontractorRepository>,
    ) -> Self {
        Self {
            operator_repo,
            category_repo,
            item_repo,
            task_definition_repo,
            subcontractor_repo,
        }
    }

    // ==========================================
    // 运营商
    // ==========================================

    fn build_operator(input: &OperatorInput) -> ApiResult<Operator> {
        let ts = now();
        Ok(Operator {
            id: new_id(),
            code: require_non_blank("运营商代码", &input.code)?,
            name: require_non_blank("运营商名称", &input.name)?,
            color: require_hex_color(&input.color)?,
            contact_name: input.contact_name.trim().to_string(),
            contact_email: input.contact_email.trim().to_string(),
            contact_phone: input.contact_phone.trim().to_string(),
            is_active: true,
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn create_operator(&self, input: OperatorInput) -> ApiResult<Operator> {
        let op = Self::build_operator(&input)?;
        self.operator_repo.insert(&op).map_err(|e| {
            warn!(code = %op.code, error = %e, "运营商创建失败");
            ApiError::from(e)
        })?;
        info!(operator_id = %op.id, code = %op.code, "运营商已创建");
        Ok(op)
    }

    /// 更新运营商 (code 可改,冲突时 ConstraintViolation)
    pub fn update_operator(&self, id: &str, input: OperatorInput) -> ApiResult<Operator> {
        let current = self.get_operator(id)?;
        let built = Self::build_operator(&input)?;
        let op = Operator {
            id: current.id,
            is_active: current.is_active,
            created_at: current.created_at,
            ..built
        };
        self.operator_repo.update(&op)?;
        info!(operator_id = %op.id, "运营商已更新");
        Ok(op)
    }

    pub fn get_operator(&self, id: &str) -> ApiResult<Operator> {
        self.operator_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Operator", id))
    }

    /// 软停用 / 重新启用
    pub fn set_operator_active(&self, id: &str, active: bool) -> ApiResult<()> {
        self.operator_repo.set_active(id, active, now())?;
        info!(operator_id = %id, active, "运营商启用状态已变更");
        Ok(())
    }

    pub fn list_operators(&self) -> ApiResult<Vec<OperatorView>> {
        let operators = self.operator_repo.list_all()?;
        self.with_operator_counts(operators)
    }

    pub fn list_active_operators(&self) -> ApiResult<Vec<OperatorView>> {
        let operators = self.operator_repo.list_active()?;
        self.with_operator_counts(operators)
    }

    fn with_operator_counts(&self, operators: Vec<Operator>) -> ApiResult<Vec<OperatorView>> {
        operators
            .into_iter()
            .map(|operator| {
                let active_projects_count = self.operator_repo.count_active_projects(&operator.id)?;
                Ok(OperatorView {
                    operator,
                    active_projects_count,
                })
            })
            .collect()
    }

    /// 写入内置运营商 (ORA / MOV),已存在则按 code 覆盖
    ///
    /// 单事务执行,重复调用结果一致
    pub fn seed_default_operators(&self) -> ApiResult<SeedSummary> {
        let operators = default_operators()
            .iter()
            .map(Self::build_operator)
            .collect::<ApiResult<Vec<_>>>()?;
        let outcomes = self.operator_repo.upsert_batch_by_code(&operators)?;
        let summary = SeedSummary::from_outcomes(&outcomes);
        info!(created = summary.created, updated = summary.updated, "内置运营商初始化完成");
        Ok(summary)
    }

    // ==========================================
    // BOQ 类别
    // ==========================================

    pub fn create_category(&self, input: BoqCategoryInput) -> ApiResult<BoqCategory> {
        let category = BoqCategory {
            id: new_id(),
            code: require_non_blank("类别代码", &input.code)?,
            name: require_non_blank("类别名称", &input.name)?,
            description: input.description.trim().to_string(),
            is_active: true,
            created_at: now(),
        };
        self.category_repo.insert(&category)?;
        info!(category_id = %category.id, code = %category.code, "BOQ 类别已创建");
        Ok(category)
    }

    pub fn list_categories(&self) -> ApiResult<Vec<BoqCategoryView>> {
        self.category_repo
            .list_all()?
            .into_iter()
            .map(|category| {
                let items_count = self.category_repo.count_items(&category.id)?;
                Ok(BoqCategoryView { category, items_count })
            })
            .collect()
    }

    // ==========================================
    // BOQ 条目
    // ==========================================

    /// 创建 BOQ 条目
    ///
    /// # 错误
    /// - ValidationError: 单价为负或超出定点上限、文本为空
    /// - ReferenceError: 运营商/类别不存在或已停用
    /// - ConstraintViolation: 同一运营商下 code 重复
    pub fn create_boq_item(&self, input: BoqItemInput) -> ApiResult<BoqItem> {
        let unit_price = normalize_price(input.unit_price)?;
        self.require_active_operator(&input.operator_id)?;
        self.require_active_category(&input.category_id)?;

        let ts = now();
        let item = BoqItem {
            id: new_id(),
            operator_id: input.operator_id,
            category_id: input.category_id,
            code: require_non_blank("BOQ 代码", &input.code)?,
            label: require_non_blank("BOQ 名称", &input.label)?,
            unit: input.unit,
            unit_price,
            description: input.description.trim().to_string(),
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };

        self.item_repo.insert(&item).map_err(|e| {
            warn!(operator_id = %item.operator_id, code = %item.code, error = %e, "BOQ 条目创建失败");
            ApiError::from(e)
        })?;
        info!(boq_item_id = %item.id, code = %item.code, "BOQ 条目已创建");
        Ok(item)
    }

    pub fn update_boq_item(&self, id: &str, update: BoqItemUpdate) -> ApiResult<BoqItem> {
        let unit_price = normalize_price(update.unit_price)?;
        let current = self.get_boq_item(id)?;
        if current.category_id != update.category_id {
            self.require_active_category(&update.category_id)?;
        }

        let item = BoqItem {
            category_id: update.category_id,
            label: require_non_blank("BOQ 名称", &update.label)?,
            unit: update.unit,
            unit_price,
            description: update.description.trim().to_string(),
            is_active: update.is_active,
            updated_at: now(),
            ..current
        };
        self.item_repo.update(&item)?;
        info!(boq_item_id = %item.id, "BOQ 条目已更新");
        Ok(item)
    }

    pub fn get_boq_item(&self, id: &str) -> ApiResult<BoqItem> {
        self.item_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("BoqItem", id))
    }

    pub fn list_boq_items(&self, filter: &BoqItemFilter) -> ApiResult<Vec<BoqItemView>> {
        self.item_repo
            .list(filter)?
            .into_iter()
            .map(|item| {
                let tasks_count = self.item_repo.count_tasks(&item.id)?;
                Ok(BoqItemView { item, tasks_count })
            })
            .collect()
    }

    /// 删除 BOQ 条目 (被计划/整改引用时 ReferenceError)
    pub fn delete_boq_item(&self, id: &str) -> ApiResult<()> {
        self.item_repo.delete(id).map_err(|e| {
            warn!(boq_item_id = %id, error = %e, "BOQ 条目删除被拒绝");
            ApiError::from(e)
        })?;
        info!(boq_item_id = %id, "BOQ 条目已删除");
        Ok(())
    }

    // ==========================================
    // 任务定义
    // ==========================================

    pub fn create_task_definition(&self, input: TaskDefinitionInput) -> ApiResult<TaskDefinition> {
        let kpi = normalize_kpi(input.kpi)?;
        let def = TaskDefinition {
            id: new_id(),
            code: require_non_blank("任务代码", &input.code)?,
            label: require_non_blank("任务名称", &input.label)?,
            unit: input.unit,
            kpi,
            description: input.description.trim().to_string(),
            is_active: true,
            created_at: now(),
        };
        self.task_definition_repo.insert(&def)?;
        info!(task_definition_id = %def.id, code = %def.code, "任务定义已创建");
        Ok(def)
    }

    pub fn update_task_definition(
        &self,
        id: &str,
        input: TaskDefinitionInput,
        is_active: bool,
    ) -> ApiResult<TaskDefinition> {
        let kpi = normalize_kpi(input.kpi)?;
        let current = self.get_task_definition(id)?;
        let def = TaskDefinition {
            code: require_non_blank("任务代码", &input.code)?,
            label: require_non_blank("任务名称", &input.label)?,
            unit: input.unit,
            kpi,
            description: input.description.trim().to_string(),
            is_active,
            ..current
        };
        self.task_definition_repo.update(&def)?;
        info!(task_definition_id = %def.id, "任务定义已更新");
        Ok(def)
    }

    pub fn get_task_definition(&self, id: &str) -> ApiResult<TaskDefinition> {
        self.task_definition_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("TaskDefinition", id))
    }

    pub fn list_task_definitions(&self, active_only: bool) -> ApiResult<Vec<TaskDefinitionView>> {
        self.task_definition_repo
            .list(active_only)?
            .into_iter()
            .map(|definition| {
                let boq_items_count = self.task_definition_repo.count_boq_items(&definition.id)?;
                Ok(TaskDefinitionView {
                    definition,
                    boq_items_count,
                })
            })
            .collect()
    }

    /// 关联任务定义与 BOQ 条目 (重复关联无副作用)
    pub fn link_boq_item(&self, task_definition_id: &str, boq_item_id: &str) -> ApiResult<()> {
        self.get_task_definition(task_definition_id)?;
        self.get_boq_item(boq_item_id)?;
        self.task_definition_repo
            .link_boq_item(task_definition_id, boq_item_id)?;
        info!(task_definition_id, boq_item_id, "任务定义已关联 BOQ 条目");
        Ok(())
    }

    /// 解除关联,返回是否存在过该关联
    pub fn unlink_boq_item(&self, task_definition_id: &str, boq_item_id: &str) -> ApiResult<bool> {
        let removed = self
            .task_definition_repo
            .unlink_boq_item(task_definition_id, boq_item_id)?;
        info!(task_definition_id, boq_item_id, removed, "任务定义解除 BOQ 关联");
        Ok(removed)
    }

    pub fn list_boq_items_for_task(&self, task_definition_id: &str) -> ApiResult<Vec<BoqItem>> {
        Ok(self.task_definition_repo.list_boq_items(task_definition_id)?)
    }

    pub fn list_tasks_for_boq_item(&self, boq_item_id: &str) -> ApiResult<Vec<TaskDefinition>> {
        Ok(self.task_definition_repo.list_for_boq_item(boq_item_id)?)
    }

    // ==========================================
    // 分包商
    // ==========================================

    fn build_subcontractor(input: SubcontractorInput) -> ApiResult<Subcontractor> {
        let ts = now();
        Ok(Subcontractor {
            id: new_id(),
            code: require_non_blank("分包商代码", &input.code)?,
            name: require_non_blank("分包商名称", &input.name)?,
            address: input.address.trim().to_string(),
            phone: input.phone.trim().to_string(),
            email: input.email.trim().to_string(),
            main_contact_name: input.main_contact_name.trim().to_string(),
            main_contact_phone: input.main_contact_phone.trim().to_string(),
            specialities: input.specialities.trim().to_string(),
            trade_register_number: input.trade_register_number.trim().to_string(),
            is_active: true,
            collaboration_start: input.collaboration_start,
            notes: input.notes.trim().to_string(),
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn create_subcontractor(&self, input: SubcontractorInput) -> ApiResult<Subcontractor> {
        let s = Self::build_subcontractor(input)?;
        self.subcontractor_repo.insert(&s)?;
        info!(subcontractor_id = %s.id, code = %s.code, "分包商已创建");
        Ok(s)
    }

    pub fn update_subcontractor(&self, id: &str, input: SubcontractorInput) -> ApiResult<Subcontractor> {
        let current = self.get_subcontractor(id)?;
        let built = Self::build_subcontractor(input)?;
        let s = Subcontractor {
            id: current.id,
            is_active: current.is_active,
            created_at: current.created_at,
            ..built
        };
        self.subcontractor_repo.update(&s)?;
        info!(subcontractor_id = %s.id, "分包商已更新");
        Ok(s)
    }

    pub fn get_subcontractor(&self, id: &str) -> ApiResult<Subcontractor> {
        self.subcontractor_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Subcontractor", id))
    }

    pub fn set_subcontractor_active(&self, id: &str, active: bool) -> ApiResult<()> {
        self.subcontractor_repo.set_active(id, active, now())?;
        info!(subcontractor_id = %id, active, "分包商启用状态已变更");
        Ok(())
    }

    pub fn list_subcontractors(&self, active_only: bool) -> ApiResult<Vec<SubcontractorView>> {
        self.subcontractor_repo
            .list(active_only)?
            .into_iter()
            .map(|subcontractor| {
                let active_projects_count = self
                    .subcontractor_repo
                    .count_active_projects(&subcontractor.id)?;
                Ok(SubcontractorView {
                    subcontractor,
                    active_projects_count,
                })
            })
            .collect()
    }

    pub fn list_active_subcontractors(&self) -> ApiResult<Vec<SubcontractorView>> {
        self.list_subcontractors(true)
    }

    // ==========================================
    // 引用检查
    // ==========================================

    fn require_active_operator(&self, id: &str) -> ApiResult<Operator> {
        match self.operator_repo.find_by_id(id)? {
            Some(op) if op.is_active => Ok(op),
            Some(_) => Err(ApiError::ReferenceError(format!("运营商已停用: {}", id))),
            None => Err(ApiError::ReferenceError(format!("运营商不存在: {}", id))),
        }
    }

    fn require_active_category(&self, id: &str) -> ApiResult<BoqCategory> {
        match self.category_repo.find_by_id(id)? {
            Some(c) if c.is_active => Ok(c),
            Some(_) => Err(ApiError::ReferenceError(format!("BOQ 类别已停用: {}", id))),
            None => Err(ApiError::ReferenceError(format!("BOQ 类别不存在: {}", id))),
        }
    }
}

/// 单价: 2 位小数,非负
pub(crate) fn normalize_price(price: Decimal) -> ApiResult<Decimal> {
    let price = normalize_fixed("单价", price, PRICE_MAX_DIGITS)?;
    require_non_negative("单价", price)?;
    Ok(price)
}

/// KPI: 2 位小数,严格为正
fn normalize_kpi(kpi: Decimal) -> ApiResult<Decimal> {
    let kpi = normalize_fixed("KPI", kpi, KPI_MAX_DIGITS)?;
    require_positive("KPI", kpi)?;
    Ok(kpi)
}
