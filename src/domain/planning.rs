// ==========================================
// 光纤部署监理系统 - 计划领域模型
// ==========================================
// ProjectPlanning: 项目 × BOQ 条目 的计划工作量
// TaskPlanning:    计划工作量分解后的任务
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::TaskStatus;

// ==========================================
// ProjectPlanning - 工作项计划
// ==========================================
// 不变量: (project_id, boq_item_id) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPlanning {
    pub id: String,
    pub project_id: String,
    pub boq_item_id: String,
    pub unit_value: i32,              // 单位倍数 (1 / 100 ...), >= 1
    pub planned_quantity: Decimal,    // > 0
    pub deadline_days: i32,           // >= 1
    pub display_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// TaskPlanning - 任务计划
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPlanning {
    pub id: String,
    pub project_planning_id: String,
    pub task_definition_id: String,
    pub unit_value: i32,
    pub planned_quantity: Decimal,
    pub deadline_days: i32,
    pub planned_start: NaiveDate,
    pub planned_end: NaiveDate,
    pub actual_start: Option<NaiveDate>,
    pub actual_end: Option<NaiveDate>,
    pub status: TaskStatus,
    pub display_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TaskPlanning {
    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}
