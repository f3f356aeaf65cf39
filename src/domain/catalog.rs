// ==========================================
// 光纤部署监理系统 - 参考数据 (目录) 领域模型
// ==========================================
// 运营商 / BOQ 类别 / BOQ 条目 / 任务定义 / 分包商
// 只读查询为主,供计划层取单价/KPI/计量单位
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::Unit;

// ==========================================
// Operator - 电信运营商
// ==========================================
// 每个运营商拥有自己的 BOQ 价目表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    pub id: String,
    pub code: String,              // 唯一代码 (ORA/MOV)
    pub name: String,
    pub color: String,             // 品牌色 (#RRGGBB)
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub is_active: bool,           // 软停用,不物理删除
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// BoqCategory - BOQ 工程类别
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqCategory {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

// ==========================================
// BoqItem - BOQ 条目 (计价工作项)
// ==========================================
// 不变量: (operator_id, code) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqItem {
    pub id: String,
    pub operator_id: String,
    pub category_id: String,
    pub code: String,
    pub label: String,
    pub unit: Unit,
    pub unit_price: Decimal,       // 单价 >= 0, 两位小数
    pub description: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// TaskDefinition - 任务定义
// ==========================================
// 一个任务可服务多个 BOQ 条目 (多对多,见 task_definition_boq_item)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    pub code: String,              // 全局唯一
    pub label: String,
    pub unit: Unit,
    pub kpi: Decimal,              // 日产能 (数量/天), > 0
    pub description: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

// ==========================================
// Subcontractor - 分包商
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subcontractor {
    pub id: String,
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub main_contact_name: String,
    pub main_contact_phone: String,
    pub specialities: String,
    pub trade_register_number: String,
    pub is_active: bool,
    pub collaboration_start: Option<NaiveDate>,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
