// ==========================================
// 光纤部署监理系统 - 项目 (工地) 领域模型
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::{ProjectStatus, ProjectType};

// ==========================================
// DeliveryGates - 交付就绪开关
// ==========================================
// 四个开关相互独立,由调用方手工设置,不从交付阶段自动推导
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryGates {
    pub works_ok: bool,
    pub environment_ok: bool,
    pub technical_visit_ok: bool,
    pub report_ok: bool,
}

impl DeliveryGates {
    /// 四个开关是否全部就绪
    pub fn all_ok(&self) -> bool {
        self.works_ok && self.environment_ok && self.technical_visit_ok && self.report_ok
    }
}

/// 交付开关的部分更新 (None 表示保持不变)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryGatesPatch {
    pub works_ok: Option<bool>,
    pub environment_ok: Option<bool>,
    pub technical_visit_ok: Option<bool>,
    pub report_ok: Option<bool>,
}

impl DeliveryGatesPatch {
    pub fn is_empty(&self) -> bool {
        self.works_ok.is_none()
            && self.environment_ok.is_none()
            && self.technical_visit_ok.is_none()
            && self.report_ok.is_none()
    }

    /// 应用到已有开关
    pub fn apply(&self, gates: DeliveryGates) -> DeliveryGates {
        DeliveryGates {
            works_ok: self.works_ok.unwrap_or(gates.works_ok),
            environment_ok: self.environment_ok.unwrap_or(gates.environment_ok),
            technical_visit_ok: self.technical_visit_ok.unwrap_or(gates.technical_visit_ok),
            report_ok: self.report_ok.unwrap_or(gates.report_ok),
        }
    }
}

// ==========================================
// Project - 部署项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub code: String,                        // 唯一
    pub name: String,
    pub operator_id: String,
    pub project_type: ProjectType,
    pub zone: String,                        // 地理区域
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    pub actual_end_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub gates: DeliveryGates,
    pub supervisor_id: Option<String>,       // 监理 (不透明身份引用)
    pub operator_supervisor: String,         // 运营商侧监理姓名
    pub budget: Option<Decimal>,             // >= 0
    pub description: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// 项目列表过滤条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub operator_id: Option<String>,
    pub project_type: Option<ProjectType>,
    pub status: Option<ProjectStatus>,
    pub zone: Option<String>,
    pub supervisor_id: Option<String>,
}
