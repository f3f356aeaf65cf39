// ==========================================
// 光纤部署监理系统 - 施工人员 (技术员与专业)
// ==========================================
// 技术员没有登录账号,与 Profile 无关联
// 专业被技术员引用 (RESTRICT),只做软停用
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::SkillLevel;

// ==========================================
// Speciality - 技术专业
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speciality {
    pub id: String,
    pub code: String,              // 唯一代码 (GC/FO/SOUDURE)
    pub name: String,
    pub description: String,
    pub color: String,             // #RRGGBB
    pub is_active: bool,
    pub display_order: i64,        // 列表按 (display_order, name) 排序
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// Technician - 现场技术员
// ==========================================
// 不变量: matricule 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technician {
    pub id: String,
    pub matricule: String,
    pub last_name: String,
    pub first_names: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub speciality_id: Option<String>,
    pub skill_level: SkillLevel,
    pub hire_date: NaiveDate,
    pub birth_date: Option<NaiveDate>,
    pub national_id_number: String,
    pub is_site_lead: bool,        // 工地负责人
    pub certifications: String,
    pub equipment: Vec<String>,    // 已配发设备
    pub is_active: bool,
    pub notes: String,
    pub photo: Option<String>,     // 照片 URL
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Technician {
    /// 全名: "Prénoms NOM"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_name.to_uppercase())
    }
}

/// 技术员列表过滤条件 (None 表示不过滤)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicianFilter {
    pub speciality_id: Option<String>,
    pub skill_level: Option<SkillLevel>,
    pub is_site_lead: Option<bool>,
    pub is_active: Option<bool>,
}
