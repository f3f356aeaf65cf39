// ==========================================
// 光纤部署监理系统 - 施工人员 API
// ==========================================
// 职责: 技术专业与现场技术员的维护与查询
// 年龄/工龄按调用方传入的 today 计算
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::catalog_api::SeedSummary;
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{blank_to_none, require_hex_color, require_non_blank};
use crate::api::{new_id, now};
use crate::domain::types::SkillLevel;
use crate::domain::workforce::{Speciality, Technician, TechnicianFilter};
use crate::engine::SeniorityEngine;
use crate::repository::{SpecialityRepository, TechnicianRepository};

const DEFAULT_SPECIALITY_COLOR: &str = "#000000";

// ==========================================
// 输入 DTO
// ==========================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialityInput {
    pub code: String,
    pub name: String,
    pub description: String,
    /// 为空时取 #000000
    pub color: String,
    pub display_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianInput {
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
    pub is_site_lead: bool,
    pub certifications: String,
    pub equipment: Vec<String>,
    pub notes: String,
    pub photo: Option<String>,
}

// ==========================================
// 读模型
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialityView {
    #[serde(flatten)]
    pub speciality: Speciality,
    /// 在职技术员数
    pub technicians_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianView {
    #[serde(flatten)]
    pub technician: Technician,
    pub full_name: String,
    pub speciality_name: Option<String>,
    pub speciality_color: Option<String>,
    pub age: Option<i32>,
    pub seniority_years: i32,
}

/// 内置专业 (按 display_order 排列)
pub fn default_specialities() -> Vec<SpecialityInput> {
    [
        ("GC", "Génie Civil", "Travaux de génie civil : tranchées, chambres, fourreaux", "#8B4513"),
        ("RESEAU", "Travaux de réseau", "Installation de câbles, pose aérienne et souterraine", "#4169E1"),
        ("FO", "Fibre Optique", "Installation et déploiement de fibre optique", "#FF8C00"),
        ("SOUDURE", "Soudure FO", "Soudure et raccordement de fibres optiques", "#DC143C"),
        ("MESURE", "Mesures et tests", "Tests de réflectométrie, mesures de perte, validation réseau", "#9370DB"),
        ("POLY", "Polyvalent", "Technicien polyvalent capable d'intervenir sur plusieurs domaines", "#32CD32"),
    ]
    .into_iter()
    .zip(1_i64..)
    .map(|((code, name, description, color), order)| SpecialityInput {
        code: code.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        color: color.to_string(),
        display_order: order,
    })
    .collect()
}

// ==========================================
// WorkforceApi - 施工人员 API
// ==========================================
pub struct WorkforceApi {
    speciality_repo: Arc<SpecialityRepository>,
    technician_repo: Arc<TechnicianRepository>,
    seniority: SeniorityEngine,
}

impl WorkforceApi {
    pub fn new(
        speciality_repo: Arc<SpecialityRepository>,
        technician_repo: Arc<TechnicianRepository>,
        seniority: SeniorityEngine,
    ) -> Self {
        Self {
            speciality_repo,
            technician_repo,
            seniority,
        }
    }

    // ==========================================
    // 专业
    // ==========================================

    fn build_speciality(input: &SpecialityInput) -> ApiResult<Speciality> {
        let color = match input.color.trim() {
            "" => DEFAULT_SPECIALITY_COLOR.to_string(),
            c => require_hex_color(c)?,
        };
        let ts = now();
        Ok(Speciality {
            id: new_id(),
            code: require_non_blank("专业代码", &input.code)?,
            name: require_non_blank("专业名称", &input.name)?,
            description: input.description.trim().to_string(),
            color,
            is_active: true,
            display_order: input.display_order,
            created_at: ts,
            updated_at: ts,
        })
    }

    pub fn create_speciality(&self, input: SpecialityInput) -> ApiResult<Speciality> {
        let s = Self::build_speciality(&input)?;
        self.speciality_repo.insert(&s).map_err(|e| {
            warn!(code = %s.code, error = %e, "专业创建失败");
            ApiError::from(e)
        })?;
        info!(speciality_id = %s.id, code = %s.code, "专业已创建");
        Ok(s)
    }

    /// 更新专业 (code 可改,冲突时 ConstraintViolation)
    pub fn update_speciality(&self, id: &str, input: SpecialityInput, is_active: bool) -> ApiResult<Speciality> {
        let current = self.get_speciality(id)?;
        let built = Self::build_speciality(&input)?;
        let s = Speciality {
            id: current.id,
            is_active,
            created_at: current.created_at,
            ..built
        };
        self.speciality_repo.update(&s)?;
        info!(speciality_id = %s.id, "专业已更新");
        Ok(s)
    }

    pub fn get_speciality(&self, id: &str) -> ApiResult<Speciality> {
        self.speciality_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Speciality", id))
    }

    pub fn set_speciality_active(&self, id: &str, active: bool) -> ApiResult<()> {
        self.speciality_repo.set_active(id, active, now())?;
        info!(speciality_id = %id, active, "专业启用状态已变更");
        Ok(())
    }

    /// 删除专业 (仍有技术员引用时 ReferenceError)
    pub fn delete_speciality(&self, id: &str) -> ApiResult<()> {
        self.speciality_repo.delete(id).map_err(|e| {
            warn!(speciality_id = %id, error = %e, "专业删除被拒绝");
            ApiError::from(e)
        })?;
        info!(speciality_id = %id, "专业已删除");
        Ok(())
    }

    pub fn list_specialities(&self, active_only: bool) -> ApiResult<Vec<SpecialityView>> {
        self.speciality_repo
            .list(active_only)?
            .into_iter()
            .map(|speciality| {
                let technicians_count = self
                    .speciality_repo
                    .count_active_technicians(&speciality.id)?;
                Ok(SpecialityView {
                    speciality,
                    technicians_count,
                })
            })
            .collect()
    }

    pub fn list_active_specialities(&self) -> ApiResult<Vec<SpecialityView>> {
        self.list_specialities(true)
    }

    /// 写入内置专业,已存在则按 code 覆盖并重新启用
    ///
    /// 单事务执行,重复调用结果一致
    pub fn seed_default_specialities(&self) -> ApiResult<SeedSummary> {
        let specialities = default_specialities()
            .iter()
            .map(Self::build_speciality)
            .collect::<ApiResult<Vec<_>>>()?;
        let outcomes = self.speciality_repo.upsert_batch_by_code(&specialities)?;
        let summary = SeedSummary::from_outcomes(&outcomes);
        info!(created = summary.created, updated = summary.updated, "内置专业初始化完成");
        Ok(summary)
    }

    // ==========================================
    // 技术员
    // ==========================================

    fn build_technician(input: TechnicianInput) -> ApiResult<Technician> {
        let ts = now();
        Ok(Technician {
            id: new_id(),
            matricule: require_non_blank("工号", &input.matricule)?,
            last_name: require_non_blank("姓", &input.last_name)?,
            first_names: require_non_blank("名", &input.first_names)?,
            phone: require_non_blank("电话", &input.phone)?,
            email: input.email.trim().to_string(),
            address: input.address.trim().to_string(),
            speciality_id: blank_to_none(input.speciality_id),
            skill_level: input.skill_level,
            hire_date: input.hire_date,
            birth_date: input.birth_date,
            national_id_number: input.national_id_number.trim().to_string(),
            is_site_lead: input.is_site_lead,
            certifications: input.certifications.trim().to_string(),
            equipment: input
                .equipment
                .into_iter()
                .filter_map(|e| blank_to_none(Some(e)))
                .collect(),
            is_active: true,
            notes: input.notes.trim().to_string(),
            photo: blank_to_none(input.photo),
            created_at: ts,
            updated_at: ts,
        })
    }

    /// 登记技术员
    ///
    /// # 错误
    /// - ValidationError: 工号/姓名/电话为空
    /// - ReferenceError: 专业不存在或已停用
    /// - ConstraintViolation: 工号重复
    pub fn create_technician(&self, input: TechnicianInput) -> ApiResult<Technician> {
        let t = Self::build_technician(input)?;
        if let Some(sid) = t.speciality_id.as_deref() {
            self.require_active_speciality(sid)?;
        }
        self.technician_repo.insert(&t).map_err(|e| {
            warn!(matricule = %t.matricule, error = %e, "技术员登记失败");
            ApiError::from(e)
        })?;
        info!(technician_id = %t.id, matricule = %t.matricule, "技术员已登记");
        Ok(t)
    }

    /// 更新技术员 (专业变更时才校验新专业的启用状态)
    pub fn update_technician(&self, id: &str, input: TechnicianInput, is_active: bool) -> ApiResult<Technician> {
        let current = self.get_technician(id)?;
        let built = Self::build_technician(input)?;
        if built.speciality_id != current.speciality_id {
            if let Some(sid) = built.speciality_id.as_deref() {
                self.require_active_speciality(sid)?;
            }
        }
        let t = Technician {
            id: current.id,
            is_active,
            created_at: current.created_at,
            ..built
        };
        self.technician_repo.update(&t)?;
        info!(technician_id = %t.id, "技术员已更新");
        Ok(t)
    }

    pub fn get_technician(&self, id: &str) -> ApiResult<Technician> {
        self.technician_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Technician", id))
    }

    pub fn get_technician_view(&self, id: &str, today: NaiveDate) -> ApiResult<TechnicianView> {
        let t = self.get_technician(id)?;
        let speciality = match t.speciality_id.as_deref() {
            Some(sid) => self.speciality_repo.find_by_id(sid)?,
            None => None,
        };
        Ok(self.to_view(t, speciality.as_ref(), today))
    }

    pub fn delete_technician(&self, id: &str) -> ApiResult<()> {
        self.technician_repo.delete(id)?;
        info!(technician_id = %id, "技术员已删除");
        Ok(())
    }

    pub fn list_technicians(&self, filter: &TechnicianFilter, today: NaiveDate) -> ApiResult<Vec<TechnicianView>> {
        let technicians = self.technician_repo.list(filter)?;
        let specialities: HashMap<String, Speciality> = self
            .speciality_repo
            .list(false)?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        Ok(technicians
            .into_iter()
            .map(|t| {
                let speciality = t.speciality_id.as_deref().and_then(|sid| specialities.get(sid));
                self.to_view(t, speciality, today)
            })
            .collect())
    }

    pub fn list_active_technicians(&self, today: NaiveDate) -> ApiResult<Vec<TechnicianView>> {
        let filter = TechnicianFilter {
            is_active: Some(true),
            ..TechnicianFilter::default()
        };
        self.list_technicians(&filter, today)
    }

    /// 某专业下的在职技术员
    ///
    /// # 错误
    /// - ValidationError: speciality_id 为空
    pub fn list_by_speciality(&self, speciality_id: &str, today: NaiveDate) -> ApiResult<Vec<TechnicianView>> {
        let speciality_id = require_non_blank("专业", speciality_id)?;
        let filter = TechnicianFilter {
            speciality_id: Some(speciality_id),
            is_active: Some(true),
            ..TechnicianFilter::default()
        };
        self.list_technicians(&filter, today)
    }

    fn to_view(&self, technician: Technician, speciality: Option<&Speciality>, today: NaiveDate) -> TechnicianView {
        TechnicianView {
            full_name: technician.full_name(),
            speciality_name: speciality.map(|s| s.name.clone()),
            speciality_color: speciality.map(|s| s.color.clone()),
            age: self.seniority.age(&technician, today),
            seniority_years: self.seniority.seniority(&technician, today),
            technician,
        }
    }

    fn require_active_speciality(&self, id: &str) -> ApiResult<Speciality> {
        match self.speciality_repo.find_by_id(id)? {
            Some(s) if s.is_active => Ok(s),
            Some(_) => Err(ApiError::ReferenceError(format!("专业已停用: {}", id))),
            None => Err(ApiError::ReferenceError(format!("专业不存在: {}", id))),
        }
    }
}
