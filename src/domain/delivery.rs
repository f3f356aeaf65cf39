// ==========================================
// 光纤部署监理系统 - 交付流程领域模型
// ==========================================
// DeliveryPhase: (project_id, phase) 唯一
// Correction:    挂在阶段下的整改记录
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::types::{CorrectionStatus, DeliveryPhaseKind, PhaseStatus};

// ==========================================
// DeliveryPhase - 交付阶段
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPhase {
    pub id: String,
    pub project_id: String,
    pub phase: DeliveryPhaseKind,
    pub status: PhaseStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub responsible_id: Option<String>,
    pub observations: String,
    pub documents: Vec<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DeliveryPhase {
    pub fn documents_count(&self) -> usize {
        self.documents.len()
    }
}

// ==========================================
// Correction - 整改记录
// ==========================================
// observations 必填; task_definition_id 可选 (可只定位到工作项)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub id: String,
    pub delivery_phase_id: String,
    pub correction_date: NaiveDate,
    pub boq_item_id: String,
    pub task_definition_id: Option<String>,
    pub status: CorrectionStatus,
    pub observations: String,
    pub photos: Vec<String>,
    pub corrector_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Correction {
    pub fn photos_count(&self) -> usize {
        self.photos.len()
    }
}
