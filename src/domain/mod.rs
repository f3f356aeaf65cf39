// ==========================================
// 光纤部署监理系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod cartography;
pub mod catalog;
pub mod delivery;
pub mod planning;
pub mod profile;
pub mod project;
pub mod report;
pub mod types;
pub mod workforce;

// 重导出核心类型
pub use cartography::CartographyPoint;
pub use catalog::{BoqCategory, BoqItem, Operator, Subcontractor, TaskDefinition};
pub use delivery::{Correction, DeliveryPhase};
pub use planning::{ProjectPlanning, TaskPlanning};
pub use profile::Profile;
pub use project::{DeliveryGates, DeliveryGatesPatch, Project, ProjectFilter};
pub use report::DailyReport;
pub use types::{
    CorrectionStatus, DeliveryPhaseKind, InfrastructureType, PhaseStatus, ProfileRole,
    ProjectStatus, ProjectType, SkillLevel, TaskStatus, Unit,
};
pub use workforce::{Speciality, Technician, TechnicianFilter};
