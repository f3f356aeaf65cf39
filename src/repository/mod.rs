// ==========================================
// 光纤部署监理系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
//       唯一性由数据库唯一索引裁决,不依赖应用侧预检查
// ==========================================

pub mod boq_repo;
pub mod cartography_repo;
pub mod daily_report_repo;
pub mod delivery_repo;
pub mod error;
pub mod operator_repo;
pub mod planning_repo;
pub mod profile_repo;
pub mod project_repo;
pub mod row_utils;
pub mod subcontractor_repo;
pub mod task_definition_repo;
pub mod workforce_repo;

#[cfg(test)]
pub(crate) mod test_fixtures;

// 重导出核心仓储
pub use boq_repo::{BoqCategoryRepository, BoqItemFilter, BoqItemRepository};
pub use cartography_repo::CartographyRepository;
pub use daily_report_repo::DailyReportRepository;
pub use delivery_repo::{CorrectionRepository, DeliveryPhaseRepository};
pub use error::{RepositoryError, RepositoryResult};
pub use operator_repo::{OperatorRepository, UpsertOutcome};
pub use planning_repo::{ProjectPlanningRepository, TaskPlanningRepository, TaskStatusChange};
pub use profile_repo::ProfileRepository;
pub use project_repo::{ProjectRepository, StatusChange};
pub use subcontractor_repo::SubcontractorRepository;
pub use task_definition_repo::TaskDefinitionRepository;
pub use workforce_repo::{SpecialityRepository, TechnicianRepository};
