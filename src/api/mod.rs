// ==========================================
// 光纤部署监理系统 - API 层
// ==========================================
// 职责: 输入校验、调用仓储与引擎、组装读模型、错误分类
// ==========================================

pub mod catalog_api;
pub mod cartography_api;
pub mod delivery_api;
pub mod error;
pub mod planning_api;
pub mod profile_api;
pub mod project_api;
pub mod report_api;
pub mod validator;
pub mod workforce_api;

use chrono::NaiveDateTime;

// 重导出核心类型
pub use catalog_api::{CatalogApi, SeedSummary};
pub use cartography_api::{CartographyApi, CartographyPointInput};
pub use delivery_api::{CorrectionInput, DeliveryApi, DeliveryPhaseDetails, DeliveryPhaseInput, PhaseView};
pub use error::{ApiError, ApiResult};
pub use planning_api::{PlanningApi, PlanningProgress};
pub use profile_api::{ProfileApi, ProfileInput, SubordinatesView};
pub use project_api::{ProjectApi, ProjectInput, ProjectStatistics, ProjectView};
pub use report_api::{DailyReportInput, DailyReportUpdate, ReportApi, ReportView};
pub use workforce_api::{
    SpecialityInput, SpecialityView, TechnicianInput, TechnicianView, WorkforceApi,
};

/// 新实体 id (UUID v4)
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 写入时间戳 (本地时间)
pub(crate) fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}
