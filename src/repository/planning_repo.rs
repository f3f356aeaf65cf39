// ==========================================
// 光纤部署监理系统 - 计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 进度/延期不落库,读时由 engine 计算
// ==========================================

mod project_planning;
mod task_planning;

pub use project_planning::ProjectPlanningRepository;
pub use task_planning::{TaskPlanningRepository, TaskStatusChange};
