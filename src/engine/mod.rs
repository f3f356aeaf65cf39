// ==========================================
// 光纤部署监理系统 - 引擎层
// ==========================================
// 职责: 进度汇总 / 延期判定 / 层级遍历 / 年龄工龄
// 红线: Engine 不拼 SQL,不读系统时钟 (today 由调用方传入)
// ==========================================

pub mod delay;
pub mod hierarchy;
pub mod progress;
pub mod seniority;

// 重导出核心引擎
pub use delay::DelayEngine;
pub use hierarchy::{HierarchyEngine, SubordinateWalk, SuperiorCheck};
pub use progress::{ProgressEngine, ProjectRollup, TaskProgress};
pub use seniority::SeniorityEngine;
