// ==========================================
// 光纤部署监理系统 - 核心库
// ==========================================
// 范围: 目录 / 项目计划 / 执行台账 / 交付流程 / 测绘 / 人员层级 / 施工人员
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 进度 / 延期 / 层级 / 工龄
pub mod engine;

// 导入层 - BOQ 价目表
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// 性能追踪 (慢 SQL / 操作耗时)
pub mod perf;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CorrectionStatus, DeliveryPhaseKind, InfrastructureType, PhaseStatus, ProfileRole,
    ProjectStatus, ProjectType, SkillLevel, TaskStatus, Unit,
};

// 领域实体
pub use domain::{
    BoqCategory, BoqItem, CartographyPoint, Correction, DailyReport, DeliveryGates,
    DeliveryPhase, Operator, Profile, Project, ProjectPlanning, Speciality, Subcontractor,
    TaskDefinition, TaskPlanning, Technician,
};

// 引擎
pub use engine::{DelayEngine, HierarchyEngine, ProgressEngine, SeniorityEngine};

// API
pub use api::{
    ApiError, ApiResult, CartographyApi, CatalogApi, DeliveryApi, PlanningApi, ProfileApi,
    ProjectApi, ReportApi, WorkforceApi,
};

pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "光纤部署监理系统";
