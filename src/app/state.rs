// ==========================================
// 光纤部署监理系统 - 应用状态
// ==========================================
// 职责: 一条共享连接注入全部 Repository,再组装 Engine 与 API
// 配置在启动时加载一次,之后只读
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{
    CartographyApi, CatalogApi, DeliveryApi, PlanningApi, ProfileApi, ProjectApi, ReportApi,
    WorkforceApi,
};
use crate::config::{AppConfig, ConfigManager};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::{HierarchyEngine, ProgressEngine, SeniorityEngine};
use crate::importer::BoqImporter;
use crate::perf::install_sqlite_tracing;
use crate::repository::{
    BoqCategoryRepository, BoqItemRepository, CartographyRepository, CorrectionRepository,
    DailyReportRepository, DeliveryPhaseRepository, OperatorRepository, ProfileRepository,
    ProjectPlanningRepository, ProjectRepository, SpecialityRepository, SubcontractorRepository,
    TaskDefinitionRepository, TaskPlanningRepository, TechnicianRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的只读配置
    pub config: Arc<AppConfig>,

    /// 配置读写 (写入在下次启动生效)
    pub config_manager: Arc<ConfigManager>,

    /// 目录: 运营商 / BOQ / 任务定义 / 分包商
    pub catalog_api: Arc<CatalogApi>,

    /// 项目与交付开关
    pub project_api: Arc<ProjectApi>,

    /// 项目计划与任务计划
    pub planning_api: Arc<PlanningApi>,

    /// 日报台账
    pub report_api: Arc<ReportApi>,

    /// 交付阶段与整改
    pub delivery_api: Arc<DeliveryApi>,

    pub cartography_api: Arc<CartographyApi>,

    pub profile_api: Arc<ProfileApi>,

    /// 技术专业与现场技术员
    pub workforce_api: Arc<WorkforceApi>,

    /// BOQ 价目表导入
    pub boq_importer: Arc<BoqImporter>,
}

impl AppState {
    /// 打开数据库并初始化全部组件
    ///
    /// # 说明
    /// 1. 打开连接 (统一 PRAGMA),校验/初始化 schema
    /// 2. 加载配置 (默认值 ← config_kv ← 环境变量)
    /// 3. 安装慢 SQL 追踪
    /// 4. 组装 Repository / Engine / API
    pub fn new(db_path: &str) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("schema 初始化失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let mut config = ConfigManager::from_connection(conn.clone())
            .load()
            .map_err(|e| format!("配置加载失败: {}", e))?;
        config.db_path = db_path.to_string();

        {
            let mut guard = conn
                .lock()
                .map_err(|e| format!("数据库锁获取失败: {}", e))?;
            install_sqlite_tracing(&mut guard, config.slow_sql_ms);
        }

        Ok(Self::with_connection(conn, config))
    }

    /// 在已打开 (且已建 schema) 的连接上组装全部组件
    pub fn with_connection(conn: Arc<Mutex<Connection>>, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let operator_repo = Arc::new(OperatorRepository::new(conn.clone()));
        let category_repo = Arc::new(BoqCategoryRepository::new(conn.clone()));
        let item_repo = Arc::new(BoqItemRepository::new(conn.clone()));
        let task_definition_repo = Arc::new(TaskDefinitionRepository::new(conn.clone()));
        let subcontractor_repo = Arc::new(SubcontractorRepository::new(conn.clone()));
        let project_repo = Arc::new(ProjectRepository::new(conn.clone()));
        let project_planning_repo = Arc::new(ProjectPlanningRepository::new(conn.clone()));
        let task_planning_repo = Arc::new(TaskPlanningRepository::new(conn.clone()));
        let report_repo = Arc::new(DailyReportRepository::new(conn.clone()));
        let phase_repo = Arc::new(DeliveryPhaseRepository::new(conn.clone()));
        let correction_repo = Arc::new(CorrectionRepository::new(conn.clone()));
        let cartography_repo = Arc::new(CartographyRepository::new(conn.clone()));
        let profile_repo = Arc::new(ProfileRepository::new(conn.clone()));
        let speciality_repo = Arc::new(SpecialityRepository::new(conn.clone()));
        let technician_repo = Arc::new(TechnicianRepository::new(conn));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let progress_engine = Arc::new(ProgressEngine::new());
        let hierarchy_engine = HierarchyEngine::new(config.hierarchy_max_depth);

        // ==========================================
        // 初始化API层
        // ==========================================
        let catalog_api = Arc::new(CatalogApi::new(
            operator_repo.clone(),
            category_repo.clone(),
            item_repo.clone(),
            task_definition_repo.clone(),
            subcontractor_repo.clone(),
        ));

        let project_api = Arc::new(ProjectApi::new(
            project_repo.clone(),
            operator_repo.clone(),
            task_planning_repo.clone(),
            progress_engine.clone(),
        ));

        let planning_api = Arc::new(PlanningApi::new(
            project_repo.clone(),
            item_repo.clone(),
            task_definition_repo.clone(),
            project_planning_repo,
            task_planning_repo.clone(),
            report_repo.clone(),
            progress_engine,
        ));

        let report_api = Arc::new(ReportApi::new(
            report_repo,
            task_planning_repo,
            subcontractor_repo,
            config.internal_executor_label.clone(),
        ));

        let delivery_api = Arc::new(DeliveryApi::new(
            phase_repo,
            correction_repo,
            project_repo.clone(),
            item_repo.clone(),
            task_definition_repo,
        ));

        let cartography_api = Arc::new(CartographyApi::new(cartography_repo, project_repo));
        let profile_api = Arc::new(ProfileApi::new(profile_repo, hierarchy_engine));
        let workforce_api = Arc::new(WorkforceApi::new(
            speciality_repo,
            technician_repo,
            SeniorityEngine::new(),
        ));
        let boq_importer = Arc::new(BoqImporter::new(operator_repo, category_repo, item_repo));

        tracing::info!("AppState初始化完成");

        Self {
            db_path: config.db_path.clone(),
            config,
            config_manager,
            catalog_api,
            project_api,
            planning_api,
            report_api,
            delivery_api,
            cartography_api,
            profile_api,
            workforce_api,
            boq_importer,
        }
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 DEPLOY_SUPERVISOR_DB_PATH (非空时)
/// - 否则: 用户数据目录/deploy-supervisor/deploy_supervisor.db
/// - 拿不到用户数据目录时回退到当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("DEPLOY_SUPERVISOR_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./deploy_supervisor.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("deploy-supervisor");
        // 目录创建失败时交给 Connection::open 报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("deploy_supervisor.db");
    }

    path.to_string_lossy().to_string()
}
