// ==========================================
// 光纤部署监理系统 - 主入口
// ==========================================
// 打开数据库、校验 schema、加载配置,输出库内概况
//
// 用法:
//   deploy-supervisor [db_path]
// ==========================================

use anyhow::Context;
use chrono::Local;

use deploy_supervisor::app::{get_default_db_path, AppState};
use deploy_supervisor::logging;
use deploy_supervisor::repository::BoqItemFilter;

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", deploy_supervisor::APP_NAME);
    tracing::info!("系统版本: {}", deploy_supervisor::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(&db_path)
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let today = Local::now().date_naive();
    let operators = state.catalog_api.list_operators()?;
    let items = state.catalog_api.list_boq_items(&BoqItemFilter::default())?;
    let subcontractors = state.catalog_api.list_subcontractors(false)?;
    let active = state.project_api.list_active_projects(today)?;
    let delayed = state.project_api.list_delayed_projects(today)?;
    let delayed_tasks = state.planning_api.list_delayed_tasks(today)?;

    println!("{} v{}", deploy_supervisor::APP_NAME, deploy_supervisor::VERSION);
    println!("数据库:       {}", state.get_db_path());
    println!("运营商:       {}", operators.len());
    println!("BOQ 条目:     {}", items.len());
    println!("分包商:       {}", subcontractors.len());
    println!("在建项目:     {}", active.len());
    println!("延期项目:     {}", delayed.len());
    println!("延期任务:     {}", delayed_tasks.len());

    Ok(())
}
