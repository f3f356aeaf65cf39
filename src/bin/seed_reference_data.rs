// 种子数据工具: 写入内置运营商与技术专业,可选导入一份 BOQ 价目表
//
// 用法:
//   cargo run --bin seed_reference_data -- [db_path] [boq_csv]
//
// 运营商与专业均按 code upsert,可重复执行

use std::path::Path;

use anyhow::Context;

use deploy_supervisor::app::{get_default_db_path, AppState};
use deploy_supervisor::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let boq_csv = args.next();

    let state = AppState::new(&db_path)
        .map_err(anyhow::Error::msg)
        .context("无法初始化AppState")?;

    let seeded = state.catalog_api.seed_default_operators()?;
    println!(
        "运营商: 新增 {}, 更新 {}",
        seeded.created, seeded.updated
    );

    let specialities = state.workforce_api.seed_default_specialities()?;
    println!(
        "技术专业: 新增 {}, 更新 {}",
        specialities.created, specialities.updated
    );

    if let Some(csv_path) = boq_csv {
        let report = state
            .boq_importer
            .import_file(Path::new(&csv_path), chrono::Local::now().naive_local())
            .with_context(|| format!("BOQ 导入失败: {}", csv_path))?;
        println!(
            "BOQ: 共 {} 行, 新增 {}, 更新 {}, 拒绝 {}",
            report.total_rows,
            report.created,
            report.updated,
            report.errors.len()
        );
        for issue in &report.errors {
            println!("  行 {}: {}", issue.row, issue.message);
        }
    }

    Ok(())
}
