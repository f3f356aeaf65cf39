// ==========================================
// 仓储层单元测试公共夹具 (仅 cfg(test))
// ==========================================

use crate::db::open_in_memory;
use crate::domain::catalog::{BoqCategory, BoqItem, Operator, Subcontractor, TaskDefinition};
use crate::domain::planning::{ProjectPlanning, TaskPlanning};
use crate::domain::project::{DeliveryGates, Project};
use crate::domain::types::{ProjectStatus, ProjectType, TaskStatus, Unit};
use crate::repository::{
    BoqCategoryRepository, BoqItemRepository, OperatorRepository, ProjectPlanningRepository,
    ProjectRepository, SubcontractorRepository, TaskDefinitionRepository, TaskPlanningRepository,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

pub fn shared_conn() -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_in_memory().unwrap()))
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ts() -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(8, 0, 0).unwrap()
}

pub fn operator(code: &str) -> Operator {
    Operator {
        id: format!("op-{}", code),
        code: code.to_string(),
        name: format!("Operator {}", code),
        color: "#FF7900".to_string(),
        contact_name: String::new(),
        contact_email: String::new(),
        contact_phone: String::new(),
        is_active: true,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn category(code: &str) -> BoqCategory {
    BoqCategory {
        id: format!("cat-{}", code),
        code: code.to_string(),
        name: format!("Category {}", code),
        description: String::new(),
        is_active: true,
        created_at: ts(),
    }
}

pub fn boq_item(id: &str, operator_id: &str, category_id: &str, code: &str, price: Decimal) -> BoqItem {
    BoqItem {
        id: id.to_string(),
        operator_id: operator_id.to_string(),
        category_id: category_id.to_string(),
        code: code.to_string(),
        label: format!("Item {}", code),
        unit: Unit::LinearMeter,
        unit_price: price,
        description: String::new(),
        is_active: true,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn task_definition(code: &str) -> TaskDefinition {
    TaskDefinition {
        id: format!("td-{}", code),
        code: code.to_string(),
        label: format!("Task {}", code),
        unit: Unit::LinearMeter,
        kpi: dec!(250),
        description: String::new(),
        is_active: true,
        created_at: ts(),
    }
}

pub fn subcontractor(code: &str) -> Subcontractor {
    Subcontractor {
        id: format!("sc-{}", code),
        code: code.to_string(),
        name: format!("Sous-traitant {}", code),
        address: String::new(),
        phone: String::new(),
        email: String::new(),
        main_contact_name: String::new(),
        main_contact_phone: String::new(),
        specialities: String::new(),
        trade_register_number: String::new(),
        is_active: true,
        collaboration_start: None,
        notes: String::new(),
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn project(id: &str, operator_id: &str) -> Project {
    Project {
        id: id.to_string(),
        code: format!("PRJ-{}", id),
        name: format!("Projet {}", id),
        operator_id: operator_id.to_string(),
        project_type: ProjectType::Distribution,
        zone: "Abidjan".to_string(),
        status: ProjectStatus::InProgress,
        start_date: date(2024, 1, 1),
        expected_end_date: date(2024, 3, 31),
        actual_end_date: None,
        delivery_date: None,
        gates: DeliveryGates::default(),
        supervisor_id: None,
        operator_supervisor: String::new(),
        budget: None,
        description: String::new(),
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn project_planning(id: &str, project_id: &str, boq_item_id: &str, qty: Decimal) -> ProjectPlanning {
    ProjectPlanning {
        id: id.to_string(),
        project_id: project_id.to_string(),
        boq_item_id: boq_item_id.to_string(),
        unit_value: 1,
        planned_quantity: qty,
        deadline_days: 30,
        display_order: 0,
        created_at: ts(),
        updated_at: ts(),
    }
}

pub fn task_planning(id: &str, pp_id: &str, td_id: &str, qty: Decimal) -> TaskPlanning {
    TaskPlanning {
        id: id.to_string(),
        project_planning_id: pp_id.to_string(),
        task_definition_id: td_id.to_string(),
        unit_value: 1,
        planned_quantity: qty,
        deadline_days: 10,
        planned_start: date(2024, 1, 10),
        planned_end: date(2024, 1, 20),
        actual_start: None,
        actual_end: None,
        status: TaskStatus::NotStarted,
        display_order: 0,
        created_at: ts(),
        updated_at: ts(),
    }
}

/// 已建好的最小计划树
pub struct PlanTree {
    pub conn: Arc<Mutex<Connection>>,
    pub project_id: String,
    pub boq_item_id: String,
    pub task_definition_id: String,
    pub project_planning_id: String,
    pub task_planning_id: String,
    pub subcontractor_id: String,
}

/// 运营商 ORA / 类别 FO / 条目 X1 (1500.00) / 任务 TIR / 分包商 ST1 /
/// 项目 p1 / 工作项计划 pp1 (100) / 任务计划 tp1 (100)
pub fn plan_tree() -> PlanTree {
    let conn = shared_conn();
    OperatorRepository::new(conn.clone()).insert(&operator("ORA")).unwrap();
    BoqCategoryRepository::new(conn.clone()).insert(&category("FO")).unwrap();
    BoqItemRepository::new(conn.clone())
        .insert(&boq_item("bi-x1", "op-ORA", "cat-FO", "X1", dec!(1500.00)))
        .unwrap();
    TaskDefinitionRepository::new(conn.clone())
        .insert(&task_definition("TIR"))
        .unwrap();
    SubcontractorRepository::new(conn.clone())
        .insert(&subcontractor("ST1"))
        .unwrap();
    ProjectRepository::new(conn.clone())
        .insert(&project("p1", "op-ORA"))
        .unwrap();
    ProjectPlanningRepository::new(conn.clone())
        .insert(&project_planning("pp1", "p1", "bi-x1", dec!(100)))
        .unwrap();
    TaskPlanningRepository::new(conn.clone())
        .insert(&task_planning("tp1", "pp1", "td-TIR", dec!(100)))
        .unwrap();

    PlanTree {
        conn,
        project_id: "p1".to_string(),
        boq_item_id: "bi-x1".to_string(),
        task_definition_id: "td-TIR".to_string(),
        project_planning_id: "pp1".to_string(),
        task_planning_id: "tp1".to_string(),
        subcontractor_id: "sc-ST1".to_string(),
    }
}
