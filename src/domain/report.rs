// ==========================================
// 光纤部署监理系统 - 日报 (执行台账) 领域模型
// ==========================================
// 日报是"实际完成量"的唯一来源
// 槽位: (task_planning_id, date, subcontractor_id) 唯一
//       subcontractor_id = None 表示内部施工
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// DailyReport - 施工日报
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub id: String,
    pub task_planning_id: String,
    pub report_date: NaiveDate,
    pub unit_value: i32,
    pub quantity: Decimal,                  // 当日完成量 >= 0
    pub subcontractor_id: Option<String>,   // None = 内部施工
    pub referent_id: String,                // 填报人 (不透明身份引用)
    pub observations: String,
    pub photos: Vec<String>,                // 照片 URL 列表
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DailyReport {
    /// 是否内部施工
    pub fn is_internal_work(&self) -> bool {
        self.subcontractor_id.is_none()
    }

    pub fn photos_count(&self) -> usize {
        self.photos.len()
    }

    /// 槽位键 (内部施工使用空串哨兵,与存储层唯一索引一致)
    pub fn slot_key(&self) -> (String, NaiveDate, String) {
        (
            self.task_planning_id.clone(),
            self.report_date,
            executor_key(self.subcontractor_id.as_deref()).to_string(),
        )
    }
}

/// 执行方哨兵键: 内部施工 → ""
pub fn executor_key(subcontractor_id: Option<&str>) -> &str {
    subcontractor_id.unwrap_or("")
}
