// ==========================================
// 光纤部署监理系统 - GPS 测绘点
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::InfrastructureType;

/// GPS 坐标精度 (小数位)
pub const GPS_SCALE: u32 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartographyPoint {
    pub id: String,
    pub project_id: String,
    pub point_date: NaiveDate,
    pub locality: String,
    pub infrastructure_type: InfrastructureType,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub description: String,
    pub photo: Option<String>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
}
