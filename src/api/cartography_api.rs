// ==========================================
// 光纤部署监理系统 - 测绘 API
// ==========================================
// 职责: 项目测绘点登记与查询
// 坐标: 纬度 [-90, 90] / 经度 [-180, 180],保留 7 位小数
// ==========================================

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{blank_to_none, normalize_latitude, normalize_longitude, require_non_blank};
use crate::api::{new_id, now};
use crate::domain::cartography::CartographyPoint;
use crate::domain::types::InfrastructureType;
use crate::repository::{CartographyRepository, ProjectRepository};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartographyPointInput {
    pub project_id: String,
    pub point_date: NaiveDate,
    pub locality: String,
    pub infrastructure_type: InfrastructureType,
    pub latitude: Decimal,
    pub longitude: Decimal,
    pub description: String,
    pub photo: Option<String>,
    pub created_by: Option<String>,
}

pub struct CartographyApi {
    point_repo: Arc<CartographyRepository>,
    project_repo: Arc<ProjectRepository>,
}

impl CartographyApi {
    pub fn new(point_repo: Arc<CartographyRepository>, project_repo: Arc<ProjectRepository>) -> Self {
        Self {
            point_repo,
            project_repo,
        }
    }

    pub fn create_point(&self, input: CartographyPointInput) -> ApiResult<CartographyPoint> {
        let locality = require_non_blank("地点", &input.locality)?;
        let (latitude, longitude) = normalize_latitude(input.latitude)
            .and_then(|lat| Ok((lat, normalize_longitude(input.longitude)?)))
            .map_err(|e| {
                warn!(project_id = %input.project_id, error = %e, "测绘点坐标无效");
                e
            })?;
        if self.project_repo.find_by_id(&input.project_id)?.is_none() {
            return Err(ApiError::ReferenceError(format!("项目不存在: {}", input.project_id)));
        }

        let point = CartographyPoint {
            id: new_id(),
            project_id: input.project_id,
            point_date: input.point_date,
            locality,
            infrastructure_type: input.infrastructure_type,
            latitude,
            longitude,
            description: input.description.trim().to_string(),
            photo: blank_to_none(input.photo),
            created_by: blank_to_none(input.created_by),
            created_at: now(),
        };
        self.point_repo.insert(&point)?;
        info!(
            point_id = %point.id,
            project_id = %point.project_id,
            infrastructure_type = %point.infrastructure_type,
            "测绘点已登记"
        );
        Ok(point)
    }

    pub fn get_point(&self, id: &str) -> ApiResult<CartographyPoint> {
        self.point_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("CartographyPoint", id))
    }

    /// 项目测绘点,日期倒序;infrastructure_type 为 None 时不过滤
    pub fn list_points(
        &self,
        project_id: &str,
        infrastructure_type: Option<InfrastructureType>,
    ) -> ApiResult<Vec<CartographyPoint>> {
        Ok(self.point_repo.list_by_project(project_id, infrastructure_type)?)
    }

    pub fn delete_point(&self, id: &str) -> ApiResult<()> {
        self.point_repo.delete(id)?;
        info!(point_id = %id, "测绘点已删除");
        Ok(())
    }
}
