// ==========================================
// 光纤部署监理系统 - 输入校验
// ==========================================
// 职责: 落库前的数值/文本范围校验,失败一律 ValidationError
// 定点列: 统一保留 2 位小数,总位数按字段上限 (与导入口径一致)
// ==========================================

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::cartography::GPS_SCALE;

/// 定点列小数位
pub const DECIMAL_SCALE: u32 = 2;

// 各定点列的总位数上限 (含 2 位小数)
pub const PRICE_MAX_DIGITS: u32 = 12;
pub const PLANNED_QUANTITY_MAX_DIGITS: u32 = 12;
pub const REPORT_QUANTITY_MAX_DIGITS: u32 = 10;
pub const KPI_MAX_DIGITS: u32 = 8;
pub const BUDGET_MAX_DIGITS: u32 = 15;

/// 非空白文本,返回去掉首尾空白后的值
pub fn require_non_blank(field: &str, value: &str) -> ApiResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("{}不能为空", field)));
    }
    Ok(trimmed.to_string())
}

/// 严格为正 (计划量、KPI)
pub fn require_positive(field: &str, value: Decimal) -> ApiResult<()> {
    if value <= Decimal::ZERO {
        return Err(ApiError::validation(format!("{}必须大于0: {}", field, value)));
    }
    Ok(())
}

/// 非负 (单价、日报数量、预算)
pub fn require_non_negative(field: &str, value: Decimal) -> ApiResult<()> {
    if value < Decimal::ZERO {
        return Err(ApiError::validation(format!("{}不能为负: {}", field, value)));
    }
    Ok(())
}

/// 定点数值: 四舍五入到 2 位小数,并校验总位数
///
/// 总位数 12 即整数部分最多 10 位 (绝对值 < 10^10)
pub fn normalize_fixed(field: &str, value: Decimal, max_digits: u32) -> ApiResult<Decimal> {
    let rounded = value.round_dp(DECIMAL_SCALE);
    let limit = Decimal::from(10_i64.pow(max_digits - DECIMAL_SCALE));
    if rounded.abs() >= limit {
        return Err(ApiError::validation(format!(
            "{}超出{}位定点上限: {}",
            field, max_digits, value
        )));
    }
    Ok(rounded)
}

/// 整数下限 (期限天数 >= 1、单位倍数 >= 1)
pub fn require_at_least(field: &str, value: i32, min: i32) -> ApiResult<()> {
    if value < min {
        return Err(ApiError::validation(format!("{}必须 >= {}: {}", field, min, value)));
    }
    Ok(())
}

/// 结束日期不得早于开始日期
pub fn require_date_order(start_field: &str, start: NaiveDate, end_field: &str, end: NaiveDate) -> ApiResult<()> {
    if end < start {
        return Err(ApiError::validation(format!(
            "{}({})早于{}({})",
            end_field, end, start_field, start
        )));
    }
    Ok(())
}

/// 品牌色 #RRGGBB
pub fn require_hex_color(value: &str) -> ApiResult<String> {
    let v = value.trim();
    let valid = v.len() == 7
        && v.starts_with('#')
        && v[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::validation(format!("颜色格式应为#RRGGBB: {}", value)));
    }
    Ok(v.to_uppercase())
}

/// GPS 坐标: 范围检查后保留 7 位小数
pub fn normalize_coordinate(field: &str, value: Decimal, bound: Decimal) -> ApiResult<Decimal> {
    if value < -bound || value > bound {
        return Err(ApiError::validation(format!(
            "{}超出范围[-{}, {}]: {}",
            field, bound, bound, value
        )));
    }
    Ok(value.round_dp(GPS_SCALE))
}

pub fn normalize_latitude(value: Decimal) -> ApiResult<Decimal> {
    normalize_coordinate("纬度", value, Decimal::from(90))
}

pub fn normalize_longitude(value: Decimal) -> ApiResult<Decimal> {
    normalize_coordinate("经度", value, Decimal::from(180))
}

/// 空白字符串折叠为 None
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let t = v.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}
