// ==========================================
// 光纤部署监理系统 - 行映射工具
// ==========================================
// 职责: TEXT 列 ↔ Decimal / 日期 / 枚举 / JSON 列表
// 约定: 金额/数量以定点小数的规范文本存储,禁止 REAL
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rusqlite::types::Type;
use rusqlite::Row;
use std::str::FromStr;

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

#[derive(Debug)]
struct UnknownCode(String);

impl std::fmt::Display for UnknownCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "未知编码: {}", self.0)
    }
}

impl std::error::Error for UnknownCode {}

// ==========================================
// 写入方向
// ==========================================

pub fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

pub fn fmt_opt_date(d: Option<NaiveDate>) -> Option<String> {
    d.map(fmt_date)
}

pub fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub fn fmt_decimal(v: Decimal) -> String {
    v.to_string()
}

pub fn fmt_json_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

// ==========================================
// 读取方向
// ==========================================

pub fn get_decimal(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(raw.trim()).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_decimal(row: &Row, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Decimal::from_str(s.trim()).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub fn get_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FMT).map_err(|e| conversion_error(idx, e))
}

pub fn get_opt_date(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDate::parse_from_str(&s, DATE_FMT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FMT).map_err(|e| conversion_error(idx, e))
}

/// 枚举列解析 (parse 为各枚举的 from_db_str)
pub fn get_enum<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| conversion_error(idx, UnknownCode(raw)))
}

/// JSON 数组列 (照片/文档 URL)
pub fn get_json_list(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_text_round_trip_keeps_precision() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (v TEXT NOT NULL)").unwrap();
        conn.execute("INSERT INTO t (v) VALUES (?1)", [fmt_decimal(dec!(1500.10))])
            .unwrap();
        let v = conn
            .query_row("SELECT v FROM t", [], |row| get_decimal(row, 0))
            .unwrap();
        assert_eq!(v, dec!(1500.1));
        assert_eq!(v.to_string(), "1500.10");
    }

    #[test]
    fn test_unknown_enum_code_is_conversion_error() {
        use crate::domain::types::TaskStatus;

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let result = conn.query_row("SELECT 'bogus'", [], |row| {
            get_enum(row, 0, TaskStatus::from_db_str)
        });
        assert!(matches!(
            result,
            Err(rusqlite::Error::FromSqlConversionFailure(0, _, _))
        ));
    }
}
