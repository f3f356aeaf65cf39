// ==========================================
// 光纤部署监理系统 - BOQ 价目表导入
// ==========================================
// 列: operator_code, category_code, code, libelle, unite, prix_unitaire[, description]
// 流程: 解析 → 逐行校验 → 合格行按 (运营商, 代码) 单事务 upsert
// - 不合格行只记录错误,不影响合格行
// - 落库失败整批回滚
// ==========================================

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::api::catalog_api::normalize_price;
use crate::domain::catalog::BoqItem;
use crate::domain::types::Unit;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{CsvParser, RawRow};
use crate::repository::{BoqCategoryRepository, BoqItemRepository, OperatorRepository, UpsertOutcome};

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "operator_code",
    "category_code",
    "code",
    "libelle",
    "unite",
    "prix_unitaire",
];

/// 行级问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub message: String,
}

/// 导入结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoqImportReport {
    pub total_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<RowIssue>,
}

impl BoqImportReport {
    pub fn imported(&self) -> usize {
        self.created + self.updated
    }
}

// ==========================================
// BoqImporter
// ==========================================
pub struct BoqImporter {
    operator_repo: Arc<OperatorRepository>,
    category_repo: Arc<BoqCategoryRepository>,
    item_repo: Arc<BoqItemRepository>,
}

impl BoqImporter {
    pub fn new(
        operator_repo: Arc<OperatorRepository>,
        category_repo: Arc<BoqCategoryRepository>,
        item_repo: Arc<BoqItemRepository>,
    ) -> Self {
        Self {
            operator_repo,
            category_repo,
            item_repo,
        }
    }

    pub fn import_file(&self, path: &Path, now: NaiveDateTime) -> ImportResult<BoqImportReport> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(ext.to_string_lossy().to_string()));
            }
        }
        self.import_reader(std::fs::File::open(path)?, now)
    }

    #[instrument(skip(self, reader))]
    pub fn import_reader<R: Read>(&self, reader: R, now: NaiveDateTime) -> ImportResult<BoqImportReport> {
        let rows = CsvParser::parse_with_required(reader, &REQUIRED_COLUMNS)?;
        let mut report = BoqImportReport {
            total_rows: rows.len(),
            ..Default::default()
        };

        // 引用缓存: code → (id, is_active)
        let operators: HashMap<String, (String, bool)> = self
            .operator_repo
            .list_all()?
            .into_iter()
            .map(|o| (o.code.to_uppercase(), (o.id, o.is_active)))
            .collect();
        let categories: HashMap<String, String> = self
            .category_repo
            .list_all()?
            .into_iter()
            .map(|c| (c.code.to_uppercase(), c.id))
            .collect();

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            match build_item(row, &operators, &categories, now) {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(row = row.row, error = %e, "BOQ 导入行被拒绝");
                    report.errors.push(RowIssue {
                        row: e.row().unwrap_or(row.row),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !items.is_empty() {
            for outcome in self.item_repo.upsert_batch(&items)? {
                match outcome {
                    UpsertOutcome::Created => report.created += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                }
            }
        }

        info!(
            total = report.total_rows,
            created = report.created,
            updated = report.updated,
            rejected = report.errors.len(),
            "BOQ 价目表导入完成"
        );
        Ok(report)
    }
}

// ==========================================
// 行校验
// ==========================================

fn required<'a>(row: &'a RawRow, field: &str) -> ImportResult<&'a str> {
    let v = row.get(field);
    if v.is_empty() {
        return Err(ImportError::FieldMissing {
            row: row.row,
            field: field.to_string(),
        });
    }
    Ok(v)
}

/// 接受 "1500", "1 500,50", "1500.50"
fn parse_price(row: &RawRow, raw: &str) -> ImportResult<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    let price = Decimal::from_str(&cleaned).map_err(|e| ImportError::TypeConversionError {
        row: row.row,
        field: "prix_unitaire".to_string(),
        message: e.to_string(),
    })?;
    // 与手工录入共用同一定点规则 (2 位小数、非负、位数上限)
    normalize_price(price).map_err(|_| ImportError::ValueRangeError {
        row: row.row,
        field: "prix_unitaire".to_string(),
        value: raw.to_string(),
    })
}

fn build_item(
    row: &RawRow,
    operators: &HashMap<String, (String, bool)>,
    categories: &HashMap<String, String>,
    now: NaiveDateTime,
) -> ImportResult<BoqItem> {
    let operator_code = required(row, "operator_code")?.to_uppercase();
    let category_code = required(row, "category_code")?.to_uppercase();
    let code = required(row, "code")?.to_string();
    let label = required(row, "libelle")?.to_string();
    let unit_raw = required(row, "unite")?;
    let price_raw = required(row, "prix_unitaire")?;

    let operator_id = match operators.get(&operator_code) {
        Some((id, true)) => id.clone(),
        Some((_, false)) => {
            return Err(ImportError::UnknownReference {
                row: row.row,
                message: format!("运营商已停用: {}", operator_code),
            })
        }
        None => {
            return Err(ImportError::UnknownReference {
                row: row.row,
                message: format!("运营商不存在: {}", operator_code),
            })
        }
    };
    let category_id = categories
        .get(&category_code)
        .cloned()
        .ok_or_else(|| ImportError::UnknownReference {
            row: row.row,
            message: format!("类别不存在: {}", category_code),
        })?;
    let unit = Unit::from_db_str(unit_raw).ok_or_else(|| ImportError::TypeConversionError {
        row: row.row,
        field: "unite".to_string(),
        message: format!("未知单位: {}", unit_raw),
    })?;
    let unit_price = parse_price(row, price_raw)?;

    Ok(BoqItem {
        id: uuid::Uuid::new_v4().to_string(),
        operator_id,
        category_id,
        code,
        label,
        unit,
        unit_price,
        description: row.get("description").to_string(),
        is_active: true,
        created_at: now,
        updated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::{category, operator, shared_conn, ts};
    use crate::repository::BoqItemFilter;
    use rust_decimal_macros::dec;

    fn importer() -> (BoqImporter, Arc<BoqItemRepository>) {
        let conn = shared_conn();
        let operator_repo = Arc::new(OperatorRepository::new(conn.clone()));
        let category_repo = Arc::new(BoqCategoryRepository::new(conn.clone()));
        let item_repo = Arc::new(BoqItemRepository::new(conn));
        operator_repo.insert(&operator("ORA")).unwrap();
        category_repo.insert(&category("GC")).unwrap();
        (
            BoqImporter::new(operator_repo, category_repo, item_repo.clone()),
            item_repo,
        )
    }

    const HEADER: &str = "operator_code,category_code,code,libelle,unite,prix_unitaire,description\n";

    #[test]
    fn test_valid_rows_survive_invalid_ones() {
        let (importer, items) = importer();
        let csv = format!(
            "{}ORA,GC,TR-01,Tranchée,ml,\"1 500,50\",Tranchée standard\n\
             XXX,GC,TR-02,Tranchée,ml,10,\n\
             ORA,GC,TR-03,Tranchée,parsec,10,\n\
             ORA,GC,TR-04,Tranchée,ml,-3,\n\
             ora,gc,PO-01,Poteau,u,250,\n\
             ORA,GC,TR-05,Tranchée,ml,99999999999,\n",
            HEADER
        );
        let report = importer.import_reader(csv.as_bytes(), ts()).unwrap();

        assert_eq!(report.total_rows, 6);
        assert_eq!(report.created, 2);
        assert_eq!(report.errors.len(), 4);
        assert_eq!(
            report.errors.iter().map(|e| e.row).collect::<Vec<_>>(),
            vec![3, 4, 5, 7]
        );

        let stored = items.list(&BoqItemFilter::default()).unwrap();
        let tr = stored.iter().find(|i| i.code == "TR-01").unwrap();
        assert_eq!(tr.unit_price, dec!(1500.50));
        assert_eq!(tr.unit, Unit::LinearMeter);
    }

    #[test]
    fn test_reimport_updates_in_place() {
        let (importer, items) = importer();
        let first = format!("{}ORA,GC,TR-01,Tranchée,ml,100,\n", HEADER);
        importer.import_reader(first.as_bytes(), ts()).unwrap();
        let before = items.list(&BoqItemFilter::default()).unwrap();

        let second = format!("{}ORA,GC,TR-01,Tranchée profonde,ml,120,\n", HEADER);
        let report = importer.import_reader(second.as_bytes(), ts()).unwrap();
        assert_eq!((report.created, report.updated), (0, 1));

        let after = items.list(&BoqItemFilter::default()).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, before[0].id);
        assert_eq!(after[0].unit_price, dec!(120));
        assert_eq!(after[0].label, "Tranchée profonde");
    }

    #[test]
    fn test_missing_column_aborts() {
        let (importer, _) = importer();
        let csv = "operator_code,code,libelle,unite,prix_unitaire\nORA,X,Y,u,1\n";
        assert!(matches!(
            importer.import_reader(csv.as_bytes(), ts()),
            Err(ImportError::MissingColumn(_))
        ));
    }
}
