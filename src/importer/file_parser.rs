// ==========================================
// 光纤部署监理系统 - CSV 解析
// ==========================================
// 输出: 每行一个 表头 → 值 映射 (已 trim),行号从 2 起 (第 1 行为表头)
// ==========================================

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::importer::error::{ImportError, ImportResult};

/// 解析后的原始行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub row: usize,
    pub fields: HashMap<String, String>,
}

impl RawRow {
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

pub struct CsvParser;

impl CsvParser {
    pub fn parse_file(path: &Path) -> ImportResult<Vec<RawRow>> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(ImportError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }
        Self::parse_reader(File::open(path)?)
    }

    /// 表头统一为小写;required 中任一列缺失则整体失败
    pub fn parse_reader<R: Read>(reader: R) -> ImportResult<Vec<RawRow>> {
        Self::parse_with_required(reader, &[])
    }

    pub fn parse_with_required<R: Read>(reader: R, required: &[&str]) -> ImportResult<Vec<RawRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 可选列可整体缺省
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
            .collect();
        for column in required {
            if !headers.iter().any(|h| h == column) {
                return Err(ImportError::MissingColumn((*column).to_string()));
            }
        }

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let fields: HashMap<String, String> = headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.trim().to_string()))
                .collect();

            // 跳过完全空白的行
            if fields.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(RawRow { row: idx + 2, fields });
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_normalised_and_blank_rows_skipped() {
        let data = "\u{feff}Code , Libelle\nA1, Tirage \n,\nA2,Pose\n";
        let rows = CsvParser::parse_reader(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("code"), "A1");
        assert_eq!(rows[0].get("libelle"), "Tirage");
        assert_eq!(rows[1].row, 4);
        assert_eq!(rows[1].get("absent"), "");
    }

    #[test]
    fn test_missing_required_column() {
        let data = "code,libelle\nA1,Tirage\n";
        let err = CsvParser::parse_with_required(data.as_bytes(), &["code", "unite"]).unwrap_err();
        assert!(matches!(err, ImportError::MissingColumn(c) if c == "unite"));
    }

    #[test]
    fn test_rejects_non_csv_extension() {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        assert!(matches!(
            CsvParser::parse_file(file.path()),
            Err(ImportError::UnsupportedFormat(_))
        ));
    }
}
