// ==========================================
// 光纤部署监理系统 - 导入层
// ==========================================
// 职责: 外部价目表 (CSV) 导入 BOQ 目录
// ==========================================

pub mod boq_importer;
pub mod error;
pub mod file_parser;

// 重导出核心类型
pub use boq_importer::{BoqImportReport, BoqImporter, RowIssue, REQUIRED_COLUMNS};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, RawRow};
