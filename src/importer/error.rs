// ==========================================
// 光纤部署监理系统 - 导入模块错误类型
// ==========================================
// 文件级错误中止导入;行级错误只记录,不影响其他行
// ==========================================

use thiserror::Error;

use crate::repository::RepositoryError;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("缺少必需列: {0}")]
    MissingColumn(String),

    // ===== 行级错误 =====
    #[error("必填字段为空 (行 {row}, 字段 {field})")]
    FieldMissing { row: usize, field: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("引用不存在 (行 {row}): {message}")]
    UnknownReference { row: usize, message: String },

    #[error("数值范围错误 (行 {row}, 字段 {field}): {value}")]
    ValueRangeError {
        row: usize,
        field: String,
        value: String,
    },

    // ===== 数据库错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ImportError {
    /// 行号 (文件级错误为 None)
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::FieldMissing { row, .. }
            | ImportError::TypeConversionError { row, .. }
            | ImportError::UnknownReference { row, .. }
            | ImportError::ValueRangeError { row, .. } => Some(*row),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
