// ==========================================
// 光纤部署监理系统 - API层错误类型
// ==========================================
// 职责: 定义调用方可见的错误分类,把 Repository 错误转换为业务错误
// 分类:
// - ConstraintViolation / DuplicateReport: 唯一性冲突,不重试
// - ValidationError: 数值越界等输入错误,落库前拒绝
// - ReferenceError:  外键指向缺失/停用实体,或受保护引用阻止删除
// ==========================================

use crate::repository::error::RepositoryError;
use chrono::NaiveDate;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 约束错误
    // ==========================================
    #[error("唯一约束冲突: {0}")]
    ConstraintViolation(String),

    /// 日报槽位已被占用,需走显式更新
    #[error("重复日报: task_planning_id={task_planning_id}, date={date}, executor={executor}")]
    DuplicateReport {
        task_planning_id: String,
        date: NaiveDate,
        executor: String,
    },

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("引用错误: {0}")]
    ReferenceError(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl ApiError {
    /// 唯一性冲突 (含重复日报)
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            ApiError::ConstraintViolation(_) | ApiError::DuplicateReport { .. }
        )
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        ApiError::NotFound(format!("{}(id={})不存在", entity, id))
    }

    /// 定点运算溢出 (只可能来自绕过校验写入的数据)
    pub fn overflow(what: &str) -> Self {
        ApiError::InternalError(format!("{}计算溢出", what))
    }

    pub fn transition(from: impl ToString, to: impl ToString) -> Self {
        ApiError::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::ConstraintViolation(msg),
            RepositoryError::ForeignKeyViolation(msg) => ApiError::ReferenceError(msg),

            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::ValidationError(format!("字段{}错误: {}", field, message))
            }

            RepositoryError::DatabaseConnectionError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseError(format!("数据库锁获取失败: {}", msg))
            }

            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::InternalError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
