// ==========================================
// 光纤部署监理系统 - 领域类型定义
// ==========================================
// 存储/传输编码沿用业务现场使用的代码 (ml/u/planifie/termine ...)
// 变体名使用英文,便于代码阅读
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 计量单位 (Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "ml")]
    LinearMeter, // 米(线性)
    #[serde(rename = "u")]
    Unit, // 个
    #[serde(rename = "m2")]
    SquareMeter, // 平方米
    #[serde(rename = "m3")]
    CubicMeter, // 立方米
    #[serde(rename = "kg")]
    Kilogram, // 千克
    #[serde(rename = "l")]
    Liter, // 升
    #[serde(rename = "jour")]
    Day, // 天
    #[serde(rename = "forfait")]
    LumpSum, // 包干
}

impl Unit {
    /// 从存储编码解析
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ml" => Some(Unit::LinearMeter),
            "u" => Some(Unit::Unit),
            "m2" => Some(Unit::SquareMeter),
            "m3" => Some(Unit::CubicMeter),
            "kg" => Some(Unit::Kilogram),
            "l" => Some(Unit::Liter),
            "jour" => Some(Unit::Day),
            "forfait" => Some(Unit::LumpSum),
            _ => None,
        }
    }

    /// 转换为存储编码
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Unit::LinearMeter => "ml",
            Unit::Unit => "u",
            Unit::SquareMeter => "m2",
            Unit::CubicMeter => "m3",
            Unit::Kilogram => "kg",
            Unit::Liter => "l",
            Unit::Day => "jour",
            Unit::LumpSum => "forfait",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 项目类型 (Project Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Backbone,     // 骨干网
    Transport,    // 传输网
    Distribution, // 配线网
}

impl ProjectType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "backbone" => Some(ProjectType::Backbone),
            "transport" => Some(ProjectType::Transport),
            "distribution" => Some(ProjectType::Distribution),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProjectType::Backbone => "backbone",
            ProjectType::Transport => "transport",
            ProjectType::Distribution => "distribution",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 项目状态 (Project Status)
// ==========================================
// 流转: planned → in_progress → in_delivery → delivered
//       任意非终态 → cancelled
// 终态: delivered / cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "planifie")]
    Planned, // 已计划
    #[serde(rename = "en_cours")]
    InProgress, // 施工中
    #[serde(rename = "en_livraison")]
    InDelivery, // 交付中
    #[serde(rename = "livre")]
    Delivered, // 已交付
    #[serde(rename = "annule")]
    Cancelled, // 已取消
}

impl ProjectStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "planifie" => Some(ProjectStatus::Planned),
            "en_cours" => Some(ProjectStatus::InProgress),
            "en_livraison" => Some(ProjectStatus::InDelivery),
            "livre" => Some(ProjectStatus::Delivered),
            "annule" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProjectStatus::Planned => "planifie",
            ProjectStatus::InProgress => "en_cours",
            ProjectStatus::InDelivery => "en_livraison",
            ProjectStatus::Delivered => "livre",
            ProjectStatus::Cancelled => "annule",
        }
    }

    /// 终态: 不再允许任何流转
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Delivered | ProjectStatus::Cancelled)
    }

    /// 活跃状态 (计入"进行中项目"统计)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// 活跃状态集合
    pub fn active_statuses() -> [ProjectStatus; 3] {
        [
            ProjectStatus::Planned,
            ProjectStatus::InProgress,
            ProjectStatus::InDelivery,
        ]
    }

    /// 判断 self → next 是否为合法流转
    pub fn can_transition_to(&self, next: ProjectStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            ProjectStatus::Cancelled => true,
            ProjectStatus::Planned => false,
            ProjectStatus::InProgress => *self == ProjectStatus::Planned,
            ProjectStatus::InDelivery => *self == ProjectStatus::InProgress,
            ProjectStatus::Delivered => *self == ProjectStatus::InDelivery,
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 任务状态 (Task Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "non_commence")]
    NotStarted, // 未开始
    #[serde(rename = "en_cours")]
    InProgress, // 进行中
    #[serde(rename = "termine")]
    Done, // 已完成
    #[serde(rename = "suspendu")]
    Suspended, // 暂停
}

impl TaskStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "non_commence" => Some(TaskStatus::NotStarted),
            "en_cours" => Some(TaskStatus::InProgress),
            "termine" => Some(TaskStatus::Done),
            "suspendu" => Some(TaskStatus::Suspended),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "non_commence",
            TaskStatus::InProgress => "en_cours",
            TaskStatus::Done => "termine",
            TaskStatus::Suspended => "suspendu",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 基础设施类型 (Infrastructure Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfrastructureType {
    #[serde(rename = "poteau_beton")]
    ConcretePole, // 水泥杆
    #[serde(rename = "poteau_metallique")]
    MetalPole, // 金属杆
    Pco, // 光分纤点
    Pec, // 光缆分歧点
    Pep, // 入户分歧点
    Jdv, // 跳线
    #[serde(rename = "chambre")]
    Chamber, // 人井
    #[serde(rename = "gc")]
    CivilWorks, // 土建
    #[serde(rename = "autre")]
    Other, // 其他
}

impl InfrastructureType {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "poteau_beton" => Some(InfrastructureType::ConcretePole),
            "poteau_metallique" => Some(InfrastructureType::MetalPole),
            "pco" => Some(InfrastructureType::Pco),
            "pec" => Some(InfrastructureType::Pec),
            "pep" => Some(InfrastructureType::Pep),
            "jdv" => Some(InfrastructureType::Jdv),
            "chambre" => Some(InfrastructureType::Chamber),
            "gc" => Some(InfrastructureType::CivilWorks),
            "autre" => Some(InfrastructureType::Other),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            InfrastructureType::ConcretePole => "poteau_beton",
            InfrastructureType::MetalPole => "poteau_metallique",
            InfrastructureType::Pco => "pco",
            InfrastructureType::Pec => "pec",
            InfrastructureType::Pep => "pep",
            InfrastructureType::Jdv => "jdv",
            InfrastructureType::Chamber => "chambre",
            InfrastructureType::CivilWorks => "gc",
            InfrastructureType::Other => "autre",
        }
    }
}

impl fmt::Display for InfrastructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 交付阶段 (Delivery Phase Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryPhaseKind {
    #[serde(rename = "environnement")]
    EnvironmentControl, // 环境与内部检查
    #[serde(rename = "rfc")]
    ReportWriting, // 竣工报告编写
    #[serde(rename = "visite_technique")]
    TechnicalVisit, // 运营商技术验收
}

impl DeliveryPhaseKind {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "environnement" => Some(DeliveryPhaseKind::EnvironmentControl),
            "rfc" => Some(DeliveryPhaseKind::ReportWriting),
            "visite_technique" => Some(DeliveryPhaseKind::TechnicalVisit),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DeliveryPhaseKind::EnvironmentControl => "environnement",
            DeliveryPhaseKind::ReportWriting => "rfc",
            DeliveryPhaseKind::TechnicalVisit => "visite_technique",
        }
    }
}

impl fmt::Display for DeliveryPhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 阶段状态 (Phase Status)
// ==========================================
// 仅前进: not_started → in_progress → done
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhaseStatus {
    #[serde(rename = "non_commence")]
    NotStarted,
    #[serde(rename = "en_cours")]
    InProgress,
    #[serde(rename = "termine")]
    Done,
}

impl PhaseStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "non_commence" => Some(PhaseStatus::NotStarted),
            "en_cours" => Some(PhaseStatus::InProgress),
            "termine" => Some(PhaseStatus::Done),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PhaseStatus::NotStarted => "non_commence",
            PhaseStatus::InProgress => "en_cours",
            PhaseStatus::Done => "termine",
        }
    }

    /// 下一个状态 (done 无后继)
    pub fn next(&self) -> Option<PhaseStatus> {
        match self {
            PhaseStatus::NotStarted => Some(PhaseStatus::InProgress),
            PhaseStatus::InProgress => Some(PhaseStatus::Done),
            PhaseStatus::Done => None,
        }
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 整改结果 (Correction Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectionStatus {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "non_ok")]
    NotOk,
}

impl CorrectionStatus {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ok" => Some(CorrectionStatus::Ok),
            "non_ok" => Some(CorrectionStatus::NotOk),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CorrectionStatus::Ok => "ok",
            CorrectionStatus::NotOk => "non_ok",
        }
    }
}

impl fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 用户角色 (Profile Role)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProfileRole {
    Superadmin,
    Admin,
    Coordonnateur,
    Stockman,
    Superviseur,
}

impl ProfileRole {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SUPERADMIN" => Some(ProfileRole::Superadmin),
            "ADMIN" => Some(ProfileRole::Admin),
            "COORDONNATEUR" => Some(ProfileRole::Coordonnateur),
            "STOCKMAN" => Some(ProfileRole::Stockman),
            "SUPERVISEUR" => Some(ProfileRole::Superviseur),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProfileRole::Superadmin => "SUPERADMIN",
            ProfileRole::Admin => "ADMIN",
            ProfileRole::Coordonnateur => "COORDONNATEUR",
            ProfileRole::Stockman => "STOCKMAN",
            ProfileRole::Superviseur => "SUPERVISEUR",
        }
    }
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 技术员技能等级 (Skill Level)
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    #[default]
    Junior,
    #[serde(rename = "confirme")]
    Confirmed,
    Senior,
    Expert,
}

impl SkillLevel {
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "junior" => Some(SkillLevel::Junior),
            "confirme" => Some(SkillLevel::Confirmed),
            "senior" => Some(SkillLevel::Senior),
            "expert" => Some(SkillLevel::Expert),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            SkillLevel::Junior => "junior",
            SkillLevel::Confirmed => "confirme",
            SkillLevel::Senior => "senior",
            SkillLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
