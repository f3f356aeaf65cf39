// ==========================================
// 光纤部署监理系统 - 延期判定引擎
// ==========================================
// 规则:
// - 任务: 已完成 → 不延期;否则 today > 计划完成日 → 延期
// - 项目: 已交付/已取消 → 不延期;否则 today > 预计完工日 → 延期
// today 由调用方传入,引擎不读系统时钟
// ==========================================

use crate::domain::planning::TaskPlanning;
use crate::domain::project::Project;
use crate::domain::types::{ProjectStatus, TaskStatus};
use chrono::NaiveDate;

#[derive(Debug, Default, Clone, Copy)]
pub struct DelayEngine;

impl DelayEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn task_delayed(&self, status: TaskStatus, planned_end: NaiveDate, today: NaiveDate) -> bool {
        if status == TaskStatus::Done {
            return false;
        }
        today > planned_end
    }

    pub fn project_delayed(&self, status: ProjectStatus, expected_end: NaiveDate, today: NaiveDate) -> bool {
        if status.is_terminal() {
            return false;
        }
        today > expected_end
    }

    pub fn is_task_delayed(&self, task: &TaskPlanning, today: NaiveDate) -> bool {
        self.task_delayed(task.status, task.planned_end, today)
    }

    pub fn is_project_delayed(&self, project: &Project, today: NaiveDate) -> bool {
        self.project_delayed(project.status, project.expected_end_date, today)
    }
}
