// ==========================================
// 光纤部署监理系统 - 进度汇总引擎
// ==========================================
// 红线:
// - 进度只在读取时计算,不落库
// - 全程 Decimal 运算,不经过浮点
// - 加法/乘法一律 checked,溢出返回 None 由调用方归类
// ==========================================
// 口径:
// - 实际完成量 = 节点下全部日报 quantity 之和,无日报为 0
// - 进度 % = round(实际 / 计划 × 100, 2);计划量为 0 时为 0
// - 金额   = 计划量 × BOQ 单价 (与完成量无关)
// - 项目进度 % = 已完成任务数 / 任务总数 × 100,无任务为 0
// ==========================================

use crate::domain::planning::TaskPlanning;
use crate::domain::types::TaskStatus;
use crate::engine::delay::DelayEngine;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const PERCENT_SCALE: u32 = 2;

/// 项目级任务汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRollup {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub progress_percentage: Decimal,
}

/// 单个任务的读模型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_planning_id: String,
    pub status: TaskStatus,
    pub planned_quantity: Decimal,
    pub realized_quantity: Decimal,
    pub progress_percentage: Decimal,
    pub is_delayed: bool,
}

// ==========================================
// ProgressEngine - 进度汇总引擎
// ==========================================
#[derive(Debug, Default)]
pub struct ProgressEngine {
    delay: DelayEngine,
}

impl ProgressEngine {
    pub fn new() -> Self {
        Self {
            delay: DelayEngine::new(),
        }
    }

    /// 实际完成量 (溢出时 None)
    pub fn realized_quantity<'a, I>(&self, quantities: I) -> Option<Decimal>
    where
        I: IntoIterator<Item = &'a Decimal>,
    {
        quantities
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, q| acc.checked_add(*q))
    }

    /// 完成百分比
    ///
    /// 计划量 <= 0 时返回 0;结果不封顶 (超报时可 > 100)
    pub fn progress_percentage(&self, realized: Decimal, planned: Decimal) -> Decimal {
        if planned <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        realized
            .checked_div(planned)
            .and_then(|ratio| ratio.checked_mul(HUNDRED))
            .map(|pct| pct.round_dp(PERCENT_SCALE))
            .unwrap_or(Decimal::ZERO)
    }

    /// 计划金额 = 计划量 × 单价 (溢出时 None)
    pub fn total_amount(&self, planned_quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
        planned_quantity.checked_mul(unit_price)
    }

    /// 项目任务汇总
    pub fn project_rollup<'a, I>(&self, statuses: I) -> ProjectRollup
    where
        I: IntoIterator<Item = &'a TaskStatus>,
    {
        let (total, completed) = statuses.into_iter().fold((0usize, 0usize), |(t, c), s| {
            (t + 1, if *s == TaskStatus::Done { c + 1 } else { c })
        });
        self.rollup_from_counts(total, completed)
    }

    /// 由计数直接汇总 (计数来自仓储 COUNT 查询时使用)
    pub fn rollup_from_counts(&self, total_tasks: usize, completed_tasks: usize) -> ProjectRollup {
        ProjectRollup {
            total_tasks,
            completed_tasks,
            progress_percentage: self.progress_percentage(
                Decimal::from(completed_tasks as u64),
                Decimal::from(total_tasks as u64),
            ),
        }
    }

    /// 批量计算任务读模型
    ///
    /// `quantities` 为 (task_planning_id, quantity) 平铺列表,可含其他任务的行;
    /// 任一任务累加溢出时返回 None
    #[instrument(skip(self, tasks, quantities), fields(tasks = tasks.len(), reports = quantities.len()))]
    pub fn task_progress_batch(
        &self,
        tasks: &[TaskPlanning],
        quantities: &[(String, Decimal)],
        today: NaiveDate,
    ) -> Option<Vec<TaskProgress>> {
        let mut realized_by_task: HashMap<&str, Decimal> = HashMap::new();
        for (task_id, qty) in quantities {
            let slot = realized_by_task.entry(task_id.as_str()).or_insert(Decimal::ZERO);
            *slot = slot.checked_add(*qty)?;
        }

        Some(
            tasks
                .iter()
                .map(|task| {
                    let realized = realized_by_task
                        .get(task.id.as_str())
                        .copied()
                        .unwrap_or(Decimal::ZERO);
                    self.task_progress(task, realized, today)
                })
                .collect(),
        )
    }

    pub fn task_progress(&self, task: &TaskPlanning, realized: Decimal, today: NaiveDate) -> TaskProgress {
        TaskProgress {
            task_planning_id: task.id.clone(),
            status: task.status,
            planned_quantity: task.planned_quantity,
            realized_quantity: realized,
            progress_percentage: self.progress_percentage(realized, task.planned_quantity),
            is_delayed: self.delay.is_task_delayed(task, today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use rust_decimal_macros::dec;

    fn task(id: &str, qty: Decimal, status: TaskStatus) -> TaskPlanning {
        let ts = NaiveDateTime::parse_from_str("2024-01-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        TaskPlanning {
            id: id.to_string(),
            project_planning_id: "pp1".to_string(),
            task_definition_id: "td1".to_string(),
            unit_value: 1,
            planned_quantity: qty,
            deadline_days: 10,
            planned_start: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            planned_end: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
            actual_start: None,
            actual_end: None,
            status,
            display_order: 0,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_realized_quantity_is_zero_without_reports() {
        let engine = ProgressEngine::new();
        assert_eq!(engine.realized_quantity(&Vec::<Decimal>::new()), Some(Decimal::ZERO));
    }

    #[test]
    fn test_two_reports_roll_up_to_seventy_five_percent() {
        let engine = ProgressEngine::new();
        let realized = engine.realized_quantity(&[dec!(30), dec!(45)]).unwrap();
        assert_eq!(realized, dec!(75));
        assert_eq!(engine.progress_percentage(realized, dec!(100)), dec!(75.00));
    }

    #[test]
    fn test_percentage_rounds_to_two_places() {
        let engine = ProgressEngine::new();
        assert_eq!(engine.progress_percentage(dec!(1), dec!(3)), dec!(33.33));
        assert_eq!(engine.progress_percentage(dec!(2), dec!(3)), dec!(66.67));
    }

    #[test]
    fn test_zero_planned_quantity_reports_zero_percent() {
        let engine = ProgressEngine::new();
        assert_eq!(engine.progress_percentage(dec!(12), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_over_reporting_is_not_capped() {
        let engine = ProgressEngine::new();
        assert_eq!(engine.progress_percentage(dec!(120), dec!(100)), dec!(120));
    }

    #[test]
    fn test_total_amount_is_exact() {
        let engine = ProgressEngine::new();
        let amount = engine.total_amount(dec!(10), dec!(1500.00)).unwrap();
        assert_eq!(amount, dec!(15000.00));
        assert_eq!(amount.to_string(), "15000.00");
    }

    #[test]
    fn test_overflow_yields_none_instead_of_panicking() {
        let engine = ProgressEngine::new();
        assert_eq!(engine.total_amount(Decimal::MAX, dec!(1500.00)), None);
        assert_eq!(engine.realized_quantity(&[Decimal::MAX, dec!(1)]), None);
        assert_eq!(
            engine.progress_percentage(Decimal::MAX, dec!(0.01)),
            Decimal::ZERO
        );

        let tasks = vec![task("t1", dec!(100), TaskStatus::InProgress)];
        let quantities = vec![("t1".to_string(), Decimal::MAX), ("t1".to_string(), Decimal::MAX)];
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(engine.task_progress_batch(&tasks, &quantities, today).is_none());
    }

    #[test]
    fn test_project_rollup() {
        let engine = ProgressEngine::new();
        let statuses = [
            TaskStatus::Done,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::NotStarted,
        ];
        let rollup = engine.project_rollup(&statuses);
        assert_eq!(rollup.total_tasks, 4);
        assert_eq!(rollup.completed_tasks, 2);
        assert_eq!(rollup.progress_percentage, dec!(50));

        let empty = engine.project_rollup(&Vec::<TaskStatus>::new());
        assert_eq!(empty.progress_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_task_progress_batch_groups_by_task() {
        let engine = ProgressEngine::new();
        let tasks = vec![
            task("t1", dec!(100), TaskStatus::InProgress),
            task("t2", dec!(40), TaskStatus::Done),
        ];
        let quantities = vec![
            ("t1".to_string(), dec!(30)),
            ("t2".to_string(), dec!(40)),
            ("t1".to_string(), dec!(45)),
            ("other".to_string(), dec!(999)),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let rows = engine.task_progress_batch(&tasks, &quantities, today).unwrap();
        assert_eq!(rows[0].realized_quantity, dec!(75));
        assert_eq!(rows[0].progress_percentage, dec!(75));
        assert!(rows[0].is_delayed);
        assert_eq!(rows[1].progress_percentage, dec!(100));
        assert!(!rows[1].is_delayed);
    }
}
