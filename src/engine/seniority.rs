// ==========================================
// 光纤部署监理系统 - 年龄/工龄计算引擎
// ==========================================
// 规则: 足年计算,今年的 (月, 日) 未到则减一年
// 2/29 出生的人在平年 3/1 才满岁
// 入职日在 today 之后时工龄记 0
// today 由调用方传入,引擎不读系统时钟
// ==========================================

use chrono::{Datelike, NaiveDate};

use crate::domain::workforce::Technician;

#[derive(Debug, Default, Clone, Copy)]
pub struct SeniorityEngine;

impl SeniorityEngine {
    pub fn new() -> Self {
        Self
    }

    /// from 到 today 之间的足年数
    pub fn full_years(&self, from: NaiveDate, today: NaiveDate) -> i32 {
        let mut years = today.year() - from.year();
        if (today.month(), today.day()) < (from.month(), from.day()) {
            years -= 1;
        }
        years
    }

    /// 年龄 (出生日期未登记时 None)
    pub fn age(&self, technician: &Technician, today: NaiveDate) -> Option<i32> {
        technician
            .birth_date
            .map(|birth| self.full_years(birth, today))
    }

    /// 工龄 (年)
    pub fn seniority(&self, technician: &Technician, today: NaiveDate) -> i32 {
        self.full_years(technician.hire_date, today).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SkillLevel;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn technician(hire_date: NaiveDate, birth_date: Option<NaiveDate>) -> Technician {
        let ts = d(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        Technician {
            id: "t-1".to_string(),
            matricule: "AIV-001".to_string(),
            last_name: "Yao".to_string(),
            first_names: "Koffi".to_string(),
            phone: "+225 01".to_string(),
            email: String::new(),
            address: String::new(),
            speciality_id: None,
            skill_level: SkillLevel::Junior,
            hire_date,
            birth_date,
            national_id_number: String::new(),
            is_site_lead: false,
            certifications: String::new(),
            equipment: vec![],
            is_active: true,
            notes: String::new(),
            photo: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_full_years_counts_only_completed_years() {
        let engine = SeniorityEngine::new();
        assert_eq!(engine.full_years(d(1990, 6, 15), d(2024, 6, 14)), 33);
        assert_eq!(engine.full_years(d(1990, 6, 15), d(2024, 6, 15)), 34);
        assert_eq!(engine.full_years(d(2024, 6, 15), d(2024, 6, 15)), 0);
    }

    #[test]
    fn test_leap_day_birthday() {
        let engine = SeniorityEngine::new();
        assert_eq!(engine.full_years(d(2000, 2, 29), d(2023, 2, 28)), 22);
        assert_eq!(engine.full_years(d(2000, 2, 29), d(2023, 3, 1)), 23);
        assert_eq!(engine.full_years(d(2000, 2, 29), d(2024, 2, 29)), 24);
    }

    #[test]
    fn test_age_and_seniority() {
        let engine = SeniorityEngine::new();
        let today = d(2024, 3, 10);

        let t = technician(d(2019, 4, 1), Some(d(1995, 3, 10)));
        assert_eq!(engine.age(&t, today), Some(29));
        assert_eq!(engine.seniority(&t, today), 4);

        let t = technician(d(2024, 9, 1), None);
        assert_eq!(engine.age(&t, today), None);
        assert_eq!(engine.seniority(&t, today), 0);
    }
}
