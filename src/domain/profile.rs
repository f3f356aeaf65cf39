// ==========================================
// 光纤部署监理系统 - 用户档案 (身份层级)
// ==========================================
// 层级用 superior_id 表示,遍历见 engine::hierarchy
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::ProfileRole;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub code: String,
    pub last_name: String,
    pub first_names: String,
    pub role: ProfileRole,
    pub superior_id: Option<String>,
    pub created_at: NaiveDateTime,
}

impl Profile {
    /// 全名: "NOM Prénoms"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name.to_uppercase(), title_case(&self.first_names))
    }
}

/// 每个单词首字母大写、其余小写,连字符与撇号同样视为词界 ("jean-marc" → "Jean-Marc")
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn profile(last_name: &str, first_names: &str) -> Profile {
        Profile {
            id: "p-1".to_string(),
            code: "C1".to_string(),
            last_name: last_name.to_string(),
            first_names: first_names.to_string(),
            role: ProfileRole::Coordonnateur,
            superior_id: None,
            created_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_full_name_capitalizes_each_first_name() {
        assert_eq!(profile("kouassi", "jean-marc").full_name(), "KOUASSI Jean-Marc");
        assert_eq!(profile("Diallo", "AMINATA fatou").full_name(), "DIALLO Aminata Fatou");
        assert_eq!(profile("o'brien", "éric").full_name(), "O'BRIEN Éric");
        assert_eq!(profile("Koné", "").full_name(), "KONÉ ");
    }
}
