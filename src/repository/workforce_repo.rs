// ==========================================
// 光纤部署监理系统 - 施工人员数据仓储
// ==========================================
// 专业 (speciality) 与技术员 (technician)
// 专业被技术员引用时删除 → ForeignKeyViolation
// ==========================================

use crate::domain::types::SkillLevel;
use crate::domain::workforce::{Speciality, Technician, TechnicianFilter};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::operator_repo::UpsertOutcome;
use crate::repository::row_utils::{
    fmt_date, fmt_datetime, fmt_json_list, fmt_opt_date, get_date, get_datetime, get_enum,
    get_json_list, get_opt_date,
};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const SPECIALITY_COLUMNS: &str = r#"SELECT id, code, name, description, color, is_active,
       display_order, created_at, updated_at
  FROM speciality"#;

const TECHNICIAN_COLUMNS: &str = r#"SELECT id, matricule, last_name, first_names, phone, email,
       address, speciality_id, skill_level, hire_date, birth_date, national_id_number,
       is_site_lead, certifications, equipment_json, is_active, notes, photo,
       created_at, updated_at
  FROM technician"#;

// ==========================================
// SpecialityRepository
// ==========================================
pub struct SpecialityRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SpecialityRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn insert_with(conn: &Connection, s: &Speciality) -> RepositoryResult<()> {
        conn.execute(
            r#"INSERT INTO speciality (
                id, code, name, description, color, is_active, display_order,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                s.id,
                s.code,
                s.name,
                s.description,
                s.color,
                s.is_active,
                s.display_order,
                fmt_datetime(s.created_at),
                fmt_datetime(s.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn insert(&self, s: &Speciality) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, s)?;
        Ok(s.id.clone())
    }

    pub fn update(&self, s: &Speciality) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE speciality
               SET code = ?1, name = ?2, description = ?3, color = ?4, is_active = ?5,
                   display_order = ?6, updated_at = ?7
               WHERE id = ?8"#,
            params![
                s.code,
                s.name,
                s.description,
                s.color,
                s.is_active,
                s.display_order,
                fmt_datetime(s.updated_at),
                s.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Speciality", &s.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Speciality>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", SPECIALITY_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_speciality_row).optional()?)
    }

    pub fn find_by_code(&self, code: &str) -> RepositoryResult<Option<Speciality>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE code = ?1", SPECIALITY_COLUMNS);
        Ok(conn.query_row(&sql, params![code], map_speciality_row).optional()?)
    }

    /// 列表,按 (display_order, name) 排序
    pub fn list(&self, active_only: bool) -> RepositoryResult<Vec<Speciality>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE (?1 = 0 OR is_active = 1) ORDER BY display_order, name",
            SPECIALITY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![active_only], map_speciality_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_active(&self, id: &str, active: bool, updated_at: NaiveDateTime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE speciality SET is_active = ?1, updated_at = ?2 WHERE id = ?3",
            params![active, fmt_datetime(updated_at), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Speciality", id));
        }
        Ok(())
    }

    /// 删除专业 (仍被技术员引用时 → ForeignKeyViolation)
    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM speciality WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Speciality", id));
        }
        Ok(())
    }

    /// 该专业下在职技术员数
    pub fn count_active_technicians(&self, speciality_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM technician WHERE speciality_id = ?1 AND is_active = 1",
            params![speciality_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 批量按 code upsert (单事务),更新时保留 id 与 created_at
    pub fn upsert_batch_by_code(&self, specialities: &[Speciality]) -> RepositoryResult<Vec<UpsertOutcome>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let mut outcomes = Vec::with_capacity(specialities.len());

        for s in specialities {
            let updated = tx.execute(
                r#"UPDATE speciality
                   SET name = ?1, description = ?2, color = ?3, display_order = ?4,
                       is_active = ?5, updated_at = ?6
                   WHERE code = ?7"#,
                params![
                    s.name,
                    s.description,
                    s.color,
                    s.display_order,
                    s.is_active,
                    fmt_datetime(s.updated_at),
                    s.code,
                ],
            )?;
            if updated > 0 {
                outcomes.push(UpsertOutcome::Updated);
            } else {
                Self::insert_with(&tx, s)?;
                outcomes.push(UpsertOutcome::Created);
            }
        }

        tx.commit()?;
        Ok(outcomes)
    }
}

// ==========================================
// TechnicianRepository
// ==========================================
pub struct TechnicianRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TechnicianRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, t: &Technician) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO technician (
                id, matricule, last_name, first_names, phone, email, address,
                speciality_id, skill_level, hire_date, birth_date, national_id_number,
                is_site_lead, certifications, equipment_json, is_active, notes, photo,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                      ?16, ?17, ?18, ?19, ?20)"#,
            params![
                t.id,
                t.matricule,
                t.last_name,
                t.first_names,
                t.phone,
                t.email,
                t.address,
                t.speciality_id,
                t.skill_level.to_db_str(),
                fmt_date(t.hire_date),
                fmt_opt_date(t.birth_date),
                t.national_id_number,
                t.is_site_lead,
                t.certifications,
                fmt_json_list(&t.equipment),
                t.is_active,
                t.notes,
                t.photo,
                fmt_datetime(t.created_at),
                fmt_datetime(t.updated_at),
            ],
        )?;
        Ok(t.id.clone())
    }

    pub fn update(&self, t: &Technician) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"UPDATE technician
               SET matricule = ?1, last_name = ?2, first_names = ?3, phone = ?4, email = ?5,
                   address = ?6, speciality_id = ?7, skill_level = ?8, hire_date = ?9,
                   birth_date = ?10, national_id_number = ?11, is_site_lead = ?12,
                   certifications = ?13, equipment_json = ?14, is_active = ?15, notes = ?16,
                   photo = ?17, updated_at = ?18
               WHERE id = ?19"#,
            params![
                t.matricule,
                t.last_name,
                t.first_names,
                t.phone,
                t.email,
                t.address,
                t.speciality_id,
                t.skill_level.to_db_str(),
                fmt_date(t.hire_date),
                fmt_opt_date(t.birth_date),
                t.national_id_number,
                t.is_site_lead,
                t.certifications,
                fmt_json_list(&t.equipment),
                t.is_active,
                t.notes,
                t.photo,
                fmt_datetime(t.updated_at),
                t.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Technician", &t.id));
        }
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Technician>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE id = ?1", TECHNICIAN_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_technician_row).optional()?)
    }

    pub fn find_by_matricule(&self, matricule: &str) -> RepositoryResult<Option<Technician>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE matricule = ?1", TECHNICIAN_COLUMNS);
        Ok(conn.query_row(&sql, params![matricule], map_technician_row).optional()?)
    }

    /// 按过滤条件列出,按 matricule 排序
    pub fn list(&self, filter: &TechnicianFilter) -> RepositoryResult<Vec<Technician>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
               WHERE (?1 IS NULL OR speciality_id = ?1)
                 AND (?2 IS NULL OR skill_level = ?2)
                 AND (?3 IS NULL OR is_site_lead = ?3)
                 AND (?4 IS NULL OR is_active = ?4)
               ORDER BY matricule"#,
            TECHNICIAN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.speciality_id,
                    filter.skill_level.map(|l| l.to_db_str()),
                    filter.is_site_lead,
                    filter.is_active,
                ],
                map_technician_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete(&self, id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM technician WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Technician", id));
        }
        Ok(())
    }
}

fn map_speciality_row(row: &rusqlite::Row) -> rusqlite::Result<Speciality> {
    Ok(Speciality {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        color: row.get(4)?,
        is_active: row.get(5)?,
        display_order: row.get(6)?,
        created_at: get_datetime(row, 7)?,
        updated_at: get_datetime(row, 8)?,
    })
}

fn map_technician_row(row: &rusqlite::Row) -> rusqlite::Result<Technician> {
    Ok(Technician {
        id: row.get(0)?,
        matricule: row.get(1)?,
        last_name: row.get(2)?,
        first_names: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        address: row.get(6)?,
        speciality_id: row.get(7)?,
        skill_level: get_enum(row, 8, SkillLevel::from_db_str)?,
        hire_date: get_date(row, 9)?,
        birth_date: get_opt_date(row, 10)?,
        national_id_number: row.get(11)?,
        is_site_lead: row.get(12)?,
        certifications: row.get(13)?,
        equipment: get_json_list(row, 14)?,
        is_active: row.get(15)?,
        notes: row.get(16)?,
        photo: row.get(17)?,
        created_at: get_datetime(row, 18)?,
        updated_at: get_datetime(row, 19)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::{date, shared_conn, ts};

    fn speciality(code: &str, order: i64) -> Speciality {
        Speciality {
            id: format!("sp-{}", code),
            code: code.to_string(),
            name: format!("Spécialité {}", code),
            description: String::new(),
            color: "#8B4513".to_string(),
            is_active: true,
            display_order: order,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn technician(matricule: &str, speciality_id: Option<&str>, level: SkillLevel) -> Technician {
        Technician {
            id: format!("t-{}", matricule),
            matricule: matricule.to_string(),
            last_name: "Yao".to_string(),
            first_names: "Koffi".to_string(),
            phone: "+225 07 00 00 00".to_string(),
            email: String::new(),
            address: String::new(),
            speciality_id: speciality_id.map(str::to_string),
            skill_level: level,
            hire_date: date(2020, 5, 4),
            birth_date: None,
            national_id_number: String::new(),
            is_site_lead: false,
            certifications: String::new(),
            equipment: vec!["Soudeuse Fujikura 90S".to_string()],
            is_active: true,
            notes: String::new(),
            photo: None,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn test_speciality_in_use_cannot_be_deleted() {
        let conn = shared_conn();
        let specialities = SpecialityRepository::new(conn.clone());
        let technicians = TechnicianRepository::new(conn);

        specialities.insert(&speciality("FO", 3)).unwrap();
        technicians
            .insert(&technician("AIV-001", Some("sp-FO"), SkillLevel::Senior))
            .unwrap();

        let err = specialities.delete("sp-FO").unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

        technicians.delete("t-AIV-001").unwrap();
        specialities.delete("sp-FO").unwrap();
    }

    #[test]
    fn test_matricule_is_unique() {
        let repo = TechnicianRepository::new(shared_conn());
        repo.insert(&technician("AIV-001", None, SkillLevel::Junior)).unwrap();

        let mut dup = technician("AIV-001", None, SkillLevel::Expert);
        dup.id = "t-other".to_string();
        assert!(matches!(
            repo.insert(&dup).unwrap_err(),
            RepositoryError::UniqueConstraintViolation(_)
        ));
    }

    #[test]
    fn test_filter_and_active_count() {
        let conn = shared_conn();
        let specialities = SpecialityRepository::new(conn.clone());
        let technicians = TechnicianRepository::new(conn);
        specialities.insert(&speciality("GC", 1)).unwrap();
        specialities.insert(&speciality("FO", 3)).unwrap();

        technicians
            .insert(&technician("AIV-002", Some("sp-FO"), SkillLevel::Senior))
            .unwrap();
        technicians
            .insert(&technician("AIV-001", Some("sp-FO"), SkillLevel::Junior))
            .unwrap();
        let mut retired = technician("AIV-003", Some("sp-FO"), SkillLevel::Senior);
        retired.is_active = false;
        technicians.insert(&retired).unwrap();
        let mut lead = technician("AIV-004", Some("sp-GC"), SkillLevel::Expert);
        lead.is_site_lead = true;
        technicians.insert(&lead).unwrap();

        let fo = technicians
            .list(&TechnicianFilter {
                speciality_id: Some("sp-FO".to_string()),
                is_active: Some(true),
                ..TechnicianFilter::default()
            })
            .unwrap();
        let matricules: Vec<_> = fo.iter().map(|t| t.matricule.as_str()).collect();
        assert_eq!(matricules, vec!["AIV-001", "AIV-002"]);

        let seniors = technicians
            .list(&TechnicianFilter {
                skill_level: Some(SkillLevel::Senior),
                ..TechnicianFilter::default()
            })
            .unwrap();
        assert_eq!(seniors.len(), 2);

        let leads = technicians
            .list(&TechnicianFilter {
                is_site_lead: Some(true),
                ..TechnicianFilter::default()
            })
            .unwrap();
        assert_eq!(leads[0].matricule, "AIV-004");
        assert_eq!(leads[0].equipment, vec!["Soudeuse Fujikura 90S".to_string()]);

        assert_eq!(technicians.list(&TechnicianFilter::default()).unwrap().len(), 4);
        assert_eq!(specialities.count_active_technicians("sp-FO").unwrap(), 2);

        let ordered: Vec<_> = specialities
            .list(false)
            .unwrap()
            .into_iter()
            .map(|s| s.code)
            .collect();
        assert_eq!(ordered, vec!["GC", "FO"]);
    }
}
