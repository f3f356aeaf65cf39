// ==========================================
// 施工人员 (专业 / 技术员) 集成测试
// ==========================================
// 覆盖: 内置专业初始化 / 技术员读模型 / 旧库升级后建表
// ==========================================


#[cfg(test)]
mod workforce_test {
    use crate::test_helpers::*;
    use deploy_supervisor::api::workforce_api::TechnicianInput;
    use deploy_supervisor::api::{ApiError, SeedSummary};
    use deploy_supervisor::app::AppState;
    use deploy_supervisor::db::{open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
    use deploy_supervisor::domain::workforce::TechnicianFilter;
    use deploy_supervisor::domain::types::SkillLevel;

    fn technician(matricule: &str, speciality_id: &str, level: SkillLevel) -> TechnicianInput {
        TechnicianInput {
            matricule: matricule.to_string(),
            last_name: "Traoré".to_string(),
            first_names: "Ibrahim".to_string(),
            phone: "+225 05 55 55 55".to_string(),
            email: "i.traore@example.ci".to_string(),
            address: "Yopougon".to_string(),
            speciality_id: Some(speciality_id.to_string()),
            skill_level: level,
            hire_date: date(2021, 2, 1),
            birth_date: None,
            national_id_number: "CI0001".to_string(),
            is_site_lead: level == SkillLevel::Expert,
            certifications: String::new(),
            equipment: vec![],
            notes: String::new(),
            photo: None,
        }
    }

    #[test]
    fn test_seeded_specialities_back_technician_views() {
        let (_tmp, state) = create_test_state();
        let api = &state.workforce_api;

        assert_eq!(
            api.seed_default_specialities().unwrap(),
            SeedSummary { created: 6, updated: 0 }
        );
        let specialities = api.list_active_specialities().unwrap();
        let soudure = specialities
            .iter()
            .find(|v| v.speciality.code == "SOUDURE")
            .unwrap();

        api.create_technician(technician("AIV-102", &soudure.speciality.id, SkillLevel::Expert))
            .unwrap();
        api.create_technician(technician("AIV-101", &soudure.speciality.id, SkillLevel::Junior))
            .unwrap();

        let today = date(2024, 2, 1);
        let leads = api
            .list_technicians(
                &TechnicianFilter {
                    is_site_lead: Some(true),
                    ..TechnicianFilter::default()
                },
                today,
            )
            .unwrap();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].technician.matricule, "AIV-102");
        assert_eq!(leads[0].full_name, "Ibrahim TRAORÉ");
        assert_eq!(leads[0].speciality_name.as_deref(), Some("Soudure FO"));
        assert_eq!(leads[0].seniority_years, 3);
        assert_eq!(leads[0].age, None);

        let by_speciality = api.list_by_speciality(&soudure.speciality.id, today).unwrap();
        let matricules: Vec<_> = by_speciality
            .iter()
            .map(|v| v.technician.matricule.as_str())
            .collect();
        assert_eq!(matricules, vec!["AIV-101", "AIV-102"]);

        let counted = api.list_active_specialities().unwrap();
        let soudure = counted.iter().find(|v| v.speciality.code == "SOUDURE").unwrap();
        assert_eq!(soudure.technicians_count, 2);
        assert!(matches!(
            api.delete_speciality(&soudure.speciality.id),
            Err(ApiError::ReferenceError(_))
        ));
    }

    #[test]
    fn test_old_database_gains_workforce_tables_on_open() {
        let (tmp, db_path) = create_test_db().unwrap();
        drop(AppState::new(&db_path).unwrap());
        {
            let conn = open_sqlite_connection(&db_path).unwrap();
            conn.execute_batch(
                "DROP TABLE technician;
                 DROP TABLE speciality;
                 DELETE FROM schema_version;
                 INSERT INTO schema_version (version) VALUES (1);",
            )
            .unwrap();
            assert_eq!(read_schema_version(&conn).unwrap(), Some(1));
        }

        let state = AppState::new(&db_path).unwrap();
        assert_eq!(
            state.workforce_api.seed_default_specialities().unwrap().created,
            6
        );
        let conn = open_sqlite_connection(&db_path).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
        drop(tmp);
    }
}
