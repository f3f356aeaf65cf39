// ==========================================
// 光纤部署监理系统 - 用户层级 API
// ==========================================
// 职责: 人员档案与上下级关系
// 其他模块对人员只保存不透明 id,不在此校验
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{blank_to_none, require_non_blank};
use crate::api::{new_id, now};
use crate::domain::profile::Profile;
use crate::domain::types::ProfileRole;
use crate::engine::{HierarchyEngine, SuperiorCheck};
use crate::perf::PerfGuard;
use crate::repository::ProfileRepository;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileInput {
    pub code: String,
    pub last_name: String,
    pub first_names: String,
    pub role: ProfileRole,
    pub superior_id: Option<String>,
}

/// 下级列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubordinatesView {
    pub root_id: String,
    pub subordinates: Vec<Profile>,
    /// 达到深度上限,结果不完整
    pub truncated: bool,
}

pub struct ProfileApi {
    profile_repo: Arc<ProfileRepository>,
    hierarchy: HierarchyEngine,
}

impl ProfileApi {
    pub fn new(profile_repo: Arc<ProfileRepository>, hierarchy: HierarchyEngine) -> Self {
        Self {
            profile_repo,
            hierarchy,
        }
    }

    pub fn create_profile(&self, input: ProfileInput) -> ApiResult<Profile> {
        let code = require_non_blank("工号", &input.code)?;
        let last_name = require_non_blank("姓", &input.last_name)?;
        let first_names = input.first_names.trim().to_string();
        let superior_id = blank_to_none(input.superior_id);
        if let Some(sup) = superior_id.as_deref() {
            self.require_profile(sup)?;
        }

        let profile = Profile {
            id: new_id(),
            code,
            last_name,
            first_names,
            role: input.role,
            superior_id,
            created_at: now(),
        };
        self.profile_repo.insert(&profile)?;
        info!(profile_id = %profile.id, code = %profile.code, role = %profile.role, "人员档案已创建");
        Ok(profile)
    }

    pub fn get_profile(&self, id: &str) -> ApiResult<Profile> {
        self.profile_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Profile", id))
    }

    pub fn get_profile_by_code(&self, code: &str) -> ApiResult<Profile> {
        self.profile_repo
            .find_by_code(code.trim())?
            .ok_or_else(|| ApiError::not_found("Profile", code))
    }

    pub fn list_profiles(&self) -> ApiResult<Vec<Profile>> {
        Ok(self.profile_repo.list_all()?)
    }

    pub fn list_direct_reports(&self, id: &str) -> ApiResult<Vec<Profile>> {
        Ok(self.profile_repo.list_direct_reports(id)?)
    }

    pub fn full_name(&self, id: &str) -> ApiResult<String> {
        Ok(self.get_profile(id)?.full_name())
    }

    /// 全部直接与间接下级 (广度优先)
    pub fn list_subordinates(&self, id: &str) -> ApiResult<SubordinatesView> {
        let _perf = PerfGuard::new("list_subordinates");
        self.require_profile(id)?;

        let edges = self.profile_repo.load_edges()?;
        let walk = self.hierarchy.subordinates(id, &edges);

        let mut by_id: HashMap<String, Profile> = self
            .profile_repo
            .list_all()?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        let subordinates = walk.ids.iter().filter_map(|sid| by_id.remove(sid)).collect();

        Ok(SubordinatesView {
            root_id: id.to_string(),
            subordinates,
            truncated: walk.truncated,
        })
    }

    /// 设置或清除上级
    ///
    /// # 错误
    /// - ValidationError: 新上级是自己或自己的下级,或上溯链超过深度上限
    /// - ReferenceError: 上级不存在
    pub fn set_superior(&self, id: &str, superior_id: Option<&str>) -> ApiResult<Profile> {
        self.get_profile(id)?;
        let Some(sup) = superior_id else {
            self.profile_repo.set_superior(id, None)?;
            info!(profile_id = %id, "上级已清除");
            return self.get_profile(id);
        };
        self.require_profile(sup)?;

        // 环检测与写入在同一事务内,避免并发改动绕过检测
        let outcome = self.profile_repo.set_superior_checked(id, Some(sup), |edges| {
            match self.hierarchy.check_superior(id, sup, edges) {
                SuperiorCheck::Ok => Ok(()),
                rejected => Err(rejected),
            }
        })?;
        match outcome {
            Ok(()) => {}
            Err(SuperiorCheck::TooDeep) => {
                warn!(profile_id = %id, superior_id = %sup, max_depth = self.hierarchy.max_depth(), "层级过深,已拒绝");
                return Err(ApiError::validation(format!(
                    "层级深度超过上限 {}",
                    self.hierarchy.max_depth()
                )));
            }
            Err(_) => {
                warn!(profile_id = %id, superior_id = %sup, "上级设置将形成环,已拒绝");
                return Err(ApiError::validation(format!(
                    "不能将 {} 设为 {} 的上级: 将形成环",
                    sup, id
                )));
            }
        }

        info!(profile_id = %id, superior_id = %sup, "上级已更新");
        self.get_profile(id)
    }

    fn require_profile(&self, id: &str) -> ApiResult<()> {
        if self.profile_repo.find_by_id(id)?.is_none() {
            return Err(ApiError::ReferenceError(format!("人员不存在: {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_fixtures::shared_conn;

    fn api(max_depth: usize) -> ProfileApi {
        ProfileApi::new(
            Arc::new(ProfileRepository::new(shared_conn())),
            HierarchyEngine::new(max_depth),
        )
    }

    fn create(api: &ProfileApi, code: &str, superior: Option<&Profile>) -> Profile {
        api.create_profile(ProfileInput {
            code: code.to_string(),
            last_name: format!("Kouame{}", code),
            first_names: "Jean Marc".to_string(),
            role: ProfileRole::Superviseur,
            superior_id: superior.map(|p| p.id.clone()),
        })
        .unwrap()
    }

    #[test]
    fn test_full_name_upper_cases_last_name() {
        let api = api(32);
        let p = api
            .create_profile(ProfileInput {
                code: "U1".to_string(),
                last_name: "Koné".to_string(),
                first_names: "Awa".to_string(),
                role: ProfileRole::Coordonnateur,
                superior_id: None,
            })
            .unwrap();
        assert_eq!(api.full_name(&p.id).unwrap(), "KONÉ Awa");
    }

    #[test]
    fn test_subordinates_and_cycle_rejection() {
        let api = api(32);
        let boss = create(&api, "B", None);
        let a = create(&api, "A", Some(&boss));
        let a1 = create(&api, "A1", Some(&a));
        let b = create(&api, "C", Some(&boss));

        let view = api.list_subordinates(&boss.id).unwrap();
        let codes: Vec<_> = view.subordinates.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes.len(), 3);
        assert_eq!(codes[2], "A1");
        assert!(!view.truncated);

        assert!(matches!(
            api.set_superior(&boss.id, Some(&a1.id)),
            Err(ApiError::ValidationError(_))
        ));
        assert!(matches!(
            api.set_superior(&a.id, Some(&a.id)),
            Err(ApiError::ValidationError(_))
        ));

        let moved = api.set_superior(&a1.id, Some(&b.id)).unwrap();
        assert_eq!(moved.superior_id.as_deref(), Some(b.id.as_str()));
        assert_eq!(api.list_direct_reports(&b.id).unwrap().len(), 1);

        let cleared = api.set_superior(&a1.id, None).unwrap();
        assert_eq!(cleared.superior_id, None);
    }

    #[test]
    fn test_unknown_superior_is_reference_error() {
        let api = api(32);
        let p = create(&api, "X", None);
        assert!(matches!(
            api.set_superior(&p.id, Some("ghost")),
            Err(ApiError::ReferenceError(_))
        ));
    }

    #[test]
    fn test_depth_guard_truncates_walk() {
        let api = api(2);
        let r = create(&api, "R", None);
        let l1 = create(&api, "L1", Some(&r));
        let l2 = create(&api, "L2", Some(&l1));
        create(&api, "L3", Some(&l2));

        let view = api.list_subordinates(&r.id).unwrap();
        assert_eq!(view.subordinates.len(), 2);
        assert!(view.truncated);
    }

    #[test]
    fn test_concurrent_swaps_never_form_a_cycle() {
        for _ in 0..20 {
            let api = api(32);
            let boss = create(&api, "B", None);
            let a = create(&api, "A", Some(&boss));
            let b = create(&api, "C", Some(&boss));

            let (first, second) = std::thread::scope(|s| {
                let h1 = s.spawn(|| api.set_superior(&a.id, Some(&b.id)));
                let h2 = s.spawn(|| api.set_superior(&b.id, Some(&a.id)));
                (h1.join().unwrap(), h2.join().unwrap())
            });
            assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);

            let a_now = api.get_profile(&a.id).unwrap();
            let b_now = api.get_profile(&b.id).unwrap();
            assert!(
                !(a_now.superior_id.as_deref() == Some(b.id.as_str())
                    && b_now.superior_id.as_deref() == Some(a.id.as_str()))
            );
        }
    }
}
