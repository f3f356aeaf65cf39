// ==========================================
// 光纤部署监理系统 - 用户层级遍历引擎
// ==========================================
// 层级以 (id, superior_id) 平铺边表示,不持有对象间引用
// 遍历一律迭代 (BFS / 逐级上溯),带深度上限与已访问集合
// ==========================================

use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{instrument, warn};

/// 下级遍历结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubordinateWalk {
    /// 按 BFS 层序排列的下级 id (不含根)
    pub ids: Vec<String>,
    /// 因深度上限截断
    pub truncated: bool,
    /// 遇到已访问节点 (数据中存在环)
    pub cycle_detected: bool,
}

/// 设置上级前的检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperiorCheck {
    Ok,
    /// 新上级是自己或自己的下级
    WouldCreateCycle,
    /// 上溯链超过深度上限
    TooDeep,
}

// ==========================================
// HierarchyEngine
// ==========================================
#[derive(Debug, Clone)]
pub struct HierarchyEngine {
    max_depth: usize,
}

impl HierarchyEngine {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 列出 root 的全部 (直接 + 间接) 下级
    #[instrument(skip(self, edges), fields(edges = edges.len()))]
    pub fn subordinates(&self, root: &str, edges: &[(String, Option<String>)]) -> SubordinateWalk {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for (id, superior) in edges {
            if let Some(sup) = superior.as_deref() {
                children.entry(sup).or_default().push(id.as_str());
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
        }

        let mut walk = SubordinateWalk::default();
        let mut visited: HashSet<&str> = HashSet::from([root]);
        let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(root, 0)]);

        while let Some((node, depth)) = queue.pop_front() {
            let Some(kids) = children.get(node) else {
                continue;
            };
            if depth >= self.max_depth {
                walk.truncated = true;
                continue;
            }
            for &kid in kids {
                if !visited.insert(kid) {
                    walk.cycle_detected = true;
                    continue;
                }
                walk.ids.push(kid.to_string());
                queue.push_back((kid, depth + 1));
            }
        }

        if walk.cycle_detected {
            warn!(root = %root, "层级数据中存在环");
        }
        if walk.truncated {
            warn!(root = %root, max_depth = self.max_depth, "层级遍历达到深度上限");
        }
        walk
    }

    /// 检查把 `id` 的上级设为 `new_superior` 是否安全
    ///
    /// 从新上级逐级上溯,若回到 `id` 则成环
    pub fn check_superior(
        &self,
        id: &str,
        new_superior: &str,
        edges: &[(String, Option<String>)],
    ) -> SuperiorCheck {
        if id == new_superior {
            return SuperiorCheck::WouldCreateCycle;
        }

        let parent: HashMap<&str, &str> = edges
            .iter()
            .filter_map(|(child, sup)| sup.as_deref().map(|s| (child.as_str(), s)))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = new_superior;
        for _ in 0..self.max_depth {
            if current == id {
                return SuperiorCheck::WouldCreateCycle;
            }
            // 已有环但不经过 id
            if !seen.insert(current) {
                return SuperiorCheck::Ok;
            }
            match parent.get(current) {
                Some(next) => current = next,
                None => return SuperiorCheck::Ok,
            }
        }
        SuperiorCheck::TooDeep
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(pairs: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
        pairs
            .iter()
            .map(|(id, sup)| (id.to_string(), sup.map(|s| s.to_string())))
            .collect()
    }

    #[test]
    fn test_subordinates_breadth_first() {
        let engine = HierarchyEngine::new(32);
        let e = edges(&[
            ("boss", None),
            ("a", Some("boss")),
            ("b", Some("boss")),
            ("a1", Some("a")),
            ("b1", Some("b")),
            ("a1x", Some("a1")),
        ]);
        let walk = engine.subordinates("boss", &e);
        assert_eq!(walk.ids, vec!["a", "b", "a1", "b1", "a1x"]);
        assert!(!walk.truncated);
        assert!(!walk.cycle_detected);
    }

    #[test]
    fn test_subordinates_stop_at_depth_guard() {
        let engine = HierarchyEngine::new(2);
        let e = edges(&[("r", None), ("l1", Some("r")), ("l2", Some("l1")), ("l3", Some("l2"))]);
        let walk = engine.subordinates("r", &e);
        assert_eq!(walk.ids, vec!["l1", "l2"]);
        assert!(walk.truncated);
    }

    #[test]
    fn test_subordinates_survive_corrupt_cycle() {
        let engine = HierarchyEngine::new(32);
        let e = edges(&[("x", Some("y")), ("y", Some("x"))]);
        let walk = engine.subordinates("x", &e);
        assert_eq!(walk.ids, vec!["y"]);
        assert!(walk.cycle_detected);
    }

    #[test]
    fn test_check_superior_rejects_descendant() {
        let engine = HierarchyEngine::new(32);
        let e = edges(&[("boss", None), ("a", Some("boss")), ("a1", Some("a"))]);
        assert_eq!(engine.check_superior("boss", "a1", &e), SuperiorCheck::WouldCreateCycle);
        assert_eq!(engine.check_superior("a", "a", &e), SuperiorCheck::WouldCreateCycle);
        assert_eq!(engine.check_superior("a1", "boss", &e), SuperiorCheck::Ok);
    }

    #[test]
    fn test_check_superior_depth_guard() {
        let engine = HierarchyEngine::new(2);
        let e = edges(&[("r", None), ("l1", Some("r")), ("l2", Some("l1")), ("new", None)]);
        assert_eq!(engine.check_superior("new", "l2", &e), SuperiorCheck::TooDeep);
    }
}
