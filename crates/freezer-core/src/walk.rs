//! Depth and cycle bookkeeping shared by the explicit-stack walks.
//!
//! Both walks keep their own frame stacks; this guard only tracks the
//! current path. A container is identified by the address of its shared
//! allocation, so the same container reached twice through siblings is
//! fine while a container reached again through its own descendants is a
//! cycle.

use std::collections::HashSet;

use crate::config::FreezeConfig;
use crate::error::FreezeError;

pub(crate) struct PathGuard {
    limit: usize,
    ancestors: HashSet<usize>,
}

impl PathGuard {
    pub(crate) fn new(config: &FreezeConfig) -> Self {
        Self {
            limit: config.max_depth,
            ancestors: HashSet::new(),
        }
    }

    /// Register a container about to be entered at `depth` (root = 1).
    pub(crate) fn enter(
        &mut self,
        depth: usize,
        id: Option<usize>,
        type_name: &str,
    ) -> Result<(), FreezeError> {
        if depth > self.limit {
            return Err(FreezeError::DepthExceeded { limit: self.limit });
        }
        if let Some(id) = id {
            if !self.ancestors.insert(id) {
                return Err(FreezeError::CyclicStructure {
                    type_name: type_name.to_string(),
                    depth,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self, id: Option<usize>) {
        if let Some(id) = id {
            self.ancestors.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentering_an_ancestor_is_a_cycle() {
        let mut guard = PathGuard::new(&FreezeConfig::default());
        guard.enter(1, Some(7), "list").unwrap();
        assert!(matches!(
            guard.enter(2, Some(7), "list"),
            Err(FreezeError::CyclicStructure { depth: 2, .. })
        ));
    }

    #[test]
    fn siblings_may_share_a_container() {
        let mut guard = PathGuard::new(&FreezeConfig::default());
        guard.enter(1, Some(1), "list").unwrap();
        guard.enter(2, Some(2), "list").unwrap();
        guard.leave(Some(2));
        assert!(guard.enter(2, Some(2), "list").is_ok());
    }

    #[test]
    fn depth_limit_is_inclusive() {
        let mut guard = PathGuard::new(&FreezeConfig::default().with_max_depth(2));
        assert!(guard.enter(2, None, "tuple").is_ok());
        assert_eq!(
            guard.enter(3, None, "tuple"),
            Err(FreezeError::DepthExceeded { limit: 2 })
        );
    }
}
