//! Virtual-workspace authorizer (§4.D): dispatches an authorization check to
//! whichever authorizer is registered for the virtual workspace a request
//! resolved to. An unresolved name abstains quietly; a resolved-but-unknown
//! name abstains loudly — that shape only arises from a bug earlier in the
//! chain and must never be mistaken for "no opinion, allow".

use std::collections::HashMap;

/// Authorization outcome, mirroring the allow/deny/no-opinion tri-state used
/// throughout Kubernetes' own authorizer chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
    NoOpinion { reason: String },
}

/// One virtual workspace's authorization policy.
pub trait VirtualWorkspaceAuthorizer: Send + Sync {
    fn authorize(&self, user: &str, groups: &[String], verb: &str) -> Decision;
}

/// The name → authorizer registry (§4.D).
#[derive(Default)]
pub struct VirtualWorkspaceAuthorizers {
    by_name: HashMap<String, Box<dyn VirtualWorkspaceAuthorizer>>,
}

impl VirtualWorkspaceAuthorizers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, authorizer: Box<dyn VirtualWorkspaceAuthorizer>) {
        self.by_name.insert(name.into(), authorizer);
    }

    /// Authorize a request already resolved to `virtual_workspace_name`
    /// (empty when no virtual-workspace routing matched this request).
    pub fn authorize(
        &self,
        virtual_workspace_name: &str,
        user: &str,
        groups: &[String],
        verb: &str,
    ) -> Decision {
        if virtual_workspace_name.is_empty() {
            return Decision::NoOpinion {
                reason: "path not resolved".to_owned(),
            };
        }

        match self.by_name.get(virtual_workspace_name) {
            Some(authorizer) => authorizer.authorize(user, groups, verb),
            None => Decision::NoOpinion {
                reason: format!(
                    "no authorizer registered for virtual workspace {virtual_workspace_name:?}: prior middleware resolved a name that was never registered"
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AllowAll;
    impl VirtualWorkspaceAuthorizer for AllowAll {
        fn authorize(&self, _user: &str, _groups: &[String], _verb: &str) -> Decision {
            Decision::Allow
        }
    }

    #[test]
    fn empty_name_abstains_quietly() {
        let registry = VirtualWorkspaceAuthorizers::new();
        let decision = registry.authorize("", "alice", &[], "list");
        assert_eq!(decision, Decision::NoOpinion { reason: "path not resolved".to_owned() });
    }

    #[test]
    fn unresolved_name_abstains_with_error_reason() {
        let registry = VirtualWorkspaceAuthorizers::new();
        let decision = registry.authorize("workspaces", "alice", &[], "list");
        match decision {
            Decision::NoOpinion { reason } => assert!(reason.contains("never registered")),
            other => panic!("expected NoOpinion, got {other:?}"),
        }
    }

    #[test]
    fn registered_name_delegates() {
        let mut registry = VirtualWorkspaceAuthorizers::new();
        registry.register("workspaces", Box::new(AllowAll));
        let decision = registry.authorize("workspaces", "alice", &[], "list");
        assert_eq!(decision, Decision::Allow);
    }
}
