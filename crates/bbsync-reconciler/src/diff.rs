//! Grant comparison and change planning.

use std::collections::HashSet;

use bbsync_client::GroupGrant;

/// Order-independent equality over `(group, permission)` pairs.
///
/// Sensitive to permission level and to the number of grants.
pub fn groups_equal(desired: &[GroupGrant], remote: &[GroupGrant]) -> bool {
    if desired.len() != remote.len() {
        return false;
    }
    let remote: HashSet<&GroupGrant> = remote.iter().collect();
    desired.iter().all(|grant| remote.contains(grant))
}

/// Changes that bring remote grants in line with the declared ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantPlan {
    /// Every declared grant, in declaration order.
    pub upserts: Vec<GroupGrant>,
    /// Remote grants whose group is not declared, in remote order.
    pub revokes: Vec<GroupGrant>,
}

impl GrantPlan {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.revokes.is_empty()
    }
}

/// Plan upserts and revokes.
///
/// Upserts are unconditional: a declared grant that already matches is still
/// written. Revokes match on group name only.
pub fn plan_grant_changes(desired: &[GroupGrant], remote: &[GroupGrant]) -> GrantPlan {
    let declared: HashSet<&str> = desired.iter().map(|g| g.name.as_str()).collect();
    GrantPlan {
        upserts: desired.to_vec(),
        revokes: remote
            .iter()
            .filter(|g| !declared.contains(g.name.as_str()))
            .cloned()
            .collect(),
    }
}
