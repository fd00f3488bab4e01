// ── Known-roles set ──
//
// Distinct role values observed across all users, kept for form
// dropdowns. Inserts add incrementally; deletes recompute from what is
// left so a role with no remaining users is retired.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

/// Watched, sorted set of distinct user roles.
pub struct RoleSet {
    roles: watch::Sender<Arc<Vec<String>>>,
}

impl RoleSet {
    pub(crate) fn new() -> Self {
        let (roles, _) = watch::channel(Arc::new(Vec::new()));
        Self { roles }
    }

    /// Record a role seen on an inserted user. No-op if already known.
    pub(crate) fn note_role(&self, role: &str) {
        if role.is_empty() {
            return;
        }
        self.roles.send_if_modified(|current| {
            if current.iter().any(|r| r == role) {
                return false;
            }
            let mut next: Vec<String> = current.as_ref().clone();
            next.push(role.to_owned());
            next.sort_unstable();
            *current = Arc::new(next);
            true
        });
    }

    /// Recompute from scratch over the surviving users' roles.
    pub(crate) fn recompute<'a>(&self, roles: impl Iterator<Item = &'a str>) {
        let next: BTreeSet<String> = roles
            .filter(|r| !r.is_empty())
            .map(str::to_owned)
            .collect();
        let next: Vec<String> = next.into_iter().collect();
        self.roles.send_if_modified(|current| {
            if **current == next {
                return false;
            }
            *current = Arc::new(next);
            true
        });
    }

    /// Current sorted role list.
    pub fn snapshot(&self) -> Arc<Vec<String>> {
        self.roles.borrow().clone()
    }

    /// Subscribe to role-list changes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<String>>> {
        self.roles.subscribe()
    }

    pub(crate) fn clear(&self) {
        self.roles.send_modify(|current| *current = Arc::new(Vec::new()));
    }
}
