//! Add/delete/update partition of two directory listings

use crate::entry::DirectoryListing;

/// What has to happen to make one directory level of the destination
/// match the source. The three sets partition the union of both name
/// sets with no overlap.
#[derive(Debug, Default, Clone)]
pub struct SyncPlan {
    /// Present in the source only
    pub to_add: Vec<String>,
    /// Present in the destination only
    pub to_delete: Vec<String>,
    /// Present on both sides
    pub to_update: Vec<String>,
}

/// Compare two listings by name. Pure set arithmetic, no I/O.
pub fn plan(source: &DirectoryListing, dest: &DirectoryListing) -> SyncPlan {
    let mut plan = SyncPlan::default();

    for name in source.keys() {
        if dest.contains_key(name) {
            plan.to_update.push(name.clone());
        } else {
            plan.to_add.push(name.clone());
        }
    }

    for name in dest.keys() {
        if !source.contains_key(name) {
            plan.to_delete.push(name.clone());
        }
    }

    plan
}
