//! Group read policy.
//!
//! Repositories resolve hierarchy membership; the decision itself lives here
//! so every backend applies the same rule.

use crate::models::{Group, User, Visibility};

/// Whether `user` may read `group`.
///
/// `member_of_hierarchy` is true when the user is a member of the group or
/// of any of its ancestors.
pub fn can_read_group(user: Option<&User>, group: &Group, member_of_hierarchy: bool) -> bool {
    match group.visibility {
        Visibility::Public => true,
        Visibility::Internal => user.is_some(),
        Visibility::Private => match user {
            Some(user) => user.admin || member_of_hierarchy,
            None => false,
        },
    }
}
