use crate::domain::models::{GroupId, UserId};

/// A notification target: either a single user or a group of users.
///
/// Directory lookups can return either shape; callers flatten once via
/// [`Principal::user_ids`] instead of branching on the variant downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    User(UserId),
    Group { id: GroupId, members: Vec<UserId> },
}

impl Principal {
    /// Project the principal onto its concrete users.
    pub fn user_ids(&self) -> Vec<UserId> {
        match self {
            Principal::User(id) => vec![*id],
            Principal::Group { members, .. } => members.clone(),
        }
    }
}
