//! Access rules for categories and their content.

use crate::domain::entities::Category;
use crate::domain::value_objects::{Role, UserSnapshot};

/// The authenticated caller, as seen by services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: i64,
    pub username: String,
    pub avatar: String,
    pub role: Role,
}

impl Actor {
    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            username: self.username.clone(),
            avatar: self.avatar.clone(),
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Why a read was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    /// Private content and no caller.
    Unauthenticated,
    /// Caller's role is not in `allowed_roles`.
    Forbidden,
}

/// Domain service deciding category visibility and content ownership.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Public categories are open to everyone. Private ones need a caller
    /// whose role is allowed.
    pub fn can_view(category: &Category, actor: Option<&Actor>) -> Result<(), AccessDenied> {
        if !category.is_private {
            return Ok(());
        }
        match actor {
            None => Err(AccessDenied::Unauthenticated),
            Some(actor) if category.allows(actor.role) => Ok(()),
            Some(_) => Err(AccessDenied::Forbidden),
        }
    }

    /// Whether `actor` may start threads or reply inside `category`.
    pub fn can_post_in(category: &Category, actor: &Actor) -> bool {
        !category.is_private || category.allows(actor.role)
    }

    /// Owners and staff may modify content.
    pub fn can_modify(owner_id: i64, actor: &Actor) -> bool {
        owner_id == actor.id || actor.is_staff()
    }

    /// Locked threads only accept changes from staff.
    pub fn can_write_to_locked(is_locked: bool, actor: &Actor) -> bool {
        !is_locked || actor.is_staff()
    }

    /// Accounts are managed by their owner or an admin.
    pub fn can_manage_account(user_id: i64, actor: &Actor) -> bool {
        user_id == actor.id || actor.is_admin()
    }
}

#[cfg(test)]
pub(crate) fn actor(id: i64, role: Role) -> Actor {
    Actor {
        id,
        username: format!("user{}", id),
        avatar: "default-avatar.png".into(),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_category(roles: Vec<Role>) -> Category {
        Category {
            is_private: true,
            allowed_roles: roles,
            ..Default::default()
        }
    }

    #[test]
    fn test_public_category_open_to_anonymous() {
        assert_eq!(AccessPolicy::can_view(&Category::default(), None), Ok(()));
    }

    #[test]
    fn test_private_category_requires_caller() {
        let category = private_category(vec![Role::Admin]);
        assert_eq!(
            AccessPolicy::can_view(&category, None),
            Err(AccessDenied::Unauthenticated)
        );
    }

    #[test]
    fn test_private_category_checks_role() {
        let category = private_category(vec![Role::Moderator, Role::Admin]);
        assert_eq!(
            AccessPolicy::can_view(&category, Some(&actor(1, Role::User))),
            Err(AccessDenied::Forbidden)
        );
        assert_eq!(
            AccessPolicy::can_view(&category, Some(&actor(1, Role::Moderator))),
            Ok(())
        );
    }

    #[test]
    fn test_allowed_roles_only_bind_private_categories() {
        let category = Category {
            allowed_roles: vec![Role::Admin],
            ..Default::default()
        };
        assert!(AccessPolicy::can_post_in(&category, &actor(1, Role::User)));

        let category = private_category(vec![Role::Admin]);
        assert!(!AccessPolicy::can_post_in(&category, &actor(1, Role::User)));
        assert!(AccessPolicy::can_post_in(&category, &actor(1, Role::Admin)));
    }

    #[test]
    fn test_owner_or_staff_can_modify() {
        assert!(AccessPolicy::can_modify(7, &actor(7, Role::User)));
        assert!(!AccessPolicy::can_modify(7, &actor(8, Role::User)));
        assert!(AccessPolicy::can_modify(7, &actor(8, Role::Moderator)));
        assert!(AccessPolicy::can_modify(7, &actor(8, Role::Admin)));
    }

    #[test]
    fn test_locked_threads() {
        assert!(AccessPolicy::can_write_to_locked(false, &actor(1, Role::User)));
        assert!(!AccessPolicy::can_write_to_locked(true, &actor(1, Role::User)));
        assert!(AccessPolicy::can_write_to_locked(true, &actor(1, Role::Moderator)));
    }

    #[test]
    fn test_account_management_is_self_or_admin() {
        assert!(AccessPolicy::can_manage_account(3, &actor(3, Role::User)));
        assert!(!AccessPolicy::can_manage_account(3, &actor(4, Role::Moderator)));
        assert!(AccessPolicy::can_manage_account(3, &actor(4, Role::Admin)));
    }
}
