//! The single authorization boundary.
//!
//! Every mutation and every page-level guard asks [`authorize`] whether an
//! acting identity may perform an [`Action`] on a [`Target`]. Nothing else in
//! the crate compares roles or owner ids.

use uuid::Uuid;

use crate::db::{Article, Listing, Profile, Role};

/// The identity behind a request, as far as authorization cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn owns_or_admin(&self, owner: Uuid) -> bool {
        self.id == owner || self.is_admin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    /// Profile fields other than the public ones (role, email, preferences).
    ViewPrivate,
    Create,
    Edit,
    Delete,
    ChangeRole,
    Apply,
    ViewApplicants,
    /// The "listings I posted" section of a member's own page.
    ViewOwnListings,
    ManageUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Listing { owner: Uuid },
    Article { owner: Uuid },
    Profile { id: Uuid },
    /// The user directory behind the admin page.
    Directory,
}

impl From<&Listing> for Target {
    fn from(listing: &Listing) -> Self {
        Target::Listing { owner: listing.created_by }
    }
}

impl From<&Article> for Target {
    fn from(article: &Article) -> Self {
        Target::Article { owner: article.author_id }
    }
}

impl From<&Profile> for Target {
    fn from(profile: &Profile) -> Self {
        Target::Profile { id: profile.id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Unauthenticated,
    Forbidden,
    SelfRoleChange,
}

pub fn authorize(actor: Option<&Actor>, action: Action, target: Target) -> Result<(), Denial> {
    use Action::*;

    if action == View && target != Target::Directory {
        return Ok(());
    }

    let actor = actor.ok_or(Denial::Unauthenticated)?;

    let allowed = match (action, target) {
        (Create, Target::Listing { .. } | Target::Article { .. }) => true,
        (Apply, Target::Listing { .. }) => true,
        (Edit | Delete | ViewApplicants, Target::Listing { owner }) => actor.owns_or_admin(owner),
        (Edit | Delete, Target::Article { owner }) => actor.owns_or_admin(owner),
        (ViewPrivate | Edit, Target::Profile { id }) => actor.id == id,
        (ViewOwnListings, Target::Profile { id }) => {
            actor.id == id && matches!(actor.role, Role::Recruiter | Role::Admin)
        }
        (ChangeRole, Target::Profile { id }) => {
            if !actor.is_admin() {
                false
            } else if actor.id == id {
                return Err(Denial::SelfRoleChange);
            } else {
                true
            }
        }
        (View | ManageUsers, Target::Directory) => actor.is_admin(),
        _ => false,
    };

    if allowed { Ok(()) } else { Err(Denial::Forbidden) }
}

pub fn can(actor: Option<&Actor>, action: Action, target: Target) -> bool {
    authorize(actor, action, target).is_ok()
}

/// What a page may offer the viewer for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub edit: bool,
    pub delete: bool,
    pub view_applicants: bool,
    pub apply: bool,
}

impl Capabilities {
    pub fn for_target(actor: Option<&Actor>, target: Target) -> Self {
        Self {
            edit: can(actor, Action::Edit, target),
            delete: can(actor, Action::Delete, target),
            view_applicants: can(actor, Action::ViewApplicants, target),
            apply: can(actor, Action::Apply, target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: Role) -> Actor {
        Actor { id: Uuid::now_v7(), role }
    }

    #[test]
    fn listings_and_articles_are_public_to_view() {
        let owner = Uuid::now_v7();
        assert_eq!(authorize(None, Action::View, Target::Listing { owner }), Ok(()));
        assert_eq!(authorize(None, Action::View, Target::Article { owner }), Ok(()));
        assert_eq!(authorize(None, Action::View, Target::Profile { id: owner }), Ok(()));
    }

    #[test]
    fn only_owner_or_admin_edits_and_deletes() {
        let owner = actor(Role::Recruiter);
        let stranger = actor(Role::Recruiter);
        let admin = actor(Role::Admin);

        for target in [Target::Listing { owner: owner.id }, Target::Article { owner: owner.id }] {
            for action in [Action::Edit, Action::Delete] {
                assert_eq!(authorize(Some(&owner), action, target), Ok(()));
                assert_eq!(authorize(Some(&admin), action, target), Ok(()));
                assert_eq!(authorize(Some(&stranger), action, target), Err(Denial::Forbidden));
                assert_eq!(authorize(None, action, target), Err(Denial::Unauthenticated));
            }
        }
    }

    #[test]
    fn role_change_requires_admin_and_another_target() {
        let admin = actor(Role::Admin);
        let user = actor(Role::User);
        let recruiter = actor(Role::Recruiter);

        assert_eq!(authorize(Some(&admin), Action::ChangeRole, Target::Profile { id: user.id }), Ok(()));
        assert_eq!(
            authorize(Some(&admin), Action::ChangeRole, Target::Profile { id: admin.id }),
            Err(Denial::SelfRoleChange)
        );
        assert_eq!(
            authorize(Some(&recruiter), Action::ChangeRole, Target::Profile { id: user.id }),
            Err(Denial::Forbidden)
        );
        assert_eq!(
            authorize(Some(&user), Action::ChangeRole, Target::Profile { id: user.id }),
            Err(Denial::Forbidden)
        );
    }

    #[test]
    fn private_profile_fields_are_owner_only() {
        let owner = actor(Role::User);
        let admin = actor(Role::Admin);
        let target = Target::Profile { id: owner.id };

        assert!(can(Some(&owner), Action::ViewPrivate, target));
        assert!(!can(Some(&admin), Action::ViewPrivate, target));
        assert!(!can(Some(&admin), Action::Edit, target));
    }

    #[test]
    fn applying_needs_a_session() {
        let target = Target::Listing { owner: Uuid::now_v7() };
        assert_eq!(authorize(None, Action::Apply, target), Err(Denial::Unauthenticated));
        assert!(can(Some(&actor(Role::User)), Action::Apply, target));
    }

    #[test]
    fn directory_is_admin_only() {
        assert!(can(Some(&actor(Role::Admin)), Action::ManageUsers, Target::Directory));
        assert!(!can(Some(&actor(Role::Recruiter)), Action::ManageUsers, Target::Directory));
        assert!(!can(None, Action::View, Target::Directory));
    }

    #[test]
    fn own_listings_section_is_for_recruiters_and_admins() {
        for (role, shown) in [(Role::User, false), (Role::Recruiter, true), (Role::Admin, true)] {
            let member = actor(role);
            assert_eq!(can(Some(&member), Action::ViewOwnListings, Target::Profile { id: member.id }), shown);
        }

        let admin = actor(Role::Admin);
        let other = Target::Profile { id: Uuid::now_v7() };
        assert!(!can(Some(&admin), Action::ViewOwnListings, other));
        assert!(!can(None, Action::ViewOwnListings, other));
    }

    #[test]
    fn capabilities_follow_ownership() {
        let owner = actor(Role::User);
        let caps = Capabilities::for_target(Some(&owner), Target::Listing { owner: owner.id });
        assert!(caps.edit && caps.delete && caps.view_applicants && caps.apply);

        let anonymous = Capabilities::for_target(None, Target::Listing { owner: owner.id });
        assert_eq!(anonymous, Capabilities::default());
    }
}
