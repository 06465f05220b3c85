//! Group directory: creating, joining and listing groups and members.

use crate::activity::ActivityLog;
use crate::error::{Error, Result};
use crate::identity::Actor;
use crate::models::{ActivityKind, Group, Member, MemberRole};
use crate::storage::{new_id, CollectionPath, DocumentStore, DocumentStoreExt, Filter, Subcollection};
use serde_json::Map;
use std::sync::Arc;

/// Attempts at drawing an unused invite code before giving up.
const INVITE_CODE_ATTEMPTS: usize = 8;

/// Group and membership records.
pub struct GroupDirectory {
    store: Arc<dyn DocumentStore>,
    activity: ActivityLog,
}

impl GroupDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    fn members_path(group_id: &str) -> CollectionPath {
        CollectionPath::group_sub(group_id, Subcollection::Members)
    }

    /// Create a group with `actor` as its admin.
    pub fn create_group(&self, actor: &Actor, name: &str) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("group name must not be empty".into()));
        }

        let groups = CollectionPath::groups();
        let mut created = None;
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let group = Group::new(new_id(), name.to_string(), actor.user_id.clone());
            let unique = [Filter::eq(Group::FIELD_INVITE_CODE, group.invite_code.as_str())];
            if self
                .store
                .insert_unless_exists_as(&groups, &unique, &group.id, &group)?
            {
                created = Some(group);
                break;
            }
        }
        let group = created
            .ok_or_else(|| Error::Storage("could not allocate an unused invite code".into()))?;

        let admin = Member::new(
            new_id(),
            actor.user_id.clone(),
            actor.display_name.clone(),
            MemberRole::Admin,
        );
        self.store
            .put_as(&Self::members_path(&group.id), &admin.id, &admin)?;

        tracing::info!("Group {} created by {} (code {})", group.id, actor.user_id, group.invite_code);
        self.activity
            .record(&group.id, actor, ActivityKind::MemberJoined, Map::new());
        Ok(group)
    }

    /// Join the group that owns `invite_code`.
    pub fn join_group(&self, actor: &Actor, invite_code: &str) -> Result<Group> {
        let code = Group::normalize_invite_code(invite_code);
        if code.is_empty() {
            return Err(Error::InvalidInviteCode);
        }

        let group = self
            .store
            .query_as::<Group>(
                &CollectionPath::groups(),
                &[Filter::eq(Group::FIELD_INVITE_CODE, code)],
            )?
            .into_iter()
            .next()
            .ok_or(Error::InvalidInviteCode)?;
        if group.is_deleting() {
            return Err(Error::GroupDeleting(group.id));
        }

        let member = Member::new(
            new_id(),
            actor.user_id.clone(),
            actor.display_name.clone(),
            MemberRole::Member,
        );
        let one_per_user = [Filter::eq(Member::FIELD_USER_ID, actor.user_id.as_str())];
        if !self.store.insert_unless_exists_as(
            &Self::members_path(&group.id),
            &one_per_user,
            &member.id,
            &member,
        )? {
            return Err(Error::AlreadyMember);
        }

        // A cascade that started before the insert landed may already have
        // cleared the members; the marker is set before that happens.
        let current = self.store.get_as::<Group>(&CollectionPath::groups(), &group.id)?;
        if current.map_or(true, |g| g.is_deleting()) {
            self.store.delete(&Self::members_path(&group.id), &member.id)?;
            tracing::info!("Join of {} to {} undone, group is being deleted", actor.user_id, group.id);
            return Err(Error::GroupDeleting(group.id));
        }

        tracing::info!("{} joined group {}", actor.user_id, group.id);
        self.activity
            .record(&group.id, actor, ActivityKind::MemberJoined, Map::new());
        Ok(group)
    }

    /// Look up a group.
    pub fn group(&self, group_id: &str) -> Result<Group> {
        self.store
            .get_as(&CollectionPath::groups(), group_id)?
            .ok_or_else(|| Error::GroupNotFound(group_id.to_string()))
    }

    /// Every group not being deleted.
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let mut groups = self.store.list_as::<Group>(&CollectionPath::groups())?;
        groups.retain(|g| !g.is_deleting());
        Ok(groups)
    }

    /// Groups `user_id` belongs to, skipping groups being deleted.
    pub fn groups_for(&self, user_id: &str) -> Result<Vec<Group>> {
        let mut groups = Vec::new();
        for group in self.list_groups()? {
            if self.membership(&group.id, user_id)?.is_some() {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    /// All member records of a group.
    pub fn members(&self, group_id: &str) -> Result<Vec<Member>> {
        self.store.list_as(&Self::members_path(group_id))
    }

    /// Live membership count; the sole input to quorum sizing.
    pub fn member_count(&self, group_id: &str) -> Result<usize> {
        Ok(self.store.list(&Self::members_path(group_id))?.len())
    }

    /// The member record of `user_id`, if any.
    pub fn membership(&self, group_id: &str, user_id: &str) -> Result<Option<Member>> {
        Ok(self
            .store
            .query_as::<Member>(
                &Self::members_path(group_id),
                &[Filter::eq(Member::FIELD_USER_ID, user_id)],
            )?
            .into_iter()
            .next())
    }

    /// The member record of `actor`, or [`Error::NotMember`].
    pub fn require_member(&self, group_id: &str, actor: &Actor) -> Result<Member> {
        self.membership(group_id, &actor.user_id)?
            .ok_or(Error::NotMember)
    }
}
