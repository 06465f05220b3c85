//! End-to-end voting scenarios against an in-memory store.

use colmeia_hive::storage::{CollectionPath, Subcollection};
use colmeia_hive::{
    ActionKind, Activity, ActivityKind, ActivityLog, Actor, DeletionOutcome, DocumentStore,
    DocumentStoreExt, Error, MemoryStore, StoreActivitySink, VoteStatus, VotingSystem,
};
use serde_json::json;
use std::sync::Arc;

fn actor(id: &str) -> Actor {
    Actor::new(id, id.to_uppercase()).unwrap()
}

fn system() -> VotingSystem {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let activity = ActivityLog::new(Arc::new(StoreActivitySink::new(Arc::clone(&store))));
    VotingSystem::new(store, activity)
}

fn household(system: &VotingSystem, users: &[&str]) -> String {
    let group = system
        .groups()
        .create_group(&actor(users[0]), "República")
        .unwrap();
    for user in &users[1..] {
        system
            .groups()
            .join_group(&actor(user), &group.invite_code)
            .unwrap();
    }
    group.id
}

fn put(system: &VotingSystem, group_id: &str, sub: Subcollection, id: &str) {
    system
        .store()
        .put(
            &CollectionPath::group_sub(group_id, sub),
            id,
            json!({ "title": id }),
        )
        .unwrap();
}

fn exists(system: &VotingSystem, group_id: &str, sub: Subcollection, id: &str) -> bool {
    system
        .store()
        .get(&CollectionPath::group_sub(group_id, sub), id)
        .unwrap()
        .is_some()
}

fn activity_kinds(system: &VotingSystem, group_id: &str) -> Vec<ActivityKind> {
    let entries: Vec<Activity> = system
        .store()
        .list_as(&CollectionPath::group_sub(group_id, Subcollection::Activities))
        .unwrap();
    entries.into_iter().map(|a| a.kind).collect()
}

#[test]
fn four_members_delete_task_by_majority() {
    let system = system();
    let group = household(&system, &["a", "b", "c", "d"]);
    put(&system, &group, Subcollection::Tasks, "t1");

    let vote_id = system
        .create_vote(&actor("a"), &group, ActionKind::DeleteTask, "t1", "Clean kitchen")
        .unwrap();
    let vote = system.vote(&group, &vote_id).unwrap();
    assert_eq!(vote.votes, vec!["a".to_string()]);
    assert_eq!(vote.required_votes, 2);
    assert_eq!(vote.total_members, 4);
    assert_eq!(vote.status, VoteStatus::Pending);

    let vote = system.add_vote(&actor("b"), &group, &vote_id).unwrap();
    assert_eq!(vote.status, VoteStatus::Approved);
    assert!(!exists(&system, &group, Subcollection::Tasks, "t1"));

    let stored = system.vote(&group, &vote_id).unwrap();
    assert_eq!(stored.status, VoteStatus::Approved);
    assert_eq!(stored.votes.len(), 2);

    let kinds = activity_kinds(&system, &group);
    assert!(kinds.contains(&ActivityKind::VoteCreated));
    assert!(kinds.contains(&ActivityKind::TaskDeleted));
    assert!(kinds.contains(&ActivityKind::VoteCompleted));
}

#[test]
fn pair_deletes_expense_without_vote() {
    let system = system();
    let group = household(&system, &["a", "b"]);
    put(&system, &group, Subcollection::Expenses, "e1");

    assert!(!system.needs_voting(&group).unwrap());
    let outcome = system
        .request_deletion(&actor("b"), &group, ActionKind::DeleteExpense, "e1", "Pizza")
        .unwrap();
    assert_eq!(outcome, DeletionOutcome::Deleted);
    assert!(!exists(&system, &group, Subcollection::Expenses, "e1"));
    assert!(system.pending_votes(&group).unwrap().is_empty());
    assert!(activity_kinds(&system, &group).contains(&ActivityKind::ExpenseDeleted));
}

#[test]
fn disbanding_three_members_needs_everyone() {
    let system = system();
    let group = household(&system, &["a", "b", "c"]);
    put(&system, &group, Subcollection::Tasks, "t1");

    let outcome = system
        .request_deletion(&actor("a"), &group, ActionKind::DeleteGroup, &group, "República")
        .unwrap();
    let vote_id = match outcome {
        DeletionOutcome::Proposed { vote_id } => vote_id,
        other => panic!("expected a vote, got {:?}", other),
    };

    let vote = system.add_vote(&actor("b"), &group, &vote_id).unwrap();
    assert_eq!(vote.votes.len(), 2);
    assert_eq!(vote.required_votes, 3);
    assert_eq!(vote.status, VoteStatus::Pending);
    assert!(system.groups().group(&group).is_ok());

    let vote = system.add_vote(&actor("c"), &group, &vote_id).unwrap();
    assert_eq!(vote.status, VoteStatus::Approved);
    assert!(matches!(
        system.groups().group(&group),
        Err(Error::GroupNotFound(_))
    ));
    assert!(!exists(&system, &group, Subcollection::Tasks, "t1"));
    assert!(system.groups().members(&group).unwrap().is_empty());
    assert!(system.groups().groups_for("a").unwrap().is_empty());
}

#[test]
fn ballots_are_idempotent_per_member() {
    let system = system();
    let group = household(&system, &["a", "b", "c", "d", "e"]);

    let vote_id = system
        .create_vote(&actor("a"), &group, ActionKind::DeleteRoutine, "r1", "Trash day")
        .unwrap();
    system.add_vote(&actor("b"), &group, &vote_id).unwrap();

    assert!(matches!(
        system.add_vote(&actor("b"), &group, &vote_id),
        Err(Error::DuplicateVote)
    ));
    assert!(matches!(
        system.add_vote(&actor("a"), &group, &vote_id),
        Err(Error::DuplicateVote)
    ));

    let vote = system.vote(&group, &vote_id).unwrap();
    assert_eq!(vote.votes.len(), 2);
    assert_eq!(vote.status, VoteStatus::Pending);
}

#[test]
fn creator_keeps_their_ballot_and_alone_may_cancel() {
    let system = system();
    let group = household(&system, &["a", "b", "c", "d", "e"]);

    let vote_id = system
        .create_vote(&actor("a"), &group, ActionKind::RemoveMember, "m9", "Zeca")
        .unwrap();
    system.add_vote(&actor("b"), &group, &vote_id).unwrap();

    assert!(matches!(
        system.remove_vote(&actor("a"), &group, &vote_id),
        Err(Error::CreatorCannotRemove)
    ));
    let vote = system.remove_vote(&actor("b"), &group, &vote_id).unwrap();
    assert_eq!(vote.votes, vec!["a".to_string()]);

    assert!(matches!(
        system.cancel_vote(&actor("b"), &group, &vote_id),
        Err(Error::NotCreator)
    ));
    let vote = system.cancel_vote(&actor("a"), &group, &vote_id).unwrap();
    assert_eq!(vote.status, VoteStatus::Rejected);

    assert!(matches!(
        system.add_vote(&actor("c"), &group, &vote_id),
        Err(Error::VoteAlreadyResolved)
    ));
}

#[test]
fn one_pending_vote_per_target() {
    let system = system();
    let group = household(&system, &["a", "b", "c", "d"]);

    let first = system
        .create_vote(&actor("a"), &group, ActionKind::DeleteTask, "t1", "Dishes")
        .unwrap();
    assert!(matches!(
        system.create_vote(&actor("b"), &group, ActionKind::DeleteTask, "t1", "Dishes"),
        Err(Error::DuplicatePendingVote)
    ));

    system.reject_vote(&actor("c"), &group, &first).unwrap();
    assert!(matches!(
        system.vote(&group, &first),
        Err(Error::VoteNotFound)
    ));
    system
        .create_vote(&actor("b"), &group, ActionKind::DeleteTask, "t1", "Dishes")
        .unwrap();
}

#[test]
fn outsiders_cannot_vote() {
    let system = system();
    let group = household(&system, &["a", "b", "c"]);
    let vote_id = system
        .create_vote(&actor("a"), &group, ActionKind::DeleteTask, "t1", "Dishes")
        .unwrap();

    assert!(matches!(
        system.add_vote(&actor("stranger"), &group, &vote_id),
        Err(Error::NotMember)
    ));
    assert!(matches!(
        system.create_vote(&actor("stranger"), &group, ActionKind::DeleteTask, "t2", "Laundry"),
        Err(Error::NotMember)
    ));
}
