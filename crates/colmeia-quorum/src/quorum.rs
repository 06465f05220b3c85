//! Quorum sizing for group votes.
//!
//! The rule depends on total membership `n` and on whether the action
//! disbands the group:
//! - n < 3 → 1 (the group acts directly, no vote is opened)
//! - n = 3 → 3 to disband, 2 otherwise
//! - n ≥ 4 → n − 1 to disband, ceil(n / 2) otherwise

use crate::action::ActionKind;

/// Smallest group size that puts destructive actions to a vote.
pub const VOTING_THRESHOLD: usize = 3;

/// Whether a group of `total_members` must vote before destructive actions.
pub const fn needs_voting(total_members: usize) -> bool {
    total_members >= VOTING_THRESHOLD
}

/// Affirmative votes required to approve `kind` in a group of `total_members`.
///
/// Never returns less than 1.
///
/// # Examples
///
/// ```
/// use colmeia_quorum::{required_votes, ActionKind};
///
/// assert_eq!(required_votes(3, ActionKind::DeleteGroup), 3); // unanimous
/// assert_eq!(required_votes(5, ActionKind::DeleteTask), 3);  // ceil(5/2)
/// assert_eq!(required_votes(7, ActionKind::DeleteGroup), 6); // all but one
/// ```
pub const fn required_votes(total_members: usize, kind: ActionKind) -> usize {
    match total_members {
        0..=2 => 1,
        3 => {
            if kind.is_disband() {
                3
            } else {
                2
            }
        }
        n => {
            if kind.is_disband() {
                n - 1
            } else {
                // ceil(n / 2)
                (n + 1) / 2
            }
        }
    }
}

/// Required and total votes for one action, frozen at vote creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quorum {
    /// Affirmative votes needed.
    pub required: usize,
    /// Membership the requirement was computed from.
    pub total: usize,
}

impl Quorum {
    /// Compute the quorum for `kind` in a group of `total_members`.
    pub const fn for_group(total_members: usize, kind: ActionKind) -> Self {
        Self {
            required: required_votes(total_members, kind),
            total: total_members,
        }
    }

    /// Check if `votes` affirmative votes meet the quorum.
    pub const fn is_met(&self, votes: usize) -> bool {
        votes >= self.required
    }

    /// How many more affirmative votes are needed.
    pub const fn votes_needed(&self, votes: usize) -> usize {
        if votes >= self.required {
            0
        } else {
            self.required - votes
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_groups_skip_voting() {
        for n in 0..VOTING_THRESHOLD {
            assert!(!needs_voting(n), "group of {} should not vote", n);
        }
        assert!(needs_voting(3));
        assert!(needs_voting(12));
    }

    #[test]
    fn table_matches_rules() {
        let cases = [
            // (members, kind, expected)
            (1, ActionKind::DeleteTask, 1),
            (2, ActionKind::DeleteGroup, 1),
            (3, ActionKind::DeleteGroup, 3),
            (3, ActionKind::DeleteTask, 2),
            (3, ActionKind::RemoveMember, 2),
            (4, ActionKind::DeleteTask, 2),
            (4, ActionKind::DeleteGroup, 3),
            (5, ActionKind::DeleteTask, 3),
            (5, ActionKind::DeleteExpense, 3),
            (6, ActionKind::DeleteRoutine, 3),
            (7, ActionKind::DeleteGroup, 6),
            (7, ActionKind::DeleteTask, 4),
        ];

        for (members, kind, expected) in cases {
            assert_eq!(
                required_votes(members, kind),
                expected,
                "required_votes({}, {}) should be {}",
                members,
                kind,
                expected
            );
        }
    }

    #[test]
    fn quorum_progress() {
        let quorum = Quorum::for_group(4, ActionKind::DeleteTask);
        assert_eq!(quorum, Quorum { required: 2, total: 4 });
        assert!(!quorum.is_met(1));
        assert!(quorum.is_met(2));
        assert_eq!(quorum.votes_needed(1), 1);
        assert_eq!(quorum.votes_needed(3), 0);
    }

    fn any_kind() -> impl Strategy<Value = ActionKind> {
        prop::sample::select(ActionKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn required_is_at_least_one(n in 0usize..500, kind in any_kind()) {
            prop_assert!(required_votes(n, kind) >= 1);
        }

        #[test]
        fn required_never_exceeds_membership(n in 1usize..500, kind in any_kind()) {
            prop_assert!(required_votes(n, kind) <= n);
        }

        #[test]
        fn disbanding_is_never_easier(n in 0usize..500, kind in any_kind()) {
            prop_assert!(
                required_votes(n, ActionKind::DeleteGroup) >= required_votes(n, kind)
            );
        }

        #[test]
        fn requirement_is_monotonic(n in 0usize..500, kind in any_kind()) {
            prop_assert!(required_votes(n + 1, kind) >= required_votes(n, kind));
        }
    }
}
