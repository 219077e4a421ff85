//! Group completion bookkeeping
//!
//! Animations created under one scope share a [`GroupId`]. The group's
//! handler fires exactly once, after the scope has closed and the last
//! member has ended.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::animation::AnimationId;
use crate::context::GroupId;

/// Delivered to a group's completion handler
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupOutcome {
    /// A member was redirected (or moved to another group) before finishing
    pub retargeted: bool,
    /// A member was stopped short of its target
    pub stopped: bool,
}

impl GroupOutcome {
    /// Every member ran to completion undisturbed
    pub fn finished(&self) -> bool {
        !self.retargeted && !self.stopped
    }
}

pub type GroupHandler = Box<dyn FnOnce(GroupOutcome)>;

/// Why a member left its group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Departure {
    Finished,
    Retargeted,
    Stopped,
}

#[derive(Default)]
struct GroupState {
    members: FxHashSet<AnimationId>,
    open_scopes: usize,
    outcome: GroupOutcome,
    handler: Option<GroupHandler>,
}

impl GroupState {
    fn is_done(&self) -> bool {
        self.members.is_empty() && self.open_scopes == 0
    }
}

/// A group that has just completed
pub(crate) struct CompletedGroup {
    pub group: GroupId,
    pub handler: Option<GroupHandler>,
    pub outcome: GroupOutcome,
}

/// Registry of live groups
#[derive(Default)]
pub(crate) struct Groups {
    groups: FxHashMap<GroupId, GroupState>,
}

impl Groups {
    pub fn open_scope(&mut self, group: GroupId) {
        self.groups.entry(group).or_default().open_scopes += 1;
    }

    pub fn close_scope(&mut self, group: GroupId) -> Option<CompletedGroup> {
        let state = self.groups.get_mut(&group)?;
        state.open_scopes = state.open_scopes.saturating_sub(1);
        self.complete_if_done(group)
    }

    pub fn join(&mut self, group: GroupId, id: AnimationId) {
        self.groups.entry(group).or_default().members.insert(id);
    }

    pub fn leave(
        &mut self,
        group: GroupId,
        id: AnimationId,
        departure: Departure,
    ) -> Option<CompletedGroup> {
        let state = self.groups.get_mut(&group)?;
        if !state.members.remove(&id) {
            return None;
        }
        match departure {
            Departure::Finished => {}
            Departure::Retargeted => state.outcome.retargeted = true,
            Departure::Stopped => state.outcome.stopped = true,
        }
        self.complete_if_done(group)
    }

    pub fn mark_retargeted(&mut self, group: GroupId) {
        if let Some(state) = self.groups.get_mut(&group) {
            state.outcome.retargeted = true;
        }
    }

    /// Install the handler. A group with nothing left to wait for (unknown
    /// or already completed) completes immediately.
    pub fn set_handler(&mut self, group: GroupId, handler: GroupHandler) -> Option<CompletedGroup> {
        match self.groups.get_mut(&group) {
            Some(state) => {
                state.handler = Some(handler);
                None
            }
            None => Some(CompletedGroup {
                group,
                handler: Some(handler),
                outcome: GroupOutcome::default(),
            }),
        }
    }

    pub fn contains(&self, group: GroupId) -> bool {
        self.groups.contains_key(&group)
    }

    pub fn member_count(&self, group: GroupId) -> usize {
        self.groups
            .get(&group)
            .map_or(0, |state| state.members.len())
    }

    fn complete_if_done(&mut self, group: GroupId) -> Option<CompletedGroup> {
        if !self.groups.get(&group)?.is_done() {
            return None;
        }
        let state = self.groups.remove(&group)?;
        Some(CompletedGroup {
            group,
            handler: state.handler,
            outcome: state.outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids(count: usize) -> Vec<AnimationId> {
        let mut arena: SlotMap<AnimationId, ()> = SlotMap::with_key();
        (0..count).map(|_| arena.insert(())).collect()
    }

    #[test]
    fn test_completes_after_scope_and_members() {
        let mut groups = Groups::default();
        let group = GroupId::next();
        let members = ids(2);

        groups.open_scope(group);
        groups.join(group, members[0]);
        groups.join(group, members[1]);
        assert!(groups.close_scope(group).is_none());

        assert!(groups.leave(group, members[0], Departure::Finished).is_none());
        let completed = groups
            .leave(group, members[1], Departure::Finished)
            .expect("last member completes the group");
        assert!(completed.outcome.finished());
        assert!(!groups.contains(group));
    }

    #[test]
    fn test_empty_group_completes_at_scope_close() {
        let mut groups = Groups::default();
        let group = GroupId::next();
        groups.open_scope(group);

        let completed = groups.close_scope(group).expect("empty group completes");
        assert_eq!(completed.outcome, GroupOutcome::default());
    }

    #[test]
    fn test_retargeted_member_marks_outcome() {
        let mut groups = Groups::default();
        let group = GroupId::next();
        let members = ids(1);

        groups.join(group, members[0]);
        let completed = groups
            .leave(group, members[0], Departure::Retargeted)
            .expect("group completes");
        assert!(completed.outcome.retargeted);
        assert!(!completed.outcome.finished());
    }

    #[test]
    fn test_leaving_twice_is_ignored() {
        let mut groups = Groups::default();
        let group = GroupId::next();
        let members = ids(2);

        groups.join(group, members[0]);
        groups.join(group, members[1]);
        assert!(groups.leave(group, members[0], Departure::Stopped).is_none());
        assert!(groups.leave(group, members[0], Departure::Stopped).is_none());
        assert_eq!(groups.member_count(group), 1);
    }

    #[test]
    fn test_handler_for_unknown_group_completes_now() {
        let mut groups = Groups::default();
        let completed = groups.set_handler(GroupId::next(), Box::new(|_| {}));
        assert!(completed.is_some());
    }
}
