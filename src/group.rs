//! Grouping: building and dissolving groups from the selection.
//!
//! Every operation returns a [`GroupChange`] describing the group table before
//! and after, which is what the history stores to undo it.

#[cfg(test)]
#[path = "group_test.rs"]
mod group_test;

use tracing::debug;

use crate::doc::{CardId, Group, GroupId, Scene, SceneError};
use crate::selection::{Selection, SelectionTarget};

/// Snapshot of the groups touched by one grouping operation.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupChange {
    /// Every affected group as it was before the operation.
    pub before: Vec<Group>,
    /// Every affected group as it is afterwards; dissolved groups are absent.
    pub after: Vec<Group>,
}

impl GroupChange {
    /// Replay the operation forwards.
    pub fn apply(&self, scene: &mut Scene) {
        let ids: Vec<GroupId> = self.before.iter().map(|g| g.id).collect();
        scene.swap_groups(&ids, &self.after);
    }

    /// Reverse the operation.
    pub fn revert(&self, scene: &mut Scene) {
        let ids: Vec<GroupId> = self.after.iter().map(|g| g.id).collect();
        scene.swap_groups(&ids, &self.before);
    }
}

/// Group every selected card into one new group.
///
/// Selected groups are flattened: their members join the new group and the
/// old groups are dissolved. A selected card that sits in an unselected group
/// (possible in group-edit mode) is taken out of that group. On success the
/// selection becomes the new group.
///
/// # Errors
///
/// `GroupTooSmall` when fewer than two distinct cards are selected.
pub fn group_selected(scene: &mut Scene, selection: &mut Selection) -> Result<(GroupId, GroupChange), SceneError> {
    let cards = selection.cards(scene);
    if cards.len() < 2 {
        return Err(SceneError::GroupTooSmall(cards.len()));
    }

    let mut affected: Vec<GroupId> = Vec::new();
    for card in &cards {
        if let Some(gid) = scene.group_of(card) {
            if !affected.contains(&gid) {
                affected.push(gid);
            }
        }
    }
    let before: Vec<Group> = affected.iter().filter_map(|g| scene.group(g)).cloned().collect();

    // Groups that keep members outside the new group survive with those members.
    let mut after: Vec<Group> = before
        .iter()
        .filter_map(|g| {
            let mut kept = g.clone();
            kept.members.retain(|m| !cards.contains(m));
            (!kept.members.is_empty()).then_some(kept)
        })
        .collect();

    let created = Group::new(next_group_name(scene), cards.clone());
    let gid = created.id;
    after.push(created);

    let change = GroupChange { before, after };
    change.apply(scene);
    selection.set([SelectionTarget::Group(gid)]);
    debug!(group_id = %gid, members = cards.len(), "cards grouped");
    Ok((gid, change))
}

/// Dissolve every selected group; the selection becomes their member cards.
///
/// Returns `None` when no group is selected.
pub fn ungroup_selected(scene: &mut Scene, selection: &mut Selection) -> Option<GroupChange> {
    let before: Vec<Group> = selection.groups().iter().filter_map(|g| scene.group(g)).cloned().collect();
    if before.is_empty() {
        return None;
    }
    let members: Vec<CardId> = before.iter().flat_map(|g| g.members.iter().copied()).collect();

    let change = GroupChange { before, after: Vec::new() };
    change.apply(scene);

    let mut next: Vec<SelectionTarget> = selection
        .iter()
        .copied()
        .filter(|t| !matches!(t, SelectionTarget::Group(_)))
        .collect();
    next.extend(members.iter().map(|m| SelectionTarget::Card(*m)));
    selection.set(next);
    debug!(groups = change.before.len(), members = members.len(), "groups dissolved");
    Some(change)
}

fn next_group_name(scene: &Scene) -> String {
    format!("Group {}", scene.groups().count() + 1)
}
