//! Selection: an ordered set of cards, groups, and connections.
//!
//! The selection only ever names live entities. Callers that remove entities
//! call [`Selection::retain_live`] in the same operation.

#[cfg(test)]
#[path = "selection_test.rs"]
mod selection_test;

use crate::camera::Rect;
use crate::doc::{CardId, ConnectionId, GroupId, Scene};

/// One selectable thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    Card(CardId),
    Group(GroupId),
    Connection(ConnectionId),
}

/// Ordered, duplicate-free selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    targets: Vec<SelectionTarget>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn contains(&self, target: &SelectionTarget) -> bool {
        self.targets.contains(target)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectionTarget> {
        self.targets.iter()
    }

    /// Add a target. Returns `false` when it was already selected.
    pub fn insert(&mut self, target: SelectionTarget) -> bool {
        if self.contains(&target) {
            return false;
        }
        self.targets.push(target);
        true
    }

    pub fn remove(&mut self, target: &SelectionTarget) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t != target);
        self.targets.len() != before
    }

    /// Add the target if absent, remove it if present.
    pub fn toggle(&mut self, target: SelectionTarget) {
        if !self.remove(&target) {
            self.targets.push(target);
        }
    }

    pub fn clear(&mut self) {
        self.targets.clear();
    }

    /// Replace the selection. Duplicates in `targets` are dropped.
    pub fn set<I>(&mut self, targets: I)
    where
        I: IntoIterator<Item = SelectionTarget>,
    {
        self.targets.clear();
        for t in targets {
            self.insert(t);
        }
    }

    /// The only selected target, when exactly one is selected.
    #[must_use]
    pub fn single(&self) -> Option<SelectionTarget> {
        match self.targets.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Selected cards with groups expanded to their members, in selection order.
    #[must_use]
    pub fn cards(&self, scene: &Scene) -> Vec<CardId> {
        let mut out: Vec<CardId> = Vec::new();
        for target in &self.targets {
            match target {
                SelectionTarget::Card(id) => {
                    if scene.contains_card(id) && !out.contains(id) {
                        out.push(*id);
                    }
                }
                SelectionTarget::Group(gid) => {
                    if let Some(group) = scene.group(gid) {
                        for m in &group.members {
                            if !out.contains(m) {
                                out.push(*m);
                            }
                        }
                    }
                }
                SelectionTarget::Connection(_) => {}
            }
        }
        out
    }

    /// Selected groups, in selection order.
    #[must_use]
    pub fn groups(&self) -> Vec<GroupId> {
        self.targets
            .iter()
            .filter_map(|t| match t {
                SelectionTarget::Group(id) => Some(*id),
                SelectionTarget::Card(_) | SelectionTarget::Connection(_) => None,
            })
            .collect()
    }

    /// Selected connections, in selection order.
    #[must_use]
    pub fn connections(&self) -> Vec<ConnectionId> {
        self.targets
            .iter()
            .filter_map(|t| match t {
                SelectionTarget::Connection(id) => Some(*id),
                SelectionTarget::Card(_) | SelectionTarget::Group(_) => None,
            })
            .collect()
    }

    /// Drop every target that no longer exists. Returns `true` when anything was dropped.
    pub fn retain_live(&mut self, scene: &Scene) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| match t {
            SelectionTarget::Card(id) => scene.contains_card(id),
            SelectionTarget::Group(id) => scene.group(id).is_some(),
            SelectionTarget::Connection(id) => scene.connection(id).is_some(),
        });
        self.targets.len() != before
    }
}

/// What clicking `card` selects: the card itself, or its group unless that group is being edited.
#[must_use]
pub fn target_for_card(scene: &Scene, card: CardId, editing_group: Option<GroupId>) -> SelectionTarget {
    match scene.group_of(&card) {
        Some(gid) if Some(gid) != editing_group => SelectionTarget::Group(gid),
        _ => SelectionTarget::Card(card),
    }
}

/// Targets for every card whose bounds intersect `rect`, bottom-most first.
#[must_use]
pub fn marquee_targets(scene: &Scene, rect: &Rect, editing_group: Option<GroupId>) -> Vec<SelectionTarget> {
    let mut out: Vec<SelectionTarget> = Vec::new();
    for card in scene.sorted_cards() {
        if !card.rect().intersects(rect) {
            continue;
        }
        let target = target_for_card(scene, card.id, editing_group);
        if !out.contains(&target) {
            out.push(target);
        }
    }
    out
}
