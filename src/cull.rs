//! Visibility culling and the image texture lifecycle.
//!
//! Decoded image pixels are only kept for cards near the viewport. Each pass
//! unloads images that left the padded view and hands out ticketed load
//! requests for images that entered it. A load result is applied only when
//! its ticket still matches the card's pending load, so late results for
//! cards that were deleted, scrolled away, or re-requested are discarded.

#[cfg(test)]
#[path = "cull_test.rs"]
mod cull_test;

use tracing::debug;

use crate::camera::{Camera, Rect};
use crate::doc::{CardId, CardPayload, Scene, TextureState};

/// A request for the host to decode an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub card_id: CardId,
    pub ticket: u64,
    pub source: String,
}

/// Why an image could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("image load failed: {0}")]
pub struct LoadFailure(pub String);

/// Texture changes produced by one culling pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullUpdate {
    pub load: Vec<LoadRequest>,
    pub unload: Vec<CardId>,
}

impl CullUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.load.is_empty() && self.unload.is_empty()
    }
}

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Placeholder,
    /// The ticket no longer matches; the result was dropped.
    Stale,
}

/// Whether a world rectangle, projected and padded by `padding_px`, overlaps the viewport.
#[must_use]
pub fn is_visible(rect: &Rect, camera: &Camera, viewport_w: f64, viewport_h: f64, padding_px: f64) -> bool {
    let screen = camera.world_rect_to_screen(rect).expand(padding_px);
    screen.intersects(&Rect::new(0.0, 0.0, viewport_w, viewport_h))
}

/// Ids of every card within the padded viewport, sorted.
#[must_use]
pub fn visible_cards(scene: &Scene, camera: &Camera, viewport_w: f64, viewport_h: f64, padding_px: f64) -> Vec<CardId> {
    let mut ids: Vec<CardId> = scene
        .cards()
        .filter(|c| is_visible(&c.rect(), camera, viewport_w, viewport_h, padding_px))
        .map(|c| c.id)
        .collect();
    ids.sort();
    ids
}

/// Issues monotonically increasing load tickets and applies culling passes.
#[derive(Debug, Clone, Default)]
pub struct TextureTracker {
    next_ticket: u64,
}

impl TextureTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    /// Unload images outside the padded view and request loads for unloaded images inside it.
    ///
    /// `Placeholder` images are left alone in both directions.
    pub fn update(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        viewport_w: f64,
        viewport_h: f64,
        padding_px: f64,
    ) -> CullUpdate {
        let mut candidates: Vec<(CardId, bool)> = scene
            .cards()
            .filter(|c| matches!(c.payload, CardPayload::Image(_)))
            .map(|c| (c.id, is_visible(&c.rect(), camera, viewport_w, viewport_h, padding_px)))
            .collect();
        candidates.sort_by_key(|(id, _)| *id);

        let mut update = CullUpdate::default();
        for (id, visible) in candidates {
            let Some(CardPayload::Image(img)) = scene.payload_mut(&id) else {
                continue;
            };
            match (img.texture, visible) {
                (TextureState::Unloaded, true) => {
                    let ticket = self.issue();
                    img.texture = TextureState::Loading { ticket };
                    update.load.push(LoadRequest { card_id: id, ticket, source: img.source.clone() });
                }
                (TextureState::Loaded | TextureState::Loading { .. }, false) => {
                    img.texture = TextureState::Unloaded;
                    update.unload.push(id);
                }
                _ => {}
            }
        }
        if !update.is_empty() {
            debug!(load = update.load.len(), unload = update.unload.len(), "culling pass");
        }
        update
    }
}

/// Apply a finished load if its ticket is still the card's pending one.
pub fn complete_load(
    scene: &mut Scene,
    ticket: u64,
    card_id: &CardId,
    result: Result<(), LoadFailure>,
) -> LoadOutcome {
    let Some(CardPayload::Image(img)) = scene.payload_mut(card_id) else {
        debug!(card_id = %card_id, ticket, "image load for missing card discarded");
        return LoadOutcome::Stale;
    };
    if img.texture != (TextureState::Loading { ticket }) {
        debug!(card_id = %card_id, ticket, "stale image load discarded");
        return LoadOutcome::Stale;
    }
    match result {
        Ok(()) => {
            img.texture = TextureState::Loaded;
            LoadOutcome::Loaded
        }
        Err(err) => {
            debug!(card_id = %card_id, error = %err, "image load failed");
            img.texture = TextureState::Placeholder;
            LoadOutcome::Placeholder
        }
    }
}

/// Return a failed image to `Unloaded` so the next pass requests it again.
pub fn retry_load(scene: &mut Scene, card_id: &CardId) -> bool {
    match scene.payload_mut(card_id) {
        Some(CardPayload::Image(img)) if img.texture == TextureState::Placeholder => {
            img.texture = TextureState::Unloaded;
            true
        }
        _ => false,
    }
}
