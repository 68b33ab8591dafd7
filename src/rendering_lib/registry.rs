// src/rendering_lib/registry.rs

use std::collections::{HashMap, HashSet};

use crate::engine_lib::light::{Light, LightId};

use super::batch::{DrawBatchEntry, TexturedEntry};
use super::error::RegistryError;

/// A draw recorded as visible to one light.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibleDraw {
    Opaque(DrawBatchEntry),
    Textured(TexturedEntry),
}

#[derive(Debug, Default)]
struct VisibleArea {
    opaque: Vec<DrawBatchEntry>,
    textured: Vec<TexturedEntry>,
}

impl VisibleArea {
    fn clear(&mut self) {
        self.opaque.clear();
        self.textured.clear();
    }
}

/// Per-light lists of batch entries that fall inside that light's visible area.
///
/// Keys follow the light set; contents follow the frame.
#[derive(Debug, Default)]
pub struct VisibleAreaRegistry {
    areas: HashMap<LightId, VisibleArea>,
    order: Vec<LightId>,
}

impl VisibleAreaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an id that already exists empties its lists.
    pub fn register_light(&mut self, light: &Light) {
        match self.areas.get_mut(&light.id) {
            Some(area) => area.clear(),
            None => {
                self.areas.insert(light.id, VisibleArea::default());
                self.order.push(light.id);
            }
        }
    }

    pub fn unregister_light(&mut self, id: LightId) -> bool {
        if self.areas.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|&other| other != id);
        true
    }

    /// Replaces the key set with exactly the ids in `lights`.
    ///
    /// Ids present before and after keep their lists and position; their
    /// entries go away at the next frame reset, not here.
    pub fn set_lights(&mut self, lights: &[Light]) {
        let wanted: HashSet<LightId> = lights.iter().map(|light| light.id).collect();
        self.areas.retain(|id, _| wanted.contains(id));
        self.order.retain(|id| wanted.contains(id));
        for light in lights {
            if !self.areas.contains_key(&light.id) {
                self.areas.insert(light.id, VisibleArea::default());
                self.order.push(light.id);
            }
        }
        log::debug!("visible-area registry rebuilt with {} lights", self.order.len());
    }

    pub fn record_visible(&mut self, id: LightId, draw: VisibleDraw) -> Result<(), RegistryError> {
        let area = self.areas.get_mut(&id).ok_or(RegistryError::UnknownLight(id))?;
        match draw {
            VisibleDraw::Opaque(entry) => area.opaque.push(entry),
            VisibleDraw::Textured(entry) => area.textured.push(entry),
        }
        Ok(())
    }

    pub fn contains(&self, id: LightId) -> bool {
        self.areas.contains_key(&id)
    }

    /// Per-frame reset: every list is emptied, every key is kept.
    pub fn clear_entries(&mut self) {
        self.areas.values_mut().for_each(VisibleArea::clear);
    }

    /// Registered ids in registration order.
    pub fn keys(&self) -> &[LightId] {
        &self.order
    }

    pub fn opaque(&self, id: LightId) -> &[DrawBatchEntry] {
        self.areas.get(&id).map(|a| a.opaque.as_slice()).unwrap_or(&[])
    }

    pub fn textured(&self, id: LightId) -> &[TexturedEntry] {
        self.areas.get(&id).map(|a| a.textured.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty_for(&self, id: LightId) -> bool {
        self.opaque(id).is_empty() && self.textured(id).is_empty()
    }
}
