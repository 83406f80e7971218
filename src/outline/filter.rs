//! Object selection for the mask pass

use crate::scene::{RenderObject, Scene};

/// Which scene objects the mask pass draws.
///
/// Selection is by rendering layer only: every queue range is included and
/// submission order is the scene's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteringCriteria {
    rendering_layer_mask: u32,
}

impl FilteringCriteria {
    pub fn new(rendering_layer_mask: u32) -> Self {
        Self {
            rendering_layer_mask,
        }
    }

    pub fn rendering_layer_mask(&self) -> u32 {
        self.rendering_layer_mask
    }

    /// Adopt a new mask. Returns true if it differed from the current one.
    pub fn update(&mut self, rendering_layer_mask: u32) -> bool {
        if self.rendering_layer_mask == rendering_layer_mask {
            return false;
        }
        log::trace!(
            "Outline filter mask {:#x} -> {:#x}",
            self.rendering_layer_mask,
            rendering_layer_mask
        );
        self.rendering_layer_mask = rendering_layer_mask;
        true
    }

    pub fn matches(&self, object: &RenderObject) -> bool {
        object.rendering_layers.intersects(self.rendering_layer_mask)
    }

    /// Matching objects of a scene, in scene order
    pub fn select<'a>(&'a self, scene: &'a Scene) -> impl Iterator<Item = &'a RenderObject> + 'a {
        scene.objects.iter().filter(move |o| self.matches(o))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{RenderQueue, RenderingLayers};

    #[test]
    fn matches_by_layer_intersection_across_queues() {
        let criteria = FilteringCriteria::new(0b0110);
        let mut scene = Scene::default();
        scene.add_object(RenderObject::new(0, 0).with_layers(RenderingLayers(0b0001)));
        scene.add_object(
            RenderObject::new(0, 0)
                .with_layers(RenderingLayers(0b0100))
                .with_queue(RenderQueue::Transparent),
        );
        scene.add_object(RenderObject::new(0, 0).with_layers(RenderingLayers(0b1010)));

        let selected: Vec<u32> = criteria
            .select(&scene)
            .map(|o| o.rendering_layers.bits())
            .collect();
        assert_eq!(selected, vec![0b0100, 0b1010]);
    }

    #[test]
    fn update_reports_changes_only() {
        let mut criteria = FilteringCriteria::new(1);
        assert!(!criteria.update(1));
        assert!(criteria.update(2));
        assert_eq!(criteria.rendering_layer_mask(), 2);
        assert!(!criteria.update(2));
    }

    #[test]
    fn empty_mask_matches_nothing() {
        let criteria = FilteringCriteria::new(0);
        assert!(!criteria.matches(&RenderObject::new(0, 0).with_layers(RenderingLayers::ALL)));
    }
}
