//! Drifting floating objects
//!
//! Each active floating object owns a local biology container holding the
//! biomass currently trapped under it. Objects drift with a simple random
//! walk; an object carried outside the map extent despawns and its contents
//! are reported as lost so the recovery process can fold them back in.

use crate::biology::pool::Biology;
use crate::core::types::{LonLat, Step};
use crate::geography::OceanMap;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatingObjectId(pub u32);

#[derive(Debug, Clone)]
pub struct FloatingObject<B: Biology> {
    pub id: FloatingObjectId,
    pub position: LonLat,
    pub deployed_step: Step,
    pub biology: B,
}

/// The set of currently active floating objects in one replicate
#[derive(Debug)]
pub struct FloatingField<B: Biology> {
    objects: Vec<FloatingObject<B>>,
    next_id: u32,
    /// Drift magnitude, degrees per step per axis
    drift_sigma: f64,
}

impl<B: Biology> FloatingField<B> {
    pub fn new(drift_sigma: f64) -> Self {
        Self {
            objects: Vec::new(),
            next_id: 0,
            drift_sigma,
        }
    }

    pub fn deploy(&mut self, position: LonLat, step: Step, biology: B) -> FloatingObjectId {
        let id = FloatingObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(FloatingObject {
            id,
            position,
            deployed_step: step,
            biology,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FloatingObject<B>> {
        self.objects.iter()
    }

    pub fn iter_biology(&self) -> impl Iterator<Item = &B> {
        self.objects.iter().map(|o| &o.biology)
    }

    pub fn biology_mut(&mut self, id: FloatingObjectId) -> Option<&mut B> {
        self.objects
            .iter_mut()
            .find(|o| o.id == id)
            .map(|o| &mut o.biology)
    }

    /// Random-walk every object one step; objects leaving the extent despawn
    /// and their contents are handed to `on_lost`
    pub fn drift(
        &mut self,
        rng: &mut impl Rng,
        map: &OceanMap,
        mut on_lost: impl FnMut(B),
    ) {
        let sigma = self.drift_sigma;
        for object in &mut self.objects {
            object.position.lon += rng.gen_range(-sigma..=sigma);
            object.position.lat += rng.gen_range(-sigma..=sigma);
        }
        let mut kept = Vec::with_capacity(self.objects.len());
        for object in self.objects.drain(..) {
            if map.contains(object.position) {
                kept.push(object);
            } else {
                tracing::debug!(id = object.id.0, "floating object drifted off the map");
                on_lost(object.biology);
            }
        }
        self.objects = kept;
    }
}
