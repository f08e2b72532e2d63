//! Field and zone restriction, applied as a late filter before hits leave a
//! node (§4.1, `LimitSpec`).

use super::StreamIterator;
use crate::model::{Doc, Hit, LimitSpec};
use crate::zone::{ZoneCache, ZoneLookup};

pub struct LimitFilter {
    inner: Box<dyn StreamIterator>,
    spec: LimitSpec,
    zone_cache: Option<ZoneCache>,
    hit_buf: Vec<Hit>,
}

impl LimitFilter {
    pub fn new(inner: Box<dyn StreamIterator>, spec: LimitSpec, zone_cache: Option<ZoneCache>) -> LimitFilter {
        LimitFilter { inner, spec, zone_cache, hit_buf: Vec::new() }
    }

    fn passes(&mut self, row_id: u32, hit: &Hit) -> bool {
        if let Some(mask) = self.spec.field_mask {
            if !mask.test(hit.hitpos.field()) {
                return false;
            }
        }
        if let Some(max_pos) = self.spec.max_field_pos {
            if hit.hitpos.pos() > max_pos {
                return false;
            }
        }
        if !self.spec.zones.is_empty() {
            let Some(cache) = self.zone_cache.as_mut() else { return false };
            let in_any_zone = self.spec.zones.iter().any(|zone| {
                matches!(cache.is_in_zone(zone, row_id, hit.hitpos), ZoneLookup::Found(_))
            });
            if !in_any_zone {
                return false;
            }
        }
        true
    }
}

impl StreamIterator for LimitFilter {
    fn get_docs(&mut self) -> &[Doc] {
        self.inner.get_docs()
    }

    fn get_hits(&mut self, docs: &[Doc]) -> &[Hit] {
        let raw: Vec<Hit> = self.inner.get_hits(docs).to_vec();
        self.hit_buf.clear();
        for h in raw {
            if self.passes(h.row_id, &h) {
                self.hit_buf.push(h);
            }
        }
        &self.hit_buf
    }

    fn advance_to(&mut self, row_id: u32) -> Option<Doc> {
        self.inner.advance_to(row_id)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
