//! The extended per-occurrence hit record (§3 "Hit (extended)").

use super::hitpos::HitPos;

/// A single term occurrence flowing out of the stream iterator tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub row_id: u32,
    pub hitpos: HitPos,
    /// The keyword's original position in the parsed query.
    pub query_pos: u32,
    /// Position inside a compound operator (phrase/proximity child index).
    pub node_pos: u32,
    /// Span length, for multi-word tokens that collapse to one position.
    pub span_len: u32,
    pub weight: f32,
    /// Bitset of additional query positions co-located at this hitpos.
    pub qpos_mask: u32,
    pub match_len: u32,
}

impl Hit {
    pub fn new(row_id: u32, hitpos: HitPos, query_pos: u32) -> Hit {
        Hit {
            row_id,
            hitpos,
            query_pos,
            node_pos: 0,
            span_len: 1,
            weight: 1.0,
            qpos_mask: 0,
            match_len: 1,
        }
    }
}
