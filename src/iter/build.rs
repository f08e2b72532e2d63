//! Compiles a [`RestrictedNode`] (C6's query AST) into the iterator tree C1
//! actually pulls docs and hits from (§2's data flow: "C6's compiled query
//! drives C1's iterator tree feeding C3/C4").
//!
//! The index layer is out of scope (§1), so this module only knows the
//! shape of the seam: something that hands back postings for a word, and
//! something that hands back zone marker sources by name.

use super::bool_ops::{And, AndNot, MaybeAnd, Or};
use super::leaf::KeywordIterator;
use super::limit::LimitFilter;
use super::position_ops::{NotNear, Predicate, PositionAnd, Quorum};
use super::StreamIterator;
use crate::model::qword::{Postings, Qword};
use crate::model::query_ast::{QueryNode, RestrictedNode};
use crate::zone::{ZoneCache, ZoneSource};

/// Resolves a keyword's posting list, the seam §6 calls "leaf iterators are
/// created by the index layer from `(word_id, field_restriction)`".
pub trait WordSource {
    fn postings_for(&mut self, word: &str) -> Box<dyn Postings>;

    /// Every document in the corpus, with no positional hits, for
    /// `match_all`/`QueryNode::Null`.
    fn all_docs(&mut self) -> Box<dyn Postings>;
}

/// Resolves the marker streams backing a named zone, so the builder can
/// open a fresh [`ZoneCache`] scoped to exactly the zones a node needs.
pub trait ZoneRegistry {
    fn open(&self, zone: &str) -> Box<dyn ZoneSource>;
}

fn zone_cache_for(names: &[String], zones: &dyn ZoneRegistry) -> ZoneCache {
    let mut cache = ZoneCache::new();
    for name in names {
        cache.register(name.clone(), zones.open(name));
    }
    cache
}

fn build_children(children: &[QueryNode], words: &mut dyn WordSource, zones: &dyn ZoneRegistry) -> Vec<Box<dyn StreamIterator>> {
    children.iter().map(|c| build_node(c, words, zones)).collect()
}

fn build_node(node: &QueryNode, words: &mut dyn WordSource, zones: &dyn ZoneRegistry) -> Box<dyn StreamIterator> {
    match node {
        QueryNode::Keyword(kw) => {
            let postings = words.postings_for(&kw.word);
            Box::new(KeywordIterator::new(Qword::new(postings, kw.query_pos)))
        }
        QueryNode::Null => {
            let postings = words.all_docs();
            Box::new(KeywordIterator::new(Qword::new(postings, 0)))
        }
        QueryNode::And(children) => Box::new(And::new(build_children(children, words, zones))),
        QueryNode::Or(children) => Box::new(Or::new(build_children(children, words, zones))),
        QueryNode::AndNot(l, r) => Box::new(AndNot::new(build_node(l, words, zones), build_node(r, words, zones))),
        QueryNode::MaybeAnd(required, optional) => {
            Box::new(MaybeAnd::new(build_node(required, words, zones), build_node(optional, words, zones)))
        }
        QueryNode::Phrase(children) => Box::new(PositionAnd::new(build_children(children, words, zones), Predicate::Phrase)),
        QueryNode::Proximity(dist, children) => {
            Box::new(PositionAnd::new(build_children(children, words, zones), Predicate::Proximity(*dist)))
        }
        QueryNode::Near(dist, children) => {
            Box::new(PositionAnd::new(build_children(children, words, zones), Predicate::Near(*dist)))
        }
        QueryNode::Quorum(k, children) => Box::new(Quorum::new(build_children(children, words, zones), *k)),
        QueryNode::NotNear(dist, l, r) => Box::new(NotNear::new(build_node(l, words, zones), build_node(r, words, zones), *dist)),
        QueryNode::Before(l, r) => {
            Box::new(PositionAnd::new(vec![build_node(l, words, zones), build_node(r, words, zones)], Predicate::Before))
        }
        QueryNode::Sentence(children) => {
            let cache = zone_cache_for(&["sentence".to_string()], zones);
            Box::new(PositionAnd::with_zone(build_children(children, words, zones), "sentence", cache))
        }
        QueryNode::Paragraph(children) => {
            let cache = zone_cache_for(&["paragraph".to_string()], zones);
            Box::new(PositionAnd::with_zone(build_children(children, words, zones), "paragraph", cache))
        }
    }
}

/// Builds the iterator tree for a compiled, field/zone-restricted query
/// node. Zone restriction, if present, opens its own cache rather than
/// sharing one with any `Sentence`/`Paragraph` node inside the subtree
/// (§4.2 caches are owned per consumer).
pub fn build_iterator(node: &RestrictedNode, words: &mut dyn WordSource, zones: &dyn ZoneRegistry) -> Box<dyn StreamIterator> {
    let inner = build_node(&node.node, words, zones);
    if node.limit.is_empty() {
        return inner;
    }
    let zone_cache = if node.limit.zones.is_empty() { None } else { Some(zone_cache_for(&node.limit.zones, zones)) };
    Box::new(LimitFilter::new(inner, node.limit.clone(), zone_cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iter::strip_sentinel;
    use crate::model::qword::VecPostings;
    use crate::model::query_ast::KeywordPayload;
    use crate::model::{Doc, FieldMask, Hit, HitPos};

    struct FixtureWords {
        by_word: std::collections::HashMap<String, VecPostings>,
        total_docs: Vec<Doc>,
    }

    impl WordSource for FixtureWords {
        fn postings_for(&mut self, word: &str) -> Box<dyn Postings> {
            Box::new(self.by_word.get(word).cloned().unwrap_or_default())
        }

        fn all_docs(&mut self) -> Box<dyn Postings> {
            Box::new(VecPostings { docs: self.total_docs.clone(), hits: Vec::new() })
        }
    }

    struct NoZones;
    impl ZoneRegistry for NoZones {
        fn open(&self, _zone: &str) -> Box<dyn ZoneSource> {
            Box::new(crate::zone::VecZoneSource::new(vec![], vec![]))
        }
    }

    fn doc(row_id: u32) -> Doc {
        Doc { row_id, fields: FieldMask::from_bits(1), prefactor: 0.0 }
    }

    #[test]
    fn and_of_two_keywords_intersects_their_postings() {
        let mut by_word = std::collections::HashMap::new();
        by_word.insert(
            "brown".to_string(),
            VecPostings { docs: vec![doc(1), doc(2)], hits: vec![Hit::new(1, HitPos::new(0, 1, false), 0), Hit::new(2, HitPos::new(0, 1, false), 0)] },
        );
        by_word.insert(
            "fox".to_string(),
            VecPostings { docs: vec![doc(2), doc(3)], hits: vec![Hit::new(2, HitPos::new(0, 2, true), 1), Hit::new(3, HitPos::new(0, 1, true), 1)] },
        );
        let mut words = FixtureWords { by_word, total_docs: vec![doc(1), doc(2), doc(3)] };

        let query = RestrictedNode::unrestricted(QueryNode::And(vec![
            QueryNode::Keyword(KeywordPayload::new("brown", 0)),
            QueryNode::Keyword(KeywordPayload::new("fox", 1)),
        ]));
        let mut iter = build_iterator(&query, &mut words, &NoZones);
        let docs = strip_sentinel(iter.get_docs()).to_vec();
        assert_eq!(docs.iter().map(|d| d.row_id).collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn match_all_yields_every_document() {
        let mut words = FixtureWords { by_word: std::collections::HashMap::new(), total_docs: vec![doc(1), doc(2)] };
        let query = RestrictedNode::unrestricted(QueryNode::Null);
        let mut iter = build_iterator(&query, &mut words, &NoZones);
        let docs = strip_sentinel(iter.get_docs()).to_vec();
        assert_eq!(docs.iter().map(|d| d.row_id).collect::<Vec<_>>(), vec![1, 2]);
    }
}
