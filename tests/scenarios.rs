//! End-to-end scenarios. Most of these drive the ranker frame directly
//! against hand-built posting data, the way the ranking-mode unit tests
//! cover a single state in isolation; `s7` instead goes the full distance
//! from a JSON request body through compilation, iterator construction and
//! the ranker frame.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use searchcore::iter::leaf::KeywordIterator;
use searchcore::iter::{build_iterator, WordSource, ZoneRegistry};
use searchcore::model::qword::{Postings, Qword, VecPostings};
use searchcore::model::query_ast::RestrictedNode;
use searchcore::model::{Doc, FieldMask, Hit, HitPos};
use searchcore::ranker::match_::{Match, NoFilter};
use searchcore::ranker::state::{ExpressionState, ProximityState, RankState, Sph04State};
use searchcore::ranker::{build_state, Frame, RankerCtx, RankingMode, StateBuildCtx};
use searchcore::zone::{VecZoneSource, ZoneSource};

fn doc(row_id: u32, prefactor: f32) -> Doc {
    Doc { row_id, fields: FieldMask::from_bits(1), prefactor }
}

/// Doc 1: "the quick brown fox" with query ["quick", "brown", "fox"]
/// landing on three contiguous field positions (1, 2, 3). Doc 2: "brown
/// fox the quick" where only "brown"/"fox" land contiguously and "quick"
/// breaks the run.
fn phrase_query_postings() -> VecPostings {
    let docs = vec![doc(1, 0.1), doc(2, 0.1)];
    let hits = vec![
        Hit::new(1, HitPos::new(0, 1, false), 0), // quick
        Hit::new(1, HitPos::new(0, 2, false), 1), // brown
        Hit::new(1, HitPos::new(0, 3, true), 2),  // fox, end of field
        Hit::new(2, HitPos::new(0, 1, false), 1), // brown
        Hit::new(2, HitPos::new(0, 2, false), 2), // fox
        Hit::new(2, HitPos::new(0, 4, true), 0),  // quick, end of field, breaks the run
    ];
    VecPostings { docs, hits }
}

fn drive<S: RankState>(state: &mut S, ctx: &RankerCtx, doc: Doc, hits: &[Hit]) -> i32 {
    state.init(ctx).unwrap();
    state.reset_doc(&doc);
    for h in hits {
        state.update(h);
    }
    state.finalize(&Match::new(doc.row_id))
}

#[test]
fn s1_proximity_ranks_the_fully_contiguous_phrase_match_first() {
    let postings = phrase_query_postings();
    let iter = KeywordIterator::new(Qword::new(postings, 0));
    let ctx = RankerCtx::new(1);
    let state = searchcore::ranker::state::State::Proximity(ProximityState::new(1, true));
    let mut frame = Frame::new(iter, NoFilter, state, &ctx).unwrap();

    let mut out = Vec::new();
    frame.get_matches(&mut out).unwrap();

    assert_eq!(out.iter().map(|m| m.row_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(out[0].weight > out[1].weight, "doc 1 ({}) should outrank doc 2 ({})", out[0].weight, out[1].weight);
}

#[test]
fn s1_sph04_sets_exact_hit_only_for_the_single_field_exact_match() {
    let ctx = RankerCtx::new(1);

    // Doc A: one field, one word, which is also the only query word
    // (head hit, end of field, matches the final query position).
    let mut exact = Sph04State::new(1, 0);
    let exact_doc = doc(10, 0.0);
    drive(&mut exact, &ctx, exact_doc, &[Hit::new(10, HitPos::new(0, 1, true), 0)]);
    assert!(exact.exact_hit(0));

    // Doc B: the query word lands mid-field, not at the end.
    let mut partial = Sph04State::new(1, 0);
    let partial_doc = doc(11, 0.0);
    drive(&mut partial, &ctx, partial_doc, &[Hit::new(11, HitPos::new(0, 1, false), 0), Hit::new(11, HitPos::new(0, 2, true), 99)]);
    assert!(!partial.exact_hit(0));
}

#[test]
fn s6_expression_ranker_sums_lcs_times_user_weight_plus_bm25() {
    let formula = searchcore::expr::CompiledExpr::compile("sum(lcs*user_weight) + bm25").unwrap();

    let mut term_idf = FxHashMap::default();
    term_idf.insert(0u32, 0.3f32);
    term_idf.insert(1u32, 0.4f32);

    let mut next_query_pos = HashMap::new();
    next_query_pos.insert(0u32, 1u32);

    let mut state = ExpressionState::new(formula, false, 1, vec![2], term_idf, FxHashMap::default(), next_query_pos);

    let ctx = RankerCtx::new(1);
    let prefactor = 0.1f32;
    let d = doc(1, prefactor);
    let weight = drive(
        &mut state,
        &ctx,
        d,
        &[
            Hit::new(1, HitPos::new(0, 1, false), 0),
            Hit::new(1, HitPos::new(0, 2, true), 1),
        ],
    );

    let expected = 2.0 + (prefactor * searchcore::ranker::state::BM25_SCALE);
    assert_eq!(weight, expected.round() as i32);
}

/// A `WordSource` over a fixed vocabulary, standing in for the (out of
/// scope) index layer.
struct FixtureIndex {
    by_word: HashMap<String, VecPostings>,
    all_docs: Vec<Doc>,
}

impl WordSource for FixtureIndex {
    fn postings_for(&mut self, word: &str) -> Box<dyn Postings> {
        Box::new(self.by_word.get(word).cloned().unwrap_or_default())
    }

    fn all_docs(&mut self) -> Box<dyn Postings> {
        Box::new(VecPostings { docs: self.all_docs.clone(), hits: Vec::new() })
    }
}

struct NoZones;
impl ZoneRegistry for NoZones {
    fn open(&self, _zone: &str) -> Box<dyn ZoneSource> {
        Box::new(VecZoneSource::new(vec![], vec![]))
    }
}

#[test]
fn s7_json_request_compiles_through_to_ranked_matches() {
    // "quick brown fox" query, same postings as `s1`'s hand-built phrase
    // test: doc 1 matches all three words contiguously, doc 2 only matches
    // "brown fox" contiguously (the "quick" hit lands out of order), so
    // under proximity ranking doc 1 must outrank doc 2.
    let mut by_word = HashMap::new();
    by_word.insert(
        "quick".to_string(),
        VecPostings {
            docs: vec![doc(1, 0.1), doc(2, 0.1)],
            hits: vec![Hit::new(1, HitPos::new(0, 1, false), 0), Hit::new(2, HitPos::new(0, 4, true), 0)],
        },
    );
    by_word.insert(
        "brown".to_string(),
        VecPostings {
            docs: vec![doc(1, 0.1), doc(2, 0.1)],
            hits: vec![Hit::new(1, HitPos::new(0, 2, false), 1), Hit::new(2, HitPos::new(0, 1, false), 1)],
        },
    );
    by_word.insert(
        "fox".to_string(),
        VecPostings {
            docs: vec![doc(1, 0.1), doc(2, 0.1)],
            hits: vec![Hit::new(1, HitPos::new(0, 3, true), 2), Hit::new(2, HitPos::new(0, 2, true), 2)],
        },
    );
    let mut index = FixtureIndex { by_word, all_docs: vec![doc(1, 0.1), doc(2, 0.1)] };

    let request = searchcore::json::compile_request(&serde_json::json!({
        "index": "articles",
        "query": {"match": {"body": "quick brown fox"}},
    }))
    .unwrap();

    let restricted = RestrictedNode::unrestricted(request.query);
    let iter = build_iterator(&restricted, &mut index, &NoZones);

    let ctx = RankerCtx::new(1);
    let state = build_state(&RankingMode::ProximityBm25, &ctx, &StateBuildCtx::default(), None).unwrap();
    let mut frame = Frame::new(iter, NoFilter, state, &ctx).unwrap();

    let mut out = Vec::new();
    frame.get_matches(&mut out).unwrap();

    assert_eq!(out.iter().map(|m| m.row_id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(out[0].weight > out[1].weight, "doc 1 ({}) should outrank doc 2 ({})", out[0].weight, out[1].weight);
}
