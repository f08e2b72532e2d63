//! The query AST handed to the core by the (external) query parser, and
//! produced internally by the JSON compiler (§3 "Query node (AST)").
//!
//! The source keeps a `parent` pointer on every node (§9 "Cyclic parent
//! links"); here ownership is strictly child-to-parent: a node owns its
//! `children: Vec<QueryNode>` and nothing points back up. Code that needs a
//! path to the root (e.g. the expression hook resolving `next_query_pos`)
//! walks an explicit stack instead of following a back-reference.

use serde::{Deserialize, Serialize};

/// Field- and zone-level restriction attached to a query node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitSpec {
    pub field_mask: Option<crate::model::hitpos::FieldMask>,
    pub max_field_pos: Option<u32>,
    pub zones: Vec<String>,
    pub zone_span: bool,
}

impl LimitSpec {
    pub fn is_empty(&self) -> bool {
        self.field_mask.is_none() && self.max_field_pos.is_none() && self.zones.is_empty()
    }
}

/// Terminal keyword payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordPayload {
    pub word: String,
    pub query_pos: u32,
    pub excluded: bool,
    pub expanded: bool,
    pub field_start: bool,
    pub field_end: bool,
    pub morphed: bool,
    pub boost: f32,
}

impl KeywordPayload {
    pub fn new(word: impl Into<String>, query_pos: u32) -> KeywordPayload {
        KeywordPayload {
            word: word.into(),
            query_pos,
            excluded: false,
            expanded: false,
            field_start: false,
            field_end: false,
            morphed: false,
            boost: 1.0,
        }
    }
}

/// An operator or keyword node in the query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    Keyword(KeywordPayload),
    And(Vec<QueryNode>),
    Or(Vec<QueryNode>),
    AndNot(Box<QueryNode>, Box<QueryNode>),
    MaybeAnd(Box<QueryNode>, Box<QueryNode>),
    Phrase(Vec<QueryNode>),
    Proximity(u32, Vec<QueryNode>),
    Quorum(u32, Vec<QueryNode>),
    Near(u32, Vec<QueryNode>),
    NotNear(u32, Box<QueryNode>, Box<QueryNode>),
    Before(Box<QueryNode>, Box<QueryNode>),
    Sentence(Vec<QueryNode>),
    Paragraph(Vec<QueryNode>),
    /// `match_all` / fullscan equivalent: matches every document.
    Null,
}

/// A node together with its field/zone restriction, the unit the compiler
/// and the iterator builder actually pass around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictedNode {
    pub node: QueryNode,
    pub limit: LimitSpec,
}

impl RestrictedNode {
    pub fn unrestricted(node: QueryNode) -> RestrictedNode {
        RestrictedNode { node, limit: LimitSpec::default() }
    }
}

impl QueryNode {
    /// Collapses single-child `And`/`Or` nodes to their sole child,
    /// mirroring the elision the JSON compiler performs on `bool` clauses
    /// (§4.6).
    pub fn elide_singletons(self) -> QueryNode {
        match self {
            QueryNode::And(mut c) if c.len() == 1 => c.pop().unwrap().elide_singletons(),
            QueryNode::Or(mut c) if c.len() == 1 => c.pop().unwrap().elide_singletons(),
            QueryNode::And(c) => QueryNode::And(c.into_iter().map(|n| n.elide_singletons()).collect()),
            QueryNode::Or(c) => QueryNode::Or(c.into_iter().map(|n| n.elide_singletons()).collect()),
            other => other,
        }
    }

    /// Maximum query position referenced anywhere in the subtree, used by
    /// SPH04's `querypos == max_qpos` exactness test.
    pub fn max_query_pos(&self) -> u32 {
        match self {
            QueryNode::Keyword(k) => k.query_pos,
            QueryNode::And(c) | QueryNode::Or(c) | QueryNode::Phrase(c) | QueryNode::Sentence(c)
            | QueryNode::Paragraph(c) | QueryNode::Proximity(_, c) | QueryNode::Quorum(_, c)
            | QueryNode::Near(_, c) => c.iter().map(QueryNode::max_query_pos).max().unwrap_or(0),
            QueryNode::AndNot(a, b) | QueryNode::MaybeAnd(a, b) | QueryNode::Before(a, b) => {
                a.max_query_pos().max(b.max_query_pos())
            }
            QueryNode::NotNear(_, a, b) => a.max_query_pos().max(b.max_query_pos()),
            QueryNode::Null => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elide_singletons_unwraps_one_child_and() {
        let kw = QueryNode::Keyword(KeywordPayload::new("brown", 0));
        let n = QueryNode::And(vec![kw.clone()]).elide_singletons();
        assert_eq!(n, kw);
    }

    #[test]
    fn max_query_pos_walks_subtree() {
        let tree = QueryNode::And(vec![
            QueryNode::Keyword(KeywordPayload::new("a", 0)),
            QueryNode::Keyword(KeywordPayload::new("b", 3)),
        ]);
        assert_eq!(tree.max_query_pos(), 3);
    }
}
