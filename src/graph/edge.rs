//! Edge representation for the knowledge graph.
//!
//! Edges carry a dual weight track (`w_core`, durable; `w_ctx`, fast/noisy)
//! plus a cached effective mix `w`. This split is the central design
//! decision here — `w` must always be recomputable from the two tracks,
//! never treated as ground truth.

use crate::ids::{self, EdgeId, NodeId};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Default mix weight: the core (durable) track dominates.
pub const LAMBDA_MIX: f32 = 0.3;

/// Relation enum. The core four (`Exact`, `Temporal`, `Leap`,
/// `Generalization`) are the only ones the scorer hard-codes semantics for;
/// the rest fall back to a default relation bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Relation {
    Exact = 0,
    Temporal = 1,
    Leap = 2,
    Generalization = 3,
    Isa = 4,
    HasProperty = 5,
    PartOf = 6,
    Causes = 7,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EdgeFlags: u32 {
        const INFERRED    = 0b0000_0001;
        const GENERALIZED = 0b0000_0010;
        const ANCHOR      = 0b0000_0100;
        const DEPRECATED  = 0b0000_1000;
        /// Set by the causal miner when lead/lag strength lands in the
        /// non-spurious band.
        const CAUSAL      = 0b0001_0000;
    }
}

/// A directed edge between two nodes.
///
/// `id` is the canonical hash of `(src, rel, dst, layer)` — see
/// [`crate::ids::edge_id`]. Upserting the same tuple again reinforces this
/// record (I4) instead of creating a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub src: NodeId,
    pub dst: NodeId,
    pub rel: Relation,
    pub layer: u16,
    pub w_core: f32,
    pub w_ctx: f32,
    pub w: f32,
    pub ts_last: u64,
    pub count: u32,
    pub flags: EdgeFlags,
    /// Numeric causal strength when `CAUSAL` is set (supplements the flag:
    /// annotation carries both a bool and a magnitude).
    pub causal_strength: Option<f32>,
}

impl Edge {
    /// Create a new edge with initial weights. Panics are never used here —
    /// callers that violate I1/I2 get a `StorageError::InvariantViolation`
    /// at the Store boundary (`upsert_edge`), not here.
    pub fn new(src: NodeId, rel: Relation, dst: NodeId, layer: u16, w_core: f32, w_ctx: f32) -> Self {
        let id = ids::edge_id(src, rel, dst, layer);
        let w_core = w_core.clamp(0.0, 1.0);
        let w_ctx = w_ctx.clamp(0.0, 1.0);
        Self {
            id,
            src,
            dst,
            rel,
            layer,
            w_core,
            w_ctx,
            w: effective_weight(w_core, w_ctx),
            ts_last: crate::graph::node::now_ns(),
            count: 1,
            flags: EdgeFlags::empty(),
            causal_strength: None,
        }
    }

    pub fn with_flags(mut self, flags: EdgeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_anchor(&self) -> bool {
        self.flags.contains(EdgeFlags::ANCHOR)
    }

    pub fn is_inferred(&self) -> bool {
        self.flags.contains(EdgeFlags::INFERRED)
    }

    /// Recompute the cached effective weight from the two tracks (I-invariant:
    /// `w` is convenience only, never a third source of truth).
    pub fn refresh_w(&mut self) {
        self.w = effective_weight(self.w_core, self.w_ctx);
    }

    /// Invariant check used at the Store boundary (I1/I2).
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.src.is_zero() || self.dst.is_zero() {
            return Err("edge endpoints must not be the zero id");
        }
        for (name, v) in [("w_core", self.w_core), ("w_ctx", self.w_ctx), ("w", self.w)] {
            if !(0.0..=1.0).contains(&v) {
                return Err(match name {
                    "w_core" => "w_core out of [0,1]",
                    "w_ctx" => "w_ctx out of [0,1]",
                    _ => "w out of [0,1]",
                });
            }
        }
        Ok(())
    }

    /// Merge another upsert of the same logical edge into this one (I4):
    /// weights combine via a capped max-like accumulation, count increments,
    /// timestamp advances. The caller (Learner/Store) decides the exact
    /// reinforcement magnitude; this just performs the bookkeeping merge for
    /// a bare re-upsert with no explicit reinforcement delta.
    pub fn merge_upsert(&mut self, other_w_core: f32, other_w_ctx: f32) {
        self.w_core = (self.w_core + other_w_core).min(1.0);
        self.w_ctx = (self.w_ctx + other_w_ctx).min(1.0);
        self.count += 1;
        self.ts_last = crate::graph::node::now_ns();
        self.refresh_w();
    }
}

/// `w = λ·w_ctx + (1−λ)·w_core`, implementation default λ = 0.3 — the core
/// weight dominates.
pub fn effective_weight(w_core: f32, w_ctx: f32) -> f32 {
    (LAMBDA_MIX * w_ctx + (1.0 - LAMBDA_MIX) * w_core).clamp(0.0, 1.0)
}

/// 128-bit relation mask (64 relation codes fit in `mask_low`; `mask_high`
/// reserves room for codes 64-127).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelMask {
    pub mask_low: u64,
    pub mask_high: u64,
}

impl RelMask {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self { mask_low: !0, mask_high: !0 }
    }

    pub fn of(rels: &[Relation]) -> Self {
        let mut m = Self::none();
        for &r in rels {
            m.set(r);
        }
        m
    }

    pub fn set(&mut self, rel: Relation) {
        let r = rel as u32;
        if r < 64 {
            self.mask_low |= 1u64 << r;
        } else {
            self.mask_high |= 1u64 << (r - 64);
        }
    }

    pub fn test(&self, rel: Relation) -> bool {
        let r = rel as u32;
        if r < 64 {
            self.mask_low & (1u64 << r) != 0
        } else {
            self.mask_high & (1u64 << (r - 64)) != 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_weight_favors_core() {
        let w = effective_weight(1.0, 0.0);
        assert!((w - 0.7).abs() < 1e-6);
    }

    #[test]
    fn relmask_round_trips() {
        let mask = RelMask::of(&[Relation::Exact, Relation::Leap]);
        assert!(mask.test(Relation::Exact));
        assert!(mask.test(Relation::Leap));
        assert!(!mask.test(Relation::Temporal));
    }

    #[test]
    fn invariant_rejects_zero_endpoints() {
        let e = Edge::new(NodeId::ZERO, Relation::Exact, NodeId::ZERO, 0, 0.5, 0.5);
        assert!(e.check_invariants().is_err());
    }

    #[test]
    fn merge_upsert_increments_count_and_weights() {
        let src = ids::node_id(crate::graph::node::NodeType::Symbol, crate::graph::node::NodeFlags::empty(), b"a");
        let dst = ids::node_id(crate::graph::node::NodeType::Symbol, crate::graph::node::NodeFlags::empty(), b"b");
        let mut e = Edge::new(src, Relation::Temporal, dst, 0, 0.1, 0.1);
        let w_before = e.w_core + e.w_ctx;
        e.merge_upsert(0.1, 0.1);
        assert_eq!(e.count, 2);
        assert!(e.w_core + e.w_ctx > w_before);
    }
}
