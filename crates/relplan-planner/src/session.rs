//! Per-statement build session: id counter plus a sticky first-error slot.
//!
//! A session lives for exactly one top-level build and is dropped with the
//! builder. Once an error is recorded every later step short-circuits with
//! that same error, so callers always see the first failure.

use relplan_core::config::PlannerConfig;
use relplan_core::error::{Error, Result};
use relplan_core::id::{AggNodeId, OperatorKind, PlanId};

#[derive(Debug)]
pub struct BuildSession {
    config: PlannerConfig,
    next_id: u64,
    next_agg_node: u64,
    err: Option<Error>,
}

impl BuildSession {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            next_id: 0,
            next_agg_node: 0,
            err: None,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Next session-unique operator id.
    pub fn alloc_id(&mut self, kind: OperatorKind) -> PlanId {
        self.next_id += 1;
        PlanId::new(kind, self.next_id)
    }

    /// Next identity for an aggregate call node.
    pub fn alloc_agg_node_id(&mut self) -> AggNodeId {
        self.next_agg_node += 1;
        AggNodeId::new(self.next_agg_node)
    }

    /// Number of operator ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next_id
    }

    /// `Err(first error)` once anything failed.
    pub fn ensure_clean(&self) -> Result<()> {
        match &self.err {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Pass `Ok` through; on `Err` remember it unless an earlier error is
    /// already recorded, and return the recorded one.
    pub fn record<T>(&mut self, res: Result<T>) -> Result<T> {
        res.map_err(|e| self.fail(e))
    }

    /// Record `e` unless an earlier error is recorded; return the first error.
    pub fn fail(&mut self, e: Error) -> Error {
        if self.err.is_none() {
            #[cfg(feature = "tracing")]
            tracing::debug!(kind = e.kind(), error = %e, "plan build failed");
        }
        self.err.get_or_insert(e).clone()
    }

    pub fn error(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    pub fn has_failed(&self) -> bool {
        self.err.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut s = BuildSession::new(PlannerConfig::default());
        let a = s.alloc_id(OperatorKind::TableScan);
        let b = s.alloc_id(OperatorKind::TableScan);
        let c = s.alloc_id(OperatorKind::Projection);
        assert_ne!(a, b);
        assert!(a.seq() < b.seq() && b.seq() < c.seq());
        assert_eq!(s.allocated(), 3);
    }

    #[test]
    fn first_error_sticks() {
        let mut s = BuildSession::new(PlannerConfig::default());
        assert!(s.ensure_clean().is_ok());
        let first = Error::ArityMismatch {
            expected: 1,
            found: 2,
        };
        let got = s.record::<()>(Err(first.clone())).unwrap_err();
        assert_eq!(got, first);

        let later = s
            .record::<()>(Err(Error::UnsupportedConstruct("later".into())))
            .unwrap_err();
        assert_eq!(later, first);
        assert_eq!(s.ensure_clean().unwrap_err(), first);
        assert_eq!(s.error(), Some(&first));
    }

    #[test]
    fn ok_results_pass_through() {
        let mut s = BuildSession::new(PlannerConfig::default());
        assert_eq!(s.record(Ok(5)).unwrap(), 5);
        assert!(!s.has_failed());
    }
}
