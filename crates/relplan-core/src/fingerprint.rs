//! Plan-cache keys.
//!
//! A `Fingerprint` is the blake3 digest of a plan's JSON form. Plans built
//! from the same statement against the same catalog serialize identically,
//! so the digest can key a cache of optimized plans across processes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(plan: &Plan) -> Result<Self> {
        let json = serde_json::to_vec(plan)?;
        Ok(Self(*blake3::hash(&json).as_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First eight bytes, for logging.
    pub fn short(&self) -> String {
        self.0[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Parses the 64-char hex form written by `Display`, e.g. a key read back
/// from a persisted plan cache.
impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != 64 || !s.is_ascii() {
            return Err(Error::Hash(format!("fingerprint must be 64 hex chars, got {s:?}")));
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|e| Error::Hash(format!("bad fingerprint {s:?}: {e}")))?;
        }
        Ok(Self(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{OperatorKind, PlanId};
    use crate::plan::PlanKind;
    use crate::schema::Schema;

    fn dual(seq: u64) -> Plan {
        Plan::leaf(
            PlanId::new(OperatorKind::TableDual, seq),
            PlanKind::TableDual,
            Schema::default(),
        )
    }

    #[test]
    fn hex_form_parses_back() {
        let fp = Fingerprint::of(&dual(1)).unwrap();
        let hex = fp.to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with(&fp.short()));
        assert_eq!(hex.parse::<Fingerprint>().unwrap(), fp);
    }

    #[test]
    fn different_plans_differ() {
        assert_eq!(Fingerprint::of(&dual(1)).unwrap(), Fingerprint::of(&dual(1)).unwrap());
        assert_ne!(Fingerprint::of(&dual(1)).unwrap(), Fingerprint::of(&dual(2)).unwrap());
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert!(matches!("abc".parse::<Fingerprint>(), Err(Error::Hash(_))));
        assert!(matches!("zz".repeat(32).parse::<Fingerprint>(), Err(Error::Hash(_))));
    }
}
