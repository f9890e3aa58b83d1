//! Planner configuration that callers can serialize/deserialize.
//!
//! One value is handed to each build session; nothing here is process-global.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Route statements through this builder. When false, `build_logical_plan`
    /// refuses and the caller keeps using its previous planner.
    pub use_new_planner: bool,

    /// Fold a LIMIT sitting directly on a SORT into the sort as a top-k bound.
    pub fold_limit_into_sort: bool,

    /// Maximum nesting of derived tables and subqueries.
    pub max_nesting_depth: usize,

    /// Database assumed for unqualified table names.
    pub default_database: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            use_new_planner: true,
            fold_limit_into_sort: true,
            max_nesting_depth: 64,
            default_database: None,
        }
    }
}

impl PlannerConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RELPLAN_USE_NEW_PLANNER`: `true`/`false`/`1`/`0`
    /// - `RELPLAN_FOLD_LIMIT_INTO_SORT`: `true`/`false`/`1`/`0`
    /// - `RELPLAN_MAX_NESTING_DEPTH`: positive integer
    /// - `RELPLAN_DEFAULT_DATABASE`: database name
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("RELPLAN_USE_NEW_PLANNER").and_then(|s| parse_bool(&s)) {
            cfg.use_new_planner = v;
        }

        if let Some(v) = lookup("RELPLAN_FOLD_LIMIT_INTO_SORT").and_then(|s| parse_bool(&s)) {
            cfg.fold_limit_into_sort = v;
        }

        if let Some(s) = lookup("RELPLAN_MAX_NESTING_DEPTH") {
            if let Ok(v) = s.trim().parse::<usize>() {
                if v > 0 {
                    cfg.max_nesting_depth = v;
                }
            }
        }

        if let Some(s) = lookup("RELPLAN_DEFAULT_DATABASE") {
            let s = s.trim();
            if !s.is_empty() {
                cfg.default_database = Some(s.to_string());
            }
        }

        cfg
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("RELPLAN_USE_NEW_PLANNER", "0"),
            ("RELPLAN_MAX_NESTING_DEPTH", "8"),
            ("RELPLAN_DEFAULT_DATABASE", "shop"),
        ]
        .into_iter()
        .collect();
        let cfg = PlannerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert!(!cfg.use_new_planner);
        assert!(cfg.fold_limit_into_sort);
        assert_eq!(cfg.max_nesting_depth, 8);
        assert_eq!(cfg.default_database.as_deref(), Some("shop"));
    }

    #[test]
    fn garbage_values_keep_defaults() {
        let cfg = PlannerConfig::from_lookup(|k| match k {
            "RELPLAN_FOLD_LIMIT_INTO_SORT" => Some("maybe".into()),
            "RELPLAN_MAX_NESTING_DEPTH" => Some("0".into()),
            _ => None,
        });
        assert_eq!(cfg, PlannerConfig::default());
    }

    #[test]
    fn deserializes_partial_documents() {
        let cfg: PlannerConfig = serde_json::from_str(r#"{"fold_limit_into_sort": false}"#).unwrap();
        assert!(!cfg.fold_limit_into_sort);
        assert!(cfg.use_new_planner);
    }
}
