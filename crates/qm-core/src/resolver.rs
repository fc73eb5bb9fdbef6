//! Selection of account-level resources against stored defaults.
//!
//! The rule is deliberately strict: when more than one candidate exists and
//! the stored default does not name one of them, resolution fails instead of
//! guessing. A machine should never land on an arbitrarily chosen network.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ResourceRef;

/// The resource kinds a server placement has to settle on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Network,
    SshKey,
    Firewall,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Network => "network",
            Self::SshKey => "SSH key",
            Self::Firewall => "firewall",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("no {kind} exists on the cloud account; create one first")]
    NoneAvailable { kind: ResourceKind },
    #[error("multiple {kind} candidates and no usable default; set one first")]
    Ambiguous {
        kind: ResourceKind,
        candidates: Vec<ResourceRef>,
    },
}

/// Pick one resource out of `candidates`, consulting `preferred` only when
/// the choice is otherwise ambiguous.
///
/// A sole candidate is returned as-is even if a default points elsewhere;
/// a default referencing a since-deleted resource counts as unset.
pub fn resolve(
    kind: ResourceKind,
    candidates: &BTreeMap<i64, ResourceRef>,
    preferred: Option<i64>,
) -> Result<ResourceRef, ResolveError> {
    let mut values = candidates.values();
    match (values.next(), values.next()) {
        (None, _) => Err(ResolveError::NoneAvailable { kind }),
        // A lone resource needs no default, stored or not.
        (Some(only), None) => Ok(only.clone()),
        (Some(_), Some(_)) => {
            if let Some(chosen) = preferred.and_then(|id| candidates.get(&id)) {
                return Ok(chosen.clone());
            }
            let mut sorted: Vec<ResourceRef> = candidates.values().cloned().collect();
            sorted.sort_by(|a, b| a.name.cmp(&b.name));
            Err(ResolveError::Ambiguous {
                kind,
                candidates: sorted,
            })
        }
    }
}
