// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit catalog entry types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Elliptic curve a circuit is compiled over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Bn256,
    Bls381,
    Bls377,
    Bw761,
}

impl Curve {
    pub const ALL: [Curve; 4] = [Curve::Bn256, Curve::Bls381, Curve::Bls377, Curve::Bw761];

    /// Parse a directory-level curve tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "bn256" => Some(Curve::Bn256),
            "bls381" => Some(Curve::Bls381),
            "bls377" => Some(Curve::Bls377),
            "bw761" => Some(Curve::Bw761),
            _ => None,
        }
    }
}

crate::simple_display! {
    Curve {
        Bn256 => "bn256",
        Bls381 => "bls381",
        Bls377 => "bls377",
        Bw761 => "bw761",
    }
}

/// Identifier of a catalog entry, `<curve>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CircuitId {
    curve: Curve,
    name: String,
}

impl CircuitId {
    pub fn new(curve: Curve, name: impl Into<String>) -> Self {
        Self { curve, name: name.into() }
    }

    /// Parse the `<curve>/<name>` form.
    pub fn parse(s: &str) -> Result<Self, CircuitIdError> {
        let (curve_tag, name) =
            s.split_once('/').ok_or_else(|| CircuitIdError::Malformed(s.to_string()))?;
        if name.is_empty() || name.contains('/') {
            return Err(CircuitIdError::Malformed(s.to_string()));
        }
        let curve =
            Curve::parse(curve_tag).ok_or_else(|| CircuitIdError::UnknownCurve(curve_tag.to_string()))?;
        Ok(Self { curve, name: name.to_string() })
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for CircuitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.curve, self.name)
    }
}

impl Serialize for CircuitId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CircuitId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CircuitId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Error parsing a textual circuit id.
#[derive(Debug, Error, PartialEq)]
pub enum CircuitIdError {
    #[error("circuit id must be <curve>/<name>: {0:?}")]
    Malformed(String),

    #[error("unrecognized curve tag {0:?}")]
    UnknownCurve(String),
}

/// An immutable catalog entry: the compiled constraint system plus its
/// proving and verifying keys.
///
/// Artifact bytes are opaque to the daemon and handed to the prover by
/// reference.
#[derive(Clone)]
pub struct Circuit {
    pub id: CircuitId,
    pub constraint_system: Vec<u8>,
    pub proving_key: Vec<u8>,
    pub verifying_key: Vec<u8>,
}

impl std::fmt::Debug for Circuit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Keys run to megabytes; print sizes, not contents.
        f.debug_struct("Circuit")
            .field("id", &self.id)
            .field("constraint_system", &self.constraint_system.len())
            .field("proving_key", &self.proving_key.len())
            .field("verifying_key", &self.verifying_key.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "circuit_tests.rs"]
mod tests;
