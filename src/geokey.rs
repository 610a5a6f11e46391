use crate::error::DataError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical zero-padded geographic identifier.
///
/// States are 2 characters ("06"), counties 5 ("06037") with the owning
/// state's id as prefix. Raw source data arrives unpadded, or as numbers;
/// every boundary into the aggregation layer goes through `normalize_state`
/// or `normalize_county` so map lookups never mix padded and unpadded keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoId(String);

impl GeoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 2-character state prefix of a county id.
    pub fn state_prefix(&self) -> &str {
        &self.0[..2.min(self.0.len())]
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw key as it appears in source data: string or integer.
#[derive(Debug, Clone)]
pub enum RawKey {
    Text(String),
    Number(i64),
}

impl From<&str> for RawKey {
    fn from(s: &str) -> Self {
        RawKey::Text(s.to_string())
    }
}

impl From<String> for RawKey {
    fn from(s: String) -> Self {
        RawKey::Text(s)
    }
}

impl From<&String> for RawKey {
    fn from(s: &String) -> Self {
        RawKey::Text(s.clone())
    }
}

impl From<i64> for RawKey {
    fn from(n: i64) -> Self {
        RawKey::Number(n)
    }
}

impl From<u64> for RawKey {
    fn from(n: u64) -> Self {
        RawKey::Number(n as i64)
    }
}

impl From<u32> for RawKey {
    fn from(n: u32) -> Self {
        RawKey::Number(n as i64)
    }
}

pub fn normalize_state(raw: impl Into<RawKey>) -> Result<GeoId, DataError> {
    normalize(raw.into(), 2)
}

pub fn normalize_county(raw: impl Into<RawKey>) -> Result<GeoId, DataError> {
    normalize(raw.into(), 5)
}

/// Assemble a county GeoId from the census API's separate FP columns
/// (2-wide state, 3-wide county-within-state).
pub fn county_from_parts(
    state_fp: impl Into<RawKey>,
    county_fp: impl Into<RawKey>,
) -> Result<GeoId, DataError> {
    let state = normalize(state_fp.into(), 2)?;
    let county = normalize(county_fp.into(), 3)?;
    Ok(GeoId(format!("{}{}", state.0, county.0)))
}

fn normalize(raw: RawKey, width: usize) -> Result<GeoId, DataError> {
    let value = match raw {
        RawKey::Number(n) => {
            if n < 0 {
                return Err(DataError::InvalidKey(n.to_string()));
            }
            n as u64
        }
        RawKey::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
                return Err(DataError::InvalidKey(s));
            }
            trimmed
                .parse::<u64>()
                .map_err(|_| DataError::InvalidKey(s))?
        }
    };

    let padded = format!("{:0width$}", value, width = width);
    if padded.len() > width {
        return Err(DataError::InvalidKey(padded));
    }
    Ok(GeoId(padded))
}
