//! Index configuration and the rules governing how it may change.

use serde::{Deserialize, Serialize};

use super::error::HnswError;

/// Default target degree for layers above zero.
pub const DEFAULT_M: usize = 16;
/// Default maximum degree for layers above zero.
pub const DEFAULT_M_MAX: usize = 16;
/// Default maximum degree at the ground layer.
pub const DEFAULT_M_MAX0: usize = 32;
/// Default candidate pool size during insertion.
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
/// Default candidate pool size during queries.
pub const DEFAULT_EF_SEARCH: usize = 200;

/// Parameters governing graph shape and exploration breadth.
///
/// `m`, `m_max`, `m_max0`, and `ef_construction` shape the persisted graph
/// and are frozen once the configuration is first written. Only `ef_search`
/// may change afterwards.
///
/// # Examples
/// ```
/// use akami_core::HnswConfig;
///
/// let config = HnswConfig::default();
/// assert_eq!((config.m, config.m_max, config.m_max0), (16, 16, 32));
/// assert_eq!(config.ef_construction, 200);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Target number of edges selected for a new node per layer.
    #[serde(rename = "M")]
    pub m: usize,
    /// Degree bound for layers above zero.
    #[serde(rename = "Mmax")]
    pub m_max: usize,
    /// Degree bound for the ground layer.
    #[serde(rename = "Mmax0")]
    pub m_max0: usize,
    /// Exploration budget used while inserting.
    #[serde(rename = "efConstruction")]
    pub ef_construction: usize,
    /// Exploration budget used while querying.
    #[serde(rename = "efSearch")]
    pub ef_search: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: DEFAULT_M,
            m_max: DEFAULT_M_MAX,
            m_max0: DEFAULT_M_MAX0,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
        }
    }
}

impl HnswConfig {
    /// Checks ranges and clamps `ef_construction` up to `m`.
    ///
    /// # Errors
    /// Returns [`HnswError::InvalidParameters`] when `m < 2` or any degree
    /// bound or `ef_search` is zero.
    ///
    /// # Examples
    /// ```
    /// use akami_core::HnswConfig;
    ///
    /// let config = HnswConfig { m: 24, ef_construction: 8, ..HnswConfig::default() }
    ///     .validated()
    ///     .expect("config must be valid");
    /// assert_eq!(config.ef_construction, 24);
    /// ```
    pub fn validated(mut self) -> Result<Self, HnswError> {
        if self.m < 2 {
            return Err(HnswError::InvalidParameters {
                reason: format!("M must be at least 2 (got {})", self.m),
            });
        }
        for (field, value) in [
            ("Mmax", self.m_max),
            ("Mmax0", self.m_max0),
            ("efSearch", self.ef_search),
        ] {
            if value == 0 {
                return Err(HnswError::InvalidParameters {
                    reason: format!("{field} must be greater than zero"),
                });
            }
        }
        self.ef_construction = self.ef_construction.max(self.m);
        Ok(self)
    }

    /// Degree bound enforced at `layer`.
    #[must_use]
    pub const fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 { self.m_max0 } else { self.m_max }
    }

    /// Multiplier applied to `-ln(U)` when sampling levels.
    #[must_use]
    pub fn level_multiplier(&self) -> f64 {
        #[expect(
            clippy::cast_precision_loss,
            reason = "degrees are small integers well within f64 precision"
        )]
        let m = self.m as f64;
        m.ln().recip()
    }

    /// Applies `update`, leaving unset fields as they are.
    #[must_use]
    pub fn merged(self, update: &ConfigUpdate) -> Self {
        Self {
            m: update.m.unwrap_or(self.m),
            m_max: update.m_max.unwrap_or(self.m_max),
            m_max0: update.m_max0.unwrap_or(self.m_max0),
            ef_construction: update.ef_construction.unwrap_or(self.ef_construction),
            ef_search: update.ef_search.unwrap_or(self.ef_search),
        }
    }

    /// Rejects `candidate` when it changes a field frozen by persistence.
    ///
    /// # Errors
    /// Returns [`HnswError::ImmutableConfigViolation`] naming the first
    /// differing frozen field.
    pub fn ensure_compatible(&self, candidate: &Self) -> Result<(), HnswError> {
        for (field, stored, requested) in [
            ("M", self.m, candidate.m),
            ("Mmax", self.m_max, candidate.m_max),
            ("Mmax0", self.m_max0, candidate.m_max0),
            ("efConstruction", self.ef_construction, candidate.ef_construction),
        ] {
            if stored != requested {
                return Err(HnswError::ImmutableConfigViolation {
                    field,
                    stored,
                    requested,
                });
            }
        }
        Ok(())
    }
}

/// Partial configuration supplied by callers; unset fields keep their
/// current (or default) values.
///
/// # Examples
/// ```
/// use akami_core::ConfigUpdate;
///
/// let update: ConfigUpdate = serde_json::from_str(r#"{"efSearch": 64}"#)
///     .expect("update must parse");
/// assert_eq!(update.ef_search, Some(64));
/// assert!(update.m.is_none());
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Requested `M`.
    #[serde(rename = "M", default, skip_serializing_if = "Option::is_none")]
    pub m: Option<usize>,
    /// Requested `Mmax`.
    #[serde(rename = "Mmax", default, skip_serializing_if = "Option::is_none")]
    pub m_max: Option<usize>,
    /// Requested `Mmax0`.
    #[serde(rename = "Mmax0", default, skip_serializing_if = "Option::is_none")]
    pub m_max0: Option<usize>,
    /// Requested `efConstruction`.
    #[serde(
        rename = "efConstruction",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ef_construction: Option<usize>,
    /// Requested `efSearch`.
    #[serde(rename = "efSearch", default, skip_serializing_if = "Option::is_none")]
    pub ef_search: Option<usize>,
}

impl ConfigUpdate {
    /// Returns whether no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.m.is_none()
            && self.m_max.is_none()
            && self.m_max0.is_none()
            && self.ef_construction.is_none()
            && self.ef_search.is_none()
    }
}

impl From<HnswConfig> for ConfigUpdate {
    fn from(config: HnswConfig) -> Self {
        Self {
            m: Some(config.m),
            m_max: Some(config.m_max),
            m_max0: Some(config.m_max0),
            ef_construction: Some(config.ef_construction),
            ef_search: Some(config.ef_search),
        }
    }
}
