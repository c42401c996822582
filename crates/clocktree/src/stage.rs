//! Stage model: one tunable integer parameter of a clock tree.
//!
//! A stage is a named, finite, non-empty, ordered set of legal values. The
//! search enumerates it in declaration order. Values outside the domain are
//! rejected, never clamped.
//!
//! ```
//! use clocktree::StageDomain;
//!
//! let p = StageDomain::values("P", [2, 4, 6, 8]).unwrap();
//! assert_eq!(p.iter().collect::<Vec<_>>(), vec![2, 4, 6, 8]);
//! assert!(StageDomain::range("M", 63, 2).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ConfigError;

/// A named integer parameter and its legal values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDomain {
    name: String,
    values: Vec<u32>,
}

impl StageDomain {
    /// Inclusive range `low..=high`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MalformedRange`] if `low > high`.
    pub fn range(name: impl Into<String>, low: u32, high: u32) -> Result<Self, ConfigError> {
        let name = name.into();
        if low > high {
            return Err(ConfigError::MalformedRange { stage: name, low, high });
        }
        Ok(Self { name, values: (low..=high).collect() })
    }

    /// Explicit ordered set of values, enumerated in the order given.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyDomain`] for an empty list,
    /// [`ConfigError::DuplicateValue`] if a value repeats.
    pub fn values(
        name: impl Into<String>,
        values: impl IntoIterator<Item = u32>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let values: Vec<u32> = values.into_iter().collect();
        if values.is_empty() {
            return Err(ConfigError::EmptyDomain { stage: name });
        }
        let mut seen = HashSet::with_capacity(values.len());
        for &v in &values {
            if !seen.insert(v) {
                return Err(ConfigError::DuplicateValue { stage: name, value: v });
            }
        }
        Ok(Self { name, values })
    }

    /// Binary `{0, 1}` domain (odd-bit, output-enable).
    pub fn flag(name: impl Into<String>) -> Self {
        Self { name: name.into(), values: vec![0, 1] }
    }

    /// Single-value domain.
    pub fn fixed(name: impl Into<String>, value: u32) -> Self {
        Self { name: name.into(), values: vec![value] }
    }

    /// Collapse this stage to one of its own legal values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::OutOfDomain`] if `value` is not legal for this stage.
    pub fn restrict(&self, value: u32) -> Result<Self, ConfigError> {
        if !self.contains(value) {
            return Err(ConfigError::OutOfDomain { stage: self.name.clone(), value });
        }
        Ok(Self::fixed(self.name.clone(), value))
    }

    /// Stage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Legal values in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.values.iter().copied()
    }

    /// Legal values as a slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    /// Number of legal values (always at least 1).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `true` if `value` is a legal choice.
    pub fn contains(&self, value: u32) -> bool {
        self.values.contains(&value)
    }

    /// Smallest legal value.
    pub fn min(&self) -> Option<u32> {
        self.values.iter().copied().min()
    }

    /// Largest legal value.
    pub fn max(&self) -> Option<u32> {
        self.values.iter().copied().max()
    }
}
