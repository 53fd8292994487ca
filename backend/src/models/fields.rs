//! Fields - named per-point physical quantities
//!
//! An interpolation produces exactly 22 quantities per point: the lapse,
//! the shift vector, the spatial metric, the extrinsic curvature and six
//! matter variables.
//!
//! # Critical Invariants
//!
//! 1. **Complete**: every `Fields` holds all 22 quantities, never a subset
//! 2. **Aligned**: every quantity has the same number of values, equal to
//!    the point count of the grid it was computed on
//! 3. **Ordered merge**: `Fields::concat` appends parts in the order given

use serde::de::{Error as _, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of quantities in a complete field set
pub const FIELD_COUNT: usize = 22;

/// Number of vacuum (spacetime) quantities; the rest are matter quantities
pub const VACUUM_FIELD_COUNT: usize = 16;

/// The fixed vocabulary of field names, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    Alpha,
    BetaX,
    BetaY,
    BetaZ,
    GammaXX,
    GammaXY,
    GammaXZ,
    GammaYY,
    GammaYZ,
    GammaZZ,
    KXX,
    KXY,
    KXZ,
    KYY,
    KYZ,
    KZZ,
    Rho,
    Epsilon,
    Pressure,
    VX,
    VY,
    VZ,
}

impl FieldName {
    /// All names in canonical order
    pub const ALL: [FieldName; FIELD_COUNT] = [
        FieldName::Alpha,
        FieldName::BetaX,
        FieldName::BetaY,
        FieldName::BetaZ,
        FieldName::GammaXX,
        FieldName::GammaXY,
        FieldName::GammaXZ,
        FieldName::GammaYY,
        FieldName::GammaYZ,
        FieldName::GammaZZ,
        FieldName::KXX,
        FieldName::KXY,
        FieldName::KXZ,
        FieldName::KYY,
        FieldName::KYZ,
        FieldName::KZZ,
        FieldName::Rho,
        FieldName::Epsilon,
        FieldName::Pressure,
        FieldName::VX,
        FieldName::VY,
        FieldName::VZ,
    ];

    /// Canonical wire name (e.g. `"gamma_xy"`, `"K_zz"`)
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::Alpha => "alpha",
            FieldName::BetaX => "beta_x",
            FieldName::BetaY => "beta_y",
            FieldName::BetaZ => "beta_z",
            FieldName::GammaXX => "gamma_xx",
            FieldName::GammaXY => "gamma_xy",
            FieldName::GammaXZ => "gamma_xz",
            FieldName::GammaYY => "gamma_yy",
            FieldName::GammaYZ => "gamma_yz",
            FieldName::GammaZZ => "gamma_zz",
            FieldName::KXX => "K_xx",
            FieldName::KXY => "K_xy",
            FieldName::KXZ => "K_xz",
            FieldName::KYY => "K_yy",
            FieldName::KYZ => "K_yz",
            FieldName::KZZ => "K_zz",
            FieldName::Rho => "rho",
            FieldName::Epsilon => "epsilon",
            FieldName::Pressure => "pressure",
            FieldName::VX => "v_x",
            FieldName::VY => "v_y",
            FieldName::VZ => "v_z",
        }
    }

    /// Position in canonical order
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the six hydrodynamic quantities
    pub fn is_matter(self) -> bool {
        self.index() >= VACUUM_FIELD_COUNT
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field name '{0}'")]
pub struct UnknownFieldName(pub String);

impl FromStr for FieldName {
    type Err = UnknownFieldName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownFieldName(s.to_string()))
    }
}

// Names travel as strings so the wire format does not depend on
// declaration order.
impl Serialize for FieldName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(D::Error::custom)
    }
}

/// Errors raised when assembling or merging field sets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldsError {
    #[error("missing field '{0}'")]
    MissingField(FieldName),

    #[error("field '{0}' given more than once")]
    DuplicateField(FieldName),

    #[error("field '{field}' has {actual} values, expected {expected}")]
    LengthMismatch {
        field: FieldName,
        expected: usize,
        actual: usize,
    },

    #[error("no partial results to merge")]
    NothingToMerge,
}

/// Complete set of 22 per-point quantities
///
/// # Example
/// ```
/// use fieldsplit_core_rs::{FieldName, Fields};
///
/// let fields = Fields::from_fn(3, |name, i| (name.index() * 10 + i) as f64).unwrap();
/// assert_eq!(fields.n_points(), 3);
/// assert_eq!(fields.get(FieldName::BetaX), &[10.0, 11.0, 12.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    columns: [Vec<f64>; FIELD_COUNT],
}

impl Fields {
    /// Build from columns given in canonical order
    ///
    /// # Errors
    ///
    /// Returns `LengthMismatch` if the columns differ in length.
    pub fn from_columns(columns: [Vec<f64>; FIELD_COUNT]) -> Result<Self, FieldsError> {
        let expected = columns[0].len();
        for (name, column) in FieldName::ALL.into_iter().zip(&columns) {
            if column.len() != expected {
                return Err(FieldsError::LengthMismatch {
                    field: name,
                    expected,
                    actual: column.len(),
                });
            }
        }
        Ok(Self { columns })
    }

    /// Build from `(name, values)` pairs in any order
    ///
    /// # Errors
    ///
    /// Every name must appear exactly once: returns `DuplicateField` or
    /// `MissingField` otherwise, then `LengthMismatch` for ragged columns.
    pub fn from_named<I>(entries: I) -> Result<Self, FieldsError>
    where
        I: IntoIterator<Item = (FieldName, Vec<f64>)>,
    {
        let mut slots: [Option<Vec<f64>>; FIELD_COUNT] = Default::default();
        for (name, values) in entries {
            let slot = &mut slots[name.index()];
            if slot.is_some() {
                return Err(FieldsError::DuplicateField(name));
            }
            *slot = Some(values);
        }
        let mut columns: [Vec<f64>; FIELD_COUNT] = Default::default();
        for ((name, slot), column) in FieldName::ALL.into_iter().zip(slots).zip(columns.iter_mut()) {
            *column = slot.ok_or(FieldsError::MissingField(name))?;
        }
        Self::from_columns(columns)
    }

    /// Build by evaluating `value(name, point_index)` for every entry
    pub fn from_fn<F>(n_points: usize, mut value: F) -> Result<Self, FieldsError>
    where
        F: FnMut(FieldName, usize) -> f64,
    {
        let columns = FieldName::ALL.map(|name| (0..n_points).map(|i| value(name, i)).collect());
        Self::from_columns(columns)
    }

    /// All-zero field set
    pub fn zeros(n_points: usize) -> Self {
        Self {
            columns: std::array::from_fn(|_| vec![0.0; n_points]),
        }
    }

    /// Number of points each quantity covers
    pub fn n_points(&self) -> usize {
        self.columns[0].len()
    }

    pub fn get(&self, name: FieldName) -> &[f64] {
        &self.columns[name.index()]
    }

    /// `(name, values)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &[f64])> + '_ {
        FieldName::ALL
            .into_iter()
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Consume into columns in canonical order
    pub fn into_columns(self) -> [Vec<f64>; FIELD_COUNT] {
        self.columns
    }

    /// Concatenate per-partition results in the order given
    ///
    /// Point `i` of the result is point `i` of the grid the parts were
    /// split from, provided `parts` is in partition order.
    ///
    /// # Errors
    ///
    /// Returns `NothingToMerge` if `parts` is empty.
    pub fn concat(parts: Vec<Fields>) -> Result<Fields, FieldsError> {
        let mut parts = parts.into_iter();
        let mut merged = parts.next().ok_or(FieldsError::NothingToMerge)?;
        for part in parts {
            for (column, values) in merged.columns.iter_mut().zip(part.columns) {
                column.extend_from_slice(&values);
            }
        }
        Ok(merged)
    }
}

impl<'de> Deserialize<'de> for Fields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FieldsVisitor)
    }
}

struct FieldsVisitor;

impl<'de> Visitor<'de> for FieldsVisitor {
    type Value = Fields;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map of the {FIELD_COUNT} named fields")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Fields, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(FIELD_COUNT));
        while let Some(entry) = map.next_entry::<FieldName, Vec<f64>>()? {
            entries.push(entry);
        }
        Fields::from_named(entries).map_err(A::Error::custom)
    }
}

impl Serialize for Fields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FIELD_COUNT))?;
        for (name, values) in self.iter() {
            map.serialize_entry(&name, values)?;
        }
        map.end()
    }
}
