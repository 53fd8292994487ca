//! Closed-form stand-in for the native interpolation
//!
//! Every quantity is a pure function of one point's coordinates and the
//! request's tuning parameters, so results do not depend on how the grid
//! was partitioned. The spacetime is a unit-mass isotropic
//! Schwarzschild-like profile; matter is a Gaussian blob in rigid
//! rotation, present only for systems with a neutron star.

use super::{InterpolationError, Interpolator};
use crate::models::{FieldName, Fields, InterpolationRequest, FIELD_COUNT};

/// Deterministic, reentrant interpolator with no external dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticInterpolator;

impl SyntheticInterpolator {
    pub fn new() -> Self {
        Self
    }

    /// All 22 quantities at one point, in canonical order
    pub fn evaluate(request: &InterpolationRequest, point: [f64; 3]) -> [f64; FIELD_COUNT] {
        let [x, y, z] = point;
        let r2 = x * x + y * y + z * z;
        // Softened radius keeps the origin finite.
        let r = (r2 + 1.0).sqrt();
        let r3 = r * r * r;

        let psi = 1.0 + 0.5 / r;
        let alpha = (1.0 - 0.5 / r) / psi;
        let conformal = psi.powi(4);

        let shift = request.interpolation_offset / r3;
        let curvature = request.relative_dr_spacing / (r3 * r * r);

        let mut values = [0.0; FIELD_COUNT];
        values[FieldName::Alpha.index()] = alpha;
        values[FieldName::BetaX.index()] = shift * x;
        values[FieldName::BetaY.index()] = shift * y;
        values[FieldName::BetaZ.index()] = shift * z;
        values[FieldName::GammaXX.index()] = conformal;
        values[FieldName::GammaYY.index()] = conformal;
        values[FieldName::GammaZZ.index()] = conformal;
        values[FieldName::KXX.index()] = curvature * x * x;
        values[FieldName::KXY.index()] = curvature * x * y;
        values[FieldName::KXZ.index()] = curvature * x * z;
        values[FieldName::KYY.index()] = curvature * y * y;
        values[FieldName::KYZ.index()] = curvature * y * z;
        values[FieldName::KZZ.index()] = curvature * z * z;

        if request.binary_type.has_matter() {
            let rho = (-r2).exp();
            let omega = 0.01 * f64::from(request.interpolation_order) / r3;
            values[FieldName::Rho.index()] = rho;
            values[FieldName::Epsilon.index()] = 0.1 * rho;
            values[FieldName::Pressure.index()] = 100.0 * rho * rho;
            values[FieldName::VX.index()] = -omega * y;
            values[FieldName::VY.index()] = omega * x;
        }
        values
    }
}

impl Interpolator for SyntheticInterpolator {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn interpolate(&self, request: &InterpolationRequest) -> Result<Fields, InterpolationError> {
        let n_points = request.grid.len();
        let mut columns: [Vec<f64>; FIELD_COUNT] =
            std::array::from_fn(|_| Vec::with_capacity(n_points));
        for point in request.grid.points() {
            let values = Self::evaluate(request, point);
            for (column, value) in columns.iter_mut().zip(values) {
                column.push(value);
            }
        }
        Ok(Fields::from_columns(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinaryType, Grid};

    fn request(kind: BinaryType) -> InterpolationRequest {
        let grid = Grid::new(vec![0.0, 3.0], vec![0.0, 4.0], vec![0.0, 0.0]).unwrap();
        InterpolationRequest::new(kind, grid, "synthetic.info")
    }

    #[test]
    fn test_covers_every_point() {
        let fields = SyntheticInterpolator.interpolate(&request(BinaryType::Bns)).unwrap();
        assert_eq!(fields.n_points(), 2);
    }

    #[test]
    fn test_black_holes_have_no_matter() {
        let fields = SyntheticInterpolator.interpolate(&request(BinaryType::Bbh)).unwrap();
        for (name, values) in fields.iter() {
            if name.is_matter() {
                assert!(values.iter().all(|v| *v == 0.0), "{name} should be zero");
            }
        }
        assert!(fields.get(FieldName::Alpha).iter().all(|a| *a > 0.0 && *a < 1.0));
    }

    #[test]
    fn test_metric_is_conformally_flat() {
        let fields = SyntheticInterpolator.interpolate(&request(BinaryType::Bhns)).unwrap();
        assert_eq!(fields.get(FieldName::GammaXX), fields.get(FieldName::GammaZZ));
        assert!(fields.get(FieldName::GammaXY).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_binary_info_unsupported() {
        let err = SyntheticInterpolator
            .binary_info(std::path::Path::new("x.info"), BinaryType::Bns)
            .unwrap_err();
        assert!(matches!(err, InterpolationError::Unsupported { .. }));
    }
}
