//! Actuation matrix, pseudo-inverse, and null-space basis.
//!
//! The actuation matrix `B` (6 x n) maps actuator commands to body wrench.
//! For an omnidirectional vehicle with more actuators than wrench axes,
//! `B` has full row rank and a non-trivial null space: commands of the form
//! `u = pinv(B) * w + N * z` all realize the same wrench `w`, with the
//! null-space coefficients `z` selecting among them. Everything here is
//! computed once per geometry and read-only afterwards.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use alloc_types::{AllocError, Result, VehicleGeometry, Wrench, WRENCH_DIM};

/// Prepared allocation matrices for a fixed vehicle geometry.
///
/// # Example
///
/// ```
/// use alloc_core::ActuationMap;
/// use alloc_types::{VehicleGeometry, Wrench};
///
/// let geometry = VehicleGeometry::tilted_octo();
/// let map = ActuationMap::from_geometry(&geometry).unwrap();
/// assert_eq!(map.rank(), 6);
/// assert_eq!(map.coeff_dim(), 2);
///
/// // The minimum-norm hover solution realizes the hover wrench.
/// let u = map.min_norm_solution(&Wrench::hover(geometry.mass));
/// let achieved = map.wrench_of(&u).unwrap();
/// assert!((achieved - Wrench::hover(geometry.mass)).norm() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ActuationMap {
    b: DMatrix<f64>,
    pinv: DMatrix<f64>,
    null_basis: DMatrix<f64>,
    rank: usize,
}

impl ActuationMap {
    /// Build the actuation matrix from a vehicle geometry and factorize it.
    ///
    /// Runs a single SVD to obtain the pseudo-inverse and an orthonormal
    /// null-space basis. The geometry must be omnidirectional (rank 6) and
    /// its configured coefficient dimension must match the actual
    /// null-space dimension `n - rank`.
    ///
    /// # Errors
    ///
    /// - [`AllocError::InvalidGeometry`] if the geometry fails validation
    /// - [`AllocError::SvdFailed`] if the factorization does not converge
    /// - [`AllocError::RankDeficient`] if the layout does not span all six axes
    /// - [`AllocError::DimensionMismatch`] if the configured coefficient
    ///   dimension disagrees with `n - rank`
    pub fn from_geometry(geometry: &VehicleGeometry) -> Result<Self> {
        geometry.validate()?;
        let n = geometry.actuator_count();
        let kf = geometry.thrust_coeff;
        let km = geometry.drag_coeff;

        let mut b = DMatrix::zeros(WRENCH_DIM, n);
        for (i, rotor) in geometry.rotors.iter().enumerate() {
            let force = rotor.axis * kf;
            let torque =
                rotor.position.cross(&rotor.axis) * kf + rotor.axis * (rotor.spin.sign() * km);
            for r in 0..3 {
                b[(r, i)] = force[r];
                b[(r + 3, i)] = torque[r];
            }
        }

        let svd = b.clone().svd(true, true);
        let sigma_max = svd
            .singular_values
            .iter()
            .fold(0.0_f64, |m, s| m.max(*s));
        if !sigma_max.is_finite() {
            return Err(AllocError::non_finite("singular values"));
        }
        let tol = sigma_max * (n.max(WRENCH_DIM) as f64) * f64::EPSILON;
        let rank = svd.singular_values.iter().filter(|s| **s > tol).count();
        if rank < WRENCH_DIM {
            return Err(AllocError::RankDeficient {
                rank,
                required: WRENCH_DIM,
            });
        }

        // The thin SVD only exposes the row space (rows of V^T); the null
        // basis is its orthogonal complement in command space.
        let v_t = svd.v_t.as_ref().ok_or(AllocError::SvdFailed)?;
        let null_columns = orthogonal_complement(v_t, rank, n);
        if null_columns.len() != geometry.coeff_dim {
            return Err(AllocError::dimension_mismatch(
                "null-space dimension",
                geometry.coeff_dim,
                null_columns.len(),
            ));
        }
        let null_basis = DMatrix::from_columns(&null_columns);

        let pinv = svd.pseudo_inverse(tol).map_err(|_| AllocError::SvdFailed)?;

        debug!(
            actuators = n,
            rank,
            coeff_dim = null_columns.len(),
            sigma_max,
            "actuation map factorized"
        );

        Ok(Self {
            b,
            pinv,
            null_basis,
            rank,
        })
    }

    /// The actuation matrix `B` (6 x n).
    #[must_use]
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.b
    }

    /// The pseudo-inverse `pinv(B)` (n x 6).
    #[must_use]
    pub fn pseudo_inverse(&self) -> &DMatrix<f64> {
        &self.pinv
    }

    /// Orthonormal null-space basis `N` (n x k).
    #[must_use]
    pub fn null_basis(&self) -> &DMatrix<f64> {
        &self.null_basis
    }

    /// Numerical rank of `B`.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of actuators (columns of `B`).
    #[must_use]
    pub fn actuator_count(&self) -> usize {
        self.b.ncols()
    }

    /// Null-space coefficient dimensionality.
    #[must_use]
    pub fn coeff_dim(&self) -> usize {
        self.null_basis.ncols()
    }

    /// Minimum-norm command realizing `wrench`: `pinv(B) * w`.
    #[must_use]
    pub fn min_norm_solution(&self, wrench: &Wrench) -> DVector<f64> {
        &self.pinv * wrench.to_dvector()
    }

    /// Wrench-free command perturbation `N * z`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::DimensionMismatch`] if `coefficients` does not
    /// have length [`coeff_dim`](Self::coeff_dim).
    pub fn perturbation(&self, coefficients: &DVector<f64>) -> Result<DVector<f64>> {
        if coefficients.len() != self.coeff_dim() {
            return Err(AllocError::dimension_mismatch(
                "coefficients",
                self.coeff_dim(),
                coefficients.len(),
            ));
        }
        Ok(&self.null_basis * coefficients)
    }

    /// Wrench produced by a command: `B * u`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::DimensionMismatch`] if `command` does not have
    /// one entry per actuator.
    pub fn wrench_of(&self, command: &DVector<f64>) -> Result<Wrench> {
        if command.len() != self.actuator_count() {
            return Err(AllocError::dimension_mismatch(
                "command",
                self.actuator_count(),
                command.len(),
            ));
        }
        Wrench::from_dvector(&(&self.b * command))
    }
}

/// Orthonormal basis of the orthogonal complement of the first `rank` rows
/// of `v_t`, built by projecting the standard basis of command space.
fn orthogonal_complement(v_t: &DMatrix<f64>, rank: usize, n: usize) -> Vec<DVector<f64>> {
    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(n.saturating_sub(rank));
    for j in 0..n {
        if basis.len() == n - rank {
            break;
        }
        let mut v = DVector::zeros(n);
        v[j] = 1.0;
        for r in 0..rank {
            let row = v_t.row(r).transpose();
            let dot = row.dot(&v);
            v -= row * dot;
        }
        for accepted in &basis {
            let dot = accepted.dot(&v);
            v -= accepted * dot;
        }
        let norm = v.norm();
        if norm > 1e-8 {
            basis.push(v / norm);
        }
    }
    basis
}
