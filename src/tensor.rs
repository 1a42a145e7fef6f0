//! Second and fourth order tensors in three dimensions.
//!
//! A [`RankFourTensor`] is stored as a 9×9 matrix whose row index is `3 * i + j` and whose
//! column index is `3 * k + l`, so that a rotation is the product `(R ⊗ R) C (R ⊗ R)ᵀ`.

use nalgebra::{Matrix3, SMatrix, Vector3};
use std::ops::{Mul, MulAssign};

pub type RankTwoTensor = Matrix3<f64>;
pub type RealVector = Vector3<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankFourTensor {
    pub data: SMatrix<f64, 9, 9>,
}

#[inline]
const fn idx(i: usize, j: usize) -> usize {
    3 * i + j
}

impl Default for RankFourTensor {
    fn default() -> Self {
        Self::zeros()
    }
}

impl RankFourTensor {
    pub fn zeros() -> Self {
        Self {
            data: SMatrix::<f64, 9, 9>::zeros(),
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize, l: usize) -> f64 {
        self.data[(idx(i, j), idx(k, l))]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, l: usize, value: f64) {
        self.data[(idx(i, j), idx(k, l))] = value;
    }

    /// Fills a tensor with orthotropic symmetry from the nine components
    /// `C1111 C1122 C1133 C2222 C2233 C3333 C2323 C1313 C1212`.
    pub fn from_symmetric9(input: &[f64; 9]) -> Self {
        let mut c = Self::zeros();
        let [c1111, c1122, c1133, c2222, c2233, c3333, c2323, c1313, c1212] = *input;
        c.set(0, 0, 0, 0, c1111);
        c.set(1, 1, 1, 1, c2222);
        c.set(2, 2, 2, 2, c3333);
        for (a, b, v) in [(0, 1, c1122), (0, 2, c1133), (1, 2, c2233)] {
            c.set(a, a, b, b, v);
            c.set(b, b, a, a, v);
        }
        for (a, b, v) in [(1, 2, c2323), (0, 2, c1313), (0, 1, c1212)] {
            c.set(a, b, a, b, v);
            c.set(b, a, a, b, v);
            c.set(a, b, b, a, v);
            c.set(b, a, b, a, v);
        }
        c
    }

    /// `C'_ijkl = R_ip R_jq R_kr R_ls C_pqrs`
    pub fn rotated(&self, r: &RankTwoTensor) -> Self {
        let mut rr = SMatrix::<f64, 9, 9>::zeros();
        for i in 0..3 {
            for j in 0..3 {
                for p in 0..3 {
                    for q in 0..3 {
                        rr[(idx(i, j), idx(p, q))] = r[(i, p)] * r[(j, q)];
                    }
                }
            }
        }
        Self {
            data: rr * self.data * rr.transpose(),
        }
    }

    pub fn rotate(&mut self, r: &RankTwoTensor) {
        *self = self.rotated(r);
    }

    /// Double contraction `C : A`.
    pub fn double_contract(&self, a: &RankTwoTensor) -> RankTwoTensor {
        let mut out = RankTwoTensor::zeros();
        for i in 0..3 {
            for j in 0..3 {
                let mut sum = 0.0;
                for k in 0..3 {
                    for l in 0..3 {
                        sum += self.get(i, j, k, l) * a[(k, l)];
                    }
                }
                out[(i, j)] = sum;
            }
        }
        out
    }

    /// Largest deviation from `C_ijkl = C_jikl = C_ijlk = C_klij`.
    pub fn symmetry_defect(&self) -> f64 {
        let mut defect: f64 = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    for l in 0..3 {
                        let c = self.get(i, j, k, l);
                        defect = defect
                            .max((c - self.get(j, i, k, l)).abs())
                            .max((c - self.get(i, j, l, k)).abs())
                            .max((c - self.get(k, l, i, j)).abs());
                    }
                }
            }
        }
        defect
    }

    pub fn max_abs(&self) -> f64 {
        self.data.amax()
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            data: SMatrix::<f64, 9, 9>::from_column_slice(values),
        }
    }
}

impl Mul<f64> for RankFourTensor {
    type Output = RankFourTensor;

    fn mul(self, rhs: f64) -> RankFourTensor {
        RankFourTensor {
            data: self.data * rhs,
        }
    }
}

impl MulAssign<f64> for RankFourTensor {
    fn mul_assign(&mut self, rhs: f64) {
        self.data *= rhs;
    }
}

/// `R T Rᵀ`
pub fn rotate_rank_two(t: &RankTwoTensor, r: &RankTwoTensor) -> RankTwoTensor {
    r * t * r.transpose()
}

/// Rotation by `angle` radians about a coordinate axis (0 = x, 1 = y, 2 = z).
pub fn axis_rotation(axis: usize, angle: f64) -> RankTwoTensor {
    let (s, c) = angle.sin_cos();
    match axis {
        0 => RankTwoTensor::new(1.0, 0.0, 0.0, 0.0, c, -s, 0.0, s, c),
        1 => RankTwoTensor::new(c, 0.0, s, 0.0, 1.0, 0.0, -s, 0.0, c),
        _ => RankTwoTensor::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
    }
}

/// Orthonormal with determinant +1 within `tol`.
pub fn is_rotation(r: &RankTwoTensor, tol: f64) -> bool {
    let defect = (r * r.transpose() - RankTwoTensor::identity()).amax();
    defect <= tol && (r.determinant() - 1.0).abs() <= tol
}
