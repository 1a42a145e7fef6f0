use crate::tensor::{RankFourTensor, RankTwoTensor};
use nalgebra::{SMatrix, SVector};

/// Index pairs of the Voigt and Mandel orderings 11, 22, 33, 23, 13, 12.
pub const VOIGT_PAIRS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (1, 2), (0, 2), (0, 1)];

const SQRT2: f64 = std::f64::consts::SQRT_2;
const FRAC_1_SQRT2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Weight of the Mandel component relative to the Voigt one.
#[inline]
fn weight(a: usize) -> f64 {
    if a < 3 {
        1.0
    } else {
        SQRT2
    }
}

pub fn tensor_to_mandel(tensor: &RankTwoTensor) -> SVector<f64, 6> {
    SVector::<f64, 6>::new(
        tensor.m11,
        tensor.m22,
        tensor.m33,
        SQRT2 * tensor.m23,
        SQRT2 * tensor.m13,
        SQRT2 * tensor.m12,
    )
}

pub fn mandel_to_tensor(mandel: &SVector<f64, 6>) -> RankTwoTensor {
    RankTwoTensor::new(
        mandel[0],
        FRAC_1_SQRT2 * mandel[5],
        FRAC_1_SQRT2 * mandel[4],
        FRAC_1_SQRT2 * mandel[5],
        mandel[1],
        FRAC_1_SQRT2 * mandel[3],
        FRAC_1_SQRT2 * mandel[4],
        FRAC_1_SQRT2 * mandel[3],
        mandel[2],
    )
}

/// Expands a 6×6 Voigt stiffness (engineering shear strains) into a tensor with minor
/// symmetries.
pub fn voigt_to_rank_four(voigt: &SMatrix<f64, 6, 6>) -> RankFourTensor {
    let mut c = RankFourTensor::zeros();
    for (a, &(i, j)) in VOIGT_PAIRS.iter().enumerate() {
        for (b, &(k, l)) in VOIGT_PAIRS.iter().enumerate() {
            let v = voigt[(a, b)];
            c.set(i, j, k, l, v);
            c.set(j, i, k, l, v);
            c.set(i, j, l, k, v);
            c.set(j, i, l, k, v);
        }
    }
    c
}

pub fn rank_four_to_voigt(c: &RankFourTensor) -> SMatrix<f64, 6, 6> {
    SMatrix::<f64, 6, 6>::from_fn(|a, b| {
        let (i, j) = VOIGT_PAIRS[a];
        let (k, l) = VOIGT_PAIRS[b];
        c.get(i, j, k, l)
    })
}

pub fn rank_four_to_mandel(c: &RankFourTensor) -> SMatrix<f64, 6, 6> {
    let voigt = rank_four_to_voigt(c);
    SMatrix::<f64, 6, 6>::from_fn(|a, b| weight(a) * weight(b) * voigt[(a, b)])
}
