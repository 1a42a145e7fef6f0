//! Cartesian local coordinate systems describing the bedding of a rock.
//!
//! The local axes `e1` and `e2` span the bedding plane and `e3` is its normal. A frame can be
//! built from a dip, from the trend and plunge of `e1` and `e2`, from two vectors, or from three
//! geological angles.

use crate::error::{from_serde, MaterialError, Result};
use crate::interfaces::UserObject;
use crate::tensor::{axis_rotation, rotate_rank_two, RankFourTensor, RankTwoTensor, RealVector};
use log::debug;
use nalgebra::Point3;
use serde::Deserialize;

/// Rotation between a local basis and the global one.
pub trait LocalFrame: Send + Sync {
    fn e1(&self) -> RealVector;
    fn e2(&self) -> RealVector;
    fn e3(&self) -> RealVector;

    /// Matrix with the local axes as rows.
    fn rotation_global_to_local(&self) -> RankTwoTensor;

    fn rotation_local_to_global(&self) -> RankTwoTensor;

    /// `T ← R T Rᵀ` with `R` the local to global rotation.
    fn rotate_local_to_global(&self, t: &mut RankTwoTensor) {
        *t = rotate_rank_two(t, &self.rotation_local_to_global());
    }

    fn rotate_global_to_local(&self, t: &mut RankTwoTensor) {
        *t = rotate_rank_two(t, &self.rotation_global_to_local());
    }

    fn rotate_local_to_global_rank_four(&self, c: &mut RankFourTensor) {
        c.rotate(&self.rotation_local_to_global());
    }

    fn rotate_global_to_local_rank_four(&self, c: &mut RankFourTensor) {
        c.rotate(&self.rotation_global_to_local());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum DipOption {
    /// `e1` is horizontal, `e2` points down the dip.
    #[serde(rename = "e1_e2_plane_e1_horizontal")]
    E1Horizontal,
    /// `e1` points down the dip, `e2` is horizontal.
    #[serde(rename = "e1_e2_plane_e2_horizontal")]
    E2Horizontal,
}

/// Input block of a [`CartesianLocalCoordinateSystem`]. Exactly one way of defining the axes
/// may be used.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoordinateSystemConfig {
    #[serde(default)]
    pub origin: [f64; 3],
    pub dip_direction_degree: Option<f64>,
    pub dip_angle_degree: Option<f64>,
    pub dip_option: Option<DipOption>,
    pub e1_trend_degree: Option<f64>,
    pub e1_plunge_degree: Option<f64>,
    pub e2_trend_degree: Option<f64>,
    pub e2_plunge_degree: Option<f64>,
    pub e1: Option<[f64; 3]>,
    pub e2: Option<[f64; 3]>,
    pub point_on_e1_e2: Option<[f64; 3]>,
    #[serde(default = "default_normalize")]
    pub normalize: bool,
}

fn default_normalize() -> bool {
    true
}

impl Default for CoordinateSystemConfig {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            dip_direction_degree: None,
            dip_angle_degree: None,
            dip_option: None,
            e1_trend_degree: None,
            e1_plunge_degree: None,
            e2_trend_degree: None,
            e2_plunge_degree: None,
            e1: None,
            e2: None,
            point_on_e1_e2: None,
            normalize: true,
        }
    }
}

impl CoordinateSystemConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| from_serde(CartesianLocalCoordinateSystem::TYPE, e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartesianLocalCoordinateSystem {
    origin: Point3<f64>,
    e1: RealVector,
    e2: RealVector,
    e3: RealVector,
    global_to_local: RankTwoTensor,
    local_to_global: RankTwoTensor,
}

/// Unit vector pointing along `trend` (clockwise from north, the global y axis) and dipping
/// `plunge` below the horizontal.
fn trend_plunge_vector(trend_degree: f64, plunge_degree: f64) -> RealVector {
    let (s1, c1) = trend_degree.to_radians().sin_cos();
    let (s2, c2) = plunge_degree.to_radians().sin_cos();
    RealVector::new(s1 * c2, c1 * c2, -s2)
}

impl CartesianLocalCoordinateSystem {
    pub const TYPE: &'static str = "CartesianLocalCoordinateSystem";

    pub fn new(config: &CoordinateSystemConfig) -> Result<Self> {
        let from_dip = [
            config.dip_direction_degree.is_some(),
            config.dip_angle_degree.is_some(),
            config.dip_option.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        let from_trend_and_plunge = [
            config.e1_trend_degree,
            config.e1_plunge_degree,
            config.e2_trend_degree,
            config.e2_plunge_degree,
        ]
        .iter()
        .filter(|v| v.is_some())
        .count();
        let from_vectors = [config.e1, config.e2, config.point_on_e1_e2]
            .iter()
            .filter(|v| v.is_some())
            .count();

        let sources = (from_dip > 0) as usize
            + (from_trend_and_plunge > 0) as usize
            + (from_vectors > 0) as usize;
        if sources != 1 {
            return Err(MaterialError::invalid(
                Self::TYPE,
                "the axes must be given by exactly one of: \
                 'dip_direction_degree', 'dip_angle_degree' and 'dip_option'; \
                 'e1_trend_degree', 'e1_plunge_degree', 'e2_trend_degree' and 'e2_plunge_degree'; \
                 'e1' and one of 'e2' or 'point_on_e1_e2'",
            ));
        }

        let origin = Point3::from(config.origin);
        let frame = if from_dip > 0 {
            match (
                config.dip_direction_degree,
                config.dip_angle_degree,
                config.dip_option,
            ) {
                (Some(direction), Some(angle), Some(option)) => {
                    Self::from_dip(origin, direction, angle, option)?
                }
                _ => {
                    return Err(MaterialError::invalid(
                        Self::TYPE,
                        "'dip_direction_degree', 'dip_angle_degree' and 'dip_option' \
                         must all be given",
                    ))
                }
            }
        } else if from_trend_and_plunge > 0 {
            match (
                config.e1_trend_degree,
                config.e1_plunge_degree,
                config.e2_trend_degree,
                config.e2_plunge_degree,
            ) {
                (Some(t1), Some(p1), Some(t2), Some(p2)) => Self::from_vectors(
                    origin,
                    trend_plunge_vector(t1, p1),
                    trend_plunge_vector(t2, p2),
                    config.normalize,
                )?,
                _ => {
                    return Err(MaterialError::invalid(
                        Self::TYPE,
                        "'e1_trend_degree', 'e1_plunge_degree', 'e2_trend_degree' and \
                         'e2_plunge_degree' must all be given",
                    ))
                }
            }
        } else {
            let e2 = match (config.e1, config.e2, config.point_on_e1_e2) {
                (Some(_), Some(e2), None) => RealVector::from(e2),
                (Some(_), None, Some(point)) => Point3::from(point) - origin,
                _ => {
                    return Err(MaterialError::invalid(
                        Self::TYPE,
                        "'e1' must be given together with exactly one of 'e2' or 'point_on_e1_e2'",
                    ))
                }
            };
            let e1 = RealVector::from(config.e1.unwrap_or_default());
            Self::from_vectors(origin, e1, e2, config.normalize)?
        };
        debug!(
            "local coordinate system e1 = {:?}, e2 = {:?}, e3 = {:?}",
            frame.e1.as_slice(),
            frame.e2.as_slice(),
            frame.e3.as_slice()
        );
        Ok(frame)
    }

    pub fn from_dip(
        origin: Point3<f64>,
        dip_direction_degree: f64,
        dip_angle_degree: f64,
        option: DipOption,
    ) -> Result<Self> {
        let (s1, c1) = dip_direction_degree.to_radians().sin_cos();
        let (s2, c2) = dip_angle_degree.to_radians().sin_cos();
        let down_dip = RealVector::new(s1 * c2, c1 * c2, -s2);
        let (e1, e2) = match option {
            DipOption::E1Horizontal => (RealVector::new(c1, -s1, 0.0), down_dip),
            DipOption::E2Horizontal => (down_dip, RealVector::new(-c1, s1, 0.0)),
        };
        let e3 = e1.cross(&e2);
        Self::from_axes(origin, e1, e2, e3)
    }

    /// Gram-Schmidt on `e1` and `e2`; `e2` is corrected to be perpendicular to `e1`.
    pub fn from_vectors(
        origin: Point3<f64>,
        e1: RealVector,
        e2: RealVector,
        normalize: bool,
    ) -> Result<Self> {
        const MIN_LENGTH: f64 = 1e-6;
        let e1_length = e1.norm();
        if e1_length < MIN_LENGTH {
            return Err(MaterialError::invalid("e1", "length is too close to zero"));
        }
        if e2.norm() < MIN_LENGTH {
            return Err(MaterialError::invalid("e2", "length is too close to zero"));
        }
        let e1_out = if normalize { e1 / e1_length } else { e1 };
        let mut e3 = e1.cross(&e2);
        let e3_length = e3.norm();
        if e3_length < MIN_LENGTH {
            return Err(MaterialError::invalid(
                "e2",
                "'e1' and 'e2' are parallel or anti-parallel",
            ));
        }
        if normalize {
            e3 /= e3_length;
        }
        let e2_out = e3.cross(&e1_out);
        Self::from_axes(origin, e1_out, e2_out, e3)
    }

    /// Axes from `(dip, dip_direction, rotation)` in degrees: the columns of
    /// `Rz(dip_direction) Ry(dip) Rz(rotation)`.
    pub fn from_geological_angles(angles: [f64; 3]) -> Result<Self> {
        let [dip, dip_direction, rotation] = angles;
        let q = axis_rotation(2, dip_direction.to_radians())
            * axis_rotation(1, dip.to_radians())
            * axis_rotation(2, rotation.to_radians());
        Self::from_axes(
            Point3::origin(),
            q.column(0).into_owned(),
            q.column(1).into_owned(),
            q.column(2).into_owned(),
        )
    }

    fn from_axes(
        origin: Point3<f64>,
        e1: RealVector,
        e2: RealVector,
        e3: RealVector,
    ) -> Result<Self> {
        let global_to_local =
            RankTwoTensor::from_rows(&[e1.transpose(), e2.transpose(), e3.transpose()]);
        let local_to_global = global_to_local
            .try_inverse()
            .ok_or_else(|| {
                MaterialError::invalid(Self::TYPE, "the local axes are not independent")
            })?;
        Ok(Self {
            origin,
            e1,
            e2,
            e3,
            global_to_local,
            local_to_global,
        })
    }

    pub fn origin(&self) -> Point3<f64> {
        self.origin
    }

    /// Coordinates of a global point in the local basis.
    pub fn to_local(&self, point: &Point3<f64>) -> RealVector {
        self.global_to_local * (point - self.origin)
    }
}

impl LocalFrame for CartesianLocalCoordinateSystem {
    fn e1(&self) -> RealVector {
        self.e1
    }

    fn e2(&self) -> RealVector {
        self.e2
    }

    fn e3(&self) -> RealVector {
        self.e3
    }

    fn rotation_global_to_local(&self) -> RankTwoTensor {
        self.global_to_local
    }

    fn rotation_local_to_global(&self) -> RankTwoTensor {
        self.local_to_global
    }
}

impl UserObject for CartesianLocalCoordinateSystem {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn as_local_frame(&self) -> Option<&dyn LocalFrame> {
        Some(self)
    }
}
