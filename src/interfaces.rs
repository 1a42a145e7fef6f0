use crate::coordinate_system::LocalFrame;
use crate::error::{MaterialError, Result};
use crate::properties::MaterialProperties;
use nalgebra::Point3;
use std::collections::HashMap;
use strum_macros::{Display, EnumIter, EnumString};

/// Quantities published at the quadrature points. The serialized form is the
/// registration name used by downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum Q {
    #[strum(serialize = "elasticity_tensor")]
    ElasticityTensor,
    #[strum(serialize = "first_local_axis")]
    FirstLocalAxis,
    #[strum(serialize = "second_local_axis")]
    SecondLocalAxis,
    #[strum(serialize = "normal_local_axis")]
    NormalLocalAxis,
    #[strum(serialize = "PorousFlow_permeability_qp")]
    Permeability,
    #[strum(serialize = "dPorousFlow_permeability_qp_dvar")]
    PermeabilityDVar,
    #[strum(serialize = "dPorousFlow_permeability_qp_dgradvar")]
    PermeabilityDGradVar,
    #[strum(serialize = "damage_index")]
    DamageIndex,
}

impl Q {
    pub const fn q_dim(&self) -> QDim {
        match self {
            Q::ElasticityTensor => QDim::RankFourTensor(3),
            Q::FirstLocalAxis | Q::SecondLocalAxis | Q::NormalLocalAxis => QDim::Vector(3),
            Q::Permeability => QDim::SquareTensor(3),
            // one entry per coupled variable; the permeability depends on none
            Q::PermeabilityDVar => QDim::TensorSequence(0, 3),
            Q::PermeabilityDGradVar => QDim::NestedTensorSequence(0, 0, 3),
            Q::DamageIndex => QDim::Scalar,
        }
    }

    pub const fn size(&self) -> usize {
        self.q_dim().size()
    }

    /// Name of the property with an optional prefix, e.g. `mech_elasticity_tensor`.
    pub fn with_base_name(&self, base_name: Option<&str>) -> String {
        match base_name {
            Some(base) if !base.is_empty() => format!("{}_{}", base, self),
            _ => self.to_string(),
        }
    }
}

/// Shape of a quantity at a single quadrature point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QDim {
    Scalar,
    Vector(usize),
    SquareTensor(usize),
    RankFourTensor(usize),
    /// `TensorSequence(n, dim)`: `n` square tensors of dimension `dim`.
    TensorSequence(usize, usize),
    /// `NestedTensorSequence(n, m, dim)`: `n` sequences of `m` square tensors.
    NestedTensorSequence(usize, usize, usize),
}

impl QDim {
    pub const fn size(&self) -> usize {
        match self {
            QDim::Scalar => 1,
            QDim::Vector(n) => *n,
            QDim::SquareTensor(n) => *n * *n,
            QDim::RankFourTensor(n) => *n * *n * *n * *n,
            QDim::TensorSequence(len, n) => *len * *n * *n,
            QDim::NestedTensorSequence(outer, inner, n) => *outer * *inner * *n * *n,
        }
    }

    /// Length of the outermost sequence, `None` for plain tensors.
    pub const fn outer_len(&self) -> Option<usize> {
        match self {
            QDim::TensorSequence(len, _) => Some(*len),
            QDim::NestedTensorSequence(outer, _, _) => Some(*outer),
            _ => None,
        }
    }
}

/// Everything the host knows about the quadrature point being evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QpContext {
    pub elem: usize,
    pub qp: usize,
    pub point: Point3<f64>,
    pub time: f64,
}

impl QpContext {
    pub fn new(elem: usize, qp: usize, point: Point3<f64>, time: f64) -> Self {
        Self {
            elem,
            qp,
            point,
            time,
        }
    }
}

/// The quadrature points of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementQp {
    pub elem: usize,
    pub points: Vec<Point3<f64>>,
    pub time: f64,
}

impl ElementQp {
    pub fn n_qp(&self) -> usize {
        self.points.len()
    }

    pub fn context(&self, qp: usize) -> QpContext {
        QpContext::new(self.elem, qp, self.points[qp], self.time)
    }
}

/// A scalar function of time and space.
pub trait Function: Send + Sync {
    fn value(&self, t: f64, p: &Point3<f64>) -> Result<f64>;
}

impl<F> Function for F
where
    F: Fn(f64, &Point3<f64>) -> f64 + Send + Sync,
{
    fn value(&self, t: f64, p: &Point3<f64>) -> Result<f64> {
        Ok(self(t, p))
    }
}

/// A scalar functor evaluated at an element quadrature point.
pub trait Functor: Send + Sync {
    fn value(&self, qp: &QpContext) -> Result<f64>;
}

impl<F> Functor for F
where
    F: Fn(&QpContext) -> f64 + Send + Sync,
{
    fn value(&self, qp: &QpContext) -> Result<f64> {
        Ok(self(qp))
    }
}

/// Named helper objects the host constructs before the materials.
pub trait UserObject: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn as_local_frame(&self) -> Option<&dyn LocalFrame> {
        None
    }
}

pub trait Material: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// Names and shapes of the properties written by this material.
    fn define_output(&self) -> HashMap<String, QDim>;

    /// Material parameters as given in the input block.
    fn parameters(&self) -> HashMap<String, f64>;

    fn compute_qp_properties(&self, qp: &QpContext, props: &mut MaterialProperties) -> Result<()>;

    /// Values of stateful properties before the first step.
    fn init_qp_stateful_properties(
        &self,
        qp: &QpContext,
        props: &mut MaterialProperties,
    ) -> Result<()> {
        self.compute_qp_properties(qp, props)
    }

    fn compute_properties(&self, elem: &ElementQp, props: &mut MaterialProperties) -> Result<()> {
        props.check_element(elem)?;
        for qp in 0..elem.n_qp() {
            self.compute_qp_properties(&elem.context(qp), props)?;
        }
        Ok(())
    }

    /// Recomputes only the listed points of `elem`.
    fn compute_some(
        &self,
        elem: &ElementQp,
        props: &mut MaterialProperties,
        qps: &[usize],
    ) -> Result<()> {
        props.check_element(elem)?;
        for &qp in qps {
            if qp >= elem.n_qp() {
                return Err(MaterialError::NoSuchPoint {
                    elem: elem.elem,
                    qp,
                });
            }
            self.compute_qp_properties(&elem.context(qp), props)?;
        }
        Ok(())
    }
}
