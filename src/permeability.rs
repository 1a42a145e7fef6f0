//! Anisotropic intrinsic permeability aligned with the bedding.
//!
//! `diag(k1, k2, k3)` is given along the axes of a local coordinate system and rotated to
//! global axes once. At each quadrature point it may be scaled by a functor, by a scalar
//! material property or by their product.

use crate::coordinate_system::LocalFrame;
use crate::error::{from_serde, Result};
use crate::interfaces::{Functor, Material, QDim, QpContext, Q};
use crate::properties::{MaterialProperties, PropertyId};
use crate::registry::{Named, Registry};
use crate::tensor::{RankTwoTensor, RealVector};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermeabilityConfig {
    pub local_coordinate_system: String,
    /// Along `e1`, in the bedding plane (P-samples), in m².
    pub permeability1: f64,
    /// Along `e2`, in the bedding plane (P-samples), in m².
    pub permeability2: f64,
    /// Along the bedding normal `e3` (S-samples), in m².
    pub permeability3: f64,
    pub prefactor_functor: Option<String>,
    pub prefactor_mat_prop: Option<String>,
}

impl PermeabilityConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| from_serde(OpalinusPermeabilityTensor::TYPE, e))
    }
}

pub struct OpalinusPermeabilityTensor {
    principal: RealVector,
    permeability: RankTwoTensor,
    prefactor_functor: Option<Named<dyn Functor>>,
    prefactor_mat_prop: Option<PropertyId>,
    permeability_id: PropertyId,
    dpermeability_dvar_id: PropertyId,
    dpermeability_dgradvar_id: PropertyId,
}

impl OpalinusPermeabilityTensor {
    pub const TYPE: &'static str = "OpalinusPermeabilityTensor";

    pub fn new(
        config: &PermeabilityConfig,
        registry: &Registry,
        props: &mut MaterialProperties,
    ) -> Result<Self> {
        let frame = registry.local_frame(&config.local_coordinate_system)?;
        let principal = RealVector::new(
            config.permeability1,
            config.permeability2,
            config.permeability3,
        );
        if principal.iter().any(|k| *k < 0.0) {
            warn!(
                "{}: negative principal permeability {:?}",
                Self::TYPE,
                principal.as_slice()
            );
        }
        let mut permeability = RankTwoTensor::from_diagonal(&principal);
        frame.rotate_local_to_global(&mut permeability);

        let prefactor_functor = config
            .prefactor_functor
            .as_deref()
            .map(|name| registry.functor(name))
            .transpose()?;
        let prefactor_mat_prop = config
            .prefactor_mat_prop
            .as_deref()
            .map(|name| props.get_property(name, QDim::Scalar))
            .transpose()?;

        let permeability_id = props.declare(&Q::Permeability.to_string(), Q::Permeability.q_dim())?;
        let dpermeability_dvar_id =
            props.declare(&Q::PermeabilityDVar.to_string(), Q::PermeabilityDVar.q_dim())?;
        let dpermeability_dgradvar_id = props.declare(
            &Q::PermeabilityDGradVar.to_string(),
            Q::PermeabilityDGradVar.q_dim(),
        )?;

        debug!(
            "{}: k = {:?} rotated to {:?}, functor = {:?}, property = {:?}",
            Self::TYPE,
            principal.as_slice(),
            permeability.as_slice(),
            prefactor_functor,
            config.prefactor_mat_prop
        );

        Ok(Self {
            principal,
            permeability,
            prefactor_functor,
            prefactor_mat_prop,
            permeability_id,
            dpermeability_dvar_id,
            dpermeability_dgradvar_id,
        })
    }

    /// The rotated, unscaled permeability.
    pub fn permeability(&self) -> &RankTwoTensor {
        &self.permeability
    }

    fn prefactor(&self, qp: &QpContext, props: &MaterialProperties) -> Result<f64> {
        let mut factor = match &self.prefactor_functor {
            Some(functor) => functor.source.value(qp)?,
            None => 1.0,
        };
        // the property may be undefined where the functor vanishes
        if let Some(id) = self.prefactor_mat_prop {
            if factor != 0.0 {
                factor *= props.get_scalar(id, qp.qp)?;
            }
        }
        Ok(factor)
    }
}

impl Material for OpalinusPermeabilityTensor {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn define_output(&self) -> HashMap<String, QDim> {
        [Q::Permeability, Q::PermeabilityDVar, Q::PermeabilityDGradVar]
            .iter()
            .map(|q| (q.to_string(), q.q_dim()))
            .collect()
    }

    fn parameters(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("permeability1".to_string(), self.principal.x),
            ("permeability2".to_string(), self.principal.y),
            ("permeability3".to_string(), self.principal.z),
        ])
    }

    fn compute_qp_properties(&self, qp: &QpContext, props: &mut MaterialProperties) -> Result<()> {
        if self.prefactor_functor.is_some() || self.prefactor_mat_prop.is_some() {
            let factor = self.prefactor(qp, props)?;
            props.set_rank_two(self.permeability_id, qp.qp, &(self.permeability * factor));
        } else {
            props.set_rank_two(self.permeability_id, qp.qp, &self.permeability);
        }
        props.set_empty(self.dpermeability_dvar_id, qp.qp);
        props.set_empty(self.dpermeability_dgradvar_id, qp.qp);
        Ok(())
    }
}
