//! Construction of materials and user objects from their registration names, and a small
//! driver evaluating a list of materials element by element.

use crate::coordinate_system::{CartesianLocalCoordinateSystem, CoordinateSystemConfig};
use crate::damage::{DamageConfig, OpalinusDamage};
use crate::elasticity::{ElasticityConfig, OpalinusElasticityTensor};
use crate::error::{MaterialError, Result};
use crate::interfaces::{ElementQp, Material, UserObject};
use crate::permeability::{OpalinusPermeabilityTensor, PermeabilityConfig};
use crate::properties::MaterialProperties;
use crate::registry::Registry;
use log::debug;
use serde_json::{Map, Value};
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum MaterialType {
    OpalinusElasticityTensor,
    OpalinusPermeabilityTensor,
    OpalinusDamage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum UserObjectType {
    CartesianLocalCoordinateSystem,
}

fn parse_type<T: FromStr>(type_name: &str, kind: &'static str) -> Result<T> {
    T::from_str(type_name).map_err(|_| MaterialError::UnknownObject {
        kind,
        name: type_name.to_string(),
    })
}

pub fn create_material(
    type_name: &str,
    params: Value,
    registry: &Registry,
    props: &mut MaterialProperties,
) -> Result<Box<dyn Material>> {
    let material: Box<dyn Material> = match parse_type(type_name, "material type")? {
        MaterialType::OpalinusElasticityTensor => Box::new(OpalinusElasticityTensor::new(
            &ElasticityConfig::from_json(params)?,
            registry,
            props,
        )?),
        MaterialType::OpalinusPermeabilityTensor => Box::new(OpalinusPermeabilityTensor::new(
            &PermeabilityConfig::from_json(params)?,
            registry,
            props,
        )?),
        MaterialType::OpalinusDamage => Box::new(OpalinusDamage::new(
            &DamageConfig::from_json(params)?,
            registry,
            props,
        )?),
    };
    Ok(material)
}

pub fn create_user_object(type_name: &str, params: Value) -> Result<Arc<dyn UserObject>> {
    match parse_type(type_name, "user object type")? {
        UserObjectType::CartesianLocalCoordinateSystem => Ok(Arc::new(
            CartesianLocalCoordinateSystem::new(&CoordinateSystemConfig::from_json(params)?)?,
        )),
    }
}

/// Splits an input block into its `name`, its `type` and the remaining parameters.
fn split_block(block: &Value) -> Result<(String, String, Value)> {
    let mut params: Map<String, Value> = block
        .as_object()
        .cloned()
        .ok_or_else(|| MaterialError::invalid("block", "expected an object"))?;
    let mut take = |key: &str| -> Result<String> {
        match params.remove(key) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(MaterialError::invalid(key, "expected a string")),
            None => Err(MaterialError::MissingParameter(key.to_string())),
        }
    };
    let name = take("name")?;
    let type_name = take("type")?;
    Ok((name, type_name, Value::Object(params)))
}

/// The materials of one block of the mesh, evaluated in input order.
pub struct MaterialSystem {
    registry: Registry,
    materials: Vec<(String, Box<dyn Material>)>,
    props: MaterialProperties,
}

impl MaterialSystem {
    /// Builds the system from
    /// `{"UserObjects": [{"name": .., "type": .., ..}], "Materials": [..]}`. Functions and
    /// functors are taken from `registry`.
    pub fn from_json(input: &Value, mut registry: Registry, n_qp: usize) -> Result<Self> {
        let blocks = |key: &str| -> Result<Vec<Value>> {
            match input.get(key) {
                None => Ok(Vec::new()),
                Some(Value::Array(blocks)) => Ok(blocks.clone()),
                Some(_) => Err(MaterialError::invalid(key, "expected a list of blocks")),
            }
        };

        for block in blocks("UserObjects")? {
            let (name, type_name, params) = split_block(&block)?;
            let user_object = create_user_object(&type_name, params)?;
            debug!("user object '{}' of type {}", name, type_name);
            registry.add_user_object(&name, user_object);
        }

        let mut props = MaterialProperties::new(n_qp);
        let mut materials = Vec::new();
        for block in blocks("Materials")? {
            let (name, type_name, params) = split_block(&block)?;
            let material = create_material(&type_name, params, &registry, &mut props)?;
            debug!("material '{}' of type {}", name, type_name);
            materials.push((name, material));
        }
        Ok(Self {
            registry,
            materials,
            props,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn material(&self, name: &str) -> Option<&dyn Material> {
        self.materials
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.as_ref())
    }

    pub fn properties(&self) -> &MaterialProperties {
        &self.props
    }

    /// Sets the initial state of the stateful properties of `elem`.
    pub fn init_stateful(&mut self, elem: &ElementQp) -> Result<()> {
        self.props.select_element(elem)?;
        for (_, material) in self.materials.iter() {
            for qp in 0..elem.n_qp() {
                material.init_qp_stateful_properties(&elem.context(qp), &mut self.props)?;
            }
        }
        self.props.copy_element_to_old();
        Ok(())
    }

    pub fn compute(&mut self, elem: &ElementQp) -> Result<()> {
        self.props.select_element(elem)?;
        for (_, material) in self.materials.iter() {
            material.compute_properties(elem, &mut self.props)?;
        }
        Ok(())
    }

    /// Recomputes the points `qps` of `elem`. Other points keep their values when `elem` is
    /// the element computed last.
    pub fn compute_some(&mut self, elem: &ElementQp, qps: &[usize]) -> Result<()> {
        if self.props.element() != elem.elem {
            self.props.select_element(elem)?;
        }
        for (_, material) in self.materials.iter() {
            material.compute_some(elem, &mut self.props, qps)?;
        }
        Ok(())
    }

    /// Accepts the current step of every element.
    pub fn advance(&mut self) {
        self.props.copy_to_old();
    }
}
