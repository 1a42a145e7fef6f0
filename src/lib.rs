//! Anisotropic material models for layered claystone: a transversely isotropic elasticity
//! tensor and an anisotropic permeability tensor, both aligned with the bedding, and a scalar
//! damage index.

pub mod coordinate_system;
pub mod damage;
pub mod elasticity;
pub mod error;
pub mod factory;
pub mod interfaces;
pub mod mandel;
pub mod permeability;
pub mod properties;
pub mod registry;
pub mod tensor;

#[cfg(feature = "python")]
mod python;

pub use coordinate_system::{CartesianLocalCoordinateSystem, CoordinateSystemConfig, LocalFrame};
pub use damage::{DamageConfig, OpalinusDamage};
pub use elasticity::{ElasticityConfig, OpalinusElasticityTensor, TransverselyIsotropic};
pub use error::{MaterialError, Result};
pub use factory::{create_material, create_user_object, MaterialSystem, MaterialType};
pub use interfaces::{ElementQp, Function, Functor, Material, QDim, QpContext, UserObject, Q};
pub use permeability::{OpalinusPermeabilityTensor, PermeabilityConfig};
pub use properties::{MaterialProperties, PropertyId};
pub use registry::Registry;
pub use tensor::{RankFourTensor, RankTwoTensor, RealVector};
