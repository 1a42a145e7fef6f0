//! Scalar damage index driven by a nonlocal variable.
//!
//! Damage starts once the nonlocal variable `κ` exceeds the onset `I` and grows as
//! `ω (1 - exp(-A ((κ - I) / F)^N))`. It never decreases.

use crate::error::{from_serde, MaterialError, Result};
use crate::interfaces::{Functor, Material, QDim, QpContext, Q};
use crate::properties::{MaterialProperties, PropertyId};
use crate::registry::{Named, Registry};
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

const TOLERANCE: f64 = 1e-12;

fn one() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    10000.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageConfig {
    pub nonlocal_variable: String,
    /// Onset of damage.
    #[serde(rename = "parameter_damageI", default)]
    pub onset: f64,
    #[serde(rename = "parameter_damageF", default = "default_scale")]
    pub scale: f64,
    #[serde(rename = "parameter_damageA", default = "one")]
    pub a: f64,
    #[serde(rename = "parameter_damageN", default = "one")]
    pub n: f64,
    /// Largest damage reached.
    #[serde(default = "one")]
    pub omega: f64,
    pub base_name: Option<String>,
}

impl DamageConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| from_serde(OpalinusDamage::TYPE, e))
    }
}

pub struct OpalinusDamage {
    onset: f64,
    scale: f64,
    a: f64,
    n: f64,
    omega: f64,
    base_name: Option<String>,
    nonlocal_variable: Named<dyn Functor>,
    damage_index_id: PropertyId,
}

impl OpalinusDamage {
    pub const TYPE: &'static str = "OpalinusDamage";

    pub fn new(
        config: &DamageConfig,
        registry: &Registry,
        props: &mut MaterialProperties,
    ) -> Result<Self> {
        if !(config.scale > 0.0) {
            return Err(MaterialError::invalid(
                "parameter_damageF",
                format!("must be positive, got {}", config.scale),
            ));
        }
        let nonlocal_variable = registry.functor(&config.nonlocal_variable)?;
        let name = Q::DamageIndex.with_base_name(config.base_name.as_deref());
        let damage_index_id = props.declare_stateful(&name, Q::DamageIndex.q_dim())?;
        debug!(
            "{}: '{}' driven by {:?}",
            Self::TYPE,
            name,
            nonlocal_variable
        );
        Ok(Self {
            onset: config.onset,
            scale: config.scale,
            a: config.a,
            n: config.n,
            omega: config.omega,
            base_name: config.base_name.clone(),
            nonlocal_variable,
            damage_index_id,
        })
    }

    /// Damage for a nonlocal variable `kappa`, without the history.
    pub fn damage(&self, kappa: f64) -> f64 {
        if kappa <= self.onset {
            return 0.0;
        }
        let growth = 1.0 - (-self.a * ((kappa - self.onset) / self.scale).powf(self.n)).exp();
        self.omega.min(self.omega * growth.max(0.0))
    }

    pub fn damage_index_name(&self) -> String {
        Q::DamageIndex.with_base_name(self.base_name.as_deref())
    }
}

impl Material for OpalinusDamage {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn define_output(&self) -> HashMap<String, QDim> {
        HashMap::from([(self.damage_index_name(), Q::DamageIndex.q_dim())])
    }

    fn parameters(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("parameter_damageI".to_string(), self.onset),
            ("parameter_damageF".to_string(), self.scale),
            ("parameter_damageA".to_string(), self.a),
            ("parameter_damageN".to_string(), self.n),
            ("omega".to_string(), self.omega),
        ])
    }

    fn init_qp_stateful_properties(
        &self,
        qp: &QpContext,
        props: &mut MaterialProperties,
    ) -> Result<()> {
        props.set_scalar(self.damage_index_id, qp.qp, 0.0);
        Ok(())
    }

    fn compute_qp_properties(&self, qp: &QpContext, props: &mut MaterialProperties) -> Result<()> {
        let kappa = self.nonlocal_variable.source.value(qp)?;
        let old = props.get_scalar_old(self.damage_index_id, qp.qp)?;
        let damage = self.damage(kappa).max(old);
        if damage < -TOLERANCE || damage > 1.0 + TOLERANCE {
            return Err(MaterialError::Domain(format!(
                "{} must be between 0 and 1, got {}",
                self.damage_index_name(),
                damage
            )));
        }
        props.set_scalar(self.damage_index_id, qp.qp, damage);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ElementQp;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Nonlocal variable whose value the test can change between steps.
    #[derive(Clone)]
    struct Kappa(Arc<Mutex<f64>>);

    impl Functor for Kappa {
        fn value(&self, _qp: &QpContext) -> Result<f64> {
            self.0
                .lock()
                .map(|v| *v)
                .map_err(|e| MaterialError::collaborator("kappa", e.to_string()))
        }
    }

    fn element() -> ElementQp {
        ElementQp {
            elem: 0,
            points: vec![Point3::origin()],
            time: 0.0,
        }
    }

    /// Damage material with its initial state set.
    fn setup(config: serde_json::Value) -> (OpalinusDamage, MaterialProperties, Kappa) {
        let kappa = Kappa(Arc::new(Mutex::new(0.0)));
        let mut registry = Registry::new();
        registry.add_functor("kappa", kappa.clone());
        let mut props = MaterialProperties::new(1);
        let config = DamageConfig::from_json(config).unwrap();
        let damage = OpalinusDamage::new(&config, &registry, &mut props).unwrap();
        damage
            .init_qp_stateful_properties(&element().context(0), &mut props)
            .unwrap();
        props.copy_to_old();
        (damage, props, kappa)
    }

    fn step(
        damage: &OpalinusDamage,
        props: &mut MaterialProperties,
        kappa: &Kappa,
        value: f64,
    ) -> Result<f64> {
        *kappa.0.lock().unwrap() = value;
        damage.compute_properties(&element(), props)?;
        props.copy_to_old();
        props.get_scalar(damage.damage_index_id, 0)
    }

    #[test]
    fn damage_law() {
        let (damage, _, _) = setup(json!({
            "nonlocal_variable": "kappa",
            "parameter_damageI": 0.01,
            "parameter_damageF": 0.1,
            "parameter_damageA": 2.0,
            "parameter_damageN": 1.5,
            "omega": 0.9
        }));
        assert_eq!(damage.damage(0.005), 0.0);
        assert_eq!(damage.damage(0.01), 0.0);
        let expected = 0.9 * (1.0 - (-2.0 * (0.09f64 / 0.1).powf(1.5)).exp());
        assert_relative_eq!(damage.damage(0.1), expected, epsilon = 1e-15);
        assert!(damage.damage(1e6) <= 0.9);
    }

    #[test]
    fn damage_never_heals() {
        let (damage, mut props, kappa) =
            setup(json!({"nonlocal_variable": "kappa", "parameter_damageF": 1.0}));
        assert_eq!(props.get_scalar_old(damage.damage_index_id, 0), Ok(0.0));

        let loaded = step(&damage, &mut props, &kappa, 2.0).unwrap();
        assert_relative_eq!(loaded, 1.0 - (-2.0f64).exp(), epsilon = 1e-15);
        let unloaded = step(&damage, &mut props, &kappa, 0.5).unwrap();
        assert_eq!(unloaded, loaded);
        let reloaded = step(&damage, &mut props, &kappa, 3.0).unwrap();
        assert!(reloaded > loaded);
    }

    #[test]
    fn out_of_range_damage_is_an_error() {
        let (damage, mut props, kappa) = setup(json!({
            "nonlocal_variable": "kappa",
            "omega": 1.5,
            "parameter_damageF": 1.0
        }));
        assert!(matches!(
            step(&damage, &mut props, &kappa, 100.0),
            Err(MaterialError::Domain(_))
        ));
    }

    #[test]
    fn defaults_and_validation() {
        let config = DamageConfig::from_json(json!({"nonlocal_variable": "kappa"})).unwrap();
        assert_eq!(config.onset, 0.0);
        assert_eq!(config.scale, 10000.0);
        assert_eq!((config.a, config.n, config.omega), (1.0, 1.0, 1.0));

        let mut props = MaterialProperties::new(1);
        let registry = Registry::new();
        assert!(matches!(
            OpalinusDamage::new(&config, &registry, &mut props),
            Err(MaterialError::UnknownObject { .. })
        ));
        let bad = DamageConfig {
            scale: 0.0,
            ..config
        };
        assert!(matches!(
            OpalinusDamage::new(&bad, &registry, &mut props),
            Err(MaterialError::InvalidParameter { .. })
        ));
    }
}
