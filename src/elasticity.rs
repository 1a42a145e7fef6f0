//! Transversely isotropic elasticity of a bedded rock such as Opalinus Clay.
//!
//! The stiffness is assembled in the bedding frame (`e3` normal to the bedding), rotated once to
//! global axes when the material is constructed, and published at every quadrature point,
//! optionally scaled by a function of time and position.

use crate::coordinate_system::{CartesianLocalCoordinateSystem, LocalFrame};
use crate::error::{from_serde, MaterialError, Result};
use crate::interfaces::{Function, Material, QDim, QpContext, Q};
use crate::mandel::voigt_to_rank_four;
use crate::properties::{MaterialProperties, PropertyId};
use crate::registry::{Named, Registry};
use crate::tensor::{RankFourTensor, RealVector};
use log::debug;
use nalgebra::SMatrix;
use serde::Deserialize;
use std::collections::HashMap;

/// Input block of [`OpalinusElasticityTensor`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticityConfig {
    /// Young's modulus parallel to the bedding (P-sample).
    #[serde(rename = "Ep", alias = "youngs_modulus_in_plane")]
    pub ep: f64,
    /// Young's modulus normal to the bedding (S-sample).
    #[serde(rename = "Es", alias = "youngs_modulus_normal")]
    pub es: f64,
    #[serde(alias = "poisson_ratio_in_plane")]
    pub nu_p: f64,
    #[serde(alias = "poisson_ratio_normal")]
    pub nu_s: f64,
    /// Out of plane shear modulus.
    #[serde(rename = "G_s", alias = "shear_module_normal")]
    pub g_s: f64,
    /// `(dip, dip_direction, rotation)` in degrees.
    pub geological_angles: Option<[f64; 3]>,
    pub local_coordinate_system: Option<String>,
    #[serde(alias = "elasticity_tensor_prefactor")]
    pub prefactor_function: Option<String>,
    pub base_name: Option<String>,
}

impl ElasticityConfig {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| from_serde(OpalinusElasticityTensor::TYPE, e))
    }
}

/// The five engineering constants of a transversely isotropic solid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverselyIsotropic {
    pub ep: f64,
    pub es: f64,
    pub nu_p: f64,
    pub nu_s: f64,
    pub g_s: f64,
}

impl TransverselyIsotropic {
    pub fn new(ep: f64, es: f64, nu_p: f64, nu_s: f64, g_s: f64) -> Result<Self> {
        let constants = Self {
            ep,
            es,
            nu_p,
            nu_s,
            g_s,
        };
        constants.validate()?;
        Ok(constants)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("Ep", self.ep), ("Es", self.es), ("G_s", self.g_s)] {
            if !(value > 0.0) {
                return Err(MaterialError::invalid(
                    name,
                    format!("must be positive, got {}", value),
                ));
            }
        }
        if self.nu_p > 1.0 - 2.0 * self.nu_s.powi(2) * self.ep / self.es {
            return Err(MaterialError::Domain(format!(
                "the elastic constants violate nu_p <= 1 - 2 nu_s^2 Ep / Es \
                 (nu_p = {}, nu_s = {}, Ep = {}, Es = {})",
                self.nu_p, self.nu_s, self.ep, self.es
            )));
        }
        if self.compliance().cholesky().is_none() {
            return Err(MaterialError::Domain(
                "the compliance of the elastic constants is not positive definite".to_string(),
            ));
        }
        Ok(())
    }

    /// In plane shear modulus `Ep / (2 (1 + nu_p))`.
    pub fn g_p(&self) -> f64 {
        self.ep / (2.0 * (1.0 + self.nu_p))
    }

    /// Voigt compliance in the bedding frame, engineering shear strains.
    pub fn compliance(&self) -> SMatrix<f64, 6, 6> {
        let mut s = SMatrix::<f64, 6, 6>::zeros();
        s[(0, 0)] = 1.0 / self.ep;
        s[(1, 1)] = 1.0 / self.ep;
        s[(2, 2)] = 1.0 / self.es;
        s[(0, 1)] = -self.nu_p / self.ep;
        s[(1, 0)] = s[(0, 1)];
        s[(0, 2)] = -self.nu_s / self.es;
        s[(2, 0)] = s[(0, 2)];
        s[(1, 2)] = -self.nu_s / self.es;
        s[(2, 1)] = s[(1, 2)];
        s[(3, 3)] = 1.0 / self.g_s;
        s[(4, 4)] = 1.0 / self.g_s;
        s[(5, 5)] = 1.0 / self.g_p();
        s
    }

    pub fn stiffness(&self) -> Result<SMatrix<f64, 6, 6>> {
        self.compliance()
            .try_inverse()
            .ok_or_else(|| MaterialError::Domain("the elastic compliance is singular".to_string()))
    }

    /// Stiffness tensor in the bedding frame.
    pub fn stiffness_tensor(&self) -> Result<RankFourTensor> {
        Ok(voigt_to_rank_four(&self.stiffness()?))
    }
}

pub struct OpalinusElasticityTensor {
    constants: TransverselyIsotropic,
    base_name: Option<String>,
    prefactor: Option<Named<dyn Function>>,
    elasticity_tensor: RankFourTensor,
    axes: [RealVector; 3],
    elasticity_tensor_id: PropertyId,
    axis_ids: [PropertyId; 3],
}

impl OpalinusElasticityTensor {
    pub const TYPE: &'static str = "OpalinusElasticityTensor";

    pub fn new(
        config: &ElasticityConfig,
        registry: &Registry,
        props: &mut MaterialProperties,
    ) -> Result<Self> {
        let constants =
            TransverselyIsotropic::new(config.ep, config.es, config.nu_p, config.nu_s, config.g_s)?;

        let mut elasticity_tensor = constants.stiffness_tensor()?;
        let axes = match (&config.geological_angles, &config.local_coordinate_system) {
            (Some(angles), None) => {
                let frame = CartesianLocalCoordinateSystem::from_geological_angles(*angles)?;
                frame.rotate_local_to_global_rank_four(&mut elasticity_tensor);
                [frame.e1(), frame.e2(), frame.e3()]
            }
            (None, Some(name)) => {
                let frame = registry.local_frame(name)?;
                frame.rotate_local_to_global_rank_four(&mut elasticity_tensor);
                [frame.e1(), frame.e2(), frame.e3()]
            }
            (None, None) => {
                return Err(MaterialError::MissingParameter("geological_angles".to_string()))
            }
            (Some(_), Some(_)) => {
                return Err(MaterialError::invalid(
                    "local_coordinate_system",
                    "cannot be combined with 'geological_angles'",
                ))
            }
        };

        let prefactor = config
            .prefactor_function
            .as_deref()
            .map(|name| registry.function(name))
            .transpose()?;

        let base_name = config.base_name.as_deref();
        let elasticity_tensor_id = props.declare(
            &Q::ElasticityTensor.with_base_name(base_name),
            Q::ElasticityTensor.q_dim(),
        )?;
        let axis_ids = [
            props.declare(&Q::FirstLocalAxis.to_string(), Q::FirstLocalAxis.q_dim())?,
            props.declare(&Q::SecondLocalAxis.to_string(), Q::SecondLocalAxis.q_dim())?,
            props.declare(&Q::NormalLocalAxis.to_string(), Q::NormalLocalAxis.q_dim())?,
        ];

        debug!(
            "{}: C1111 = {:e}, C3333 = {:e}, normal = {:?}, prefactor = {:?}",
            Self::TYPE,
            elasticity_tensor.get(0, 0, 0, 0),
            elasticity_tensor.get(2, 2, 2, 2),
            axes[2].as_slice(),
            prefactor
        );

        Ok(Self {
            constants,
            base_name: config.base_name.clone(),
            prefactor,
            elasticity_tensor,
            axes,
            elasticity_tensor_id,
            axis_ids,
        })
    }

    /// The rotated, unscaled stiffness.
    pub fn elasticity_tensor(&self) -> &RankFourTensor {
        &self.elasticity_tensor
    }

    pub fn constants(&self) -> &TransverselyIsotropic {
        &self.constants
    }

    /// `e1`, `e2` and the bedding normal `e3` in global coordinates.
    pub fn local_axes(&self) -> &[RealVector; 3] {
        &self.axes
    }

    pub fn elasticity_tensor_name(&self) -> String {
        Q::ElasticityTensor.with_base_name(self.base_name.as_deref())
    }
}

impl Material for OpalinusElasticityTensor {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn define_output(&self) -> HashMap<String, QDim> {
        HashMap::from([
            (self.elasticity_tensor_name(), Q::ElasticityTensor.q_dim()),
            (Q::FirstLocalAxis.to_string(), Q::FirstLocalAxis.q_dim()),
            (Q::SecondLocalAxis.to_string(), Q::SecondLocalAxis.q_dim()),
            (Q::NormalLocalAxis.to_string(), Q::NormalLocalAxis.q_dim()),
        ])
    }

    fn parameters(&self) -> HashMap<String, f64> {
        HashMap::from([
            ("Ep".to_string(), self.constants.ep),
            ("Es".to_string(), self.constants.es),
            ("nu_p".to_string(), self.constants.nu_p),
            ("nu_s".to_string(), self.constants.nu_s),
            ("G_s".to_string(), self.constants.g_s),
        ])
    }

    fn compute_qp_properties(&self, qp: &QpContext, props: &mut MaterialProperties) -> Result<()> {
        match &self.prefactor {
            Some(prefactor) => {
                let factor = prefactor.source.value(qp.time, &qp.point)?;
                props.set_scaled_rank_four(
                    self.elasticity_tensor_id,
                    qp.qp,
                    &self.elasticity_tensor,
                    factor,
                );
            }
            None => props.set_rank_four(self.elasticity_tensor_id, qp.qp, &self.elasticity_tensor),
        }
        for (id, axis) in self.axis_ids.iter().zip(self.axes.iter()) {
            props.set_vector(*id, qp.qp, axis);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ElementQp;
    use crate::tensor::{is_rotation, RankTwoTensor};
    use approx::{assert_relative_eq, relative_eq};
    use nalgebra::Point3;
    use serde_json::json;

    fn opalinus() -> serde_json::Value {
        json!({"Ep": 11.0e9, "Es": 4.6e9, "nu_p": 0.29, "nu_s": 0.24, "G_s": 1.8e9})
    }

    fn with(mut base: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
        let map = base.as_object_mut().unwrap();
        for (k, v) in extra.as_object().unwrap() {
            map.insert(k.clone(), v.clone());
        }
        base
    }

    fn build(
        value: serde_json::Value,
        registry: &Registry,
    ) -> Result<(OpalinusElasticityTensor, MaterialProperties)> {
        let mut props = MaterialProperties::new(2);
        let config = ElasticityConfig::from_json(value)?;
        let material = OpalinusElasticityTensor::new(&config, registry, &mut props)?;
        Ok((material, props))
    }

    fn element(time: f64) -> ElementQp {
        ElementQp {
            elem: 0,
            points: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)],
            time,
        }
    }

    fn published(
        material: &OpalinusElasticityTensor,
        props: &mut MaterialProperties,
        time: f64,
    ) -> Vec<RankFourTensor> {
        material.compute_properties(&element(time), props).unwrap();
        let id = props.id(&material.elasticity_tensor_name()).unwrap();
        (0..2).map(|qp| props.get_rank_four(id, qp).unwrap()).collect()
    }

    /// Stiffness of the bedding frame in closed form.
    fn closed_form(c: &TransverselyIsotropic) -> RankFourTensor {
        let r = c.ep / c.es;
        let d = 1.0 - c.nu_p - 2.0 * r * c.nu_s.powi(2);
        let c1111 = c.ep * (1.0 - r * c.nu_s.powi(2)) / (1.0 + c.nu_p) / d;
        let c1212 = c.ep / (2.0 * (1.0 + c.nu_p));
        let c1133 = c.ep * c.nu_s / d;
        let c3333 = c.es * (1.0 - c.nu_p) / d;
        RankFourTensor::from_symmetric9(&[
            c1111,
            c1111 - 2.0 * c1212,
            c1133,
            c1111,
            c1133,
            c3333,
            c.g_s,
            c.g_s,
            c1212,
        ])
    }

    #[test]
    fn isotropic_limit() {
        let config = json!({
            "Ep": 1e10, "Es": 1e10, "nu_p": 0.25, "nu_s": 0.25, "G_s": 4e9,
            "geological_angles": [0.0, 0.0, 0.0]
        });
        let (material, mut props) = build(config, &Registry::new()).unwrap();
        for c in published(&material, &mut props, 0.0) {
            assert_relative_eq!(c.get(0, 0, 0, 0), 1.2e10, max_relative = 1e-6);
            assert_relative_eq!(c.get(2, 2, 2, 2), 1.2e10, max_relative = 1e-6);
            assert_relative_eq!(c.get(0, 0, 1, 1), 4.0e9, max_relative = 1e-6);
            assert_relative_eq!(c.get(0, 0, 2, 2), 4.0e9, max_relative = 1e-6);
            assert_relative_eq!(c.get(0, 1, 0, 1), 4.0e9, max_relative = 1e-6);
            assert_relative_eq!(c.get(1, 2, 1, 2), 4.0e9, max_relative = 1e-6);
        }
    }

    #[test]
    fn inverted_compliance_matches_closed_form() {
        let c = TransverselyIsotropic::new(11.0e9, 4.6e9, 0.29, 0.24, 1.8e9).unwrap();
        let inverted = c.stiffness_tensor().unwrap();
        let expected = closed_form(&c);
        assert!(relative_eq!(
            inverted.data,
            expected.data,
            epsilon = 1e-6 * expected.max_abs()
        ));
    }

    #[test]
    fn zero_angles_keep_the_bedding_frame() {
        let (material, _) =
            build(with(opalinus(), json!({"geological_angles": [0.0, 0.0, 0.0]})), &Registry::new())
                .unwrap();
        let local = material.constants().stiffness_tensor().unwrap();
        assert!(relative_eq!(
            material.elasticity_tensor().data,
            local.data,
            epsilon = 1e-9 * local.max_abs()
        ));
    }

    #[test]
    fn published_tensor_has_minor_and_major_symmetries() {
        for angles in [[0.0, 0.0, 0.0], [35.0, 120.0, -15.0], [90.0, 45.0, 10.0]] {
            let (material, mut props) =
                build(with(opalinus(), json!({"geological_angles": angles})), &Registry::new())
                    .unwrap();
            for c in published(&material, &mut props, 0.0) {
                assert!(c.symmetry_defect() <= 1e-12 * c.max_abs());
            }
        }
    }

    #[test]
    fn bedding_normal_along_x() {
        let input = with(opalinus(), json!({"geological_angles": [90.0, 0.0, 0.0]}));
        let (material, mut props) = build(input, &Registry::new()).unwrap();
        let c = published(&material, &mut props, 0.0)[1];
        let local = material.constants().stiffness_tensor().unwrap();
        // the stiff in-plane direction e1 now lies along -z, the soft normal along x
        assert_relative_eq!(c.get(0, 0, 0, 0), local.get(2, 2, 2, 2), max_relative = 1e-12);
        assert_relative_eq!(c.get(2, 2, 2, 2), local.get(0, 0, 0, 0), max_relative = 1e-12);

        let normal = props.id(&Q::NormalLocalAxis.to_string()).unwrap();
        for qp in 0..2 {
            assert_relative_eq!(
                props.get_vector::<3>(normal, qp).unwrap(),
                RealVector::new(1.0, 0.0, 0.0),
                epsilon = 1e-14
            );
        }

        // same result when the axes come from a registered coordinate system
        let mut registry = Registry::new();
        let frame = CartesianLocalCoordinateSystem::from_vectors(
            Point3::origin(),
            RealVector::new(0.0, 0.0, -1.0),
            RealVector::new(0.0, 1.0, 0.0),
            true,
        )
        .unwrap();
        registry.add_user_object("bedding", std::sync::Arc::new(frame));
        let (from_frame, _) =
            build(with(opalinus(), json!({"local_coordinate_system": "bedding"})), &registry)
                .unwrap();
        assert!(relative_eq!(
            from_frame.elasticity_tensor().data,
            material.elasticity_tensor().data,
            epsilon = 1e-9 * local.max_abs()
        ));
    }

    #[test]
    fn rotation_round_trip() {
        let (material, _) = build(
            with(opalinus(), json!({"geological_angles": [35.0, 120.0, -15.0]})),
            &Registry::new(),
        )
        .unwrap();
        let [e1, e2, e3] = *material.local_axes();
        let global_to_local =
            RankTwoTensor::from_rows(&[e1.transpose(), e2.transpose(), e3.transpose()]);
        let back = material.elasticity_tensor().rotated(&global_to_local);
        let local = material.constants().stiffness_tensor().unwrap();
        assert!(relative_eq!(back.data, local.data, epsilon = 1e-9 * local.max_abs()));
    }

    #[test]
    fn local_axes_are_an_orthonormal_right_handed_triad() {
        let (material, mut props) = build(
            with(opalinus(), json!({"geological_angles": [35.0, 120.0, -15.0]})),
            &Registry::new(),
        )
        .unwrap();
        material.compute_properties(&element(0.0), &mut props).unwrap();
        for qp in 0..2 {
            let axes: Vec<RealVector> = [Q::FirstLocalAxis, Q::SecondLocalAxis, Q::NormalLocalAxis]
                .iter()
                .map(|q| props.get_vector::<3>(props.id(&q.to_string()).unwrap(), qp).unwrap())
                .collect();
            let r = RankTwoTensor::from_columns(&axes);
            assert!(is_rotation(&r, 1e-12));
        }
    }

    #[test]
    fn prefactor_scales_the_tensor() {
        let mut registry = Registry::new();
        registry
            .add_function("ramp", |t: f64, _p: &Point3<f64>| 2.0 * t)
            .add_function("one", |_t: f64, _p: &Point3<f64>| 1.0)
            .add_function("off", |_t: f64, _p: &Point3<f64>| 0.0);
        let angles = json!({"geological_angles": [35.0, 120.0, -15.0]});
        let (plain, mut plain_props) = build(with(opalinus(), angles.clone()), &registry).unwrap();
        let unscaled = published(&plain, &mut plain_props, 0.0)[0];
        // constant in space and time without prefactor
        for time in [0.0, 1.0, 7.5] {
            for c in published(&plain, &mut plain_props, time) {
                assert_eq!(c, unscaled);
            }
        }

        let config = with(with(opalinus(), angles.clone()), json!({"prefactor_function": "ramp"}));
        let (ramp, mut props) = build(config, &registry).unwrap();
        for c in published(&ramp, &mut props, 0.5) {
            assert!(relative_eq!(c.data, unscaled.data, epsilon = 1e-9 * unscaled.max_abs()));
        }
        for c in published(&ramp, &mut props, 1.0) {
            assert!(relative_eq!(
                c.data,
                (unscaled * 2.0).data,
                epsilon = 1e-9 * unscaled.max_abs()
            ));
        }

        let config = with(with(opalinus(), angles.clone()), json!({"prefactor_function": "one"}));
        let (one, mut props) = build(config, &registry).unwrap();
        assert_eq!(published(&one, &mut props, 3.0)[1], unscaled);

        let config = with(with(opalinus(), angles), json!({"elasticity_tensor_prefactor": "off"}));
        let (off, mut props) = build(config, &registry).unwrap();
        assert_eq!(published(&off, &mut props, 3.0)[1].max_abs(), 0.0);
    }

    #[test]
    fn prefactor_errors_propagate() {
        struct Broken;
        impl Function for Broken {
            fn value(&self, _t: f64, _p: &Point3<f64>) -> Result<f64> {
                Err(MaterialError::collaborator("broken", "no value"))
            }
        }
        let mut registry = Registry::new();
        registry.add_function("broken", Broken);
        let config = with(
            opalinus(),
            json!({"geological_angles": [0.0, 0.0, 0.0], "prefactor_function": "broken"}),
        );
        let (material, mut props) = build(config, &registry).unwrap();
        assert_eq!(
            material.compute_properties(&element(0.0), &mut props),
            Err(MaterialError::collaborator("broken", "no value"))
        );
    }

    #[test]
    fn base_name_prefixes_the_tensor_only() {
        let config = with(
            opalinus(),
            json!({"geological_angles": [0.0, 0.0, 0.0], "base_name": "rock"}),
        );
        let (material, props) = build(config, &Registry::new()).unwrap();
        assert!(props.id("rock_elasticity_tensor").is_some());
        assert!(props.id("first_local_axis").is_some());
        assert_eq!(material.define_output(), props.declared());
        assert_eq!(material.parameters()["G_s"], 1.8e9);
    }

    #[test]
    fn rejects_bad_configuration() {
        let registry = Registry::new();
        let angles = json!({"geological_angles": [0.0, 0.0, 0.0]});
        let missing = json!({
            "Ep": 1e10, "Es": 1e10, "nu_p": 0.2, "nu_s": 0.2,
            "geological_angles": [0.0, 0.0, 0.0]
        });
        assert_eq!(
            build(missing, &registry).err(),
            Some(MaterialError::MissingParameter("G_s".to_string()))
        );
        assert_eq!(
            build(opalinus(), &registry).err(),
            Some(MaterialError::MissingParameter("geological_angles".to_string()))
        );
        let negative = with(with(opalinus(), angles.clone()), json!({"Es": -1.0}));
        assert!(matches!(
            build(negative, &registry),
            Err(MaterialError::InvalidParameter { .. })
        ));
        let inadmissible = with(with(opalinus(), angles.clone()), json!({"nu_s": 0.6}));
        assert!(matches!(build(inadmissible, &registry), Err(MaterialError::Domain(_))));
        let unknown_function =
            with(with(opalinus(), angles.clone()), json!({"prefactor_function": "nope"}));
        assert!(matches!(
            build(unknown_function, &registry),
            Err(MaterialError::UnknownObject { .. })
        ));
        let both = with(with(opalinus(), angles), json!({"local_coordinate_system": "bedding"}));
        assert!(build(both, &registry).is_err());
    }
}
