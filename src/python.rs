#![allow(non_snake_case)]

use crate::coordinate_system::{CartesianLocalCoordinateSystem, LocalFrame};
use crate::elasticity::TransverselyIsotropic;
use crate::error::MaterialError;
use crate::mandel::rank_four_to_mandel;
use crate::tensor::RankTwoTensor;
use nalgebra::{Const, Dyn, Matrix3, SMatrix, Vector3};
use numpy::{PyArray2, PyReadonlyArray1, PyReadwriteArray1, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

impl From<MaterialError> for PyErr {
    fn from(err: MaterialError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Rotated transversely isotropic stiffness in Mandel notation.
#[pyclass]
struct PyOpalinusElasticity {
    D: SMatrix<f64, 6, 6>,
}

#[pymethods]
impl PyOpalinusElasticity {
    #[new]
    fn new(
        Ep: f64,
        Es: f64,
        nu_p: f64,
        nu_s: f64,
        G_s: f64,
        geological_angles: [f64; 3],
    ) -> PyResult<Self> {
        let constants = TransverselyIsotropic::new(Ep, Es, nu_p, nu_s, G_s)?;
        let frame = CartesianLocalCoordinateSystem::from_geological_angles(geological_angles)?;
        let mut tensor = constants.stiffness_tensor()?;
        frame.rotate_local_to_global_rank_four(&mut tensor);
        Ok(Self {
            D: rank_four_to_mandel(&tensor),
        })
    }

    fn mandel<'py>(&self, py: Python<'py>) -> &'py PyArray2<f64> {
        self.D.to_pyarray(py)
    }

    /// Adds `D * del_strain` to the stress of every integration point.
    fn evaluate(
        &self,
        stress: PyReadwriteArray1<f64>,
        del_strain: PyReadonlyArray1<f64>,
    ) -> PyResult<()> {
        let mut stress = stress
            .try_as_matrix_mut::<Dyn, Const<1>, Const<1>, Dyn>()
            .ok_or_else(|| PyValueError::new_err("stress must be a contiguous vector"))?;
        let del_strain = del_strain
            .try_as_matrix::<Dyn, Const<1>, Const<1>, Dyn>()
            .ok_or_else(|| PyValueError::new_err("del_strain must be a contiguous vector"))?;
        if stress.nrows() != del_strain.nrows() || stress.nrows() % 6 != 0 {
            return Err(PyValueError::new_err(format!(
                "expected two vectors of 6 * n_ip entries, got {} and {}",
                stress.nrows(),
                del_strain.nrows()
            )));
        }
        for ip in 0..stress.nrows() / 6 {
            let mut view_stress = stress.fixed_view_mut::<6, 1>(ip * 6, 0);
            let view_strain = del_strain.fixed_view::<6, 1>(ip * 6, 0);
            view_stress += self.D * view_strain;
        }
        Ok(())
    }
}

#[pyclass]
struct PyOpalinusPermeability {
    k: RankTwoTensor,
}

#[pymethods]
impl PyOpalinusPermeability {
    #[new]
    fn new(
        permeability1: f64,
        permeability2: f64,
        permeability3: f64,
        geological_angles: [f64; 3],
    ) -> PyResult<Self> {
        let frame = CartesianLocalCoordinateSystem::from_geological_angles(geological_angles)?;
        let mut k =
            Matrix3::from_diagonal(&Vector3::new(permeability1, permeability2, permeability3));
        frame.rotate_local_to_global(&mut k);
        Ok(Self { k })
    }

    fn tensor<'py>(&self, py: Python<'py>) -> &'py PyArray2<f64> {
        self.k.to_pyarray(py)
    }
}

#[pymodule]
fn opalinus(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyOpalinusElasticity>()?;
    m.add_class::<PyOpalinusPermeability>()?;
    Ok(())
}
