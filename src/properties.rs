//! Per-quadrature-point storage of published material properties.
//!
//! Every property is a flat vector holding `n_qp` blocks of `QDim::size()` values. Materials
//! declare their properties while they are constructed and keep the returned [`PropertyId`],
//! so the evaluation of a quadrature point never looks names up.
//!
//! The store holds the points of one element at a time. Stateful properties additionally keep
//! their current and old values for every element that has been evaluated.

use crate::error::{MaterialError, Result};
use crate::interfaces::{ElementQp, QDim};
use crate::tensor::{RankFourTensor, RankTwoTensor};
use nalgebra::{DVector, SVector};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId(usize);

/// Values of a stateful property, per element.
#[derive(Debug, Clone, Default)]
struct History {
    current: HashMap<usize, DVector<f64>>,
    old: HashMap<usize, DVector<f64>>,
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    dim: QDim,
    /// Values at the points of the selected element.
    values: DVector<f64>,
    computed: Vec<bool>,
    history: Option<History>,
}

impl Slot {
    /// Stores the computed points of the selected element in the history.
    fn commit(&mut self, elem: usize) {
        let Slot {
            dim,
            values,
            computed,
            history,
            ..
        } = self;
        let Some(history) = history.as_mut() else {
            return;
        };
        if !computed.iter().any(|c| *c) {
            return;
        }
        let old = &history.old;
        let current = history.current.entry(elem).or_insert_with(|| {
            old.get(&elem).cloned().unwrap_or_else(|| DVector::zeros(values.len()))
        });
        let size = dim.size();
        for (qp, _) in computed.iter().enumerate().filter(|(_, c)| **c) {
            let range = qp * size..(qp + 1) * size;
            current.as_mut_slice()[range.clone()].copy_from_slice(&values.as_slice()[range]);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialProperties {
    n_qp: usize,
    elem: usize,
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl MaterialProperties {
    pub fn new(n_qp: usize) -> Self {
        Self {
            n_qp,
            elem: 0,
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Largest number of quadrature points per element.
    pub fn n_qp(&self) -> usize {
        self.n_qp
    }

    /// The element whose points are currently stored.
    pub fn element(&self) -> usize {
        self.elem
    }

    pub fn check_element(&self, elem: &ElementQp) -> Result<()> {
        if elem.n_qp() > self.n_qp {
            return Err(MaterialError::TooManyPoints {
                elem: elem.elem,
                found: elem.n_qp(),
                capacity: self.n_qp,
            });
        }
        Ok(())
    }

    /// Moves to `elem`. The stateful values computed for the previous element are kept.
    pub fn select_element(&mut self, elem: &ElementQp) -> Result<()> {
        self.check_element(elem)?;
        self.commit();
        self.elem = elem.elem;
        self.reset_computed();
        Ok(())
    }

    fn commit(&mut self) {
        let elem = self.elem;
        for slot in self.slots.iter_mut() {
            slot.commit(elem);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn declare(&mut self, name: &str, dim: QDim) -> Result<PropertyId> {
        self.declare_impl(name, dim, false)
    }

    /// Declares a property whose value of the previous step is kept as `old`.
    pub fn declare_stateful(&mut self, name: &str, dim: QDim) -> Result<PropertyId> {
        self.declare_impl(name, dim, true)
    }

    fn declare_impl(&mut self, name: &str, dim: QDim, stateful: bool) -> Result<PropertyId> {
        if self.index.contains_key(name) {
            return Err(MaterialError::DuplicateProperty(name.to_string()));
        }
        self.slots.push(Slot {
            name: name.to_string(),
            dim,
            values: DVector::<f64>::zeros(self.n_qp * dim.size()),
            computed: vec![false; self.n_qp],
            history: stateful.then(History::default),
        });
        let id = self.slots.len() - 1;
        self.index.insert(name.to_string(), id);
        Ok(PropertyId(id))
    }

    /// Looks up a property declared by another material and checks its shape.
    pub fn get_property(&self, name: &str, expected: QDim) -> Result<PropertyId> {
        let id = *self
            .index
            .get(name)
            .ok_or_else(|| MaterialError::UnknownProperty(name.to_string()))?;
        let found = self.slots[id].dim;
        if found != expected {
            return Err(MaterialError::PropertyShape {
                name: name.to_string(),
                expected: format!("{:?}", expected),
                found: format!("{:?}", found),
            });
        }
        Ok(PropertyId(id))
    }

    pub fn id(&self, name: &str) -> Option<PropertyId> {
        self.index.get(name).map(|&id| PropertyId(id))
    }

    pub fn name(&self, id: PropertyId) -> &str {
        &self.slots[id.0].name
    }

    pub fn dim(&self, id: PropertyId) -> QDim {
        self.slots[id.0].dim
    }

    pub fn is_stateful(&self, id: PropertyId) -> bool {
        self.slots[id.0].history.is_some()
    }

    pub fn is_computed(&self, id: PropertyId, qp: usize) -> bool {
        self.slots[id.0].computed[qp]
    }

    /// Forget which points of the selected element were computed.
    pub fn reset_computed(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.computed.iter_mut().for_each(|c| *c = false);
        }
    }

    /// Accepts the current values of stateful properties as the old ones, for every element.
    pub fn copy_to_old(&mut self) {
        self.commit();
        for history in self.slots.iter_mut().filter_map(|slot| slot.history.as_mut()) {
            for (elem, values) in history.current.iter() {
                history.old.insert(*elem, values.clone());
            }
        }
    }

    /// Like [`copy_to_old`](Self::copy_to_old) for the selected element only.
    pub fn copy_element_to_old(&mut self) {
        self.commit();
        let elem = self.elem;
        for history in self.slots.iter_mut().filter_map(|slot| slot.history.as_mut()) {
            if let Some(values) = history.current.get(&elem) {
                history.old.insert(elem, values.clone());
            }
        }
    }

    pub fn slice(&self, id: PropertyId, qp: usize) -> Result<&[f64]> {
        let slot = &self.slots[id.0];
        if !slot.computed[qp] {
            return Err(MaterialError::PropertyNotComputed {
                name: slot.name.clone(),
                qp,
            });
        }
        let size = slot.dim.size();
        Ok(&slot.values.as_slice()[qp * size..(qp + 1) * size])
    }

    pub fn old_slice(&self, id: PropertyId, qp: usize) -> Result<&[f64]> {
        let slot = &self.slots[id.0];
        let history = slot.history.as_ref().ok_or_else(|| {
            MaterialError::invalid(&slot.name, "property is not stateful, no old value")
        })?;
        let old = history
            .old
            .get(&self.elem)
            .ok_or_else(|| MaterialError::OldValueMissing {
                name: slot.name.clone(),
                elem: self.elem,
            })?;
        let size = slot.dim.size();
        Ok(&old.as_slice()[qp * size..(qp + 1) * size])
    }

    pub fn slice_mut(&mut self, id: PropertyId, qp: usize) -> &mut [f64] {
        let slot = &mut self.slots[id.0];
        let size = slot.dim.size();
        slot.computed[qp] = true;
        &mut slot.values.as_mut_slice()[qp * size..(qp + 1) * size]
    }

    pub fn set_slice(&mut self, id: PropertyId, qp: usize, values: &[f64]) {
        self.slice_mut(id, qp).copy_from_slice(values);
    }

    /// Marks a point as computed without writing values, for properties of size zero.
    pub fn set_empty(&mut self, id: PropertyId, qp: usize) {
        debug_assert_eq!(self.dim(id).size(), 0);
        self.slice_mut(id, qp);
    }

    pub fn set_scalar(&mut self, id: PropertyId, qp: usize, value: f64) {
        self.slice_mut(id, qp)[0] = value;
    }

    pub fn get_scalar(&self, id: PropertyId, qp: usize) -> Result<f64> {
        Ok(self.slice(id, qp)?[0])
    }

    pub fn get_scalar_old(&self, id: PropertyId, qp: usize) -> Result<f64> {
        Ok(self.old_slice(id, qp)?[0])
    }

    pub fn set_vector<const N: usize>(&mut self, id: PropertyId, qp: usize, v: &SVector<f64, N>) {
        self.set_slice(id, qp, v.as_slice());
    }

    pub fn get_vector<const N: usize>(&self, id: PropertyId, qp: usize) -> Result<SVector<f64, N>> {
        Ok(SVector::<f64, N>::from_column_slice(self.slice(id, qp)?))
    }

    pub fn set_rank_two(&mut self, id: PropertyId, qp: usize, t: &RankTwoTensor) {
        self.set_slice(id, qp, t.as_slice());
    }

    pub fn get_rank_two(&self, id: PropertyId, qp: usize) -> Result<RankTwoTensor> {
        Ok(RankTwoTensor::from_column_slice(self.slice(id, qp)?))
    }

    pub fn set_rank_four(&mut self, id: PropertyId, qp: usize, c: &RankFourTensor) {
        self.set_slice(id, qp, c.as_slice());
    }

    /// Writes `factor * c` without a temporary tensor.
    pub fn set_scaled_rank_four(
        &mut self,
        id: PropertyId,
        qp: usize,
        c: &RankFourTensor,
        factor: f64,
    ) {
        for (out, value) in self.slice_mut(id, qp).iter_mut().zip(c.as_slice()) {
            *out = factor * value;
        }
    }

    pub fn get_rank_four(&self, id: PropertyId, qp: usize) -> Result<RankFourTensor> {
        Ok(RankFourTensor::from_slice(self.slice(id, qp)?))
    }

    /// Declared names and shapes.
    pub fn declared(&self) -> HashMap<String, QDim> {
        self.slots
            .iter()
            .map(|slot| (slot.name.clone(), slot.dim))
            .collect()
    }
}
