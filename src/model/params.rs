use ndarray::{ArrayD, IxDyn};

use crate::error::{Result, SolverErr};

/// A named, insertion-ordered mapping from parameter name to tensor.
///
/// Shapes are fixed at registration; values start out absent and are written
/// exactly once per initializer run. Reading a value before initialization
/// is a usage error, surfaced as `Uninitialized`, so a forward pass on an
/// uninitialized model is detectable rather than silently garbage.
#[derive(Debug, Clone, Default)]
pub struct ParamSet {
    slots: Vec<Slot>,
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    shape: Vec<usize>,
    value: Option<ArrayD<f32>>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new trainable tensor slot.
    ///
    /// # Arguments
    /// * `name` - Unique parameter name.
    /// * `shape` - The tensor shape, fixed for the slot's lifetime.
    ///
    /// # Errors
    /// Returns `DuplicateParam` when the name is already taken and
    /// `InvalidConfig` for an empty or zero-sized shape.
    pub fn register(&mut self, name: &str, shape: &[usize]) -> Result<()> {
        if shape.is_empty() || shape.contains(&0) {
            return Err(SolverErr::InvalidConfig(
                "parameter shapes must be non-empty with positive extents",
            ));
        }

        if self.slots.iter().any(|slot| slot.name == name) {
            return Err(SolverErr::DuplicateParam {
                name: name.to_owned(),
            });
        }

        self.slots.push(Slot {
            name: name.to_owned(),
            shape: shape.to_vec(),
            value: None,
        });

        Ok(())
    }

    /// Returns the number of registered parameters.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the position of `name` in registration order.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.slots
            .iter()
            .position(|slot| slot.name == name)
            .ok_or_else(|| SolverErr::UnknownParam {
                name: name.to_owned(),
            })
    }

    /// Returns the declared shape of the parameter at `index`.
    pub fn shape(&self, index: usize) -> &[usize] {
        &self.slots[index].shape
    }

    pub fn name(&self, index: usize) -> &str {
        &self.slots[index].name
    }

    /// Returns the value of the named parameter.
    ///
    /// # Errors
    /// Returns `UnknownParam` for an unregistered name and `Uninitialized`
    /// when the slot has no value yet.
    pub fn get(&self, name: &str) -> Result<&ArrayD<f32>> {
        let index = self.index_of(name)?;
        self.value(index)
    }

    /// Returns the value of the parameter at `index`.
    pub fn value(&self, index: usize) -> Result<&ArrayD<f32>> {
        self.slots[index]
            .value
            .as_ref()
            .ok_or_else(|| SolverErr::Uninitialized {
                name: self.slots[index].name.clone(),
            })
    }

    /// Returns a mutable view of the parameter at `index`.
    pub fn value_mut(&mut self, index: usize) -> Result<&mut ArrayD<f32>> {
        let slot = &mut self.slots[index];
        slot.value.as_mut().ok_or_else(|| SolverErr::Uninitialized {
            name: slot.name.clone(),
        })
    }

    /// Writes a value into the slot at `index`.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` when the tensor does not match the declared
    /// shape.
    pub fn set(&mut self, index: usize, value: ArrayD<f32>) -> Result<()> {
        let slot = &mut self.slots[index];

        if value.shape() != slot.shape.as_slice() {
            return Err(SolverErr::ShapeMismatch {
                what: "parameter value",
                got: value.len(),
                expected: slot.shape.iter().product(),
            });
        }

        slot.value = Some(value);
        Ok(())
    }

    /// Checks that every slot holds a value.
    ///
    /// # Errors
    /// Returns `Uninitialized` naming the first empty slot.
    pub fn ensure_initialized(&self) -> Result<()> {
        for slot in &self.slots {
            if slot.value.is_none() {
                return Err(SolverErr::Uninitialized {
                    name: slot.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Allocates one zeroed gradient tensor per slot, index-aligned with
    /// registration order.
    pub fn zero_grads(&self) -> Vec<ArrayD<f32>> {
        self.slots
            .iter()
            .map(|slot| ArrayD::zeros(IxDyn(&slot.shape)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let mut params = ParamSet::new();
        params.register("w", &[2, 3]).unwrap();

        match params.register("w", &[2, 3]) {
            Err(SolverErr::DuplicateParam { name }) => assert_eq!(name, "w"),
            other => panic!("expected duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn read_before_init_is_detectable() {
        let mut params = ParamSet::new();
        params.register("w", &[2]).unwrap();

        assert!(matches!(params.get("w"), Err(SolverErr::Uninitialized { .. })));
        assert!(params.ensure_initialized().is_err());

        params.set(0, ArrayD::zeros(IxDyn(&[2]))).unwrap();
        assert!(params.get("w").is_ok());
        assert!(params.ensure_initialized().is_ok());
    }

    #[test]
    fn set_rejects_wrong_shape() {
        let mut params = ParamSet::new();
        params.register("w", &[2, 3]).unwrap();

        let err = params.set(0, ArrayD::zeros(IxDyn(&[3, 2])));
        assert!(matches!(err, Err(SolverErr::ShapeMismatch { .. })));
    }

    #[test]
    fn unknown_name_is_reported() {
        let params = ParamSet::new();
        assert!(matches!(params.get("nope"), Err(SolverErr::UnknownParam { .. })));
    }

    #[test]
    fn zero_grads_match_declared_shapes() {
        let mut params = ParamSet::new();
        params.register("w", &[4, 2]).unwrap();
        params.register("b", &[2]).unwrap();

        let grads = params.zero_grads();
        assert_eq!(grads.len(), 2);
        assert_eq!(grads[0].shape(), &[4, 2]);
        assert_eq!(grads[1].shape(), &[2]);
    }
}
