//! Double-buffered field storage
//!
//! The time loop owns the store. During a step the pipeline gets read-only
//! access to `previous` and exclusive access to `current` through
//! [`FieldStore::split`]. [`FieldStore::commit`] copies `current` into
//! `previous` for every quantity at once.
use super::{Field, Quantity, Role};

/// One instance of every quantity
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSet {
    /// Velocity (both components)
    pub velocity: Field,
    /// Pressure
    pub pressure: Field,
    /// Transported scalar, if enabled
    pub scalar: Option<Field>,
}

impl FieldSet {
    fn zeros(velocity: usize, pressure: usize, scalar: Option<usize>) -> Self {
        Self {
            velocity: Field::zeros(Quantity::Velocity, velocity),
            pressure: Field::zeros(Quantity::Pressure, pressure),
            scalar: scalar.map(|n| Field::zeros(Quantity::Scalar, n)),
        }
    }

    /// Field of `quantity`
    pub fn get(&self, quantity: Quantity) -> Option<&Field> {
        match quantity {
            Quantity::Velocity => Some(&self.velocity),
            Quantity::Pressure => Some(&self.pressure),
            Quantity::Scalar => self.scalar.as_ref(),
        }
    }

    /// Mutable field of `quantity`
    pub fn get_mut(&mut self, quantity: Quantity) -> Option<&mut Field> {
        match quantity {
            Quantity::Velocity => Some(&mut self.velocity),
            Quantity::Pressure => Some(&mut self.pressure),
            Quantity::Scalar => self.scalar.as_mut(),
        }
    }

    /// All coefficients finite
    pub fn is_finite(&self) -> bool {
        self.velocity.is_finite()
            && self.pressure.is_finite()
            && self.scalar.as_ref().map_or(true, |s| s.is_finite())
    }
}

/// Borrowed view of the store during one step
#[derive(Debug)]
pub struct StepFields<'a> {
    /// Last committed state
    pub previous: &'a FieldSet,
    /// State being computed
    pub current: &'a mut FieldSet,
    /// Velocity iterate (implicit strategy only)
    pub iterate: Option<&'a mut Field>,
}

/// Current, previous and iterate instances of all quantities
#[derive(Debug, Clone)]
pub struct FieldStore {
    current: FieldSet,
    previous: FieldSet,
    iterate: Option<Field>,
}

impl FieldStore {
    /// Allocate zero fields. `scalar` is the number of scalar
    /// coefficients if transport is enabled.
    pub fn new(velocity: usize, pressure: usize, scalar: Option<usize>, iterate: bool) -> Self {
        let set = FieldSet::zeros(velocity, pressure, scalar);
        Self {
            previous: set.clone(),
            current: set,
            iterate: if iterate {
                Some(Field::zeros(Quantity::Velocity, velocity))
            } else {
                None
            },
        }
    }

    /// Field instance of `quantity` in `role`
    pub fn field(&self, quantity: Quantity, role: Role) -> Option<&Field> {
        match role {
            Role::Current => self.current.get(quantity),
            Role::Previous => self.previous.get(quantity),
            Role::Iterate => match quantity {
                Quantity::Velocity => self.iterate.as_ref(),
                _ => None,
            },
        }
    }

    /// Last committed state
    pub fn previous(&self) -> &FieldSet {
        &self.previous
    }

    /// State of the step in progress
    pub fn current(&self) -> &FieldSet {
        &self.current
    }

    /// Set the initial state of `quantity` (both time levels).
    /// Returns false if the quantity is not stored or the size differs.
    pub fn initialize(&mut self, quantity: Quantity, values: &ndarray::Array1<f64>) -> bool {
        let ok = match self.current.get_mut(quantity) {
            Some(f) if f.len() == values.len() => {
                f.v.assign(values);
                true
            }
            _ => false,
        };
        if ok {
            if let Some(f) = self.previous.get_mut(quantity) {
                f.v.assign(values);
            }
        }
        ok
    }

    /// Disjoint borrows for one step
    pub fn split(&mut self) -> StepFields<'_> {
        StepFields {
            previous: &self.previous,
            current: &mut self.current,
            iterate: self.iterate.as_mut(),
        }
    }

    /// previous <- current for every quantity
    pub fn commit(&mut self) {
        self.previous.clone_from(&self.current);
    }

    /// current <- previous, discards a failed step
    pub fn rollback(&mut self) {
        self.current.clone_from(&self.previous);
    }
}
