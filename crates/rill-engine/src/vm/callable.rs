//! Callable units

use super::object::ClassId;
use crate::compiler::Unit;
use std::rc::Rc;

/// An executable value wrapping one bytecode unit and the class that
/// method definitions inside it attach to.
#[derive(Debug, Clone)]
pub struct Proc {
    unit: Rc<Unit>,
    target_class: ClassId,
}

impl Proc {
    /// Wrap a unit; definitions go to the root class
    pub fn new(unit: Unit) -> Self {
        Self::with_class(Rc::new(unit), ClassId::OBJECT)
    }

    pub fn with_class(unit: Rc<Unit>, target_class: ClassId) -> Self {
        Self { unit, target_class }
    }

    pub fn unit(&self) -> &Rc<Unit> {
        &self.unit
    }

    pub fn target_class(&self) -> ClassId {
        self.target_class
    }
}
