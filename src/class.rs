use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::{
    callable::Function, error::RuntimeError, instance::Instance, interpreter::Interpreter,
    value::Value,
};

const INITIALIZER: &str = "init";

/// A class: a name plus a method table that never changes once built.
///
/// Lookup is a single level; there is no superclass to fall back to.
pub struct Class {
    name: String,
    methods: HashMap<String, Rc<Function>>,
}

impl Class {
    pub fn new(name: String, methods: HashMap<String, Rc<Function>>) -> Self {
        Class { name, methods }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn find_method(&self, name: &str) -> Option<&Rc<Function>> {
        self.methods.get(name)
    }

    /// Arity of `init`, or 0 when the class has none.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER)
            .map_or(0, |initializer| initializer.arity())
    }

    /// Constructs a new instance, running `init` on it when present.
    ///
    /// The initializer's return value is discarded; the result is always the
    /// instance.
    pub fn call(
        self: &Rc<Self>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        debug!(class = %self.name, arguments = arguments.len(), "constructing instance");

        let instance = Instance::new(Rc::clone(self));
        if let Some(initializer) = self.find_method(INITIALIZER) {
            initializer
                .bind(instance.clone())
                .call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
