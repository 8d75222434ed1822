use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::trace;

use crate::{
    class::Class,
    environment::Environment,
    error::RuntimeError,
    instance::Instance,
    interpreter::{Interpreter, Unwind},
    stmt,
    value::Value,
};

/// Anything the interpreter can invoke with `callee(args)`.
///
/// The caller checks `arguments.len() == arity()` before calling.
#[derive(Clone)]
pub enum Callable {
    Function(Rc<Function>),
    Class(Rc<Class>),
    Native(NativeFunction),
}

impl Callable {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.arity(),
            Callable::Class(class) => class.arity(),
            Callable::Native(native) => native.arity,
        }
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match self {
            Callable::Function(function) => function.call(interpreter, arguments),
            Callable::Class(class) => class.call(interpreter, arguments),
            Callable::Native(native) => Ok((native.function)(&arguments)),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Function(f1), Callable::Function(f2)) => Rc::ptr_eq(f1, f2),
            (Callable::Class(c1), Callable::Class(c2)) => Rc::ptr_eq(c1, c2),
            (Callable::Native(n1), Callable::Native(n2)) => n1.name == n2.name,
            _ => false,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "<fn {}>", function.name()),
            Callable::Class(class) => write!(f, "{}", class.name()),
            Callable::Native(_) => write!(f, "<native fn>"),
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({self})")
    }
}

/// A built-in function implemented in Rust.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub function: fn(&[Value]) -> Value,
}

impl NativeFunction {
    /// `clock()`: seconds since the Unix epoch.
    pub fn clock() -> Self {
        NativeFunction {
            name: "clock",
            arity: 0,
            function: |_| {
                Value::Number(
                    SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map(|elapsed| elapsed.as_secs_f64())
                        .unwrap_or_default(),
                )
            },
        }
    }
}

/// A user-defined function or method together with the scope it closes over.
pub struct Function {
    declaration: Rc<stmt::Function>,
    closure: Environment,
}

impl Function {
    pub fn new(declaration: Rc<stmt::Function>, closure: Environment) -> Self {
        Function {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Returns a copy of this method whose closure defines `this`.
    pub fn bind(&self, instance: Instance) -> Function {
        let mut closure = self.closure.clone();
        closure.add_scope();
        closure.define("this", Value::Instance(instance));
        Function::new(Rc::clone(&self.declaration), closure)
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        trace!(function = self.name(), arguments = arguments.len(), "call");

        let mut environment = self.closure.clone();
        environment.add_scope();
        for (param, arg) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, arg);
        }

        match interpreter.execute_block(&self.declaration.body, environment) {
            Ok(()) => Ok(Value::Nil),
            Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::parser;
    use crate::scanner::Scanner;
    use crate::stmt::Stmt;

    fn declare(source: &str) -> Rc<stmt::Function> {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        match parser::parse(&tokens, &mut diagnostics).pop() {
            Some(Stmt::Function(function)) => function,
            other => panic!("expected a function, got {other:?}"),
        }
    }

    #[test]
    fn function_returns_value_or_nil() {
        let mut interpreter = Interpreter::new();
        let closure = interpreter.globals();

        let add = Function::new(declare("func add(a, b) { return a + b; }"), closure.clone());
        assert_eq!(add.arity(), 2);
        let sum = add.call(&mut interpreter, vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(sum.ok(), Some(Value::Number(3.0)));

        let noop = Function::new(declare("func noop() {}"), closure);
        assert_eq!(noop.call(&mut interpreter, vec![]).ok(), Some(Value::Nil));
    }

    #[test]
    fn runtime_errors_propagate_out_of_calls() {
        let mut interpreter = Interpreter::new();
        let broken = Function::new(
            declare("func broken() { return missing; }"),
            interpreter.globals(),
        );
        let error = broken.call(&mut interpreter, vec![]).unwrap_err();
        assert!(matches!(error, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn native_clock_takes_no_arguments() {
        let clock = Callable::Native(NativeFunction::clock());
        assert_eq!(clock.arity(), 0);
        assert_eq!(clock.to_string(), "<native fn>");

        let mut interpreter = Interpreter::new();
        match clock.call(&mut interpreter, vec![]) {
            Ok(Value::Number(seconds)) => assert!(seconds > 0.0),
            other => panic!("unexpected clock result: {other:?}"),
        }
    }
}
