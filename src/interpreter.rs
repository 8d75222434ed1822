use std::collections::HashMap;
use std::io::{self, Write};
use std::mem;
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::callable::{Callable, Function, NativeFunction};
use crate::class::Class;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::Expr;
use crate::stack::ensure_sufficient_stack;
use crate::stmt::Stmt;
use crate::token::Token;
use crate::token_type::TokenType;
use crate::value::Value;

/// Deepest chain of nested calls before a program is stopped with
/// [`RuntimeError::StackOverflow`].
pub const MAX_CALL_DEPTH: usize = 1024;

/// Non-local exits out of statement execution.
#[derive(Debug)]
pub(crate) enum Unwind {
    Error(RuntimeError),
    Return(Value),
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Error(error)
    }
}

/// Tree-walking evaluator.
pub struct Interpreter {
    globals: Environment,
    environment: Environment,
    out: Box<dyn Write>,
    depth: usize,
}

impl Interpreter {
    /// An interpreter that prints to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter that sends `print` output to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        let globals = Environment::new();
        let clock = NativeFunction::clock();
        globals.define(clock.name, Value::Callable(Callable::Native(clock)));

        Interpreter {
            environment: globals.clone(),
            globals,
            out,
            depth: 0,
        }
    }

    /// The outermost scope.
    pub fn globals(&self) -> Environment {
        self.globals.clone()
    }

    /// Runs a program, stopping at the first runtime error.
    #[instrument(level = "debug", skip_all, fields(statements = statements.len()))]
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            match statement.interpret(self) {
                Ok(()) => {}
                Err(Unwind::Error(error)) => {
                    debug!(line = error.line(), %error, "runtime error");
                    return Err(error);
                }
                // a top-level `return` ends the program
                Err(Unwind::Return(_)) => break,
            }
        }
        self.out.flush()?;
        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr.interpret(self) {
            Ok(value) | Err(Unwind::Return(value)) => Ok(value),
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    /// Executes `statements` in `environment`, restoring the current one after.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Environment,
    ) -> Result<(), Unwind> {
        let previous = mem::replace(&mut self.environment, environment);
        let result = statements
            .iter()
            .try_for_each(|statement| statement.interpret(self));
        self.environment = previous;
        result
    }

    fn call(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let Value::Callable(callable) = callee else {
            return Err(RuntimeError::NotCallable {
                paren: paren.clone(),
            });
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::Arity {
                paren: paren.clone(),
                expected: callable.arity(),
                found: arguments.len(),
            });
        }

        if self.depth >= MAX_CALL_DEPTH {
            debug!(depth = self.depth, "call depth exceeded");
            return Err(RuntimeError::StackOverflow {
                paren: paren.clone(),
            });
        }

        self.depth += 1;
        let result = callable.call(self, arguments);
        self.depth -= 1;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

trait Interpret {
    type Output;

    fn interpret(&self, interpreter: &mut Interpreter) -> Result<Self::Output, Unwind>;
}

impl Interpret for Stmt {
    type Output = ();

    fn interpret(&self, interpreter: &mut Interpreter) -> Result<(), Unwind> {
        ensure_sufficient_stack(|| match self {
            Stmt::Block { statements } => {
                let mut environment = interpreter.environment.clone();
                environment.add_scope();
                interpreter.execute_block(statements, environment)
            }
            Stmt::Class { name, methods } => {
                let methods: HashMap<_, _> = methods
                    .iter()
                    .map(|method| {
                        let function =
                            Function::new(Rc::clone(method), interpreter.environment.clone());
                        (method.name.lexeme.clone(), Rc::new(function))
                    })
                    .collect();
                debug!(class = %name.lexeme, methods = methods.len(), "define class");

                let class = Class::new(name.lexeme.clone(), methods);
                interpreter.environment.define(
                    &name.lexeme,
                    Value::Callable(Callable::Class(Rc::new(class))),
                );
                Ok(())
            }
            Stmt::Expression { expression } => {
                expression.interpret(interpreter)?;
                Ok(())
            }
            Stmt::Function(declaration) => {
                let function =
                    Function::new(Rc::clone(declaration), interpreter.environment.clone());
                interpreter.environment.define(
                    &declaration.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(())
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if condition.interpret(interpreter)?.is_truthy() {
                    then_branch.interpret(interpreter)
                } else if let Some(else_branch) = else_branch {
                    else_branch.interpret(interpreter)
                } else {
                    Ok(())
                }
            }
            Stmt::Print { expression } => {
                let value = expression.interpret(interpreter)?;
                writeln!(interpreter.out, "{value}").map_err(RuntimeError::from)?;
                Ok(())
            }
            Stmt::Return { keyword: _, value } => {
                let value = match value {
                    Some(expr) => expr.interpret(interpreter)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => expr.interpret(interpreter)?,
                    None => Value::Nil,
                };
                interpreter.environment.define(&name.lexeme, value);
                Ok(())
            }
            Stmt::While { condition, body } => {
                while condition.interpret(interpreter)?.is_truthy() {
                    body.interpret(interpreter)?;
                }
                Ok(())
            }
        })
    }
}

impl Interpret for Expr {
    type Output = Value;

    fn interpret(&self, interpreter: &mut Interpreter) -> Result<Value, Unwind> {
        ensure_sufficient_stack(|| match self {
            Expr::Assign { name, value } => {
                let value = value.interpret(interpreter)?;
                interpreter.environment.assign(name, value.clone())?;
                Ok(value)
            }
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = left.interpret(interpreter)?;
                let right = right.interpret(interpreter)?;
                Ok(binary(operator, left, right)?)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = callee.interpret(interpreter)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| argument.interpret(interpreter))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(interpreter.call(callee, paren, arguments)?)
            }
            Expr::Get { object, name } => match object.interpret(interpreter)? {
                Value::Instance(instance) => Ok(instance.get(name)?),
                _ => Err(RuntimeError::NotAnInstance {
                    token: name.clone(),
                    message: "Only instances have properties.",
                }
                .into()),
            },
            Expr::Grouping { expression } => expression.interpret(interpreter),
            Expr::LiteralExpr { value } => Ok(Value::from(value)),
            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left = left.interpret(interpreter)?;
                let short_circuit = match operator.typ {
                    TokenType::Or => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    right.interpret(interpreter)
                }
            }
            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = object.interpret(interpreter)? else {
                    return Err(RuntimeError::NotAnInstance {
                        token: name.clone(),
                        message: "Only instances have fields.",
                    }
                    .into());
                };
                let value = value.interpret(interpreter)?;
                instance.set(name, value.clone());
                Ok(value)
            }
            Expr::This { keyword } => Ok(interpreter.environment.get(keyword)?),
            Expr::Unary { operator, right } => {
                let right = right.interpret(interpreter)?;
                match operator.typ {
                    TokenType::Bang => Ok(Value::Bool(!right.is_truthy())),
                    TokenType::Minus => match right {
                        Value::Number(value) => Ok(Value::Number(-value)),
                        _ => Err(RuntimeError::Operand {
                            token: operator.clone(),
                            message: "Operand must be a number.",
                        }
                        .into()),
                    },
                    _ => Err(RuntimeError::Operand {
                        token: operator.clone(),
                        message: "Expected a unary operator.",
                    }
                    .into()),
                }
            }
            Expr::Variable { name } => Ok(interpreter.environment.get(name)?),
        })
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use Value::{Bool, Number};

    match operator.typ {
        TokenType::Plus => match (left, right) {
            (Number(f1), Number(f2)) => Ok(Number(f1 + f2)),
            (Value::String(s1), Value::String(s2)) => Ok(Value::String(s1 + &s2)),
            _ => Err(RuntimeError::Operand {
                token: operator.clone(),
                message: "Operands must be two numbers or two strings.",
            }),
        },
        TokenType::Minus => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Number(left - right))
        }
        TokenType::Slash => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Number(left / right))
        }
        TokenType::Star => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Number(left * right))
        }
        TokenType::Greater => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Bool(left > right))
        }
        TokenType::GreaterEqual => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Bool(left >= right))
        }
        TokenType::Less => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Bool(left < right))
        }
        TokenType::LessEqual => {
            let (left, right) = get_numeric_operands(operator, left, right)?;
            Ok(Bool(left <= right))
        }
        TokenType::BangEqual => Ok(Bool(left != right)),
        TokenType::EqualEqual => Ok(Bool(left == right)),
        _ => Err(RuntimeError::Operand {
            token: operator.clone(),
            message: "Expected a binary operator.",
        }),
    }
}

fn get_numeric_operands(
    operator: &Token,
    left: Value,
    right: Value,
) -> Result<(f64, f64), RuntimeError> {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => Ok((left, right)),
        _ => Err(RuntimeError::Operand {
            token: operator.clone(),
            message: "Operands must be numbers.",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::parser;
    use crate::scanner::Scanner;
    use std::cell::RefCell;

    /// Output sink the test keeps a handle to.
    #[derive(Clone, Default)]
    struct Captured(Rc<RefCell<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn run(source: &str) -> (Result<(), RuntimeError>, String) {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
        let statements = parser::parse(&tokens, &mut diagnostics);
        assert!(!diagnostics.had_error(), "{diagnostics}");

        let captured = Captured::default();
        let mut interpreter = Interpreter::with_output(Box::new(captured.clone()));
        let result = interpreter.interpret(&statements);
        let output = String::from_utf8_lossy(&captured.0.borrow()).into_owned();
        (result, output)
    }

    fn output(source: &str) -> String {
        let (result, output) = run(source);
        if let Err(error) = result {
            panic!("runtime error: {error}");
        }
        output
    }

    #[test]
    fn arithmetic_and_strings() {
        assert_eq!(
            output("print 1 + 2 * 3; print (1 + 2) * 3; print \"a\" + \"b\"; print 7 / 2;"),
            "7\n9\nab\n3.5\n"
        );
    }

    #[test]
    fn comparison_equality_and_logic() {
        assert_eq!(
            output("print 1 < 2; print 1 == 1; print nil == false; print !nil; print nil or \"x\"; print 0 and 1;"),
            "true\ntrue\nfalse\ntrue\nx\n1\n"
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(
            output("var hit = false; func touch() { hit = true; return true; } false and touch(); true or touch(); print hit;"),
            "false\n"
        );
    }

    #[test]
    fn blocks_scope_variables() {
        assert_eq!(
            output("var a = 1; { var a = 2; print a; } print a;"),
            "2\n1\n"
        );
    }

    #[test]
    fn for_and_while_loops() {
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i; var j = 2; while (j > 0) { print j; j = j - 1; }"),
            "0\n1\n2\n2\n1\n"
        );
    }

    #[test]
    fn for_with_expression_initializer_reuses_variable() {
        assert_eq!(
            output("var i = 10; for (i = 0; i < 2; i = i + 1) {} print i;"),
            "2\n"
        );
    }

    #[test]
    fn recursion_and_closures() {
        let source = "
            func fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
            print fib(10);
            func counter() {
                var count = 0;
                func next() { count = count + 1; return count; }
                return next;
            }
            var c = counter();
            c();
            print c();
        ";
        assert_eq!(output(source), "55\n2\n");
    }

    #[test]
    fn classes_and_bound_methods() {
        let source = "
            class Counter {
                init(start) { this.count = start; }
                bump() { this.count = this.count + 1; return this; }
            }
            var counter = Counter(5);
            counter.bump().bump();
            var bump = counter.bump;
            bump();
            print counter.count;
            print Counter;
            print counter;
        ";
        assert_eq!(output(source), "8\nCounter\nCounter instance\n");
    }

    #[test]
    fn fields_shadow_methods() {
        let source = "
            class Greeter { greet() { return \"hello\"; } }
            var g = Greeter();
            print g.greet();
            g.greet = \"hi\";
            print g.greet;
        ";
        assert_eq!(output(source), "hello\nhi\n");
    }

    #[test]
    fn top_level_return_stops_the_program() {
        assert_eq!(output("print 1; return; print 2;"), "1\n");
    }

    fn runtime_error(source: &str) -> RuntimeError {
        match run(source).0 {
            Err(error) => error,
            Ok(()) => panic!("expected a runtime error"),
        }
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        let error = runtime_error("class A {}\nvar a = A();\nprint a.missing;");
        assert_eq!(error.to_string(), "Undefined property 'missing'.");
        assert_eq!(error.line(), 3);
    }

    #[test]
    fn operand_errors() {
        assert_eq!(
            runtime_error("print -\"x\";").to_string(),
            "Operand must be a number."
        );
        assert_eq!(
            runtime_error("print 1 + nil;").to_string(),
            "Operands must be two numbers or two strings."
        );
        assert_eq!(
            runtime_error("print 1 < \"2\";").to_string(),
            "Operands must be numbers."
        );
    }

    #[test]
    fn call_errors() {
        assert!(matches!(
            runtime_error("\"not a function\"();"),
            RuntimeError::NotCallable { .. }
        ));
        assert!(matches!(
            runtime_error("func f(a) {} f();"),
            RuntimeError::Arity {
                expected: 1,
                found: 0,
                ..
            }
        ));
        assert!(matches!(
            runtime_error("class P { init(x) {} } P(1, 2);"),
            RuntimeError::Arity {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn properties_need_instances() {
        assert_eq!(
            runtime_error("var x = 1; print x.y;").to_string(),
            "Only instances have properties."
        );
        assert_eq!(
            runtime_error("var x = 1; x.y = 2;").to_string(),
            "Only instances have fields."
        );
    }

    #[test]
    fn unbounded_recursion_is_a_runtime_error() {
        let error = runtime_error("func f() {\n  f();\n}\nf();");
        assert!(matches!(error, RuntimeError::StackOverflow { .. }));
        assert_eq!(error.to_string(), "Stack overflow.");
        assert_eq!(error.line(), 2);
    }

    #[test]
    fn call_depth_unwinds_after_errors_and_returns() {
        let captured = Captured::default();
        let mut interpreter = Interpreter::with_output(Box::new(captured.clone()));

        let overflow = crate::run("func f() { f(); } f();", &mut interpreter);
        assert!(matches!(
            overflow,
            Err(crate::RunError::Runtime(RuntimeError::StackOverflow { .. }))
        ));
        assert_eq!(interpreter.depth, 0);

        let deep = format!(
            "func down(n) {{ if (n > 0) return down(n - 1); return n; }} print down({});",
            MAX_CALL_DEPTH - 1
        );
        assert!(crate::run(&deep, &mut interpreter).is_ok());
        assert_eq!(interpreter.depth, 0);
        assert_eq!(String::from_utf8_lossy(&captured.0.borrow()), "0\n");
    }

    #[test]
    fn output_stops_at_first_runtime_error() {
        let (result, output) = run("print 1; print missing; print 2;");
        assert!(matches!(result, Err(RuntimeError::UndefinedVariable { .. })));
        assert_eq!(output, "1\n");
    }

    #[test]
    fn evaluate_single_expression() {
        let mut diagnostics = Diagnostics::new();
        let tokens = Scanner::new("clock() > 0 and 2 * 21").scan_tokens(&mut diagnostics);
        let expr = parser::parse_expression(&tokens, &mut diagnostics).expect("expression");

        let mut interpreter = Interpreter::with_output(Box::new(io::sink()));
        assert_eq!(interpreter.evaluate(&expr).ok(), Some(Value::Number(42.0)));
    }
}
