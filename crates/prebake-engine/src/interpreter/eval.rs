//! Statement and expression evaluation.

use crate::interpreter::environment::EnvId;
use crate::interpreter::heap::{Closure, ObjectId, ObjectKind};
use crate::interpreter::value::{loose_equals, strict_equals, Value};
use crate::interpreter::{Frame, Realm, Thrown};
use crate::parser::ast::{
    AssignOp, BinaryOp, Expr, FunctionNode, Program, Stmt, UnaryOp, UpdateOp,
};
use crate::parser::captures::hoisted_names;
use indexmap::IndexMap;
use std::rc::Rc;

/// Name of the intrinsic that registers additional functions.
pub const OPTIMIZE_INTRINSIC: &str = "__optimize";

type EvalResult<T> = Result<T, Thrown>;

/// Statement completion.
enum Flow {
    Normal,
    Return(Value),
}

/// Assignable reference produced by evaluating a target expression.
enum Reference {
    Binding(String),
    Property(Value, String),
}

impl Realm {
    /// Run a parsed program in the global environment.
    pub fn run_program(&mut self, program: &Program) -> EvalResult<()> {
        self.hoist(&program.body, EnvId::GLOBAL);
        match self.exec_block(&program.body, EnvId::GLOBAL)? {
            Flow::Normal | Flow::Return(_) => Ok(()),
        }
    }

    /// Call a function value with `args`.
    pub fn call(&mut self, callee: &Value, args: Vec<Value>) -> EvalResult<Value> {
        let closure = match callee
            .as_object()
            .and_then(|id| self.heap.get(id))
            .and_then(|object| object.as_closure())
        {
            Some(closure) => closure.clone(),
            None => {
                return Err(Thrown::error(
                    "TypeError",
                    format!("{} is not a function", callee.to_display_string(&self.heap)),
                ))
            }
        };
        if self.call_depth() >= self.limits().max_call_depth {
            return Err(Thrown::error("RangeError", "Maximum call stack size exceeded"));
        }

        let name = closure.node.display_name().to_string();
        if let Some(tracer) = self.tracer_mut() {
            tracer.before_call(&name, &args);
        }

        let result = self.with_frame(Frame::Function { name: name.clone() }, |realm| {
            realm.invoke(callee, &closure, args)
        });

        if let Some(tracer) = self.tracer_mut() {
            tracer.after_call(&name, result.as_ref().map_err(|thrown| &thrown.value));
        }
        result
    }

    fn invoke(&mut self, callee: &Value, closure: &Closure, args: Vec<Value>) -> EvalResult<Value> {
        let node = &closure.node;
        let env = self.create_env(closure.env);

        let mut args = args.into_iter();
        for param in &node.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.declare_binding(env, &param.name, value);
        }
        if !node.is_declaration {
            if let Some(name) = &node.name {
                if !node.params.iter().any(|p| &p.name == name) {
                    self.declare_binding(env, name, callee.clone());
                }
            }
        }

        self.hoist(&node.body, env);
        match self.exec_block(&node.body, env)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Undefined),
        }
    }

    /// Declare hoisted names in `env`: `var`s start out undefined (unless
    /// already bound, e.g. as a parameter), function declarations are
    /// instantiated up front.
    fn hoist(&mut self, body: &[Stmt], env: EnvId) {
        for name in hoisted_names(body) {
            if self.envs.binding(env, &name).is_none() {
                self.declare_binding(env, &name, Value::Undefined);
            }
        }
        let mut declarations = Vec::new();
        collect_function_declarations(body, &mut declarations);
        for node in declarations {
            if let Some(name) = node.name.clone() {
                let function = self.instantiate(node, env);
                self.declare_binding(env, &name, function);
            }
        }
    }

    fn instantiate(&mut self, node: Rc<FunctionNode>, env: EnvId) -> Value {
        Value::Object(self.allocate(ObjectKind::Function(Closure { node, env })))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn exec_block(&mut self, stmts: &[Stmt], env: EnvId) -> EvalResult<Flow> {
        for stmt in stmts {
            if let Flow::Return(value) = self.exec(stmt, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: EnvId) -> EvalResult<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Var(decl) => {
                if let Some(init) = &decl.init {
                    let value = self.eval(init, env)?;
                    self.assign_binding(env, &decl.name, value);
                }
                Ok(Flow::Normal)
            }
            // Hoisted
            Stmt::Function(_) | Stmt::Empty => Ok(Flow::Normal),
            Stmt::If { test, consequent, alternate } => {
                if self.eval(test, env)?.is_truthy() {
                    self.exec(consequent, env)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.exec_block(stmts, env),
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr, env)?;
                Err(Thrown::new(value, &self.heap))
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn eval(&mut self, expr: &Expr, env: EnvId) -> EvalResult<Value> {
        self.tick()?;
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::string(s)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => self.lookup(env, name),
            Expr::Object(props) => {
                let mut properties = IndexMap::new();
                for (key, value) in props {
                    let value = self.eval(value, env)?;
                    properties.insert(key.clone(), value);
                }
                let id = self.allocate(ObjectKind::Ordinary);
                if let Some(object) = self.heap.get_mut(id) {
                    object.properties = properties;
                }
                Ok(Value::Object(id))
            }
            Expr::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, env)?);
                }
                Ok(Value::Object(self.allocate(ObjectKind::Array(values))))
            }
            Expr::Function(node) => Ok(self.instantiate(node.clone(), env)),
            Expr::Member { object, property } => {
                let object = self.eval(object, env)?;
                self.get_property(&object, property)
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, env)?;
                let key = self.eval(index, env)?.to_property_key(&self.heap);
                self.get_property(&object, &key)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args, env),
            Expr::Assign { op, target, value } => {
                let reference = self.reference(target, env)?;
                let value = match op {
                    AssignOp::Assign => self.eval(value, env)?,
                    AssignOp::AddAssign => {
                        let current = self.get_reference(&reference, env)?;
                        let rhs = self.eval(value, env)?;
                        self.binary(BinaryOp::Add, &current, &rhs)
                    }
                    AssignOp::SubAssign => {
                        let current = self.get_reference(&reference, env)?;
                        let rhs = self.eval(value, env)?;
                        self.binary(BinaryOp::Sub, &current, &rhs)
                    }
                };
                self.put_reference(&reference, value.clone(), env)?;
                Ok(value)
            }
            Expr::Update { op, prefix, target } => {
                let reference = self.reference(target, env)?;
                let old = self.get_reference(&reference, env)?.to_number();
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_reference(&reference, Value::Number(new), env)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Binary { op: BinaryOp::And, left, right } => {
                let left = self.eval(left, env)?;
                if left.is_truthy() {
                    self.eval(right, env)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary { op: BinaryOp::Or, left, right } => {
                let left = self.eval(left, env)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                Ok(self.binary(*op, &left, &right))
            }
            Expr::Unary { op: UnaryOp::Typeof, operand } => {
                // `typeof undeclared` does not throw
                if let Expr::Ident(name) = operand.as_ref() {
                    if self.envs.resolve(env, name).is_none() {
                        return Ok(Value::string("undefined"));
                    }
                }
                let value = self.eval(operand, env)?;
                Ok(Value::string(value.type_of(&self.heap)))
            }
            Expr::Unary { op, operand } => {
                let value = self.eval(operand, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Typeof => Value::string(value.type_of(&self.heap)),
                })
            }
            Expr::Conditional { test, consequent, alternate } => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(consequent, env)
                } else {
                    self.eval(alternate, env)
                }
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], env: EnvId) -> EvalResult<Value> {
        if let Expr::Ident(name) = callee {
            if name == OPTIMIZE_INTRINSIC && self.envs.resolve(env, name).is_none() {
                let function = match args.first() {
                    Some(arg) => self.eval(arg, env)?,
                    None => Value::Undefined,
                };
                self.register_additional_function(function);
                return Ok(Value::Undefined);
            }
        }

        let function = match callee {
            Expr::Member { object, property } => {
                let object = self.eval(object, env)?;
                if property == "push" {
                    if let Some(id) = self.array_without_own(&object, "push") {
                        let values = self.eval_args(args, env)?;
                        return self.array_push(id, values);
                    }
                }
                self.get_property(&object, property)?
            }
            other => self.eval(other, env)?,
        };
        let values = self.eval_args(args, env)?;
        self.call(&function, values)
    }

    fn eval_args(&mut self, args: &[Expr], env: EnvId) -> EvalResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, env)).collect()
    }

    fn array_without_own(&self, value: &Value, key: &str) -> Option<ObjectId> {
        let id = value.as_object()?;
        let object = self.heap.get(id)?;
        match object.kind {
            ObjectKind::Array(_) if !object.properties.contains_key(key) => Some(id),
            _ => None,
        }
    }

    fn array_push(&mut self, id: ObjectId, values: Vec<Value>) -> EvalResult<Value> {
        for value in values {
            let index = self
                .heap
                .get(id)
                .and_then(|o| o.elements())
                .map_or(0, |elements| elements.len());
            self.write_property(id, &index.to_string(), value)?;
        }
        let length = self.heap.get(id).and_then(|o| o.elements()).map_or(0, |e| e.len());
        Ok(Value::Number(length as f64))
    }

    // ========================================================================
    // Bindings and properties
    // ========================================================================

    fn lookup(&mut self, env: EnvId, name: &str) -> EvalResult<Value> {
        match self.envs.resolve(env, name) {
            Some(found) => Ok(self.read_binding(found, name)),
            None => match name {
                "undefined" => Ok(Value::Undefined),
                "NaN" => Ok(Value::Number(f64::NAN)),
                "Infinity" => Ok(Value::Number(f64::INFINITY)),
                _ => Err(Thrown::error("ReferenceError", format!("{} is not defined", name))),
            },
        }
    }

    /// Assign through the scope chain; undeclared names become globals.
    fn assign_binding(&mut self, env: EnvId, name: &str, value: Value) {
        let target = self.envs.resolve(env, name).unwrap_or(EnvId::GLOBAL);
        self.declare_binding(target, name, value);
    }

    fn get_property(&mut self, object: &Value, key: &str) -> EvalResult<Value> {
        match object {
            Value::Object(id) => {
                if key == "length" {
                    if let Some(elements) = self.heap.get(*id).and_then(|o| o.elements()) {
                        return Ok(Value::Number(elements.len() as f64));
                    }
                }
                Ok(self.read_property(*id, key))
            }
            Value::String(s) => Ok(match key {
                "length" => Value::Number(s.chars().count() as f64),
                _ => match crate::interpreter::value::array_index(key) {
                    Some(index) => s
                        .chars()
                        .nth(index)
                        .map_or(Value::Undefined, |c| Value::string(c.to_string())),
                    None => Value::Undefined,
                },
            }),
            Value::Undefined | Value::Null => Err(Thrown::error(
                "TypeError",
                format!("Cannot read properties of {} (reading '{}')", object, key),
            )),
            Value::Bool(_) | Value::Number(_) => Ok(Value::Undefined),
        }
    }

    fn set_property(&mut self, object: &Value, key: &str, value: Value) -> EvalResult<()> {
        match object {
            Value::Object(id) => {
                let is_array = self.heap.get(*id).and_then(|o| o.elements()).is_some();
                if is_array && key == "length" {
                    return Err(Thrown::error("TypeError", "array length is read-only"));
                }
                self.write_property(*id, key, value)
            }
            Value::Undefined | Value::Null => Err(Thrown::error(
                "TypeError",
                format!("Cannot set properties of {} (setting '{}')", object, key),
            )),
            // Writes to primitives are silently dropped
            _ => Ok(()),
        }
    }

    fn reference(&mut self, target: &Expr, env: EnvId) -> EvalResult<Reference> {
        match target {
            Expr::Ident(name) => Ok(Reference::Binding(name.clone())),
            Expr::Member { object, property } => {
                let object = self.eval(object, env)?;
                Ok(Reference::Property(object, property.clone()))
            }
            Expr::Index { object, index } => {
                let object = self.eval(object, env)?;
                let key = self.eval(index, env)?.to_property_key(&self.heap);
                Ok(Reference::Property(object, key))
            }
            _ => Err(Thrown::error("SyntaxError", "Invalid assignment target")),
        }
    }

    fn get_reference(&mut self, reference: &Reference, env: EnvId) -> EvalResult<Value> {
        match reference {
            Reference::Binding(name) => self.lookup(env, name),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn put_reference(&mut self, reference: &Reference, value: Value, env: EnvId) -> EvalResult<()> {
        match reference {
            Reference::Binding(name) => {
                self.assign_binding(env, name, value);
                Ok(())
            }
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Value {
        use BinaryOp::*;
        match op {
            Add => {
                let numeric = |v: &Value| {
                    matches!(v, Value::Number(_) | Value::Bool(_) | Value::Null | Value::Undefined)
                };
                if numeric(left) && numeric(right) {
                    Value::Number(left.to_number() + right.to_number())
                } else {
                    let mut s = left.to_display_string(&self.heap);
                    s.push_str(&right.to_display_string(&self.heap));
                    Value::string(s)
                }
            }
            Sub => Value::Number(left.to_number() - right.to_number()),
            Mul => Value::Number(left.to_number() * right.to_number()),
            Div => Value::Number(left.to_number() / right.to_number()),
            Mod => Value::Number(left.to_number() % right.to_number()),
            Less | Greater | LessEqual | GreaterEqual => {
                let ordering = match (left, right) {
                    (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                    _ => left.to_number().partial_cmp(&right.to_number()),
                };
                Value::Bool(match ordering {
                    None => false,
                    Some(ordering) => match op {
                        Less => ordering.is_lt(),
                        Greater => ordering.is_gt(),
                        LessEqual => ordering.is_le(),
                        _ => ordering.is_ge(),
                    },
                })
            }
            Equal => Value::Bool(loose_equals(left, right)),
            NotEqual => Value::Bool(!loose_equals(left, right)),
            StrictEqual => Value::Bool(strict_equals(left, right)),
            StrictNotEqual => Value::Bool(!strict_equals(left, right)),
            // Short-circuiting forms are handled in `eval`
            And => Value::Bool(left.is_truthy() && right.is_truthy()),
            Or => Value::Bool(left.is_truthy() || right.is_truthy()),
        }
    }
}

fn collect_function_declarations(body: &[Stmt], out: &mut Vec<Rc<FunctionNode>>) {
    for stmt in body {
        match stmt {
            Stmt::Function(node) => out.push(node.clone()),
            Stmt::If { consequent, alternate, .. } => {
                collect_function_declarations(std::slice::from_ref(consequent.as_ref()), out);
                if let Some(alternate) = alternate {
                    collect_function_declarations(std::slice::from_ref(alternate.as_ref()), out);
                }
            }
            Stmt::While { body, .. } => {
                collect_function_declarations(std::slice::from_ref(body.as_ref()), out)
            }
            Stmt::Block(stmts) => collect_function_declarations(stmts, out),
            _ => {}
        }
    }
}
