//! Bytecode interpreter
//!
//! Every call gets its own [`Frame`] with a private operand stack, so native
//! methods can re-enter the VM (for example to load and run another unit)
//! without disturbing the caller's frame.

use super::arena::Arena;
use super::builtins;
use super::callable::Proc;
use super::object::{ClassId, ClassRegistry, Exception, Method, Object};
use super::value::Value;
use super::{ReadError, VmError, VmOptions, VmResult};
use crate::compiler::bytecode::{BytecodeReader, DecodeError};
use crate::compiler::{self, CompileContext, CompileError, Opcode, Unit};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::io::{self, Read, Write};
use std::rc::Rc;
use tracing::debug;

/// Result of [`Vm::load_source`]
#[derive(Debug)]
pub enum Loaded {
    /// Compile-only mode: the unit, not executed
    Compiled(Unit),
    /// The value the program evaluated to
    Executed(Value),
}

/// In-memory output sink, for capturing what scripts print
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Exception handler installed by `PUSH_HANDLER`
#[derive(Debug, Clone, Copy)]
struct Handler {
    /// Bytecode offset of the handler code
    target: usize,
    /// Operand stack height to restore
    depth: usize,
}

/// Activation record of one unit
struct Frame {
    unit: Rc<Unit>,
    ip: usize,
    stack: Vec<Value>,
    locals: Vec<Value>,
    receiver: Value,
    /// Class that `DEFINE_METHOD` attaches to
    target_class: ClassId,
    handlers: Vec<Handler>,
}

/// A Rill virtual machine instance
pub struct Vm {
    classes: ClassRegistry,
    globals: FxHashMap<String, Value>,
    arena: Arena,
    /// Top-level receiver
    main: Value,
    options: VmOptions,
    output: Box<dyn Write>,
    /// Number of active script frames
    depth: usize,
}

impl Vm {
    /// Create a VM with default options
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    /// Create a VM with the given options
    pub fn with_options(options: VmOptions) -> Self {
        let main = Value::Object(Rc::new(Object {
            class: ClassId::OBJECT,
            class_name: Rc::from("main"),
        }));
        let mut vm = Self {
            classes: ClassRegistry::new(),
            globals: FxHashMap::default(),
            arena: Arena::new(),
            main,
            options,
            output: Box::new(io::stdout()),
            depth: 0,
        };
        builtins::register(&mut vm);
        vm
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    /// The top-level receiver
    pub fn main(&self) -> Value {
        self.main.clone()
    }

    // ===== Output =====

    /// Redirect what `puts` writes
    pub fn set_output(&mut self, output: impl Write + 'static) {
        self.output = Box::new(output);
    }

    /// Redirect output into a fresh buffer and return a handle to it
    pub fn capture_output(&mut self) -> OutputBuffer {
        let buffer = OutputBuffer::new();
        self.set_output(buffer.clone());
        buffer
    }

    pub fn write_output(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.output.write_all(bytes)
    }

    // ===== Methods and globals =====

    /// Define a native method on `class`
    pub fn define_method<F>(&mut self, class: ClassId, name: &str, f: F)
    where
        F: Fn(&mut Vm, &Value, &[Value]) -> VmResult<Value> + 'static,
    {
        self.classes.define_method(class, name, Method::Native(Rc::new(f)));
    }

    /// Define a native method on the kernel (root class)
    pub fn define_kernel_method<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut Vm, &Value, &[Value]) -> VmResult<Value> + 'static,
    {
        self.define_method(ClassId::OBJECT, name, f);
    }

    /// Whether `name` resolves to a method for the top-level receiver
    pub fn has_method(&self, name: &str) -> bool {
        self.classes.find_method(self.main.class_id(), name).is_some()
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }

    pub fn set_global(&mut self, name: &str, value: Value) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn class_name_of(&self, value: &Value) -> &str {
        self.classes.name(value.class_id())
    }

    /// Whether `value` is an instance of `class` or one of its subclasses
    pub fn is_a(&self, value: &Value, class: ClassId) -> bool {
        self.classes.is_subclass(value.class_id(), class)
    }

    // ===== Allocation =====

    /// Allocate a string and record it in the arena
    pub fn new_string(&mut self, s: &str) -> Value {
        let value = Value::Str(Rc::from(s));
        self.arena.push(&value);
        value
    }

    /// Allocate an exception of `class` and record it in the arena
    pub fn new_exception(&mut self, class: ClassId, message: impl Into<String>) -> Rc<Exception> {
        let exception = Rc::new(Exception {
            class,
            class_name: self.classes.name(class).to_string(),
            message: message.into(),
        });
        self.arena.push(&Value::Exception(exception.clone()));
        exception
    }

    /// Wrap a unit into a callable and record it in the arena
    pub fn new_proc(&mut self, unit: Unit) -> Rc<Proc> {
        let proc = Rc::new(Proc::new(unit));
        self.arena.push(&Value::Proc(proc.clone()));
        proc
    }

    /// Build an exception of `class` ready to be returned as `Err`
    pub fn raise(&mut self, class: ClassId, message: impl Into<String>) -> VmError {
        VmError::Raised(self.new_exception(class, message))
    }

    pub fn arena_save(&self) -> usize {
        self.arena.save()
    }

    pub fn arena_restore(&mut self, index: usize) {
        self.arena.restore(index);
    }

    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    // ===== Compiling and loading =====

    /// Compile source text into a unit without running it
    pub fn compile_source(&self, source: &str, context: &CompileContext) -> Result<Unit, CompileError> {
        compiler::compile(source, context)
    }

    /// Compile source text and, unless the context says `no_exec`, run it.
    ///
    /// Compile failures are raised as `SyntaxError`.
    pub fn load_source(&mut self, source: &str, context: &CompileContext) -> VmResult<Loaded> {
        let unit = match self.compile_source(source, context) {
            Ok(unit) => unit,
            Err(err) => return Err(self.raise(ClassId::SYNTAX_ERROR, err.to_string())),
        };
        if context.no_exec {
            return Ok(Loaded::Compiled(unit));
        }
        let proc = self.new_proc(unit);
        let main = self.main();
        self.yield_with_class(&proc, main, ClassId::OBJECT)
            .map(Loaded::Executed)
    }

    /// Compile and run source text, returning its value
    pub fn eval(&mut self, source: &str) -> VmResult<Value> {
        match self.load_source(source, &CompileContext::new())? {
            Loaded::Executed(value) => Ok(value),
            Loaded::Compiled(_) => Ok(Value::Nil),
        }
    }

    /// Run a unit against the top-level receiver
    pub fn run(&mut self, unit: Unit) -> VmResult<Value> {
        let proc = self.new_proc(unit);
        let main = self.main();
        self.yield_with_class(&proc, main, ClassId::OBJECT)
    }

    /// Deserialize one unit from a stream, applying this VM's limits
    pub fn read_unit<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Unit, ReadError> {
        let unit = Unit::read_from(reader)?;
        self.check_unit_limits(&unit)?;
        Ok(unit)
    }

    /// Deserialize one unit from a serialized blob in memory.
    ///
    /// # Safety
    ///
    /// Same contract as [`Unit::decode_from_ptr`].
    pub unsafe fn read_unit_from_ptr(&mut self, data: *const u8) -> Result<Unit, ReadError> {
        let unit = Unit::decode_from_ptr(data)?;
        self.check_unit_limits(&unit)?;
        Ok(unit)
    }

    fn check_unit_limits(&mut self, unit: &Unit) -> Result<(), ReadError> {
        let depth = unit.depth();
        if depth > self.options.max_unit_depth {
            return Err(ReadError::Raised(self.raise(
                ClassId::SYSTEM_STACK_ERROR,
                format!(
                    "bytecode units nested {} deep (limit {})",
                    depth, self.options.max_unit_depth
                ),
            )));
        }
        let longest = unit.longest_string();
        if longest > self.options.max_string_len {
            return Err(ReadError::Raised(self.raise(
                ClassId::NO_MEMORY_ERROR,
                format!(
                    "string constant of {} bytes exceeds limit of {}",
                    longest, self.options.max_string_len
                ),
            )));
        }
        debug!(depth, longest, bytes = unit.code.len(), "read bytecode unit");
        Ok(())
    }

    // ===== Execution =====

    /// Invoke a callable with no arguments against `receiver`, defining
    /// methods on `class`.
    pub fn yield_with_class(&mut self, proc: &Proc, receiver: Value, class: ClassId) -> VmResult<Value> {
        self.execute(proc.unit().clone(), receiver, class, &[])
    }

    /// Call a method by name on `receiver`
    pub fn call_method(&mut self, receiver: &Value, name: &str, args: &[Value]) -> VmResult<Value> {
        match self.classes.find_method(receiver.class_id(), name) {
            Some((_, Method::Native(f))) => f(self, receiver, args),
            Some((owner, Method::Script(unit))) => self.execute(unit, receiver.clone(), owner, args),
            None => Err(self.raise(
                ClassId::NO_METHOD_ERROR,
                format!("undefined method '{}' for {}", name, receiver.inspect()),
            )),
        }
    }

    fn execute(
        &mut self,
        unit: Rc<Unit>,
        receiver: Value,
        target_class: ClassId,
        args: &[Value],
    ) -> VmResult<Value> {
        if self.depth >= self.options.max_call_depth {
            return Err(self.raise(ClassId::SYSTEM_STACK_ERROR, "stack level too deep"));
        }
        if args.len() != unit.param_count as usize || unit.param_count > unit.local_count {
            return Err(self.raise(
                ClassId::ARGUMENT_ERROR,
                format!(
                    "wrong number of arguments (given {}, expected {})",
                    args.len(),
                    unit.param_count
                ),
            ));
        }

        let mut locals = vec![Value::Nil; unit.local_count as usize];
        for (slot, arg) in locals.iter_mut().zip(args) {
            *slot = arg.clone();
        }
        let mut frame = Frame {
            unit,
            ip: 0,
            stack: Vec::new(),
            locals,
            receiver,
            target_class,
            handlers: Vec::new(),
        };

        let outermost = self.depth == 0;
        self.depth += 1;
        let result = self.run_frame(&mut frame);
        self.depth -= 1;

        match result {
            // STOP ends the whole run; the outermost call reports nil
            Err(VmError::Halted) if outermost => Ok(Value::Nil),
            other => other,
        }
    }

    fn run_frame(&mut self, frame: &mut Frame) -> VmResult<Value> {
        loop {
            match self.step(frame) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(VmError::Raised(exception)) => match frame.handlers.pop() {
                    Some(handler) => {
                        frame.stack.truncate(handler.depth);
                        frame.stack.push(Value::Exception(exception));
                        frame.ip = handler.target;
                    }
                    None => return Err(VmError::Raised(exception)),
                },
                Err(halt) => return Err(halt),
            }
        }
    }

    fn invalid_bytecode(&mut self, offset: usize, detail: impl std::fmt::Display) -> VmError {
        self.raise(
            ClassId::RUNTIME_ERROR,
            format!("invalid bytecode at offset {}: {}", offset, detail),
        )
    }

    fn pop(&mut self, frame: &mut Frame) -> VmResult<Value> {
        match frame.stack.pop() {
            Some(value) => Ok(value),
            None => Err(self.invalid_bytecode(frame.ip, "stack underflow")),
        }
    }

    /// Execute one instruction; `Some` when the frame returns
    fn step(&mut self, frame: &mut Frame) -> VmResult<Option<Value>> {
        let unit = Rc::clone(&frame.unit);
        let offset = frame.ip;
        let code = unit.code.get(offset..).unwrap_or(&[]);
        if code.is_empty() {
            return Err(self.invalid_bytecode(offset, "execution fell off the end"));
        }

        let mut reader = BytecodeReader::new(code);
        let (opcode, operand, operand2) = match decode_instruction(&mut reader) {
            Ok(decoded) => decoded,
            Err(err) => return Err(self.invalid_bytecode(offset, err)),
        };
        let next = offset + reader.position();
        frame.ip = next;

        match opcode {
            Opcode::Nop => {}
            Opcode::Pop => {
                self.pop(frame)?;
            }
            Opcode::Dup => {
                let top = self.pop(frame)?;
                frame.stack.push(top.clone());
                frame.stack.push(top);
            }

            Opcode::LoadNil => frame.stack.push(Value::Nil),
            Opcode::LoadTrue => frame.stack.push(Value::Bool(true)),
            Opcode::LoadFalse => frame.stack.push(Value::Bool(false)),
            Opcode::LoadSelf => frame.stack.push(frame.receiver.clone()),
            Opcode::LoadInt => match unit.constants.get_integer(operand as u32) {
                Some(i) => frame.stack.push(Value::Int(i)),
                None => return Err(self.invalid_bytecode(offset, "integer constant out of range")),
            },
            Opcode::LoadFloat => match unit.constants.get_float(operand as u32) {
                Some(x) => frame.stack.push(Value::Float(x)),
                None => return Err(self.invalid_bytecode(offset, "float constant out of range")),
            },
            Opcode::LoadStr => match unit.constants.get_string(operand as u32) {
                Some(s) => {
                    let value = self.new_string(s);
                    frame.stack.push(value);
                }
                None => return Err(self.invalid_bytecode(offset, "string constant out of range")),
            },

            Opcode::LoadLocal => match frame.locals.get(operand as usize) {
                Some(value) => frame.stack.push(value.clone()),
                None => return Err(self.invalid_bytecode(offset, "local slot out of range")),
            },
            Opcode::StoreLocal => {
                let value = self.pop(frame)?;
                match frame.locals.get_mut(operand as usize) {
                    Some(slot) => *slot = value,
                    None => return Err(self.invalid_bytecode(offset, "local slot out of range")),
                }
            }
            Opcode::LoadGlobal => {
                let name = self.symbol(&unit, operand, offset)?;
                match self.globals.get(name) {
                    Some(value) => frame.stack.push(value.clone()),
                    None => {
                        return Err(self.raise(
                            ClassId::NAME_ERROR,
                            format!("undefined local variable or method '{}' for main", name),
                        ))
                    }
                }
            }
            Opcode::StoreGlobal => {
                let value = self.pop(frame)?;
                let name = self.symbol(&unit, operand, offset)?;
                self.globals.insert(name.to_string(), value);
            }

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => {
                let right = self.pop(frame)?;
                let left = self.pop(frame)?;
                let result = self.arithmetic(opcode, left, right)?;
                frame.stack.push(result);
            }
            Opcode::Neg => {
                let value = self.pop(frame)?;
                let result = match value {
                    Value::Int(i) => match i.checked_neg() {
                        Some(n) => Value::Int(n),
                        None => return Err(self.raise(ClassId::RANGE_ERROR, "integer overflow")),
                    },
                    Value::Float(x) => Value::Float(-x),
                    other => {
                        return Err(self.raise(
                            ClassId::NO_METHOD_ERROR,
                            format!("undefined method '-@' for {}", other.inspect()),
                        ))
                    }
                };
                frame.stack.push(result);
            }
            Opcode::Not => {
                let value = self.pop(frame)?;
                frame.stack.push(Value::Bool(!value.is_truthy()));
            }

            Opcode::Eq | Opcode::Ne => {
                let right = self.pop(frame)?;
                let left = self.pop(frame)?;
                let equal = left == right;
                frame.stack.push(Value::Bool(equal == (opcode == Opcode::Eq)));
            }
            Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                let right = self.pop(frame)?;
                let left = self.pop(frame)?;
                let result = self.compare(opcode, &left, &right)?;
                frame.stack.push(Value::Bool(result));
            }

            Opcode::Jmp => frame.ip = self.jump_target(&unit, next, operand, offset)?,
            Opcode::JmpIfFalse | Opcode::JmpIfTrue => {
                let condition = self.pop(frame)?;
                if condition.is_truthy() == (opcode == Opcode::JmpIfTrue) {
                    frame.ip = self.jump_target(&unit, next, operand, offset)?;
                }
            }

            Opcode::Send => {
                let argc = operand2 as usize;
                if frame.stack.len() < argc + 1 {
                    return Err(self.invalid_bytecode(offset, "stack underflow"));
                }
                let args = frame.stack.split_off(frame.stack.len() - argc);
                let receiver = self.pop(frame)?;
                let name = self.symbol(&unit, operand, offset)?;
                let result = self.call_method(&receiver, name, &args)?;
                frame.stack.push(result);
            }
            Opcode::DefineMethod => {
                let name = self.symbol(&unit, operand, offset)?;
                match unit.children.get(operand2 as usize) {
                    Some(child) => {
                        let method = Method::Script(child.clone());
                        self.classes.define_method(frame.target_class, name, method);
                    }
                    None => return Err(self.invalid_bytecode(offset, "child unit out of range")),
                }
            }

            Opcode::Return => return self.pop(frame).map(Some),
            Opcode::Raise => {
                let value = self.pop(frame)?;
                return Err(self.raise_value(value));
            }
            Opcode::PushHandler => {
                let target = self.jump_target(&unit, next, operand, offset)?;
                frame.handlers.push(Handler {
                    target,
                    depth: frame.stack.len(),
                });
            }
            Opcode::PopHandler => {
                frame.handlers.pop();
            }
            Opcode::Stop => return Err(VmError::Halted),
        }
        Ok(None)
    }

    fn symbol<'u>(&mut self, unit: &'u Unit, index: i64, offset: usize) -> VmResult<&'u str> {
        match unit.symbol(index as u16) {
            Some(name) => Ok(name),
            None => Err(self.invalid_bytecode(offset, "symbol out of range")),
        }
    }

    fn jump_target(&mut self, unit: &Unit, next: usize, relative: i64, offset: usize) -> VmResult<usize> {
        let target = next as i64 + relative;
        if target < 0 || target as usize >= unit.code.len() {
            return Err(self.invalid_bytecode(offset, format!("jump target {} out of range", target)));
        }
        Ok(target as usize)
    }

    /// Turn the operand of `RAISE` into an exception
    fn raise_value(&mut self, value: Value) -> VmError {
        match value {
            Value::Exception(exception) => VmError::Raised(exception),
            Value::Str(message) => self.raise(ClassId::RUNTIME_ERROR, &*message),
            _ => self.raise(ClassId::TYPE_ERROR, "exception class/object expected"),
        }
    }

    fn arithmetic(&mut self, op: Opcode, left: Value, right: Value) -> VmResult<Value> {
        match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => self.integer_arithmetic(op, *a, *b),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                Ok(Value::Float(float_arithmetic(op, as_f64(&left), as_f64(&right))))
            }
            (Value::Str(a), Value::Str(b)) if op == Opcode::Add => {
                let joined = format!("{}{}", a, b);
                Ok(self.new_string(&joined))
            }
            (Value::Str(s), Value::Int(n)) if op == Opcode::Mul => {
                if *n < 0 {
                    return Err(self.raise(ClassId::ARGUMENT_ERROR, "negative argument"));
                }
                let len = s.len().saturating_mul(*n as usize);
                if len > self.options.max_string_len {
                    return Err(self.raise(ClassId::ARGUMENT_ERROR, "argument too big"));
                }
                let repeated = s.repeat(*n as usize);
                Ok(self.new_string(&repeated))
            }
            (Value::Str(_), other) if op == Opcode::Add => {
                let message = format!(
                    "no implicit conversion of {} into String",
                    self.class_name_of(other)
                );
                Err(self.raise(ClassId::TYPE_ERROR, message))
            }
            (Value::Int(_) | Value::Float(_), other) => {
                let message = format!(
                    "{} can't be coerced into {}",
                    self.class_name_of(other),
                    self.class_name_of(&left)
                );
                Err(self.raise(ClassId::TYPE_ERROR, message))
            }
            _ => Err(self.raise(
                ClassId::NO_METHOD_ERROR,
                format!(
                    "undefined method '{}' for {}",
                    operator_symbol(op),
                    left.inspect()
                ),
            )),
        }
    }

    fn integer_arithmetic(&mut self, op: Opcode, a: i64, b: i64) -> VmResult<Value> {
        if matches!(op, Opcode::Div | Opcode::Mod) && b == 0 {
            return Err(self.raise(ClassId::ZERO_DIVISION_ERROR, "divided by 0"));
        }
        let result = match op {
            Opcode::Add => a.checked_add(b),
            Opcode::Sub => a.checked_sub(b),
            Opcode::Mul => a.checked_mul(b),
            // Division and modulo round towards negative infinity
            Opcode::Div => a.checked_div(b).map(|q| {
                if a % b != 0 && ((a < 0) != (b < 0)) {
                    q - 1
                } else {
                    q
                }
            }),
            Opcode::Mod => {
                let r = a.wrapping_rem(b);
                Some(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
            }
            _ => None,
        };
        match result {
            Some(value) => Ok(Value::Int(value)),
            None => Err(self.raise(ClassId::RANGE_ERROR, "integer overflow")),
        }
    }

    fn compare(&mut self, op: Opcode, left: &Value, right: &Value) -> VmResult<bool> {
        let ordering = match (left, right) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                as_f64(left).partial_cmp(&as_f64(right))
            }
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => {
                let message = format!(
                    "comparison of {} with {} failed",
                    self.class_name_of(left),
                    right.inspect()
                );
                return Err(self.raise(ClassId::ARGUMENT_ERROR, message));
            }
        };
        // NaN compares false with everything
        let Some(ordering) = ordering else {
            return Ok(false);
        };
        Ok(match op {
            Opcode::Lt => ordering == Ordering::Less,
            Opcode::Le => ordering != Ordering::Greater,
            Opcode::Gt => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        })
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one instruction; `SEND` and `DEFINE_METHOD` carry a second operand
fn decode_instruction(reader: &mut BytecodeReader<'_>) -> Result<(Opcode, i64, i64), DecodeError> {
    let opcode = reader.read_opcode()?;
    let (first, second) = match opcode {
        Opcode::Send => (reader.read_u16()? as i64, reader.read_u8()? as i64),
        Opcode::DefineMethod => (reader.read_u16()? as i64, reader.read_u16()? as i64),
        op if op.is_jump() => (reader.read_i32()? as i64, 0),
        op if op.operand_size() == 2 => (reader.read_u16()? as i64, 0),
        _ => (0, 0),
    };
    Ok((opcode, first, second))
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(i) => *i as f64,
        Value::Float(x) => *x,
        _ => f64::NAN,
    }
}

fn float_arithmetic(op: Opcode, a: f64, b: f64) -> f64 {
    match op {
        Opcode::Add => a + b,
        Opcode::Sub => a - b,
        Opcode::Mul => a * b,
        Opcode::Div => a / b,
        _ => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
    }
}

fn operator_symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        _ => "%",
    }
}
