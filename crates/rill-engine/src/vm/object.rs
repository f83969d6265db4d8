//! Object model: classes, methods and exceptions

use super::interpreter::Vm;
use super::value::Value;
use super::VmResult;
use crate::compiler::Unit;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

/// Index of a class in the [`ClassRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Root class; its method table doubles as the kernel
    pub const OBJECT: ClassId = ClassId(0);
    pub const NIL: ClassId = ClassId(1);
    pub const TRUE: ClassId = ClassId(2);
    pub const FALSE: ClassId = ClassId(3);
    pub const INTEGER: ClassId = ClassId(4);
    pub const FLOAT: ClassId = ClassId(5);
    pub const STRING: ClassId = ClassId(6);
    pub const PROC: ClassId = ClassId(7);
    pub const EXCEPTION: ClassId = ClassId(8);
    pub const SCRIPT_ERROR: ClassId = ClassId(9);
    pub const LOAD_ERROR: ClassId = ClassId(10);
    pub const SYNTAX_ERROR: ClassId = ClassId(11);
    pub const STANDARD_ERROR: ClassId = ClassId(12);
    pub const RUNTIME_ERROR: ClassId = ClassId(13);
    pub const TYPE_ERROR: ClassId = ClassId(14);
    pub const ARGUMENT_ERROR: ClassId = ClassId(15);
    pub const NAME_ERROR: ClassId = ClassId(16);
    pub const NO_METHOD_ERROR: ClassId = ClassId(17);
    pub const ZERO_DIVISION_ERROR: ClassId = ClassId(18);
    pub const RANGE_ERROR: ClassId = ClassId(19);
    pub const SYSTEM_CALL_ERROR: ClassId = ClassId(20);
    pub const NO_MEMORY_ERROR: ClassId = ClassId(21);
    pub const SYSTEM_STACK_ERROR: ClassId = ClassId(22);
}

/// Built-in classes in id order, with their superclass
const CORE_CLASSES: &[(&str, Option<ClassId>)] = &[
    ("Object", None),
    ("NilClass", Some(ClassId::OBJECT)),
    ("TrueClass", Some(ClassId::OBJECT)),
    ("FalseClass", Some(ClassId::OBJECT)),
    ("Integer", Some(ClassId::OBJECT)),
    ("Float", Some(ClassId::OBJECT)),
    ("String", Some(ClassId::OBJECT)),
    ("Proc", Some(ClassId::OBJECT)),
    ("Exception", Some(ClassId::OBJECT)),
    ("ScriptError", Some(ClassId::EXCEPTION)),
    ("LoadError", Some(ClassId::SCRIPT_ERROR)),
    ("SyntaxError", Some(ClassId::SCRIPT_ERROR)),
    ("StandardError", Some(ClassId::EXCEPTION)),
    ("RuntimeError", Some(ClassId::STANDARD_ERROR)),
    ("TypeError", Some(ClassId::STANDARD_ERROR)),
    ("ArgumentError", Some(ClassId::STANDARD_ERROR)),
    ("NameError", Some(ClassId::STANDARD_ERROR)),
    ("NoMethodError", Some(ClassId::NAME_ERROR)),
    ("ZeroDivisionError", Some(ClassId::STANDARD_ERROR)),
    ("RangeError", Some(ClassId::STANDARD_ERROR)),
    ("SystemCallError", Some(ClassId::STANDARD_ERROR)),
    ("NoMemoryError", Some(ClassId::EXCEPTION)),
    ("SystemStackError", Some(ClassId::EXCEPTION)),
];

/// Native method implementation: `(vm, receiver, args)`
pub type NativeFn = Rc<dyn Fn(&mut Vm, &Value, &[Value]) -> VmResult<Value>>;

/// A method body
#[derive(Clone)]
pub enum Method {
    /// Implemented in Rust
    Native(NativeFn),
    /// Compiled function body
    Script(Rc<Unit>),
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Native(_) => f.write_str("Method::Native"),
            Method::Script(unit) => write!(f, "Method::Script({} params)", unit.param_count),
        }
    }
}

/// Class metadata
#[derive(Debug)]
pub struct Class {
    /// Class name
    pub name: String,
    /// Parent class, `None` only for the root
    pub superclass: Option<ClassId>,
    /// Methods defined directly on this class
    pub methods: FxHashMap<String, Method>,
}

/// Registry of all classes known to a VM
#[derive(Debug)]
pub struct ClassRegistry {
    classes: Vec<Class>,
    by_name: FxHashMap<String, ClassId>,
}

impl ClassRegistry {
    /// Create a registry holding the core classes
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::with_capacity(CORE_CLASSES.len()),
            by_name: FxHashMap::default(),
        };
        for (name, superclass) in CORE_CLASSES {
            registry.define_class(name, *superclass);
        }
        registry
    }

    /// Define a class, or return the existing one with that name
    pub fn define_class(&mut self, name: &str, superclass: Option<ClassId>) -> ClassId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(Class {
            name: name.to_string(),
            superclass,
            methods: FxHashMap::default(),
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, id: ClassId) -> Option<&Class> {
        self.classes.get(id.0 as usize)
    }

    /// Class name, `"?"` for an unknown id
    pub fn name(&self, id: ClassId) -> &str {
        self.get(id).map_or("?", |c| c.name.as_str())
    }

    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Whether `class` is `ancestor` or inherits from it
    pub fn is_subclass(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.ancestors(class).any(|id| id == ancestor)
    }

    /// `class` followed by its superclasses up to the root
    pub fn ancestors(&self, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        std::iter::successors(self.get(class).map(|_| class), move |id| {
            self.get(*id).and_then(|c| c.superclass)
        })
    }

    pub fn define_method(&mut self, class: ClassId, name: &str, method: Method) {
        if let Some(class) = self.classes.get_mut(class.0 as usize) {
            class.methods.insert(name.to_string(), method);
        }
    }

    /// Find a method on the class chain, falling back to the kernel.
    ///
    /// Returns the method together with the class that defines it.
    pub fn find_method(&self, class: ClassId, name: &str) -> Option<(ClassId, Method)> {
        self.ancestors(class)
            .chain(std::iter::once(ClassId::OBJECT))
            .find_map(|id| {
                self.get(id)
                    .and_then(|c| c.methods.get(name))
                    .map(|m| (id, m.clone()))
            })
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Plain object instance
#[derive(Debug)]
pub struct Object {
    pub class: ClassId,
    pub class_name: Rc<str>,
}

/// Exception instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// Exception class
    pub class: ClassId,
    /// Name of the class, kept for display without the registry
    pub class_name: String,
    /// Message
    pub message: String,
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.class_name)
    }
}
