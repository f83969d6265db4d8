//! Kernel methods for loading code from scripts
//!
//! [`register`] installs the three low-level loaders and the `load` /
//! `require` methods built on them. All of them return `true` on success and
//! raise on failure.

use crate::compile::DEFAULT_LABEL;
use crate::error::LoadError;
use crate::extension::{load_library, DynamicLinker, PlatformLinker};
use crate::loader::{load_file, load_source};
use crate::options::RuntimeOptions;
use crate::resolve::{extension_of, resolve, LOAD_EXTENSIONS, REQUIRE_EXTENSIONS};
use crate::scratch::ScratchProvider;
use rill_engine::vm::builtins::{check_arity, check_arity_range};
use rill_engine::vm::ClassId;
use rill_engine::{Value, Vm, VmResult};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// Files seen by `require`
#[derive(Debug, Default)]
pub struct Features {
    loaded: FxHashSet<PathBuf>,
    loading: FxHashSet<PathBuf>,
}

impl Features {
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.loaded.contains(path)
    }

    pub fn is_loading(&self, path: &Path) -> bool {
        self.loading.contains(path)
    }

    pub fn loaded(&self) -> impl Iterator<Item = &Path> {
        self.loaded.iter().map(PathBuf::as_path)
    }
}

/// Everything the kernel methods share
pub struct Kernel {
    load_path: Vec<PathBuf>,
    scratch: Box<dyn ScratchProvider>,
    linker: Box<dyn DynamicLinker>,
    features: RefCell<Features>,
}

impl Kernel {
    pub fn new(options: &RuntimeOptions) -> Self {
        Self {
            load_path: options.load_path.clone(),
            scratch: Box::new(options.scratch()),
            linker: Box::new(PlatformLinker),
            features: RefCell::new(Features::default()),
        }
    }

    pub fn with_scratch(mut self, scratch: impl ScratchProvider + 'static) -> Self {
        self.scratch = Box::new(scratch);
        self
    }

    pub fn with_linker(mut self, linker: impl DynamicLinker + 'static) -> Self {
        self.linker = Box::new(linker);
        self
    }

    pub fn features(&self) -> std::cell::Ref<'_, Features> {
        self.features.borrow()
    }

    /// Define the kernel methods on `vm` and return the shared state
    pub fn install(self, vm: &mut Vm) -> Rc<Kernel> {
        let kernel = Rc::new(self);

        let k = kernel.clone();
        vm.define_kernel_method("__load_source", move |vm, _, args| {
            check_arity_range(vm, args, 1, 2)?;
            let code = string_arg(vm, &args[0])?;
            let path = match args.get(1) {
                Some(path) => string_arg(vm, path)?,
                None => DEFAULT_LABEL.to_string(),
            };
            guarded(vm, |vm| load_source(vm, &code, Some(&path), k.scratch.as_ref()).map(drop))
        });

        vm.define_kernel_method("__load_bytecode_file", move |vm, _, args| {
            check_arity(vm, args, 1)?;
            let path = string_arg(vm, &args[0])?;
            guarded(vm, |vm| load_file(vm, Path::new(&path)).map(drop))
        });

        let k = kernel.clone();
        vm.define_kernel_method("__load_shared_file", move |vm, _, args| {
            check_arity(vm, args, 1)?;
            let path = string_arg(vm, &args[0])?;
            guarded(vm, |vm| load_library(vm, Path::new(&path), k.linker.as_ref()))
        });

        let k = kernel.clone();
        vm.define_kernel_method("load", move |vm, _, args| {
            check_arity(vm, args, 1)?;
            let path = string_arg(vm, &args[0])?;
            guarded(vm, |vm| {
                let real = resolve(&path, LOAD_EXTENSIONS, &k.load_path)?;
                k.load_resolved(vm, &real)
            })
        });

        let k = kernel.clone();
        vm.define_kernel_method("require", move |vm, _, args| {
            check_arity(vm, args, 1)?;
            let path = string_arg(vm, &args[0])?;
            let mark = vm.arena_save();
            let result = k.require(vm, &path);
            let result = result.map_err(|err| err.into_vm_error(vm));
            vm.arena_restore(mark);
            result.map(Value::Bool)
        });

        kernel
    }

    fn require(&self, vm: &mut Vm, path: &str) -> Result<bool, LoadError> {
        let real = resolve(path, REQUIRE_EXTENSIONS, &self.load_path)?;
        {
            let mut features = self.features.borrow_mut();
            if features.is_loaded(&real) || features.is_loading(&real) {
                debug!(feature = %real.display(), "already required");
                return Ok(false);
            }
            features.loading.insert(real.clone());
        }

        let result = match extension_of(&real).as_str() {
            ".rbc" => load_file(vm, &real).map(drop),
            _ => self.load_script(vm, &real),
        };

        let mut features = self.features.borrow_mut();
        features.loading.remove(&real);
        result?;
        features.loaded.insert(real);
        Ok(true)
    }

    /// Load a resolved file according to its extension
    fn load_resolved(&self, vm: &mut Vm, real: &Path) -> Result<(), LoadError> {
        match extension_of(real).as_str() {
            ".rbc" => load_file(vm, real).map(drop),
            ".rill" => self.load_script(vm, real),
            _ => load_library(vm, real, self.linker.as_ref()),
        }
    }

    fn load_script(&self, vm: &mut Vm, real: &Path) -> Result<(), LoadError> {
        let label = real.display().to_string();
        let source = std::fs::read_to_string(real).map_err(|source| LoadError::OpenFile {
            path: label.clone(),
            source,
        })?;
        load_source(vm, &source, Some(&label), self.scratch.as_ref()).map(drop)
    }
}

/// Install the loading kernel methods with the platform scratch files and
/// dynamic linker
pub fn register(vm: &mut Vm, options: &RuntimeOptions) -> Rc<Kernel> {
    Kernel::new(options).install(vm)
}

/// Run a load with the arena bracketed, raising any error into the VM
fn guarded<F>(vm: &mut Vm, load: F) -> VmResult<Value>
where
    F: FnOnce(&mut Vm) -> Result<(), LoadError>,
{
    let mark = vm.arena_save();
    let result = load(vm).map_err(|err| err.into_vm_error(vm));
    vm.arena_restore(mark);
    result.map(|()| Value::Bool(true))
}

fn string_arg(vm: &mut Vm, value: &Value) -> VmResult<String> {
    match value.as_str() {
        Some(s) => Ok(s.to_string()),
        None => {
            let message = format!(
                "no implicit conversion of {} into String",
                vm.class_name_of(value)
            );
            Err(vm.raise(ClassId::TYPE_ERROR, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(dir: &Path) -> (Vm, Rc<Kernel>) {
        let options = RuntimeOptions {
            load_path: vec![dir.to_path_buf()],
            scratch_dir: Some(dir.to_path_buf()),
            ..RuntimeOptions::default()
        };
        let mut vm = Vm::with_options(options.vm_options());
        let kernel = register(&mut vm, &options);
        (vm, kernel)
    }

    #[test]
    fn test_methods_are_defined() {
        let dir = tempfile::tempdir().unwrap();
        let (vm, _) = setup(dir.path());
        for name in ["__load_source", "__load_bytecode_file", "__load_shared_file", "load", "require"] {
            assert!(vm.has_method(name), "{} missing", name);
        }
    }

    #[test]
    fn test_load_source_method() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vm, _) = setup(dir.path());
        let value = vm.eval("__load_source(\"let greeting = \\\"hi\\\";\")").unwrap();
        assert_eq!(value, Value::Bool(true));
        assert_eq!(vm.global("greeting"), Some(Value::from("hi")));
    }

    #[test]
    fn test_load_source_syntax_error_is_catchable() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vm, _) = setup(dir.path());
        let source = r#"
            try { __load_source("let = ;", "broken.rill") }
            catch (e) { class_name(e) + ": " + message(e) }
        "#;
        assert_eq!(
            vm.eval(source).unwrap(),
            Value::from("LoadError: can't load file -- broken.rill")
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_string_arguments_required() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vm, _) = setup(dir.path());
        let err = vm.eval("__load_source(42)").unwrap_err();
        assert_eq!(err.exception().unwrap().class, ClassId::TYPE_ERROR);
        let err = vm.eval("require()").unwrap_err();
        assert_eq!(err.exception().unwrap().class, ClassId::ARGUMENT_ERROR);
    }

    #[test]
    fn test_require_records_feature() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.rill"), "let count = 1;").unwrap();
        let (mut vm, kernel) = setup(dir.path());

        assert_eq!(vm.eval("require(\"lib\")").unwrap(), Value::Bool(true));
        let real = dir.path().join("lib.rill").canonicalize().unwrap();
        assert!(kernel.features().is_loaded(&real));
        assert!(!kernel.features().is_loading(&real));
    }

    #[test]
    fn test_failed_require_is_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.rill"), "raise \"nope\";").unwrap();
        let (mut vm, kernel) = setup(dir.path());

        assert!(vm.eval("require(\"bad\")").is_err());
        assert_eq!(kernel.features().loaded().count(), 0);
        let real = dir.path().join("bad.rill").canonicalize().unwrap();
        assert!(!kernel.features().is_loading(&real));
        assert!(vm.eval("require(\"bad\")").is_err());
    }

    #[test]
    fn test_missing_feature() {
        let dir = tempfile::tempdir().unwrap();
        let (mut vm, _) = setup(dir.path());
        let err = vm.eval("load(\"ghost\")").unwrap_err();
        let exception = err.exception().unwrap();
        assert_eq!(exception.class, ClassId::LOAD_ERROR);
        assert_eq!(exception.message, "cannot load such file -- ghost");
    }
}
