//! Built-in kernel methods

use super::interpreter::Vm;
use super::object::ClassId;
use super::value::Value;
use super::VmResult;

/// Define the built-in methods on the kernel
pub fn register(vm: &mut Vm) {
    vm.define_kernel_method("puts", puts);
    vm.define_kernel_method("str", |vm, _, args| {
        check_arity(vm, args, 1)?;
        let text = args[0].to_string();
        Ok(vm.new_string(&text))
    });
    vm.define_kernel_method("class_name", |vm, _, args| {
        check_arity(vm, args, 1)?;
        let name = vm.class_name_of(&args[0]).to_string();
        Ok(vm.new_string(&name))
    });
    vm.define_kernel_method("message", |vm, _, args| {
        check_arity(vm, args, 1)?;
        match args[0].as_exception() {
            Some(exception) => {
                let message = exception.message.clone();
                Ok(vm.new_string(&message))
            }
            None => {
                let message = format!(
                    "no implicit conversion of {} into Exception",
                    vm.class_name_of(&args[0])
                );
                Err(vm.raise(ClassId::TYPE_ERROR, message))
            }
        }
    });
    vm.define_kernel_method("is_a", |vm, _, args| {
        check_arity(vm, args, 2)?;
        let Some(name) = args[1].as_str() else {
            return Err(vm.raise(ClassId::TYPE_ERROR, "class name must be a String"));
        };
        match vm.classes().lookup(name) {
            Some(class) => Ok(Value::Bool(vm.is_a(&args[0], class))),
            None => {
                let message = format!("uninitialized constant {}", name);
                Err(vm.raise(ClassId::NAME_ERROR, message))
            }
        }
    });
}

fn puts(vm: &mut Vm, _receiver: &Value, args: &[Value]) -> VmResult<Value> {
    let mut text = String::new();
    for arg in args {
        text.push_str(&arg.to_string());
        text.push('\n');
    }
    if args.is_empty() {
        text.push('\n');
    }
    if let Err(err) = vm.write_output(text.as_bytes()) {
        return Err(vm.raise(ClassId::SYSTEM_CALL_ERROR, format!("puts: {}", err)));
    }
    Ok(Value::Nil)
}

/// Raise `ArgumentError` unless exactly `expected` arguments were passed
pub fn check_arity(vm: &mut Vm, args: &[Value], expected: usize) -> VmResult<()> {
    check_arity_range(vm, args, expected, expected)
}

/// Raise `ArgumentError` unless `min..=max` arguments were passed
pub fn check_arity_range(vm: &mut Vm, args: &[Value], min: usize, max: usize) -> VmResult<()> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        min.to_string()
    } else {
        format!("{}..{}", min, max)
    };
    Err(vm.raise(
        ClassId::ARGUMENT_ERROR,
        format!(
            "wrong number of arguments (given {}, expected {})",
            args.len(),
            expected
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VmError;

    #[test]
    fn test_puts_writes_lines() {
        let mut vm = Vm::new();
        let output = vm.capture_output();
        vm.eval("puts(\"a\", 1, 2.0, nil); puts();").unwrap();
        assert_eq!(output.contents(), "a\n1\n2.0\n\n\n");
    }

    #[test]
    fn test_str_and_class_name() {
        let mut vm = Vm::new();
        assert_eq!(vm.eval("str(12) + \"!\"").unwrap(), Value::from("12!"));
        assert_eq!(vm.eval("class_name(1.5)").unwrap(), Value::from("Float"));
        assert_eq!(vm.eval("class_name(self)").unwrap(), Value::from("Object"));
    }

    #[test]
    fn test_is_a_follows_hierarchy() {
        let mut vm = Vm::new();
        let source = "try { missing(); } catch (e) { is_a(e, \"NameError\") && !is_a(e, \"ScriptError\") }";
        assert_eq!(vm.eval(source).unwrap(), Value::Bool(true));
        assert!(matches!(
            vm.eval("is_a(1, \"Nope\")"),
            Err(VmError::Raised(e)) if e.class == ClassId::NAME_ERROR
        ));
    }

    #[test]
    fn test_message_requires_exception() {
        let mut vm = Vm::new();
        let err = vm.eval("message(1)").unwrap_err();
        assert_eq!(err.exception().unwrap().class, ClassId::TYPE_ERROR);
    }

    #[test]
    fn test_arity_message() {
        let mut vm = Vm::new();
        let err = vm.eval("str()").unwrap_err();
        assert_eq!(
            err.exception().unwrap().message,
            "wrong number of arguments (given 0, expected 1)"
        );
    }
}
