//! Code generation from AST to bytecode
//!
//! Every statement list compiles to code that leaves exactly one value on
//! the stack: the value of its last statement, or `nil`. The unit's
//! implicit `RETURN` hands that value back to the caller.

use super::bytecode::{DebugInfo, Opcode, Unit};
use super::error::{CompileError, CompileResult};
use super::unit_builder::UnitBuilder;
use super::CompileContext;
use crate::parser::ast::*;

/// Main code generator
pub struct CodeGenerator<'a> {
    context: &'a CompileContext,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(context: &'a CompileContext) -> Self {
        Self { context }
    }

    fn debug_info(&self) -> Option<DebugInfo> {
        self.context
            .debug_info
            .then(|| DebugInfo::new(self.context.filename.clone()))
    }

    /// Compile a complete program into its top-level unit
    pub fn compile_program(&mut self, program: &Program) -> CompileResult<Unit> {
        let mut unit = UnitBuilder::program(self.debug_info());
        self.compile_statements(&mut unit, &program.statements)?;
        Ok(unit.build())
    }

    /// Compile a function declaration into a child unit
    fn compile_function(&mut self, decl: &FunctionDecl) -> CompileResult<Unit> {
        let mut unit = UnitBuilder::function(&decl.name, &decl.params, self.debug_info())?;
        unit.mark_line(decl.span.line);
        self.compile_statements(&mut unit, &decl.body.statements)?;
        Ok(unit.build())
    }

    /// Compile a statement list, leaving the value of the last statement
    fn compile_statements(&mut self, unit: &mut UnitBuilder, stmts: &[Statement]) -> CompileResult<()> {
        match stmts.split_last() {
            None => {
                unit.emit(Opcode::LoadNil);
                Ok(())
            }
            Some((last, init)) => {
                for stmt in init {
                    self.compile_stmt(unit, stmt, false)?;
                }
                self.compile_stmt(unit, last, true)
            }
        }
    }

    fn compile_block(&mut self, unit: &mut UnitBuilder, block: &Block, want_value: bool) -> CompileResult<()> {
        if want_value {
            return self.compile_statements(unit, &block.statements);
        }
        for stmt in &block.statements {
            self.compile_stmt(unit, stmt, false)?;
        }
        Ok(())
    }

    /// Compile a statement; when `want_value` is set it leaves one value on the stack
    fn compile_stmt(&mut self, unit: &mut UnitBuilder, stmt: &Statement, want_value: bool) -> CompileResult<()> {
        unit.mark_line(stmt.span().line);
        match stmt {
            Statement::Let { name, value, .. } => {
                self.compile_expr(unit, value)?;
                let target = if unit.in_function() {
                    Target::Local(unit.add_local(name)?)
                } else {
                    Target::Global(unit.add_symbol(name)?)
                };
                self.store(unit, target, want_value);
            }
            Statement::Assign { name, value, .. } => {
                self.compile_expr(unit, value)?;
                let target = self.resolve(unit, name)?;
                self.store(unit, target, want_value);
            }
            Statement::Function(decl) => {
                let child = self.compile_function(decl)?;
                let symbol = unit.add_symbol(&decl.name)?;
                let index = unit.add_child(child)?;
                unit.writer.emit_define_method(symbol, index);
                if want_value {
                    unit.emit(Opcode::LoadNil);
                }
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.compile_expr(unit, condition)?;
                let else_jump = unit.writer.emit_jump(Opcode::JmpIfFalse);
                self.compile_block(unit, then_branch, want_value)?;
                let end_jump = unit.writer.emit_jump(Opcode::Jmp);
                unit.writer.patch_jump(else_jump);
                match else_branch {
                    Some(block) => self.compile_block(unit, block, want_value)?,
                    None if want_value => unit.emit(Opcode::LoadNil),
                    None => {}
                }
                unit.writer.patch_jump(end_jump);
            }
            Statement::While { condition, body, .. } => {
                let loop_start = unit.writer.offset();
                self.compile_expr(unit, condition)?;
                let exit_jump = unit.writer.emit_jump(Opcode::JmpIfFalse);
                self.compile_block(unit, body, false)?;
                unit.writer.emit_loop(loop_start);
                unit.writer.patch_jump(exit_jump);
                if want_value {
                    unit.emit(Opcode::LoadNil);
                }
            }
            Statement::Return { value, .. } => {
                match value {
                    Some(value) => self.compile_expr(unit, value)?,
                    None => unit.emit(Opcode::LoadNil),
                }
                unit.emit(Opcode::Return);
                if want_value {
                    unit.emit(Opcode::LoadNil);
                }
            }
            Statement::Raise { value, .. } => {
                self.compile_expr(unit, value)?;
                unit.emit(Opcode::Raise);
                if want_value {
                    unit.emit(Opcode::LoadNil);
                }
            }
            Statement::Try {
                body,
                binding,
                handler,
                ..
            } => {
                let handler_jump = unit.writer.emit_jump(Opcode::PushHandler);
                self.compile_block(unit, body, want_value)?;
                unit.emit(Opcode::PopHandler);
                let end_jump = unit.writer.emit_jump(Opcode::Jmp);

                // The interpreter enters here with the exception on the stack
                unit.writer.patch_jump(handler_jump);
                let target = if unit.in_function() {
                    Target::Local(unit.add_local(binding)?)
                } else {
                    Target::Global(unit.add_symbol(binding)?)
                };
                self.store(unit, target, false);
                self.compile_block(unit, handler, want_value)?;
                unit.writer.patch_jump(end_jump);
            }
            Statement::Expression { expr, .. } => {
                self.compile_expr(unit, expr)?;
                if !want_value {
                    unit.emit(Opcode::Pop);
                }
            }
        }
        Ok(())
    }

    /// Locals shadow globals inside functions; everything else is global
    fn resolve(&mut self, unit: &mut UnitBuilder, name: &str) -> CompileResult<Target> {
        match unit.get_local(name) {
            Some(slot) => Ok(Target::Local(slot)),
            None => Ok(Target::Global(unit.add_symbol(name)?)),
        }
    }

    fn store(&mut self, unit: &mut UnitBuilder, target: Target, keep_value: bool) {
        if keep_value {
            unit.emit(Opcode::Dup);
        }
        match target {
            Target::Local(slot) => unit.emit_with_u16(Opcode::StoreLocal, slot),
            Target::Global(symbol) => unit.emit_with_u16(Opcode::StoreGlobal, symbol),
        }
    }

    /// Compile an expression, leaving its value on the stack
    fn compile_expr(&mut self, unit: &mut UnitBuilder, expr: &Expression) -> CompileResult<()> {
        match expr {
            Expression::Int(value, _) => {
                let index = unit.add_integer(*value)?;
                unit.emit_with_u16(Opcode::LoadInt, index);
            }
            Expression::Float(value, _) => {
                let index = unit.add_float(*value)?;
                unit.emit_with_u16(Opcode::LoadFloat, index);
            }
            Expression::Str(value, _) => {
                let index = unit.add_string(value)?;
                unit.emit_with_u16(Opcode::LoadStr, index);
            }
            Expression::Bool(true, _) => unit.emit(Opcode::LoadTrue),
            Expression::Bool(false, _) => unit.emit(Opcode::LoadFalse),
            Expression::Nil(_) => unit.emit(Opcode::LoadNil),
            Expression::SelfRef(_) => unit.emit(Opcode::LoadSelf),
            Expression::Identifier(name, _) => match self.resolve(unit, name)? {
                Target::Local(slot) => unit.emit_with_u16(Opcode::LoadLocal, slot),
                Target::Global(symbol) => unit.emit_with_u16(Opcode::LoadGlobal, symbol),
            },
            Expression::Call { callee, args, .. } => {
                let argc = u8::try_from(args.len()).map_err(|_| CompileError::TooManyArguments {
                    name: callee.clone(),
                })?;
                unit.emit(Opcode::LoadSelf);
                for arg in args {
                    self.compile_expr(unit, arg)?;
                }
                let symbol = unit.add_symbol(callee)?;
                unit.writer.emit_send(symbol, argc);
            }
            Expression::Unary { op, operand, .. } => {
                self.compile_expr(unit, operand)?;
                unit.emit(match op {
                    UnaryOp::Negate => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                });
            }
            Expression::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
                ..
            } => {
                // Keep the left value as the result when it decides the outcome
                self.compile_expr(unit, left)?;
                unit.emit(Opcode::Dup);
                let short_circuit = unit.writer.emit_jump(if *op == BinaryOp::And {
                    Opcode::JmpIfFalse
                } else {
                    Opcode::JmpIfTrue
                });
                unit.emit(Opcode::Pop);
                self.compile_expr(unit, right)?;
                unit.writer.patch_jump(short_circuit);
            }
            Expression::Binary { op, left, right, .. } => {
                self.compile_expr(unit, left)?;
                self.compile_expr(unit, right)?;
                unit.emit(binary_opcode(*op));
            }
        }
        Ok(())
    }
}

/// Where a variable lives
#[derive(Debug, Clone, Copy)]
enum Target {
    Local(u16),
    Global(u16),
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit operators are compiled with jumps"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::bytecode::verify_unit;
    use crate::compiler::compile;

    fn compile_ok(source: &str) -> Unit {
        compile(source, &CompileContext::new()).unwrap()
    }

    #[test]
    fn test_empty_program_returns_nil() {
        let unit = compile_ok("");
        assert_eq!(unit.code, vec![Opcode::LoadNil.to_u8(), Opcode::Return.to_u8()]);
    }

    #[test]
    fn test_top_level_let_is_global() {
        let unit = compile_ok("let x = 1;");
        assert_eq!(unit.symbols, vec!["x".to_string()]);
        assert_eq!(unit.local_count, 0);
        assert_eq!(unit.constants.integers, vec![1]);
    }

    #[test]
    fn test_function_becomes_child_unit() {
        let unit = compile_ok("fn add(a, b) { let c = a + b; c }");
        assert_eq!(unit.children.len(), 1);
        let child = &unit.children[0];
        assert_eq!(child.param_count, 2);
        assert_eq!(child.local_count, 3);
        assert!(child.symbols.is_empty());
        assert_eq!(unit.code[0], Opcode::DefineMethod.to_u8());
    }

    #[test]
    fn test_every_construct_verifies() {
        let source = r#"
            fn classify(n) {
                if n < 0 { return "negative"; } else if n == 0 { "zero" } else { "positive" }
            }
            let i = 0;
            while i < 3 { i = i + 1; }
            try { raise "boom"; } catch (e) { message(e) }
            !(i >= 3) || classify(-1.5) && nil
        "#;
        let unit = compile_ok(source);
        assert_eq!(verify_unit(&unit), Ok(()));
    }

    #[test]
    fn test_duplicate_parameter() {
        let err = compile("fn f(a, a) { a }", &CompileContext::new()).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateParameter { .. }));
    }

    #[test]
    fn test_debug_info_records_lines() {
        let context = CompileContext::new()
            .with_filename("lines.rill")
            .with_debug_info();
        let unit = compile("let a = 1;\n\nlet b = 2;", &context).unwrap();
        let info = unit.debug_info.as_ref().unwrap();
        assert_eq!(info.filename.as_deref(), Some("lines.rill"));
        assert_eq!(info.line_for(0), Some(1));
        assert_eq!(info.line_for(unit.code.len() - 1), Some(3));
    }

    #[test]
    fn test_parse_error_carries_label() {
        let context = CompileContext::new().with_filename("broken.rill");
        let err = compile("let = 1;", &context).unwrap_err();
        assert!(err.to_string().starts_with("broken.rill:1:5:"), "{}", err);
        assert_eq!(err.line(), Some(1));
    }
}
