//! # Code Generation Module
//!
//! Emits textual LLVM IR from a typed AIR module. The generator trusts the
//! invariants the middle-end guarantees: every expression carries a resolved
//! type, every reference carries a valid ID, every field access a valid
//! index. It performs no checking of its own.
//!
//! Value mapping: `int` is `i64`, `float` is `double`, `bool` is `i1`,
//! `string` is a NUL-terminated `ptr` provided by the runtime, structs are
//! first-class aggregates (built with `insertvalue`, read with
//! `extractvalue`) and arrays are pointers into stack storage. Lvalues
//! (assignment targets) are `getelementptr` chains rooted at a variable's
//! `alloca`.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::air::{BinOpKind, Expr, ExprKind, Function, Module, Stmt, StmtKind, StructDecl, UnOpKind};
use crate::ty::{ty_ids, TyId, TyTable};

pub struct CodeGenerator<'a> {
    ty_table: &'a TyTable,
    structs: HashMap<TyId, StructDecl>,
    globals: String,
    body: String,
    next_tmp: usize,
    next_label: usize,
    next_str: usize,
    terminated: bool,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(ty_table: &'a TyTable) -> Self {
        Self {
            ty_table,
            structs: HashMap::new(),
            globals: String::new(),
            body: String::new(),
            next_tmp: 0,
            next_label: 0,
            next_str: 0,
            terminated: false,
        }
    }

    pub fn generate(mut self, module: &Module) -> String {
        for decl in &module.structs {
            self.structs.insert(decl.ty_id, decl.clone());
        }

        let mut header = String::new();
        let _ = writeln!(header, "; module {}", module.name);
        for import in &module.imports {
            let _ = writeln!(header, "; import {import}");
        }
        header.push('\n');

        for decl in &module.structs {
            let fields = decl
                .fields
                .iter()
                .map(|field| self.llvm_ty(field.ty))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(header, "%struct.{} = type {{ {fields} }}", decl.name);
        }
        if !module.structs.is_empty() {
            header.push('\n');
        }

        for function in &module.functions {
            if function.is_extern {
                self.gen_declare(function);
            } else {
                self.gen_function(function);
            }
        }

        let mut out = header;
        if !self.globals.is_empty() {
            out.push_str(&self.globals);
            out.push('\n');
        }
        out.push_str(&self.body);
        out
    }

    fn gen_declare(&mut self, function: &Function) {
        let params = function
            .params
            .iter()
            .map(|param| self.llvm_ty(param.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(
            self.body,
            "declare {} @{}({params})",
            self.llvm_ty(function.return_ty),
            function.name
        );
    }

    fn gen_function(&mut self, function: &Function) {
        self.next_tmp = 0;
        self.next_label = 0;
        self.terminated = false;

        let params = function
            .params
            .iter()
            .enumerate()
            .map(|(index, param)| format!("{} %arg{index}", self.llvm_ty(param.ty)))
            .collect::<Vec<_>>()
            .join(", ");

        let _ = writeln!(
            self.body,
            "define {} @{}({params}) {{",
            self.llvm_ty(function.return_ty),
            function.name
        );
        let _ = writeln!(self.body, "entry:");

        for (index, param) in function.params.iter().enumerate() {
            let ty = self.llvm_ty(param.ty);
            self.inst(format!("%v{} = alloca {ty}", param.var_id));
            self.inst(format!("store {ty} %arg{index}, ptr %v{}", param.var_id));
        }

        for statement in &function.body {
            self.gen_stmt(statement);
        }

        if !self.terminated {
            if function.return_ty == ty_ids::VOID {
                self.inst("ret void".to_string());
            } else {
                self.inst("unreachable".to_string());
            }
        }

        let _ = writeln!(self.body, "}}\n");
    }

    // ----- statements -----------------------------------------------------

    fn gen_stmt(&mut self, statement: &Stmt) {
        if self.terminated {
            // dead code after a terminator still needs a block of its own
            let label = self.fresh_label("cont");
            let _ = writeln!(self.body, "{label}:");
            self.terminated = false;
        }

        match &statement.kind {
            StmtKind::VarDecl {
                var_id,
                ty,
                initializer,
                ..
            } => {
                let llvm_ty = self.llvm_ty(*ty);
                self.inst(format!("%v{var_id} = alloca {llvm_ty}"));
                if let Some(initializer) = initializer {
                    let value = self.gen_expr(initializer);
                    self.inst(format!("store {llvm_ty} {value}, ptr %v{var_id}"));
                }
            }
            StmtKind::Assignment { var_id, value, .. } => {
                let llvm_ty = self.llvm_ty(value.ty);
                let value = self.gen_expr(value);
                self.inst(format!("store {llvm_ty} {value}, ptr %v{var_id}"));
            }
            StmtKind::FieldAssignment {
                object,
                field_index,
                value,
                ..
            } => {
                let value_ty = self.llvm_ty(value.ty);
                let value = self.gen_expr(value);
                if let Some(base) = self.gen_lvalue(object) {
                    let struct_ty = self.llvm_ty(object.ty);
                    let ptr = self.tmp();
                    self.inst(format!(
                        "{ptr} = getelementptr inbounds {struct_ty}, ptr {base}, i32 0, i32 {field_index}"
                    ));
                    self.inst(format!("store {value_ty} {value}, ptr {ptr}"));
                }
            }
            StmtKind::Return { value } => {
                match value {
                    Some(value) if value.ty != ty_ids::VOID => {
                        let ty = self.llvm_ty(value.ty);
                        let value = self.gen_expr(value);
                        self.inst(format!("ret {ty} {value}"));
                    }
                    _ => self.inst("ret void".to_string()),
                }
                self.terminated = true;
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let id = self.next_label;
                self.next_label += 1;
                let then_label = format!("then.{id}");
                let else_label = format!("else.{id}");
                let merge_label = format!("merge.{id}");

                let condition = self.gen_expr(condition);
                let target_else = if else_branch.is_empty() {
                    &merge_label
                } else {
                    &else_label
                };
                self.inst(format!(
                    "br i1 {condition}, label %{then_label}, label %{target_else}"
                ));

                let _ = writeln!(self.body, "{then_label}:");
                self.terminated = false;
                for statement in then_branch {
                    self.gen_stmt(statement);
                }
                if !self.terminated {
                    self.inst(format!("br label %{merge_label}"));
                }

                if !else_branch.is_empty() {
                    let _ = writeln!(self.body, "{else_label}:");
                    self.terminated = false;
                    for statement in else_branch {
                        self.gen_stmt(statement);
                    }
                    if !self.terminated {
                        self.inst(format!("br label %{merge_label}"));
                    }
                }

                let _ = writeln!(self.body, "{merge_label}:");
                self.terminated = false;
            }
            StmtKind::ExprStmt { expression } => {
                self.gen_expr(expression);
            }
        }
    }

    // ----- expressions ----------------------------------------------------

    /// Emit the instructions computing `expression` and return the resulting
    /// LLVM value. Void-typed calls return an empty string; they only appear
    /// in expression-statement position.
    fn gen_expr(&mut self, expression: &Expr) -> String {
        match &expression.kind {
            ExprKind::IntegerLiteral(value) => value.to_string(),
            ExprKind::FloatLiteral(value) => float_literal(*value),
            ExprKind::BoolLiteral(value) => (if *value { "true" } else { "false" }).to_string(),
            ExprKind::StringLiteral(value) => self.string_constant(value),
            ExprKind::VarRef { var_id, .. } => {
                let ty = self.llvm_ty(expression.ty);
                let tmp = self.tmp();
                self.inst(format!("{tmp} = load {ty}, ptr %v{var_id}"));
                tmp
            }
            ExprKind::Binary { op, left, right } => self.gen_binary(*op, left, right),
            ExprKind::Unary { op, operand } => {
                let value = self.gen_expr(operand);
                let tmp = self.tmp();
                match op {
                    UnOpKind::Neg => {
                        if operand.ty == ty_ids::FLOAT {
                            self.inst(format!("{tmp} = fneg double {value}"));
                        } else {
                            self.inst(format!("{tmp} = sub i64 0, {value}"));
                        }
                    }
                    UnOpKind::Not => {
                        self.inst(format!("{tmp} = xor i1 {value}, true"));
                    }
                }
                tmp
            }
            ExprKind::Call {
                name, arguments, ..
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| {
                        let ty = self.llvm_ty(argument.ty);
                        let value = self.gen_expr(argument);
                        format!("{ty} {value}")
                    })
                    .collect::<Vec<_>>()
                    .join(", ");

                if expression.ty == ty_ids::VOID {
                    self.inst(format!("call void @{name}({arguments})"));
                    String::new()
                } else {
                    let ty = self.llvm_ty(expression.ty);
                    let tmp = self.tmp();
                    self.inst(format!("{tmp} = call {ty} @{name}({arguments})"));
                    tmp
                }
            }
            ExprKind::StructInstantiation { field_values, .. } => {
                let struct_ty = self.llvm_ty(expression.ty);
                let mut current = "undef".to_string();
                for (index, value) in field_values.iter().enumerate() {
                    let value_ty = self.llvm_ty(value.ty);
                    let value = self.gen_expr(value);
                    let tmp = self.tmp();
                    self.inst(format!(
                        "{tmp} = insertvalue {struct_ty} {current}, {value_ty} {value}, {index}"
                    ));
                    current = tmp;
                }
                current
            }
            ExprKind::FieldAccess {
                object,
                field_index,
                ..
            } => {
                let struct_ty = self.llvm_ty(object.ty);
                let object = self.gen_expr(object);
                let tmp = self.tmp();
                self.inst(format!(
                    "{tmp} = extractvalue {struct_ty} {object}, {field_index}"
                ));
                tmp
            }
            ExprKind::ArrayLiteral { elements } => {
                let element_ty = self
                    .ty_table
                    .array_element_type(expression.ty)
                    .unwrap_or(ty_ids::INTEGER);
                let element_llvm = self.llvm_ty(element_ty);
                let storage = self.tmp();
                self.inst(format!(
                    "{storage} = alloca {element_llvm}, i64 {}",
                    elements.len().max(1)
                ));
                for (index, element) in elements.iter().enumerate() {
                    let value = self.gen_expr(element);
                    let slot = self.tmp();
                    self.inst(format!(
                        "{slot} = getelementptr {element_llvm}, ptr {storage}, i64 {index}"
                    ));
                    self.inst(format!("store {element_llvm} {value}, ptr {slot}"));
                }
                storage
            }
            ExprKind::ArrayAccess { array, index } => {
                let element_llvm = self.llvm_ty(expression.ty);
                let array_value = self.gen_expr(array);
                let index_value = self.gen_expr(index);
                let slot = self.tmp();
                self.inst(format!(
                    "{slot} = getelementptr {element_llvm}, ptr {array_value}, i64 {index_value}"
                ));
                let tmp = self.tmp();
                self.inst(format!("{tmp} = load {element_llvm}, ptr {slot}"));
                tmp
            }
        }
    }

    fn gen_binary(&mut self, op: BinOpKind, left: &Expr, right: &Expr) -> String {
        let operand_ty = left.ty;
        let left_value = self.gen_expr(left);
        let right_value = self.gen_expr(right);
        let tmp = self.tmp();

        let is_float = operand_ty == ty_ids::FLOAT;
        let llvm_operand_ty = self.llvm_ty(operand_ty);

        let instruction = match op {
            BinOpKind::Add => {
                if is_float {
                    format!("fadd double {left_value}, {right_value}")
                } else {
                    format!("add i64 {left_value}, {right_value}")
                }
            }
            BinOpKind::Sub => {
                if is_float {
                    format!("fsub double {left_value}, {right_value}")
                } else {
                    format!("sub i64 {left_value}, {right_value}")
                }
            }
            BinOpKind::Mul => {
                if is_float {
                    format!("fmul double {left_value}, {right_value}")
                } else {
                    format!("mul i64 {left_value}, {right_value}")
                }
            }
            BinOpKind::Div => {
                if is_float {
                    format!("fdiv double {left_value}, {right_value}")
                } else {
                    // signed integer division
                    format!("sdiv i64 {left_value}, {right_value}")
                }
            }
            BinOpKind::Mod => {
                if is_float {
                    format!("frem double {left_value}, {right_value}")
                } else {
                    format!("srem i64 {left_value}, {right_value}")
                }
            }
            BinOpKind::Eq
            | BinOpKind::Ne
            | BinOpKind::Lt
            | BinOpKind::Le
            | BinOpKind::Gt
            | BinOpKind::Ge => {
                if is_float {
                    let cmp = match op {
                        BinOpKind::Eq => "oeq",
                        BinOpKind::Ne => "one",
                        BinOpKind::Lt => "olt",
                        BinOpKind::Le => "ole",
                        BinOpKind::Gt => "ogt",
                        _ => "oge",
                    };
                    format!("fcmp {cmp} double {left_value}, {right_value}")
                } else {
                    let cmp = match op {
                        BinOpKind::Eq => "eq",
                        BinOpKind::Ne => "ne",
                        BinOpKind::Lt => "slt",
                        BinOpKind::Le => "sle",
                        BinOpKind::Gt => "sgt",
                        _ => "sge",
                    };
                    format!("icmp {cmp} {llvm_operand_ty} {left_value}, {right_value}")
                }
            }
            BinOpKind::And => format!("and i1 {left_value}, {right_value}"),
            BinOpKind::Or => format!("or i1 {left_value}, {right_value}"),
        };

        self.inst(format!("{tmp} = {instruction}"));
        tmp
    }

    /// Address of an assignable expression: a variable slot or a
    /// `getelementptr` chain into one. Returns `None` for targets without
    /// storage (a field of a call result, for instance).
    fn gen_lvalue(&mut self, expression: &Expr) -> Option<String> {
        match &expression.kind {
            ExprKind::VarRef { var_id, .. } => Some(format!("%v{var_id}")),
            ExprKind::FieldAccess {
                object,
                field_index,
                ..
            } => {
                let base = self.gen_lvalue(object)?;
                let struct_ty = self.llvm_ty(object.ty);
                let ptr = self.tmp();
                self.inst(format!(
                    "{ptr} = getelementptr inbounds {struct_ty}, ptr {base}, i32 0, i32 {field_index}"
                ));
                Some(ptr)
            }
            ExprKind::ArrayAccess { array, index } => {
                let element_llvm = self.llvm_ty(expression.ty);
                let array_value = self.gen_expr(array);
                let index_value = self.gen_expr(index);
                let slot = self.tmp();
                self.inst(format!(
                    "{slot} = getelementptr {element_llvm}, ptr {array_value}, i64 {index_value}"
                ));
                Some(slot)
            }
            _ => None,
        }
    }

    // ----- helpers --------------------------------------------------------

    fn llvm_ty(&self, ty: TyId) -> String {
        match ty {
            ty_ids::INTEGER => "i64".to_string(),
            ty_ids::FLOAT => "double".to_string(),
            ty_ids::BOOL => "i1".to_string(),
            ty_ids::STRING => "ptr".to_string(),
            ty_ids::VOID => "void".to_string(),
            other => {
                if self.ty_table.is_array(other) {
                    "ptr".to_string()
                } else if let Some(decl) = self.structs.get(&other) {
                    format!("%struct.{}", decl.name)
                } else {
                    // error type or unknown: never reached from a clean module
                    "i64".to_string()
                }
            }
        }
    }

    fn string_constant(&mut self, value: &str) -> String {
        let name = format!("@.str.{}", self.next_str);
        self.next_str += 1;

        let bytes = value.as_bytes();
        let mut encoded = String::new();
        for byte in bytes {
            match byte {
                b' '..=b'~' if *byte != b'"' && *byte != b'\\' => encoded.push(*byte as char),
                _ => {
                    let _ = write!(encoded, "\\{byte:02X}");
                }
            }
        }
        encoded.push_str("\\00");

        let _ = writeln!(
            self.globals,
            "{name} = private unnamed_addr constant [{} x i8] c\"{encoded}\"",
            bytes.len() + 1
        );
        name
    }

    fn tmp(&mut self) -> String {
        let tmp = format!("%t{}", self.next_tmp);
        self.next_tmp += 1;
        tmp
    }

    fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{prefix}.{}", self.next_label);
        self.next_label += 1;
        label
    }

    fn inst(&mut self, instruction: String) {
        let _ = writeln!(self.body, "  {instruction}");
    }
}

fn float_literal(value: f64) -> String {
    // hex form is always exactly representable in the IR
    format!("0x{:016X}", value.to_bits())
}
