use super::nodes::*;
use crate::common::consts::modifiers_to_string;

/// Indented tree dump of a compilation unit, one declaration or statement
/// per line with its source range.
pub struct AstPrinter {
    indent_level: usize,
    output: String,
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl AstPrinter {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            output: String::new(),
        }
    }

    pub fn print(&mut self, unit: &CompilationUnit) -> String {
        self.output.clear();
        self.indent_level = 0;
        if let Some(package) = &unit.package {
            self.writeln(&format!("package {};", package.name));
        }
        for import in &unit.imports {
            self.writeln(&import.to_string());
        }
        for ty in &unit.types {
            self.print_type(ty);
        }
        self.output.clone()
    }

    fn indent(&mut self) {
        self.indent_level += 2;
    }

    fn dedent(&mut self) {
        if self.indent_level >= 2 {
            self.indent_level -= 2;
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push(' ');
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn modifiers_prefix(modifiers: u32, annotations: &[Annotation]) -> String {
        let mut parts: Vec<String> = annotations.iter().map(|a| a.to_string()).collect();
        let mods = modifiers_to_string(modifiers);
        if !mods.is_empty() {
            parts.push(mods);
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("{} ", parts.join(" "))
        }
    }

    fn print_type(&mut self, ty: &TypeDeclaration) {
        let keyword = match (&ty.dialect, ty.kind) {
            (Some(payload), _) => payload.describe(),
            (None, TypeKind::Class) => "class".to_string(),
            (None, TypeKind::Interface) => "interface".to_string(),
        };
        let mut header = format!("{}{} {}", Self::modifiers_prefix(ty.modifiers, &ty.annotations), keyword, ty.name);
        if !ty.type_parameters.is_empty() {
            let params: Vec<String> = ty.type_parameters.iter().map(|p| p.to_string()).collect();
            header.push_str(&format!("<{}>", params.join(", ")));
        }
        if let Some(superclass) = &ty.superclass {
            header.push_str(&format!(" extends {}", superclass));
        }
        if !ty.super_interfaces.is_empty() {
            let names: Vec<String> = ty.super_interfaces.iter().map(|i| i.to_string()).collect();
            header.push_str(&format!(" implements {}", names.join(", ")));
        }
        header.push_str(&format!(" [{}..={}]", ty.declaration_source_start, ty.declaration_source_end));
        if ty.is_open() {
            header.push_str(" (incomplete)");
        }
        self.writeln(&header);
        self.indent();
        for member in &ty.members {
            match member {
                Member::Field(field) => self.print_field(field),
                Member::Method(method) => self.print_method(method),
                Member::Type(inner) => self.print_type(inner),
                Member::Initializer(init) => {
                    let label = if init.modifiers & crate::common::consts::ACC_STATIC != 0 {
                        "static initializer"
                    } else {
                        "initializer"
                    };
                    self.writeln(&format!("{} [{}..={}]", label, init.declaration_source_start, init.declaration_source_end));
                    self.print_block(&init.block.statements);
                }
            }
        }
        self.dedent();
    }

    fn print_field(&mut self, field: &FieldDeclaration) {
        let mut line = format!(
            "{}{} {}",
            Self::modifiers_prefix(field.modifiers, &field.annotations),
            field.type_ref,
            field.name
        );
        if let Some(init) = &field.initializer {
            line.push_str(&format!(" = {}", init));
        }
        line.push_str(&format!(" [{}..={}]", field.declaration_source_start, field.declaration_source_end));
        self.writeln(&line);
    }

    fn print_method(&mut self, method: &MethodDeclaration) {
        let mut line = Self::modifiers_prefix(method.modifiers, &method.annotations);
        if let Some(payload) = &method.dialect {
            line.push_str(&format!("{} ", payload.describe()));
        }
        if let Some(ret) = &method.return_type {
            if method.kind != MethodKind::Constructor {
                line.push_str(&format!("{} ", ret));
            }
        }
        let args: Vec<String> = method.arguments.iter().map(|a| a.to_string()).collect();
        line.push_str(&format!("{}({})", method.selector, args.join(", ")));
        if !method.thrown_exceptions.is_empty() {
            let thrown: Vec<String> = method.thrown_exceptions.iter().map(|t| t.to_string()).collect();
            line.push_str(&format!(" throws {}", thrown.join(", ")));
        }
        line.push_str(&format!(" [{}..={}]", method.declaration_source_start, method.declaration_source_end));
        if method.is_open() && method.statements.is_none() && method.body_start.is_some() {
            line.push_str(" (incomplete)");
        }
        self.writeln(&line);
        if let Some(statements) = &method.statements {
            self.print_block(statements);
        }
    }

    fn print_block(&mut self, statements: &[Statement]) {
        self.indent();
        for statement in statements {
            self.print_statement(statement);
        }
        self.dedent();
    }

    fn print_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => {
                self.writeln("{");
                self.print_block(&block.statements);
                self.writeln("}");
            }
            Statement::LocalDeclaration(local) => {
                let mut line = format!("{}{} {}", Self::modifiers_prefix(local.modifiers, &local.annotations), local.type_ref, local.name);
                if let Some(init) = &local.initializer {
                    line.push_str(&format!(" = {}", init));
                }
                line.push(';');
                self.writeln(&line);
            }
            Statement::Expression(expr, _) => self.writeln(&format!("{};", expr)),
            Statement::If {
                condition,
                then_statement,
                else_statement,
                ..
            } => {
                self.writeln(&format!("if ({})", condition));
                self.print_nested(then_statement);
                if let Some(else_statement) = else_statement {
                    self.writeln("else");
                    self.print_nested(else_statement);
                }
            }
            Statement::While { condition, body, .. } => {
                self.writeln(&format!("while ({})", condition));
                self.print_nested(body);
            }
            Statement::Do { body, condition, .. } => {
                self.writeln("do");
                self.print_nested(body);
                self.writeln(&format!("while ({});", condition));
            }
            Statement::For { condition, body, .. } => {
                let condition = condition.as_ref().map(|c| c.to_string()).unwrap_or_default();
                self.writeln(&format!("for (...; {}; ...)", condition));
                self.print_nested(body);
            }
            Statement::ForEach {
                variable,
                collection,
                body,
                ..
            } => {
                self.writeln(&format!("for ({} {} : {})", variable.type_ref, variable.name, collection));
                self.print_nested(body);
            }
            Statement::Return { expression, .. } => match expression {
                Some(expr) => self.writeln(&format!("return {};", expr)),
                None => self.writeln("return;"),
            },
            Statement::Throw { expression, .. } => self.writeln(&format!("throw {};", expression)),
            Statement::Break { label, .. } => match label {
                Some(label) => self.writeln(&format!("break {};", label)),
                None => self.writeln("break;"),
            },
            Statement::Continue { label, .. } => match label {
                Some(label) => self.writeln(&format!("continue {};", label)),
                None => self.writeln("continue;"),
            },
            Statement::Labeled { label, statement, .. } => {
                self.writeln(&format!("{}:", label));
                self.print_nested(statement);
            }
            Statement::Try {
                block,
                catches,
                finally,
                ..
            } => {
                self.writeln("try");
                self.print_block(&block.statements);
                for catch in catches {
                    self.writeln(&format!("catch ({})", catch.argument));
                    self.print_block(&catch.block.statements);
                }
                if let Some(finally) = finally {
                    self.writeln("finally");
                    self.print_block(&finally.statements);
                }
            }
            Statement::Assert { condition, message, .. } => match message {
                Some(message) => self.writeln(&format!("assert {} : {};", condition, message)),
                None => self.writeln(&format!("assert {};", condition)),
            },
            Statement::ExplicitConstructorCall { is_super, arguments, .. } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                let keyword = if *is_super { "super" } else { "this" };
                self.writeln(&format!("{}({});", keyword, args.join(", ")));
            }
            Statement::Empty(_) => self.writeln(";"),
        }
    }

    fn print_nested(&mut self, statement: &Statement) {
        self.indent();
        self.print_statement(statement);
        self.dedent();
    }
}
