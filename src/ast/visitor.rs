use super::nodes::*;

/// Read-only traversal over a compilation unit.
///
/// Every method defaults to walking its children, so an implementation only
/// overrides the nodes it cares about and calls the matching `walk_*`
/// function to keep descending.
pub trait Visitor {
    fn visit_unit(&mut self, unit: &CompilationUnit) {
        walk_unit(self, unit);
    }

    fn visit_type(&mut self, ty: &TypeDeclaration) {
        walk_type(self, ty);
    }

    fn visit_method(&mut self, method: &MethodDeclaration) {
        walk_method(self, method);
    }

    fn visit_field(&mut self, field: &FieldDeclaration) {
        if let Some(init) = &field.initializer {
            self.visit_expression(init);
        }
    }

    fn visit_initializer(&mut self, initializer: &Initializer) {
        for statement in &initializer.block.statements {
            self.visit_statement(statement);
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        walk_statement(self, statement);
    }

    fn visit_expression(&mut self, expression: &Expression) {
        walk_expression(self, expression);
    }
}

pub fn walk_unit<V: Visitor + ?Sized>(visitor: &mut V, unit: &CompilationUnit) {
    for ty in &unit.types {
        visitor.visit_type(ty);
    }
}

pub fn walk_type<V: Visitor + ?Sized>(visitor: &mut V, ty: &TypeDeclaration) {
    for member in &ty.members {
        match member {
            Member::Field(field) => visitor.visit_field(field),
            Member::Method(method) => visitor.visit_method(method),
            Member::Type(inner) => visitor.visit_type(inner),
            Member::Initializer(init) => visitor.visit_initializer(init),
        }
    }
}

pub fn walk_method<V: Visitor + ?Sized>(visitor: &mut V, method: &MethodDeclaration) {
    if let Some(statements) = &method.statements {
        for statement in statements {
            visitor.visit_statement(statement);
        }
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(visitor: &mut V, statement: &Statement) {
    match statement {
        Statement::Block(block) => {
            for s in &block.statements {
                visitor.visit_statement(s);
            }
        }
        Statement::LocalDeclaration(local) => {
            if let Some(init) = &local.initializer {
                visitor.visit_expression(init);
            }
        }
        Statement::Expression(expr, _) => visitor.visit_expression(expr),
        Statement::If {
            condition,
            then_statement,
            else_statement,
            ..
        } => {
            visitor.visit_expression(condition);
            visitor.visit_statement(then_statement);
            if let Some(else_statement) = else_statement {
                visitor.visit_statement(else_statement);
            }
        }
        Statement::While { condition, body, .. } | Statement::Do { body, condition, .. } => {
            visitor.visit_expression(condition);
            visitor.visit_statement(body);
        }
        Statement::For {
            initializations,
            condition,
            increments,
            body,
            ..
        } => {
            for init in initializations {
                visitor.visit_statement(init);
            }
            if let Some(condition) = condition {
                visitor.visit_expression(condition);
            }
            for inc in increments {
                visitor.visit_expression(inc);
            }
            visitor.visit_statement(body);
        }
        Statement::ForEach { collection, body, .. } => {
            visitor.visit_expression(collection);
            visitor.visit_statement(body);
        }
        Statement::Return { expression, .. } => {
            if let Some(expr) = expression {
                visitor.visit_expression(expr);
            }
        }
        Statement::Throw { expression, .. } => visitor.visit_expression(expression),
        Statement::Labeled { statement, .. } => visitor.visit_statement(statement),
        Statement::Try {
            block,
            catches,
            finally,
            ..
        } => {
            for s in &block.statements {
                visitor.visit_statement(s);
            }
            for catch in catches {
                for s in &catch.block.statements {
                    visitor.visit_statement(s);
                }
            }
            if let Some(finally) = finally {
                for s in &finally.statements {
                    visitor.visit_statement(s);
                }
            }
        }
        Statement::Assert { condition, message, .. } => {
            visitor.visit_expression(condition);
            if let Some(message) = message {
                visitor.visit_expression(message);
            }
        }
        Statement::ExplicitConstructorCall { arguments, .. } => {
            for arg in arguments {
                visitor.visit_expression(arg);
            }
        }
        Statement::Break { .. } | Statement::Continue { .. } | Statement::Empty(_) => {}
    }
}

pub fn walk_expression<V: Visitor + ?Sized>(visitor: &mut V, expression: &Expression) {
    match expression {
        Expression::FieldAccess { receiver, .. } => visitor.visit_expression(receiver),
        Expression::MessageSend(send) => {
            if let Some(receiver) = &send.receiver {
                visitor.visit_expression(receiver);
            }
            for arg in &send.arguments {
                visitor.visit_expression(arg);
            }
        }
        Expression::Allocation { arguments, .. } => {
            for arg in arguments {
                visitor.visit_expression(arg);
            }
        }
        Expression::Assignment { target, value, .. } => {
            visitor.visit_expression(target);
            visitor.visit_expression(value);
        }
        Expression::Binary { left, right, .. } => {
            visitor.visit_expression(left);
            visitor.visit_expression(right);
        }
        Expression::Unary { operand, .. } => visitor.visit_expression(operand),
        Expression::Conditional {
            condition,
            value_if_true,
            value_if_false,
            ..
        } => {
            visitor.visit_expression(condition);
            visitor.visit_expression(value_if_true);
            visitor.visit_expression(value_if_false);
        }
        Expression::InstanceOf { expression, .. } => visitor.visit_expression(expression),
        Expression::Parenthesized(inner, _) => visitor.visit_expression(inner),
        Expression::Annotation(annotation) => {
            for pair in &annotation.values {
                visitor.visit_expression(&pair.value);
            }
        }
        Expression::Literal(_) | Expression::Name(_) | Expression::This(_) | Expression::Super(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::factory::Dialect;
    use crate::parser::parse;

    #[derive(Default)]
    struct Counter {
        methods: usize,
        sends: Vec<String>,
    }

    impl Visitor for Counter {
        fn visit_method(&mut self, method: &MethodDeclaration) {
            self.methods += 1;
            walk_method(self, method);
        }

        fn visit_expression(&mut self, expression: &Expression) {
            if let Expression::MessageSend(send) = expression {
                self.sends.push(send.selector.clone());
            }
            walk_expression(self, expression);
        }
    }

    #[test]
    fn test_walk_reaches_nested_calls() {
        let source = "class A { void m() { if (ok()) { run(f(1)); } } class B { void n() { g(); } } }";
        let outcome = parse(source, Config::default(), Dialect::Disabled).expect("parse");
        let mut counter = Counter::default();
        counter.visit_unit(&outcome.unit);
        assert_eq!(counter.methods, 2);
        assert_eq!(counter.sends, vec!["ok", "run", "f", "g"]);
    }
}
