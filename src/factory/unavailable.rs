use crate::ast::{
    Annotation, Argument, AstNode, DialectNode, DialectPayload, Expression, MessageSend, MethodDeclaration,
    MethodKind, TypeDeclaration, TypeReference,
};
use crate::parser::diagnostics::ProblemReporter;
use crate::parser::span::Span;

use super::{base_class, base_method, DeclarationFactory};

/// Marks a node built while no dialect was wired in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailablePayload {
    pub construct: &'static str,
}

impl DialectPayload for UnavailablePayload {
    fn kind(&self) -> &'static str {
        "unavailable"
    }

    fn describe(&self) -> String {
        format!("<{} unavailable>", self.construct)
    }

    crate::dialect_payload_plumbing!();
}

/// Factory used when dialect support is disabled.
///
/// It never fails: every dialect construct comes back as a placeholder node
/// tagged with [`UnavailablePayload`], and the parser reports the feature as
/// unavailable once per unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableFactory;

impl UnavailableFactory {
    fn placeholder_method(construct: &'static str) -> MethodDeclaration {
        let mut method = base_method(MethodKind::Dialect);
        method.dialect = Some(Box::new(UnavailablePayload { construct }));
        method
    }

    fn placeholder_node(construct: &'static str, span: Span) -> DialectNode {
        DialectNode::new(span, Box::new(UnavailablePayload { construct }))
    }
}

impl DeclarationFactory for UnavailableFactory {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn create_proceed(&self, send: MessageSend) -> MessageSend {
        send
    }

    fn create_aspect(&self) -> TypeDeclaration {
        let mut ty = base_class();
        ty.dialect = Some(Box::new(UnavailablePayload { construct: "aspect" }));
        ty
    }

    fn set_privileged(&self, _aspect: &mut TypeDeclaration, _privileged: bool) {}

    fn set_per_clause_from(&self, _aspect: &mut TypeDeclaration, _tokens: &DialectNode, _reporter: &mut ProblemReporter) {}

    fn set_dominates_pattern_from(
        &self,
        _aspect: &mut TypeDeclaration,
        _tokens: &DialectNode,
        _reporter: &mut ProblemReporter,
    ) {
    }

    fn create_pseudo_tokens_from(&self, tokens: Vec<DialectNode>) -> DialectNode {
        let span = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => first.span().to(last.span()),
            _ => Span::default(),
        };
        Self::placeholder_node("pseudo tokens", span)
    }

    fn create_method_declaration(&self) -> MethodDeclaration {
        base_method(MethodKind::Method)
    }

    fn create_constructor_declaration(&self) -> MethodDeclaration {
        base_method(MethodKind::Constructor)
    }

    fn create_pointcut_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("pointcut")
    }

    fn create_around_advice_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("around advice")
    }

    fn create_after_advice_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("after advice")
    }

    fn create_before_advice_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("before advice")
    }

    fn create_pointcut_designator(&self, tokens: DialectNode, _reporter: &mut ProblemReporter) -> DialectNode {
        Self::placeholder_node("pointcut designator", tokens.span())
    }

    fn set_pointcut_designator_on_advice(&self, _advice: &mut MethodDeclaration, _designator: DialectNode) {}

    fn set_pointcut_designator_on_pointcut(&self, _pointcut: &mut MethodDeclaration, _designator: DialectNode) {}

    fn set_extra_argument(&self, _advice: &mut MethodDeclaration, _argument: Argument) {}

    fn is_after_advice(&self, method: &MethodDeclaration) -> bool {
        method
            .payload::<UnavailablePayload>()
            .map_or(false, |p| p.construct == "after advice")
    }

    fn set_after_throwing_advice_kind(&self, _advice: &mut MethodDeclaration) {}

    fn set_after_returning_advice_kind(&self, _advice: &mut MethodDeclaration) {}

    fn create_declare_declaration(&self, _tokens: DialectNode, _reporter: &mut ProblemReporter) -> MethodDeclaration {
        Self::placeholder_method("declare")
    }

    fn create_declare_annotation_declaration(
        &self,
        _tokens: DialectNode,
        _annotation: Annotation,
        _kind: char,
        _reporter: &mut ProblemReporter,
    ) -> MethodDeclaration {
        Self::placeholder_method("declare annotation")
    }

    fn create_inter_type_field_declaration(&self, _on_type: TypeReference) -> MethodDeclaration {
        Self::placeholder_method("inter-type field")
    }

    fn create_inter_type_method_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("inter-type method")
    }

    fn create_inter_type_constructor_declaration(&self) -> MethodDeclaration {
        Self::placeholder_method("inter-type constructor")
    }

    fn set_selector(&self, declaration: &mut MethodDeclaration, selector: &str) {
        declaration.selector = selector.to_string();
    }

    fn set_declared_modifiers(&self, _declaration: &mut MethodDeclaration, _modifiers: u32) {}

    fn set_initialization(&self, _declaration: &mut MethodDeclaration, _initialization: Expression) {}

    fn set_on_type(&self, _declaration: &mut MethodDeclaration, _on_type: TypeReference) {}

    fn create_pseudo_token(&self, _value: &str, _is_identifier: bool, span: Span) -> DialectNode {
        Self::placeholder_node("pseudo token", span)
    }

    fn create_if_pseudo_token(&self, _condition: Expression, span: Span) -> DialectNode {
        Self::placeholder_node("pseudo token", span)
    }

    fn set_literal_kind(&self, _token: &mut DialectNode, _kind: &str) {}

    fn should_try_to_recover(&self, _node: &AstNode) -> bool {
        true
    }

    fn create_intertype_member_class_declaration(&self) -> TypeDeclaration {
        let mut ty = base_class();
        ty.dialect = Some(Box::new(UnavailablePayload {
            construct: "inter-type member class",
        }));
        ty
    }

    fn set_on_type_of_member_class(&self, _declaration: &mut TypeDeclaration, _on_type: TypeReference) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_are_tagged() {
        let factory = UnavailableFactory;
        let advice = factory.create_before_advice_declaration();
        assert_eq!(advice.kind, MethodKind::Dialect);
        assert_eq!(advice.dialect_kind(), Some("unavailable"));
        assert!(factory.is_after_advice(&factory.create_after_advice_declaration()));
        assert_eq!(factory.create_aspect().dialect_kind(), Some("unavailable"));
    }

    #[test]
    fn test_always_recovers() {
        let factory = UnavailableFactory;
        let node = AstNode::Method(factory.create_pointcut_declaration());
        assert!(factory.should_try_to_recover(&node));
    }
}
