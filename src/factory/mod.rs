//! Declaration factories
//!
//! The parser never builds a dialect node itself. Every aspect, pointcut,
//! advice, declare statement and inter-type member comes out of a
//! [`DeclarationFactory`], which the parser receives through a [`Dialect`]
//! value when it is constructed. Factories are looked up by name in a
//! process-wide registry; an unknown name degrades to [`Dialect::Disabled`].

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::ast::{
    Annotation, Argument, AstNode, DialectNode, Expression, MessageSend, MethodDeclaration, MethodKind,
    TypeDeclaration, TypeKind, TypeReference,
};
use crate::common::config::Config;
use crate::parser::diagnostics::ProblemReporter;
use crate::parser::span::Span;

mod unavailable;

pub use unavailable::{UnavailableFactory, UnavailablePayload};

/// Node construction and mutation hooks for one language dialect.
///
/// Implementations must be free of side effects beyond the nodes they are
/// handed: one factory instance is shared by every parser in the process.
pub trait DeclarationFactory: fmt::Debug + Send + Sync {
    /// Registry name of the dialect.
    fn name(&self) -> &'static str;

    /// Re-create a `proceed(..)` call.
    fn create_proceed(&self, send: MessageSend) -> MessageSend;

    fn create_aspect(&self) -> TypeDeclaration;
    fn set_privileged(&self, aspect: &mut TypeDeclaration, privileged: bool);
    fn set_per_clause_from(&self, aspect: &mut TypeDeclaration, tokens: &DialectNode, reporter: &mut ProblemReporter);
    fn set_dominates_pattern_from(
        &self,
        aspect: &mut TypeDeclaration,
        tokens: &DialectNode,
        reporter: &mut ProblemReporter,
    );

    /// Fold a run of pseudo tokens into one node.
    fn create_pseudo_tokens_from(&self, tokens: Vec<DialectNode>) -> DialectNode;

    fn create_method_declaration(&self) -> MethodDeclaration;
    fn create_constructor_declaration(&self) -> MethodDeclaration;
    fn create_pointcut_declaration(&self) -> MethodDeclaration;
    fn create_around_advice_declaration(&self) -> MethodDeclaration;
    fn create_after_advice_declaration(&self) -> MethodDeclaration;
    fn create_before_advice_declaration(&self) -> MethodDeclaration;

    /// Re-interpret a pseudo token run as a structured designator.
    fn create_pointcut_designator(&self, tokens: DialectNode, reporter: &mut ProblemReporter) -> DialectNode;
    fn set_pointcut_designator_on_advice(&self, advice: &mut MethodDeclaration, designator: DialectNode);
    fn set_pointcut_designator_on_pointcut(&self, pointcut: &mut MethodDeclaration, designator: DialectNode);
    fn set_extra_argument(&self, advice: &mut MethodDeclaration, argument: Argument);
    fn is_after_advice(&self, method: &MethodDeclaration) -> bool;
    fn set_after_throwing_advice_kind(&self, advice: &mut MethodDeclaration);
    fn set_after_returning_advice_kind(&self, advice: &mut MethodDeclaration);

    fn create_declare_declaration(&self, tokens: DialectNode, reporter: &mut ProblemReporter) -> MethodDeclaration;
    fn create_declare_annotation_declaration(
        &self,
        tokens: DialectNode,
        annotation: Annotation,
        kind: char,
        reporter: &mut ProblemReporter,
    ) -> MethodDeclaration;

    fn create_inter_type_field_declaration(&self, on_type: TypeReference) -> MethodDeclaration;
    fn create_inter_type_method_declaration(&self) -> MethodDeclaration;
    fn create_inter_type_constructor_declaration(&self) -> MethodDeclaration;
    fn set_selector(&self, declaration: &mut MethodDeclaration, selector: &str);
    fn set_declared_modifiers(&self, declaration: &mut MethodDeclaration, modifiers: u32);
    fn set_initialization(&self, declaration: &mut MethodDeclaration, initialization: Expression);
    fn set_on_type(&self, declaration: &mut MethodDeclaration, on_type: TypeReference);

    fn create_pseudo_token(&self, value: &str, is_identifier: bool, span: Span) -> DialectNode;
    fn create_if_pseudo_token(&self, condition: Expression, span: Span) -> DialectNode;
    fn set_literal_kind(&self, token: &mut DialectNode, kind: &str);

    /// Whether error recovery may guess-repair around this node.
    fn should_try_to_recover(&self, node: &AstNode) -> bool;

    fn create_intertype_member_class_declaration(&self) -> TypeDeclaration;
    fn set_on_type_of_member_class(&self, declaration: &mut TypeDeclaration, on_type: TypeReference);
}

/// Plain base-language method, the shape every factory starts from.
pub fn base_method(kind: MethodKind) -> MethodDeclaration {
    MethodDeclaration::new(kind)
}

/// Plain base-language class.
pub fn base_class() -> TypeDeclaration {
    TypeDeclaration::new(TypeKind::Class)
}

/// The dialect a parser is built with.
#[derive(Debug, Clone, Default)]
pub enum Dialect {
    /// Dialect tokens are lexed, dialect productions report "feature unavailable".
    #[default]
    Disabled,
    Enabled(Arc<dyn DeclarationFactory>),
}

impl Dialect {
    pub fn enabled(factory: Arc<dyn DeclarationFactory>) -> Self {
        Dialect::Enabled(factory)
    }

    /// Resolve the dialect a configuration names.
    pub fn resolve(config: &Config) -> Self {
        match config.dialect.as_deref() {
            None => Dialect::Disabled,
            Some(name) => Self::by_name(name),
        }
    }

    /// Look a dialect up in the registry; unknown names disable the dialect.
    pub fn by_name(name: &str) -> Self {
        match lookup(name) {
            Some(factory) => Dialect::Enabled(factory),
            None => {
                log::warn!("no declaration factory registered as {:?}, dialect support disabled", name);
                Dialect::Disabled
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Dialect::Enabled(_))
    }

    pub fn factory(&self) -> Option<&Arc<dyn DeclarationFactory>> {
        match self {
            Dialect::Enabled(factory) => Some(factory),
            Dialect::Disabled => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Enabled(factory) => factory.name(),
            Dialect::Disabled => "none",
        }
    }
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn DeclarationFactory>>>> = Lazy::new(|| {
    let mut factories: HashMap<String, Arc<dyn DeclarationFactory>> = HashMap::new();
    let aspectj: Arc<dyn DeclarationFactory> = Arc::new(crate::aspect::AspectFactory::new());
    factories.insert(aspectj.name().to_string(), aspectj);
    RwLock::new(factories)
});

/// Register a factory under `name`. The first registration of a name wins;
/// later ones are ignored and reported as `false`.
pub fn register(name: &str, factory: Arc<dyn DeclarationFactory>) -> bool {
    let mut factories = REGISTRY.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if factories.contains_key(name) {
        log::debug!("declaration factory {:?} already registered, keeping the first one", name);
        return false;
    }
    factories.insert(name.to_string(), factory);
    true
}

pub fn lookup(name: &str) -> Option<Arc<dyn DeclarationFactory>> {
    let factories = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    factories.get(name).cloned()
}

/// Names currently registered, sorted.
pub fn registered_names() -> Vec<String> {
    let factories = REGISTRY.read().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut names: Vec<String> = factories.keys().cloned().collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dialect_is_registered() {
        assert!(registered_names().contains(&"aspectj".to_string()));
        assert!(Dialect::by_name("aspectj").is_enabled());
    }

    #[test]
    fn test_unknown_dialect_degrades_to_disabled() {
        let dialect = Dialect::by_name("no-such-dialect");
        assert!(!dialect.is_enabled());
        assert_eq!(dialect.name(), "none");
    }

    #[test]
    fn test_first_registration_wins() {
        let first: Arc<dyn DeclarationFactory> = Arc::new(UnavailableFactory);
        assert!(register("registry-test", first));
        assert!(!register("registry-test", Arc::new(crate::aspect::AspectFactory::new())));
        assert_eq!(lookup("registry-test").map(|f| f.name()), Some("unavailable"));
    }

    #[test]
    fn test_resolve_follows_config() {
        assert!(Dialect::resolve(&Config::default()).is_enabled());
        assert!(!Dialect::resolve(&Config::default().without_dialect()).is_enabled());
    }
}
