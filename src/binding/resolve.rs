//! Builds the bindings of one parsed compilation unit.
//!
//! Resolution is local to the unit: names of types declared in the unit (and
//! type variables in scope) resolve to their declarations, every other name
//! becomes a plain reference carrying the name as written.

use std::collections::HashMap;

use log::debug;

use super::{
    base_type_id, DeclaringElement, Environment, FieldBinding, MethodBinding, ReferenceBinding, TypeBinding, TypeId,
    TypeVariableBinding,
};
use crate::ast::{
    CompilationUnit, MethodDeclaration, TypeArgument, TypeDeclaration, TypeKind, TypeParameter, TypeReference,
};
use crate::common::consts::ACC_INTERFACE;

/// Resolve every declaration of `unit` into a fresh environment.
pub fn resolve_unit(unit: &CompilationUnit) -> Environment {
    let mut resolver = Resolver::new(unit);
    let package = resolver.package.clone();
    let mut declared = Vec::new();
    for ty in &unit.types {
        resolver.declare(ty, &package, &mut declared);
    }
    let mut declared = declared.into_iter();
    for ty in &unit.types {
        resolver.complete(ty, &mut declared);
    }
    debug!(
        "resolved {} type bindings for {} top-level types",
        resolver.env.type_count(),
        unit.types.len()
    );
    resolver.env
}

struct Resolver {
    env: Environment,
    package: Vec<String>,
    /// Declared types by simple name and by qualified name.
    declared: HashMap<String, TypeId>,
    /// Single-type imports by simple name.
    imported: HashMap<String, Vec<String>>,
    base: HashMap<&'static str, TypeId>,
    /// Type variables in scope, innermost last.
    scopes: Vec<Vec<(String, TypeId)>>,
}

impl Resolver {
    fn new(unit: &CompilationUnit) -> Self {
        let package = unit
            .package
            .as_ref()
            .map(|p| p.name.tokens.clone())
            .unwrap_or_default();
        let imported = unit
            .imports
            .iter()
            .filter(|import| !import.is_static && !import.on_demand)
            .map(|import| (import.name.last().to_string(), import.name.tokens.clone()))
            .collect();
        Self {
            env: Environment::new(),
            package,
            declared: HashMap::new(),
            imported,
            base: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    /// First pass: one binding per declared type, depth first.
    fn declare(&mut self, ty: &TypeDeclaration, outer: &[String], out: &mut Vec<TypeId>) {
        let mut compound_name = outer.to_vec();
        compound_name.push(ty.name.clone());
        let mut modifiers = ty.modifiers;
        if ty.kind == TypeKind::Interface {
            modifiers |= ACC_INTERFACE;
        }
        let mut reference = ReferenceBinding::new(compound_name.clone(), modifiers);
        if compound_name.len() > self.package.len() + 1 {
            let mut binary = self.package.clone();
            binary.push(compound_name[self.package.len()..].join("$"));
            reference.constant_pool_name = binary.join("/");
        }
        let binding = if ty.type_parameters.is_empty() {
            TypeBinding::Reference(reference)
        } else {
            TypeBinding::Generic(reference)
        };
        let id = self.env.add_type(binding);
        self.declared.insert(ty.name.clone(), id);
        self.declared.insert(compound_name.join("."), id);
        out.push(id);
        for inner in ty.member_types() {
            self.declare(inner, &compound_name, out);
        }
    }

    /// Second pass, in the same order: supertypes, type variables and members.
    fn complete(&mut self, ty: &TypeDeclaration, declared: &mut impl Iterator<Item = TypeId>) {
        let id = match declared.next() {
            Some(id) => id,
            None => return,
        };
        let type_variables = self.open_scope(&ty.type_parameters, DeclaringElement::Type(id));
        let superclass = ty.superclass.as_ref().map(|s| self.resolve_type(s));
        let super_interfaces: Vec<TypeId> = ty.super_interfaces.iter().map(|s| self.resolve_type(s)).collect();
        if let Some(binding) = self.env.type_binding_mut(id) {
            if let TypeBinding::Generic(reference) | TypeBinding::Reference(reference) = binding {
                reference.superclass = superclass;
                reference.super_interfaces = super_interfaces;
                reference.type_variables = type_variables;
            }
        }

        for field in ty.fields() {
            let field_type = Some(self.resolve_type(&field.type_ref));
            self.env.add_field(FieldBinding {
                name: field.name.clone(),
                modifiers: field.modifiers,
                field_type,
                declaring_class: Some(id),
            });
        }
        for method in ty.methods() {
            self.method(method, id);
        }
        for inner in ty.member_types() {
            self.complete(inner, declared);
        }
        self.scopes.pop();
    }

    fn method(&mut self, method: &MethodDeclaration, declaring_class: TypeId) {
        let id = self.env.add_method(MethodBinding {
            selector: method.selector.clone(),
            modifiers: method.modifiers,
            return_type: None,
            parameters: Vec::new(),
            thrown_exceptions: Vec::new(),
            declaring_class: Some(declaring_class),
            type_variables: Vec::new(),
        });
        let type_variables = self.open_scope(&method.type_parameters, DeclaringElement::Method(id));
        let return_type = method.return_type.as_ref().map(|t| self.resolve_type(t));
        let parameters = method
            .arguments
            .iter()
            .map(|argument| {
                let leaf = self.resolve_type(&argument.type_ref);
                if argument.is_varargs {
                    self.array_of(leaf, 1)
                } else {
                    leaf
                }
            })
            .collect();
        let thrown_exceptions = method.thrown_exceptions.iter().map(|t| self.resolve_type(t)).collect();
        self.scopes.pop();

        let binding = MethodBinding {
            selector: method.selector.clone(),
            modifiers: method.modifiers,
            return_type,
            parameters,
            thrown_exceptions,
            declaring_class: Some(declaring_class),
            type_variables,
        };
        // methods are referenced by id from their type variables
        if let Some(slot) = self.env.method_mut(id) {
            *slot = binding;
        }
    }

    /// Push a scope with one variable per parameter, then fill in bounds so
    /// they may mention any variable of the same scope.
    fn open_scope(&mut self, parameters: &[TypeParameter], declaring: DeclaringElement) -> Vec<TypeId> {
        let ids: Vec<(String, TypeId)> = parameters
            .iter()
            .map(|parameter| {
                let id = self.env.add_type(TypeBinding::TypeVariable(TypeVariableBinding {
                    source_name: parameter.name.clone(),
                    declaring_element: Some(declaring),
                    superclass: None,
                    super_interfaces: Vec::new(),
                }));
                (parameter.name.clone(), id)
            })
            .collect();
        self.scopes.push(ids.clone());

        for (parameter, (_, id)) in parameters.iter().zip(&ids) {
            let mut bounds = parameter.bounds.iter().map(|b| self.resolve_type(b));
            let first = bounds.next();
            let rest: Vec<TypeId> = bounds.collect();
            let first_is_interface = first
                .and_then(|b| self.env.type_binding(b))
                .and_then(TypeBinding::reference)
                .map_or(false, |r| r.modifiers & ACC_INTERFACE != 0);
            if let Some(TypeBinding::TypeVariable(variable)) = self.env.type_binding_mut(*id) {
                match first {
                    Some(first) if first_is_interface => {
                        variable.super_interfaces.push(first);
                    }
                    Some(first) => variable.superclass = Some(first),
                    None => {}
                }
                variable.super_interfaces.extend(rest);
            }
        }
        ids.into_iter().map(|(_, id)| id).collect()
    }

    fn type_variable(&self, name: &str) -> Option<TypeId> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    fn resolve_type(&mut self, type_ref: &TypeReference) -> TypeId {
        let leaf = self.resolve_leaf(type_ref);
        if type_ref.dims > 0 {
            self.array_of(leaf, type_ref.dims)
        } else {
            leaf
        }
    }

    fn array_of(&mut self, leaf: TypeId, dimensions: usize) -> TypeId {
        match self.env.type_binding(leaf) {
            Some(TypeBinding::Array {
                leaf: inner,
                dimensions: existing,
            }) => {
                let (inner, existing) = (*inner, *existing);
                self.env.add_type(TypeBinding::Array {
                    leaf: inner,
                    dimensions: existing + dimensions,
                })
            }
            _ => self.env.add_type(TypeBinding::Array { leaf, dimensions }),
        }
    }

    fn resolve_leaf(&mut self, type_ref: &TypeReference) -> TypeId {
        let name = type_ref.type_name();
        if type_ref.primitive {
            let simple = type_ref.simple_name();
            let (id, static_name) = match base_type_id::of(simple) {
                Some(id) => (id, base_name(simple)),
                None => (0, "<unknown>"),
            };
            if let Some(existing) = self.base.get(static_name) {
                return *existing;
            }
            let binding = self.env.add_type(TypeBinding::Base { id, name: static_name });
            self.base.insert(static_name, binding);
            return binding;
        }

        if name.len() == 1 && !type_ref.is_parameterized() {
            if let Some(variable) = self.type_variable(&name[0]) {
                return variable;
            }
        }

        let arguments: Vec<&TypeArgument> = type_ref
            .segments
            .last()
            .map(|s| s.arguments.iter().collect())
            .unwrap_or_default();
        let declared = self.declared.get(&name.join(".")).copied();
        let reference = match declared.and_then(|id| self.env.type_binding(id)).and_then(TypeBinding::reference) {
            Some(reference) => reference.clone(),
            None => match self.imported.get(&name.join(".")) {
                Some(qualified) => ReferenceBinding::new(qualified.clone(), 0),
                None => ReferenceBinding::new(name, 0),
            },
        };
        let is_generic = declared
            .and_then(|id| self.env.type_binding(id))
            .map_or(false, TypeBinding::is_generic);

        if !arguments.is_empty() {
            let arguments = arguments.into_iter().map(|a| self.resolve_argument(a)).collect();
            return self.env.add_type(TypeBinding::Parameterized {
                reference,
                generic: declared,
                arguments,
            });
        }
        match declared {
            Some(id) if !is_generic => id,
            Some(_) => self.env.add_type(TypeBinding::Raw(reference)),
            None => self.env.add_type(TypeBinding::Reference(reference)),
        }
    }

    fn resolve_argument(&mut self, argument: &TypeArgument) -> TypeId {
        match argument {
            TypeArgument::Type(type_ref) => self.resolve_type(type_ref),
            TypeArgument::Wildcard(wildcard) => {
                let bound = wildcard.bound.as_ref().map(|b| self.resolve_type(b));
                self.env.add_type(TypeBinding::Wildcard {
                    bound,
                    kind: wildcard.kind,
                })
            }
        }
    }
}

fn base_name(name: &str) -> &'static str {
    match name {
        "char" => "char",
        "byte" => "byte",
        "short" => "short",
        "boolean" => "boolean",
        "void" => "void",
        "long" => "long",
        "double" => "double",
        "float" => "float",
        "int" => "int",
        _ => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{types_equal, Binding};
    use crate::common::config::Config;
    use crate::factory::Dialect;
    use crate::parser::parse;

    fn resolve(source: &str) -> Environment {
        let outcome = parse(source, Config::default(), Dialect::Disabled).expect("parse");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        resolve_unit(&outcome.unit)
    }

    const SOURCE: &str = r#"
package p;

import java.util.List;

public class Box<T extends Comparable<T>> {
    private List<T> items;
    int[] counts;

    public <U> U first(List<? extends U> from, int index) throws java.io.IOException {
        return null;
    }

    static class Inner { }
}
"#;

    #[test]
    fn test_declared_types_and_members() {
        let env = resolve(SOURCE);
        let boxed = env.declared_type("p.Box").expect("Box");
        assert!(env.type_binding(boxed).map_or(false, TypeBinding::is_generic));
        let inner = env.declared_type("p.Box.Inner").expect("Inner");
        assert_eq!(
            env.type_binding(inner).and_then(TypeBinding::reference).map(|r| r.constant_pool_name.as_str()),
            Some("p/Box$Inner")
        );
        let items = env.field_named(boxed, "items").and_then(|f| env.field(f)).expect("items");
        assert_eq!(items.field_type.map(|t| env.describe_type(t)), Some("java.util.List<T>".to_string()));
        let counts = env.field_named(boxed, "counts").and_then(|f| env.field(f)).expect("counts");
        assert_eq!(counts.field_type.map(|t| env.describe_type(t)), Some("int[]".to_string()));
        let first = env.method_named(boxed, "first").and_then(|m| env.method(m)).expect("first");
        assert_eq!(first.parameters.len(), 2);
        assert_eq!(first.type_variables.len(), 1);
        assert_eq!(first.thrown_exceptions.len(), 1);
    }

    #[test]
    fn test_nested_binary_names_keep_one_package_prefix() {
        let env = resolve("package a.b; class Outer { static class Mid { static class Leaf { } } }");
        let name = |compound: &str| {
            env.declared_type(compound)
                .and_then(|id| env.type_binding(id))
                .and_then(TypeBinding::reference)
                .map(|r| r.constant_pool_name.clone())
        };
        assert_eq!(name("a.b.Outer.Mid"), Some("a/b/Outer$Mid".to_string()));
        assert_eq!(name("a.b.Outer.Mid.Leaf"), Some("a/b/Outer$Mid$Leaf".to_string()));

        let env = resolve("class Top { class Nested { } }");
        let nested = env.declared_type("Top.Nested").expect("Nested");
        assert_eq!(
            env.type_binding(nested).and_then(TypeBinding::reference).map(|r| r.constant_pool_name.as_str()),
            Some("Top$Nested")
        );
    }

    #[test]
    fn test_two_snapshots_compare_equal() {
        let left = resolve(SOURCE);
        let right = resolve(SOURCE);
        let l = left.declared_type("p.Box").expect("left");
        let r = right.declared_type("p.Box").expect("right");
        assert!(types_equal(&left, l, &right, r));

        let lm = Binding::Method(left.method_named(l, "first").expect("left method"));
        let rm = Binding::Method(right.method_named(r, "first").expect("right method"));
        assert!(crate::binding::bindings_equal(left.bind(&lm), right.bind(&rm)));
    }

    #[test]
    fn test_changed_signature_is_detected() {
        let left = resolve(SOURCE);
        let right = resolve(&SOURCE.replace("int index", "long index"));
        let l = left.declared_type("p.Box").expect("left");
        let r = right.declared_type("p.Box").expect("right");
        let lm = Binding::Method(left.method_named(l, "first").expect("left method"));
        let rm = Binding::Method(right.method_named(r, "first").expect("right method"));
        assert!(!crate::binding::bindings_equal(left.bind(&lm), right.bind(&rm)));
    }
}
