//! Structural binding equality.
//!
//! Two bindings are equal when they have the same kind, the same qualified
//! name, the same modifier bits under [`ACC_EQUALITY_MASK`] and, recursively,
//! equal components. The two sides may come from different environments.
//!
//! Type variables can reach themselves through their bounds. A comparison
//! keeps the pairs of type variables it is already comparing and treats a
//! pair met again as equal, so every comparison terminates.
//!
//! The default rule (plain and raw references) only checks that the *other*
//! side is not a generic declaration. A plain reference therefore equals a
//! parameterization of the same name while the reverse comparison fails.

use std::collections::HashSet;

use super::{
    Binding, BindingRef, DeclaringElement, Environment, FieldBinding, MethodBinding, TypeBinding, TypeId,
    VariableBinding,
};
use crate::common::consts::{ACC_EQUALITY_MASK, ACC_JUST_FLAG};

/// Are these two bindings equal?
pub fn bindings_equal(left: BindingRef<'_>, right: BindingRef<'_>) -> bool {
    Comparator::new(left.env, right.env).binding(left.binding, right.binding)
}

/// Are these two binding arrays equal, pairwise and in order?
pub fn binding_arrays_equal(left: &[BindingRef<'_>], right: &[BindingRef<'_>]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(l, r)| bindings_equal(*l, *r))
}

pub fn types_equal(left_env: &Environment, left: TypeId, right_env: &Environment, right: TypeId) -> bool {
    Comparator::new(left_env, right_env).type_binding(Some(left), Some(right))
}

pub fn type_arrays_equal(left_env: &Environment, left: &[TypeId], right_env: &Environment, right: &[TypeId]) -> bool {
    Comparator::new(left_env, right_env).types(left, right)
}

/// One top-level comparison. The visited set lives and dies with it.
struct Comparator<'l, 'r> {
    left: &'l Environment,
    right: &'r Environment,
    visited: HashSet<(TypeId, TypeId)>,
}

impl<'l, 'r> Comparator<'l, 'r> {
    fn new(left: &'l Environment, right: &'r Environment) -> Self {
        Self {
            left,
            right,
            visited: HashSet::new(),
        }
    }

    fn binding(&mut self, left: &Binding, right: &Binding) -> bool {
        match (left, right) {
            (Binding::Type(l), Binding::Type(r)) => self.type_binding(Some(*l), Some(*r)),
            (Binding::Method(l), Binding::Method(r)) => match (self.left.method(*l), self.right.method(*r)) {
                (Some(l), Some(r)) => self.method(l, r),
                _ => false,
            },
            (Binding::Field(l), Binding::Field(r)) => match (self.left.field(*l), self.right.field(*r)) {
                (Some(l), Some(r)) => self.field(l, r),
                _ => false,
            },
            (Binding::Variable(l), Binding::Variable(r)) => {
                match (self.left.variable(*l), self.right.variable(*r)) {
                    (Some(l), Some(r)) => self.variable(l, r),
                    _ => false,
                }
            }
            (Binding::Package(l), Binding::Package(r)) => l.compound_name == r.compound_name,
            (Binding::Import(l), Binding::Import(r)) => {
                l.is_static == r.is_static && l.on_demand == r.on_demand && l.compound_name == r.compound_name
            }
            _ => false,
        }
    }

    fn declaring_element(&mut self, left: Option<DeclaringElement>, right: Option<DeclaringElement>) -> bool {
        match (left, right) {
            (None, None) => true,
            (Some(DeclaringElement::Type(l)), Some(DeclaringElement::Type(r))) => self.type_binding(Some(l), Some(r)),
            (Some(DeclaringElement::Method(l)), Some(DeclaringElement::Method(r))) => {
                match (self.left.method(l), self.right.method(r)) {
                    (Some(l), Some(r)) => self.method(l, r),
                    _ => false,
                }
            }
            _ => false,
        }
    }

    fn method(&mut self, left: &MethodBinding, right: &MethodBinding) -> bool {
        left.selector == right.selector
            && self.type_binding(left.return_type, right.return_type)
            && self.types(&left.thrown_exceptions, &right.thrown_exceptions)
            && self.type_binding(left.declaring_class, right.declaring_class)
            && self.types(&left.type_variables, &right.type_variables)
            && self.types(&left.parameters, &right.parameters)
    }

    fn field(&mut self, left: &FieldBinding, right: &FieldBinding) -> bool {
        left.modifiers & ACC_JUST_FLAG == right.modifiers & ACC_JUST_FLAG
            && left.name == right.name
            && self.type_binding(left.field_type, right.field_type)
            && self.type_binding(left.declaring_class, right.declaring_class)
    }

    fn variable(&mut self, left: &VariableBinding, right: &VariableBinding) -> bool {
        left.modifiers & ACC_JUST_FLAG == right.modifiers & ACC_JUST_FLAG
            && left.name == right.name
            && self.type_binding(left.variable_type, right.variable_type)
            && left.id == right.id
    }

    fn types(&mut self, left: &[TypeId], right: &[TypeId]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| self.type_binding(Some(*l), Some(*r)))
    }

    fn type_binding(&mut self, left: Option<TypeId>, right: Option<TypeId>) -> bool {
        let (left_id, right_id) = match (left, right) {
            (None, None) => return true,
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };
        let (l, r) = match (self.left.type_binding(left_id), self.right.type_binding(right_id)) {
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };

        match l {
            TypeBinding::Base { id, .. } => matches!(r, TypeBinding::Base { id: other, .. } if other == id),

            TypeBinding::Array { leaf, dimensions } => match r {
                TypeBinding::Array {
                    leaf: other_leaf,
                    dimensions: other_dimensions,
                } => dimensions == other_dimensions && self.type_binding(Some(*leaf), Some(*other_leaf)),
                _ => false,
            },

            TypeBinding::Parameterized { reference, arguments, .. } => match r {
                TypeBinding::Parameterized {
                    reference: other,
                    arguments: other_arguments,
                    ..
                } => {
                    reference.compound_name == other.compound_name
                        && same_modifiers(reference.modifiers, other.modifiers)
                        && self.types(arguments, other_arguments)
                }
                _ => false,
            },

            TypeBinding::Wildcard { bound, kind } => match r {
                TypeBinding::Wildcard {
                    bound: other_bound,
                    kind: other_kind,
                } => self.type_binding(*bound, *other_bound) && kind == other_kind,
                _ => false,
            },

            TypeBinding::TypeVariable(_) | TypeBinding::Capture(_) => {
                if !self.visited.insert((left_id, right_id)) {
                    return true;
                }
                match (l, r) {
                    (TypeBinding::Capture(capture), TypeBinding::Capture(other)) => {
                        capture.position == other.position
                            && self.type_binding(capture.wildcard, other.wildcard)
                            && self.type_binding(capture.source_type, other.source_type)
                    }
                    (TypeBinding::Capture(_), _) => false,
                    (TypeBinding::TypeVariable(variable), TypeBinding::TypeVariable(other))
                    | (TypeBinding::TypeVariable(variable), TypeBinding::Capture(super::CaptureBinding { variable: other, .. })) => {
                        variable.source_name == other.source_name
                            && self.declaring_element(variable.declaring_element, other.declaring_element)
                            && self.type_binding(variable.superclass, other.superclass)
                            && self.types(&variable.super_interfaces, &other.super_interfaces)
                    }
                    _ => false,
                }
            }

            TypeBinding::Generic(reference) => match r {
                TypeBinding::Generic(other) => {
                    reference.compound_name == other.compound_name
                        && same_modifiers(reference.modifiers, other.modifiers)
                        && self.types(&reference.type_variables, &other.type_variables)
                }
                _ => false,
            },

            TypeBinding::Raw(reference) | TypeBinding::Reference(reference) => match r.reference() {
                Some(other) => {
                    reference.compound_name == other.compound_name
                        && reference.constant_pool_name == other.constant_pool_name
                        && !r.is_generic()
                        && l.is_raw() == r.is_raw()
                        && same_modifiers(reference.modifiers, other.modifiers)
                }
                None => false,
            },
        }
    }
}

fn same_modifiers(left: u32, right: u32) -> bool {
    left & ACC_EQUALITY_MASK == right & ACC_EQUALITY_MASK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::WildcardKind;
    use crate::binding::{base_type_id, CaptureBinding, ImportBinding, PackageBinding, ReferenceBinding, TypeVariableBinding};
    use crate::common::consts::{ACC_DEPRECATED, ACC_INTERFACE, ACC_PUBLIC};

    fn name(qualified: &str) -> Vec<String> {
        qualified.split('.').map(str::to_string).collect()
    }

    fn reference(qualified: &str) -> ReferenceBinding {
        ReferenceBinding::new(name(qualified), ACC_PUBLIC)
    }

    /// `class Box<T extends Comparable<T>>` built into a fresh environment.
    fn self_bounded() -> (Environment, TypeId, TypeId) {
        let mut env = Environment::new();
        let comparable = env.add_type(TypeBinding::Generic(reference("java.lang.Comparable")));
        let boxed = env.add_type(TypeBinding::Generic(reference("p.Box")));
        let variable = env.add_type(TypeBinding::TypeVariable(TypeVariableBinding {
            source_name: "T".into(),
            declaring_element: Some(DeclaringElement::Type(boxed)),
            superclass: None,
            super_interfaces: Vec::new(),
        }));
        let bound = env.add_type(TypeBinding::Parameterized {
            reference: reference("java.lang.Comparable"),
            generic: Some(comparable),
            arguments: vec![variable],
        });
        if let Some(TypeBinding::TypeVariable(v)) = env.type_binding_mut(variable) {
            v.super_interfaces.push(bound);
        }
        if let Some(TypeBinding::Generic(r)) = env.type_binding_mut(boxed) {
            r.type_variables.push(variable);
        }
        (env, boxed, variable)
    }

    #[test]
    fn test_base_types_compare_by_id() {
        let mut left = Environment::new();
        let mut right = Environment::new();
        let l = left.add_type(TypeBinding::Base { id: base_type_id::T_INT, name: "int" });
        let r = right.add_type(TypeBinding::Base { id: base_type_id::T_INT, name: "int" });
        let long = right.add_type(TypeBinding::Base { id: base_type_id::T_LONG, name: "long" });
        assert!(types_equal(&left, l, &right, r));
        assert!(!types_equal(&left, l, &right, long));
    }

    #[test]
    fn test_arrays_compare_dimensions_and_leaf() {
        let mut env = Environment::new();
        let int = env.add_type(TypeBinding::Base { id: base_type_id::T_INT, name: "int" });
        let one = env.add_type(TypeBinding::Array { leaf: int, dimensions: 1 });
        let two = env.add_type(TypeBinding::Array { leaf: int, dimensions: 2 });
        let again = env.add_type(TypeBinding::Array { leaf: int, dimensions: 2 });
        assert!(!types_equal(&env, one, &env, two));
        assert!(types_equal(&env, two, &env, again));
    }

    #[test]
    fn test_self_referential_type_variables_terminate() {
        let (left, left_box, left_t) = self_bounded();
        let (right, right_box, right_t) = self_bounded();
        assert!(types_equal(&left, left_t, &right, right_t));
        assert!(types_equal(&left, left_box, &right, right_box));
    }

    #[test]
    fn test_type_variable_names_matter() {
        let (left, _, left_t) = self_bounded();
        let (mut right, _, right_t) = self_bounded();
        if let Some(TypeBinding::TypeVariable(v)) = right.type_binding_mut(right_t) {
            v.source_name = "U".into();
        }
        assert!(!types_equal(&left, left_t, &right, right_t));
    }

    #[test]
    fn test_wildcards_compare_bound_and_kind() {
        let mut env = Environment::new();
        let number = env.add_type(TypeBinding::Reference(reference("java.lang.Number")));
        let extends = env.add_type(TypeBinding::Wildcard { bound: Some(number), kind: WildcardKind::Extends });
        let sup = env.add_type(TypeBinding::Wildcard { bound: Some(number), kind: WildcardKind::Super });
        let unbound = env.add_type(TypeBinding::Wildcard { bound: None, kind: WildcardKind::Unbound });
        assert!(types_equal(&env, extends, &env, extends));
        assert!(!types_equal(&env, extends, &env, sup));
        assert!(!types_equal(&env, extends, &env, unbound));
    }

    #[test]
    fn test_captures_compare_position() {
        let mut env = Environment::new();
        let wildcard = env.add_type(TypeBinding::Wildcard { bound: None, kind: WildcardKind::Unbound });
        let capture = |position| {
            TypeBinding::Capture(CaptureBinding {
                variable: TypeVariableBinding {
                    source_name: "capture".into(),
                    declaring_element: None,
                    superclass: None,
                    super_interfaces: Vec::new(),
                },
                position,
                wildcard: Some(wildcard),
                source_type: None,
            })
        };
        let first = env.add_type(capture(10));
        let same = env.add_type(capture(10));
        let other = env.add_type(capture(42));
        assert!(types_equal(&env, first, &env, same));
        assert!(!types_equal(&env, first, &env, other));
    }

    #[test]
    fn test_modifier_bookkeeping_bits_are_ignored() {
        let mut env = Environment::new();
        let plain = env.add_type(TypeBinding::Reference(reference("p.A")));
        let mut deprecated = reference("p.A");
        deprecated.modifiers |= ACC_DEPRECATED;
        let deprecated = env.add_type(TypeBinding::Reference(deprecated));
        let mut interface = reference("p.A");
        interface.modifiers |= ACC_INTERFACE;
        let interface = env.add_type(TypeBinding::Reference(interface));
        assert!(types_equal(&env, plain, &env, deprecated));
        assert!(!types_equal(&env, plain, &env, interface));
    }

    #[test]
    fn test_raw_and_generic_never_match() {
        let mut env = Environment::new();
        let generic = env.add_type(TypeBinding::Generic(reference("java.util.List")));
        let raw = env.add_type(TypeBinding::Raw(reference("java.util.List")));
        assert!(!types_equal(&env, raw, &env, generic));
        assert!(!types_equal(&env, generic, &env, raw));
    }

    /// Known asymmetry of the default rule: it only rejects a generic
    /// declaration on the right, so a plain reference accepts a
    /// parameterization of the same name while the reverse does not.
    #[test]
    fn test_plain_reference_against_parameterized_is_asymmetric() {
        let mut env = Environment::new();
        let string = env.add_type(TypeBinding::Reference(reference("java.lang.String")));
        let plain = env.add_type(TypeBinding::Reference(reference("java.util.List")));
        let parameterized = env.add_type(TypeBinding::Parameterized {
            reference: reference("java.util.List"),
            generic: None,
            arguments: vec![string],
        });
        assert!(types_equal(&env, plain, &env, parameterized));
        assert!(!types_equal(&env, parameterized, &env, plain));
    }

    #[test]
    fn test_missing_components_are_not_equal() {
        let mut env = Environment::new();
        let string = env.add_type(TypeBinding::Reference(reference("java.lang.String")));
        let with_type = FieldBinding {
            name: "f".into(),
            modifiers: 0,
            field_type: Some(string),
            declaring_class: None,
        };
        let without_type = FieldBinding { field_type: None, ..with_type.clone() };
        let mut comparator = Comparator::new(&env, &env);
        assert!(!comparator.field(&with_type, &without_type));
        assert!(!types_equal(&env, string, &env, TypeId(1000)));
    }

    #[test]
    fn test_methods_compare_signature_and_owner() {
        let mut env = Environment::new();
        let owner = env.add_type(TypeBinding::Reference(reference("p.A")));
        let int = env.add_type(TypeBinding::Base { id: base_type_id::T_INT, name: "int" });
        let method = MethodBinding {
            selector: "m".into(),
            modifiers: ACC_PUBLIC,
            return_type: Some(int),
            parameters: vec![int],
            thrown_exceptions: Vec::new(),
            declaring_class: Some(owner),
            type_variables: Vec::new(),
        };
        let first = env.add_method(method.clone());
        let same = env.add_method(method.clone());
        let other = env.add_method(MethodBinding { parameters: vec![int, int], ..method });
        let (a, b, c) = (Binding::Method(first), Binding::Method(same), Binding::Method(other));
        assert!(bindings_equal(env.bind(&a), env.bind(&b)));
        assert!(!bindings_equal(env.bind(&a), env.bind(&c)));
    }

    #[test]
    fn test_packages_imports_and_arrays() {
        let env = Environment::new();
        let package = Binding::Package(PackageBinding { compound_name: name("p.q") });
        let import = Binding::Import(ImportBinding {
            compound_name: name("java.util"),
            is_static: false,
            on_demand: true,
        });
        let static_import = Binding::Import(ImportBinding {
            compound_name: name("java.util"),
            is_static: true,
            on_demand: true,
        });
        assert!(bindings_equal(env.bind(&package), env.bind(&package)));
        assert!(!bindings_equal(env.bind(&import), env.bind(&static_import)));
        assert!(!bindings_equal(env.bind(&package), env.bind(&import)));
        assert!(binding_arrays_equal(
            &[env.bind(&package), env.bind(&import)],
            &[env.bind(&package), env.bind(&import)]
        ));
        assert!(!binding_arrays_equal(&[env.bind(&package)], &[]));
    }
}
