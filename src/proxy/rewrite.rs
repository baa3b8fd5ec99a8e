//! Declaration rewriter for value and type groups.

use tracing::debug;

use super::classify::first_inaccessible;
use super::PackageScope;
use crate::model::{Expr, Member, TypeExpr, TypeGroup, TypeSpec, ValueGroup};

/// Keep the exported members of a `var`/`const` group, each bound to the
/// same name in the original package. Type annotations are dropped so the
/// type is inferred from the original symbol.
pub fn alias_values(group: &ValueGroup, alias: &str) -> Option<ValueGroup> {
    let members: Vec<Member> = group
        .members
        .iter()
        .filter(|m| m.exported)
        .map(|m| Member::new(m.name.clone(), None, Some(Expr::selector(alias, m.name.clone()))))
        .collect();

    if members.is_empty() {
        return None;
    }
    Some(ValueGroup {
        keyword: group.keyword,
        doc: group.doc.clone(),
        members,
    })
}

/// Keep the exported type names of a group as transparent aliases of the
/// originals. Generic types keep their parameter list and instantiate the
/// original with it, unless the language version predates generic aliases.
pub fn alias_types(group: &TypeGroup, alias: &str, scope: &PackageScope) -> Option<TypeGroup> {
    let specs: Vec<TypeSpec> = group
        .specs
        .iter()
        .filter(|s| s.exported && !scope.omits_type(&s.name))
        .filter(|s| {
            let usable = constraints_accessible(s, scope);
            if !usable {
                debug!(name = %s.name, "type parameter constraint uses an unexported type");
            }
            usable
        })
        .map(|s| alias_spec(s, alias))
        .collect();

    if specs.is_empty() {
        return None;
    }
    Some(TypeGroup {
        doc: group.doc.clone(),
        specs,
    })
}

fn alias_spec(spec: &TypeSpec, alias: &str) -> TypeSpec {
    let target = TypeExpr::qualified(alias, spec.name.clone());
    let definition = if spec.type_params.is_empty() {
        target
    } else {
        TypeExpr::Generic {
            base: Box::new(target),
            args: spec
                .type_params
                .iter()
                .flat_map(|tp| tp.names.iter().map(TypeExpr::named))
                .collect(),
        }
    };

    TypeSpec {
        name: spec.name.clone(),
        exported: true,
        type_params: spec.type_params.clone(),
        definition,
        is_alias: true,
    }
}

fn constraints_accessible(spec: &TypeSpec, scope: &PackageScope) -> bool {
    let own: Vec<&str> = spec
        .type_params
        .iter()
        .flat_map(|tp| tp.names.iter().map(String::as_str))
        .collect();

    spec.type_params
        .iter()
        .all(|tp| first_inaccessible(&tp.constraint, &own, scope).is_none())
}
