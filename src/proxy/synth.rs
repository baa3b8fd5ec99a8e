//! Function proxy synthesizer.

use crate::model::{Expr, Function, Member, Stmt, TypeExpr, ValueGroup, ValueKeyword};
use crate::runtime::UNASSIGNED_CALL_ID;

/// Build a function with `f`'s signature whose body calls `hook` (when given)
/// and then forwards every argument to `alias.F`.
///
/// ```go
/// func Join(sep string, parts ...string) string {
///     __invokeHandler("Join", -1)
///     return __strs.Join(sep, parts...)
/// }
/// ```
pub fn forward(f: &Function, alias: &str, hook: Option<&str>) -> Function {
    let mut body = Vec::with_capacity(2);

    if let Some(hook) = hook {
        body.push(Stmt::Expr(Expr::Call {
            func: Box::new(Expr::Ident(hook.to_string())),
            type_args: Vec::new(),
            args: vec![Expr::Str(f.name.clone()), Expr::Int(UNASSIGNED_CALL_ID)],
            spread: false,
        }));
    }

    let call = Expr::Call {
        func: Box::new(Expr::selector(alias, f.name.clone())),
        type_args: f.type_param_names().into_iter().map(TypeExpr::named).collect(),
        args: f
            .params
            .iter()
            .flat_map(|group| group.names.iter())
            .map(|name| Expr::Ident(name.clone()))
            .collect(),
        spread: f.is_variadic(),
    };

    if f.results.is_empty() {
        body.push(Stmt::Expr(call));
    } else {
        body.push(Stmt::Return(vec![call]));
    }

    Function {
        name: f.name.clone(),
        exported: f.exported,
        doc: f.doc.clone(),
        type_params: f.type_params.clone(),
        params: f.params.clone(),
        results: f.results.clone(),
        body: Some(body),
    }
}

/// `var F = alias.F`
pub fn bind(f: &Function, alias: &str) -> ValueGroup {
    ValueGroup {
        keyword: ValueKeyword::Var,
        doc: f.doc.clone(),
        members: vec![Member::new(
            f.name.clone(),
            None,
            Some(Expr::selector(alias, f.name.clone())),
        )],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ParamGroup, TypeParam};

    fn join() -> Function {
        Function {
            name: "Join".to_string(),
            exported: true,
            doc: Some("// Join concatenates parts.".to_string()),
            type_params: vec![],
            params: vec![
                ParamGroup::named(["sep"], TypeExpr::named("string")),
                ParamGroup::named(["parts"], TypeExpr::Variadic(Box::new(TypeExpr::named("string")))),
            ],
            results: vec![ParamGroup::unnamed(TypeExpr::named("string"))],
            body: None,
        }
    }

    fn forwarded_call(f: &Function) -> &Expr {
        match f.body.as_deref() {
            Some([.., Stmt::Return(values)]) => &values[0],
            Some([.., Stmt::Expr(call)]) => call,
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_forward_keeps_signature_and_spreads_variadic() {
        let original = join();
        let out = forward(&original, "__strs", Some("__invokeHandler"));

        assert_eq!(out.params, original.params);
        assert_eq!(out.results, original.results);
        assert_eq!(out.doc, original.doc);

        let body = out.body.as_ref().unwrap();
        assert_eq!(
            body[0],
            Stmt::Expr(Expr::Call {
                func: Box::new(Expr::Ident("__invokeHandler".into())),
                type_args: vec![],
                args: vec![Expr::Str("Join".into()), Expr::Int(-1)],
                spread: false,
            })
        );
        assert_eq!(
            body[1],
            Stmt::Return(vec![Expr::Call {
                func: Box::new(Expr::selector("__strs", "Join")),
                type_args: vec![],
                args: vec![Expr::Ident("sep".into()), Expr::Ident("parts".into())],
                spread: true,
            }])
        );
    }

    #[test]
    fn test_forward_expands_grouped_parameters() {
        let f = Function {
            name: "Move".to_string(),
            exported: true,
            doc: None,
            type_params: vec![],
            params: vec![ParamGroup::named(["dx", "dy"], TypeExpr::named("float64"))],
            results: vec![],
            body: None,
        };
        let out = forward(&f, "__geom", Some("__invokeHandler"));
        let body = out.body.as_ref().unwrap();
        assert_eq!(body.len(), 2);
        match &body[1] {
            Stmt::Expr(Expr::Call { args, spread, .. }) => {
                assert_eq!(args, &vec![Expr::Ident("dx".into()), Expr::Ident("dy".into())]);
                assert!(!spread);
            }
            other => panic!("expected bare call, got {:?}", other),
        }
    }

    #[test]
    fn test_forward_instantiates_generics() {
        let f = Function {
            name: "Map".to_string(),
            exported: true,
            doc: None,
            type_params: vec![TypeParam {
                names: vec!["T".into(), "U".into()],
                constraint: TypeExpr::named("any"),
            }],
            params: vec![ParamGroup::named(["xs"], TypeExpr::Slice(Box::new(TypeExpr::named("T"))))],
            results: vec![ParamGroup::unnamed(TypeExpr::Slice(Box::new(TypeExpr::named("U"))))],
            body: None,
        };
        let out = forward(&f, "__seq", None);
        assert_eq!(out.body.as_ref().unwrap().len(), 1);
        match forwarded_call(&out) {
            Expr::Call { type_args, .. } => {
                assert_eq!(type_args, &vec![TypeExpr::named("T"), TypeExpr::named("U")]);
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_bind() {
        let group = bind(&join(), "__strs");
        assert_eq!(group.keyword, ValueKeyword::Var);
        assert_eq!(
            group.members,
            vec![Member::new("Join", None, Some(Expr::selector("__strs", "Join")))]
        );
    }
}
