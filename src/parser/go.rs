//! Lowering of tree-sitter-go nodes into the owned syntax model.
//!
//! Only the shapes the proxy generator needs are modelled structurally:
//! declaration headers and type expressions. Function bodies and method
//! declarations are dropped; initializers are kept as source text.

use tree_sitter::Node;

use super::{GoParser, ParsedFile};
use crate::error::{GenerateError, Result};
use crate::model::{
    is_exported, ChanDir, Declaration, Expr, Function, Member, ParamGroup, SourceFile, TypeExpr,
    TypeGroup, TypeParam, TypeSpec, ValueGroup, ValueKeyword,
};

/// Lower a whole file.
pub(super) fn lower_file(parser: &GoParser, parsed: &ParsedFile) -> Result<SourceFile> {
    let root = parsed.tree.root_node();
    let mut package = None;
    let mut leading_comments = Vec::new();
    let mut has_package_doc = false;
    let mut pending: Vec<Node> = Vec::new();
    let mut declarations = Vec::new();

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "comment" => {
                pending.push(node);
                continue;
            }
            "package_clause" => {
                leading_comments = leading_lines(parsed, &pending);
                has_package_doc = pending
                    .last()
                    .map(|c| c.end_position().row + 1 == node.start_position().row)
                    .unwrap_or(false);
                package = named_child_of_kind(node, "package_identifier")
                    .map(|n| parsed.node_text(n).to_string());
            }
            "import_declaration" => {
                declarations.push(Declaration::Imports(parser.imports_in(parsed, node)));
            }
            "var_declaration" => {
                let doc = doc_comment(parsed, &pending, node);
                declarations.push(Declaration::Values(lower_values(
                    parsed,
                    node,
                    ValueKeyword::Var,
                    doc,
                )));
            }
            "const_declaration" => {
                let doc = doc_comment(parsed, &pending, node);
                declarations.push(Declaration::Values(lower_values(
                    parsed,
                    node,
                    ValueKeyword::Const,
                    doc,
                )));
            }
            "type_declaration" => {
                let doc = doc_comment(parsed, &pending, node);
                declarations.push(Declaration::Types(lower_types(parsed, node, doc)));
            }
            "function_declaration" => {
                let doc = doc_comment(parsed, &pending, node);
                if let Some(function) = lower_function(parsed, node, doc) {
                    declarations.push(Declaration::Function(function));
                }
            }
            _ => {}
        }
        pending.clear();
    }

    let package = package.ok_or_else(|| GenerateError::Parse {
        file: parsed.path.clone(),
        line: 1,
        column: 1,
        message: "missing package clause".to_string(),
    })?;

    Ok(SourceFile {
        path: parsed.path.clone(),
        package,
        leading_comments,
        has_package_doc,
        declarations,
    })
}

/// Comments before the package clause, with blank-line gaps kept as "".
fn leading_lines(parsed: &ParsedFile, comments: &[Node]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut prev_end: Option<usize> = None;
    for comment in comments {
        if let Some(end) = prev_end {
            if comment.start_position().row > end + 1 {
                lines.push(String::new());
            }
        }
        lines.push(parsed.node_text(*comment).to_string());
        prev_end = Some(comment.end_position().row);
    }
    lines
}

/// The run of comments ending on the line directly above `decl`.
fn doc_comment(parsed: &ParsedFile, pending: &[Node], decl: Node) -> Option<String> {
    let mut row = decl.start_position().row;
    let mut lines = Vec::new();
    for comment in pending.iter().rev() {
        if comment.end_position().row + 1 != row {
            break;
        }
        lines.push(parsed.node_text(*comment).to_string());
        row = comment.start_position().row;
    }
    if lines.is_empty() {
        return None;
    }
    lines.reverse();
    Some(lines.join("\n"))
}

fn lower_values(
    parsed: &ParsedFile,
    node: Node,
    keyword: ValueKeyword,
    doc: Option<String>,
) -> ValueGroup {
    let spec_kind = match keyword {
        ValueKeyword::Var => "var_spec",
        ValueKeyword::Const => "const_spec",
    };

    let mut specs = Vec::new();
    collect_kind(node, spec_kind, &mut specs);

    let mut members = Vec::new();
    for spec in specs {
        let names = field_texts(parsed, spec, "name");
        let ty = spec.child_by_field_name("type").map(|t| lower_type(parsed, t));
        let values: Vec<Expr> = spec
            .child_by_field_name("value")
            .map(|list| {
                let mut cursor = list.walk();
                list.named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .map(|n| Expr::Source(parsed.node_text(n).to_string()))
                    .collect()
            })
            .unwrap_or_default();
        let paired = values.len() == names.len();

        for (i, name) in names.into_iter().enumerate() {
            let value = if paired { Some(values[i].clone()) } else { None };
            members.push(Member::new(name, ty.clone(), value));
        }
    }

    ValueGroup {
        keyword,
        doc,
        members,
    }
}

fn lower_types(parsed: &ParsedFile, node: Node, doc: Option<String>) -> TypeGroup {
    let mut specs = Vec::new();
    let mut cursor = node.walk();
    for spec in node.named_children(&mut cursor) {
        let is_alias = match spec.kind() {
            "type_spec" => false,
            "type_alias" => true,
            _ => continue,
        };
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let Some(definition) = spec.child_by_field_name("type") else {
            continue;
        };
        let name = parsed.node_text(name_node).to_string();
        specs.push(TypeSpec {
            exported: is_exported(&name),
            name,
            type_params: spec
                .child_by_field_name("type_parameters")
                .map(|tp| lower_type_params(parsed, tp))
                .unwrap_or_default(),
            definition: lower_type(parsed, definition),
            is_alias,
        });
    }
    TypeGroup { doc, specs }
}

fn lower_function(parsed: &ParsedFile, node: Node, doc: Option<String>) -> Option<Function> {
    let name = parsed.node_text(node.child_by_field_name("name")?).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| lower_params(parsed, p))
        .unwrap_or_default();
    let results = node
        .child_by_field_name("result")
        .map(|r| lower_results(parsed, r))
        .unwrap_or_default();
    let type_params = node
        .child_by_field_name("type_parameters")
        .map(|tp| lower_type_params(parsed, tp))
        .unwrap_or_default();

    Some(Function {
        exported: is_exported(&name),
        name,
        doc,
        type_params,
        params,
        results,
        body: None,
    })
}

fn lower_type_params(parsed: &ParsedFile, list: Node) -> Vec<TypeParam> {
    let mut params = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        if decl.kind() != "type_parameter_declaration" {
            continue;
        }
        let Some(constraint) = decl.child_by_field_name("type") else {
            continue;
        };
        params.push(TypeParam {
            names: field_texts(parsed, decl, "name"),
            constraint: lower_type(parsed, constraint),
        });
    }
    params
}

fn lower_params(parsed: &ParsedFile, list: Node) -> Vec<ParamGroup> {
    let mut groups = Vec::new();
    let mut cursor = list.walk();
    for decl in list.named_children(&mut cursor) {
        let Some(ty) = decl.child_by_field_name("type") else {
            continue;
        };
        let ty = match decl.kind() {
            "parameter_declaration" => lower_type(parsed, ty),
            "variadic_parameter_declaration" => TypeExpr::Variadic(Box::new(lower_type(parsed, ty))),
            _ => continue,
        };
        groups.push(ParamGroup {
            names: field_texts(parsed, decl, "name"),
            ty,
        });
    }
    groups
}

/// A result is either a parameter list or a single bare type.
fn lower_results(parsed: &ParsedFile, node: Node) -> Vec<ParamGroup> {
    if node.kind() == "parameter_list" {
        lower_params(parsed, node)
    } else {
        vec![ParamGroup::unnamed(lower_type(parsed, node))]
    }
}

/// Lower a type node.
pub(super) fn lower_type(parsed: &ParsedFile, node: Node) -> TypeExpr {
    let child = |field: &str| {
        node.child_by_field_name(field)
            .map(|n| Box::new(lower_type(parsed, n)))
    };

    match node.kind() {
        "type_identifier" | "identifier" => TypeExpr::Named(parsed.node_text(node).to_string()),
        "qualified_type" => {
            match (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ) {
                (Some(pkg), Some(name)) => TypeExpr::qualified(
                    parsed.node_text(pkg),
                    parsed.node_text(name),
                ),
                _ => literal(parsed, node),
            }
        }
        "pointer_type" => match only_named_child(node) {
            Some(inner) => TypeExpr::Pointer(Box::new(lower_type(parsed, inner))),
            None => literal(parsed, node),
        },
        "slice_type" => match child("element") {
            Some(elem) => TypeExpr::Slice(elem),
            None => literal(parsed, node),
        },
        "array_type" | "implicit_length_array_type" => match child("element") {
            Some(elem) => {
                let length = node.child_by_field_name("length");
                let mut len_refs = Vec::new();
                if let Some(length) = length {
                    collect_value_refs(parsed, length, &mut len_refs);
                }
                TypeExpr::Array {
                    len: length
                        .map(|n| parsed.node_text(n).to_string())
                        .unwrap_or_else(|| "...".to_string()),
                    len_refs,
                    elem,
                }
            }
            None => literal(parsed, node),
        },
        "map_type" => match (child("key"), child("value")) {
            (Some(key), Some(value)) => TypeExpr::Map { key, value },
            _ => literal(parsed, node),
        },
        "channel_type" => match child("value") {
            Some(elem) => TypeExpr::Chan {
                dir: chan_dir(node),
                elem,
            },
            None => literal(parsed, node),
        },
        "function_type" => TypeExpr::Func {
            params: node
                .child_by_field_name("parameters")
                .map(|p| lower_params(parsed, p))
                .unwrap_or_default(),
            results: node
                .child_by_field_name("result")
                .map(|r| lower_results(parsed, r))
                .unwrap_or_default(),
        },
        "generic_type" => {
            let base = child("type");
            let args = node
                .child_by_field_name("type_arguments")
                .map(|list| {
                    let mut cursor = list.walk();
                    list.named_children(&mut cursor)
                        .map(|a| lower_type(parsed, a))
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            match base {
                Some(base) => TypeExpr::Generic { base, args },
                None => literal(parsed, node),
            }
        }
        "parenthesized_type" | "type_elem" | "type_constraint" => match only_named_child(node) {
            Some(inner) => lower_type(parsed, inner),
            None => literal(parsed, node),
        },
        _ => literal(parsed, node),
    }
}

/// Keep an unstructured type as text, remembering the type names it
/// mentions and the unexported member names it declares.
fn literal(parsed: &ParsedFile, node: Node) -> TypeExpr {
    let mut refs = Vec::new();
    let mut hidden = Vec::new();
    collect_type_refs(parsed, node, &mut refs, &mut hidden);
    TypeExpr::Literal {
        text: parsed.node_text(node).to_string(),
        refs,
        hidden,
    }
}

fn collect_type_refs(
    parsed: &ParsedFile,
    node: Node,
    refs: &mut Vec<TypeExpr>,
    hidden: &mut Vec<String>,
) {
    match node.kind() {
        "type_identifier" => {
            refs.push(TypeExpr::Named(parsed.node_text(node).to_string()));
            return;
        }
        "qualified_type" => {
            refs.push(lower_type(parsed, node));
            return;
        }
        "array_type" => {
            if let Some(length) = node.child_by_field_name("length") {
                collect_value_refs(parsed, length, refs);
            }
            if let Some(elem) = node.child_by_field_name("element") {
                collect_type_refs(parsed, elem, refs, hidden);
            }
            return;
        }
        "field_declaration" | "method_elem" => {
            let mut names = field_texts(parsed, node, "name");
            if names.is_empty() {
                names.extend(
                    node.child_by_field_name("type")
                        .and_then(|t| embedded_name(parsed, t)),
                );
            }
            hidden.extend(names.into_iter().filter(|n| !is_exported(n)));
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_type_refs(parsed, child, refs, hidden);
    }
}

/// Field name of an embedded field: the type name without package or arguments.
fn embedded_name(parsed: &ParsedFile, node: Node) -> Option<String> {
    match node.kind() {
        "type_identifier" => Some(parsed.node_text(node).to_string()),
        "qualified_type" => node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n).to_string()),
        "generic_type" => node
            .child_by_field_name("type")
            .and_then(|t| embedded_name(parsed, t)),
        _ => None,
    }
}

/// Identifiers of a constant expression: `n` as `Named`, `pkg.N` as `Qualified`.
fn collect_value_refs(parsed: &ParsedFile, node: Node, refs: &mut Vec<TypeExpr>) {
    match node.kind() {
        "identifier" => {
            refs.push(TypeExpr::Named(parsed.node_text(node).to_string()));
            return;
        }
        "selector_expression" => {
            if let (Some(operand), Some(field)) = (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ) {
                if operand.kind() == "identifier" {
                    refs.push(TypeExpr::qualified(
                        parsed.node_text(operand),
                        parsed.node_text(field),
                    ));
                    return;
                }
            }
        }
        _ => {}
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_value_refs(parsed, child, refs);
    }
}

fn chan_dir(node: Node) -> ChanDir {
    let mut cursor = node.walk();
    let tokens: Vec<&str> = node
        .children(&mut cursor)
        .filter(|c| !c.is_named())
        .map(|c| c.kind())
        .collect();
    match tokens.as_slice() {
        ["<-", "chan", ..] => ChanDir::Recv,
        ["chan", "<-", ..] => ChanDir::Send,
        _ => ChanDir::Both,
    }
}

/// Texts of every child under `field`.
fn field_texts(parsed: &ParsedFile, node: Node, field: &str) -> Vec<String> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor)
        .map(|n| parsed.node_text(n).to_string())
        .collect()
}

fn only_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node
        .named_children(&mut cursor)
        .filter(|n| n.kind() != "comment")
        .collect();
    match children.as_slice() {
        [single] => Some(*single),
        _ => None,
    }
}

fn named_child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|n| n.kind() == kind);
    found
}

/// Collect the outermost descendants of `kind` without descending into them.
fn collect_kind<'t>(node: Node<'t>, kind: &str, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == kind {
            out.push(child);
        } else {
            collect_kind(child, kind, out);
        }
    }
}
