//! Go source printer for generated proxy files.
//!
//! Output follows gofmt layout (tab indentation, grouped imports, one blank
//! line between top-level declarations) so generated files are stable under
//! `gofmt`.

use std::fmt::{self, Write};

use crate::model::{
    ChanDir, Declaration, Expr, Function, ImportEntry, Member, ParamGroup, ProxyFile, Stmt,
    TypeExpr, TypeGroup, TypeParam, TypeSpec, ValueGroup,
};

/// Render a proxy file to Go source.
pub fn render_file(file: &ProxyFile) -> String {
    let mut out = String::new();

    for line in &file.header {
        out.push_str(line);
        out.push('\n');
    }
    if !file.header.is_empty() && !file.header_is_package_doc {
        out.push('\n');
    }
    let _ = writeln!(out, "package {}", file.package);
    out.push('\n');

    render_imports(&mut out, &file.imports, &file.original);

    for decl in &file.declarations {
        out.push('\n');
        render_declaration(&mut out, decl);
    }
    out
}

fn render_imports(out: &mut String, imports: &[ImportEntry], original: &ImportEntry) {
    if imports.is_empty() {
        let _ = writeln!(out, "import {}", import_spec(original));
        return;
    }
    out.push_str("import (\n");
    for entry in imports {
        let _ = writeln!(out, "\t{}", import_spec(entry));
    }
    out.push('\n');
    let _ = writeln!(out, "\t{}", import_spec(original));
    out.push_str(")\n");
}

fn import_spec(entry: &ImportEntry) -> String {
    match &entry.alias {
        Some(alias) => format!("{} {}", alias, quote(&entry.path)),
        None => quote(&entry.path),
    }
}

fn render_declaration(out: &mut String, decl: &Declaration) {
    match decl {
        Declaration::Values(group) => render_values(out, group),
        Declaration::Types(group) => render_types(out, group),
        Declaration::Imports(entries) => {
            for entry in entries {
                let _ = writeln!(out, "import {}", import_spec(entry));
            }
        }
        Declaration::Function(f) => render_function(out, f),
    }
}

fn render_doc(out: &mut String, doc: &Option<String>) {
    if let Some(doc) = doc {
        out.push_str(doc);
        out.push('\n');
    }
}

fn render_values(out: &mut String, group: &ValueGroup) {
    render_doc(out, &group.doc);
    let keyword = group.keyword.as_str();
    match group.members.as_slice() {
        [single] => {
            let _ = writeln!(out, "{} {}", keyword, member(single));
        }
        members => {
            let _ = writeln!(out, "{} (", keyword);
            for m in members {
                let _ = writeln!(out, "\t{}", member(m));
            }
            out.push_str(")\n");
        }
    }
}

fn member(m: &Member) -> String {
    let mut s = m.name.clone();
    if let Some(ty) = &m.ty {
        let _ = write!(s, " {}", ty);
    }
    if let Some(value) = &m.value {
        let _ = write!(s, " = {}", value);
    }
    s
}

fn render_types(out: &mut String, group: &TypeGroup) {
    render_doc(out, &group.doc);
    match group.specs.as_slice() {
        [single] => {
            let _ = writeln!(out, "type {}", type_spec(single));
        }
        specs => {
            out.push_str("type (\n");
            for spec in specs {
                let _ = writeln!(out, "\t{}", type_spec(spec));
            }
            out.push_str(")\n");
        }
    }
}

fn type_spec(spec: &TypeSpec) -> String {
    format!(
        "{}{}{}{}",
        spec.name,
        type_params(&spec.type_params),
        if spec.is_alias { " = " } else { " " },
        spec.definition
    )
}

fn type_params(params: &[TypeParam]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let list: Vec<String> = params
        .iter()
        .map(|tp| format!("{} {}", tp.names.join(", "), tp.constraint))
        .collect();
    format!("[{}]", list.join(", "))
}

fn render_function(out: &mut String, f: &Function) {
    render_doc(out, &f.doc);
    let _ = write!(
        out,
        "func {}{}({}){}",
        f.name,
        type_params(&f.type_params),
        params(&f.params),
        results(&f.results)
    );
    match &f.body {
        Some(body) => {
            out.push_str(" {\n");
            for stmt in body {
                let _ = writeln!(out, "\t{}", statement(stmt));
            }
            out.push_str("}\n");
        }
        None => out.push('\n'),
    }
}

fn params(groups: &[ParamGroup]) -> String {
    groups
        .iter()
        .map(|g| {
            if g.names.is_empty() {
                g.ty.to_string()
            } else {
                format!("{} {}", g.names.join(", "), g.ty)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn results(groups: &[ParamGroup]) -> String {
    match groups {
        [] => String::new(),
        [single] if single.names.is_empty() => format!(" {}", single.ty),
        _ => format!(" ({})", params(groups)),
    }
}

fn statement(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr(expr) => expr.to_string(),
        Stmt::Return(values) if values.is_empty() => "return".to_string(),
        Stmt::Return(values) => format!("return {}", join(values)),
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(T::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Go interpreted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Qualified { package, name } => write!(f, "{}.{}", package, name),
            TypeExpr::Variadic(inner) => write!(f, "...{}", inner),
            TypeExpr::Pointer(inner) => write!(f, "*{}", inner),
            TypeExpr::Slice(inner) => write!(f, "[]{}", inner),
            TypeExpr::Array { len, elem, .. } => write!(f, "[{}]{}", len, elem),
            TypeExpr::Map { key, value } => write!(f, "map[{}]{}", key, value),
            TypeExpr::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            TypeExpr::Func { params: p, results: r } => {
                write!(f, "func({}){}", params(p), results(r))
            }
            TypeExpr::Generic { base, args } => write!(f, "{}[{}]", base, join(args)),
            TypeExpr::Literal { text, .. } => f.write_str(text),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => f.write_str(name),
            Expr::Selector { package, name } => write!(f, "{}.{}", package, name),
            Expr::Call {
                func,
                type_args,
                args,
                spread,
            } => {
                write!(f, "{}", func)?;
                if !type_args.is_empty() {
                    write!(f, "[{}]", join(type_args))?;
                }
                write!(f, "({}", join(args))?;
                if *spread && !args.is_empty() {
                    f.write_str("...")?;
                }
                f.write_str(")")
            }
            Expr::Str(s) => f.write_str(&quote(s)),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Source(text) => f.write_str(text),
        }
    }
}
