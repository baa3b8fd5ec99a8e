//! Output assembler: one source file in, at most one proxy file out.

use tracing::{debug, warn};

use super::{classify, omitted_types, Exclusion, ImportResolver, ImportTable, ProxyContext, Verdict};
use crate::model::{Declaration, ImportEntry, ProxyFile, SourceFile};

/// What assembling one file produced.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    /// None when the file contributes no exported symbol.
    pub artifact: Option<ProxyFile>,
    pub exclusions: Vec<Exclusion>,
}

pub struct Assembler<'a> {
    ctx: ProxyContext<'a>,
    table: &'a ImportTable,
    import_path: &'a str,
    tool_identity: &'a str,
}

impl<'a> Assembler<'a> {
    pub fn new(
        ctx: ProxyContext<'a>,
        table: &'a ImportTable,
        import_path: &'a str,
        tool_identity: &'a str,
    ) -> Self {
        Self {
            ctx,
            table,
            import_path,
            tool_identity,
        }
    }

    /// `// Code generated by <tool>. Proxy for "<path>". DO NOT EDIT.`
    pub fn marker(&self) -> String {
        format!(
            "// Code generated by {}. Proxy for \"{}\". DO NOT EDIT.",
            self.tool_identity, self.import_path
        )
    }

    pub fn assemble(&self, file: &SourceFile) -> FileOutcome {
        let file_name = file.file_name();
        let mut resolver = ImportResolver::new(self.table);
        let mut declarations = Vec::new();
        let mut exclusions = Vec::new();

        for decl in &file.declarations {
            if let Declaration::Imports(entries) = decl {
                resolver.register(entries);
                continue;
            }
            if let Declaration::Types(group) = decl {
                for (symbol, reason) in omitted_types(group, self.ctx.scope) {
                    warn!(file = %file_name, %symbol, %reason, "excluding symbol from proxy");
                    exclusions.push(Exclusion {
                        file: file_name.clone(),
                        symbol,
                        reason,
                    });
                }
            }
            match classify(decl, &self.ctx) {
                Verdict::Keep(kept) => {
                    match &kept {
                        Declaration::Function(f) => resolver.note_function(f, self.ctx.scope),
                        Declaration::Types(group) => {
                            for spec in group.specs.iter().filter(|s| !s.type_params.is_empty()) {
                                resolver.note_type_spec(spec, self.ctx.scope);
                            }
                        }
                        _ => {}
                    }
                    declarations.push(kept);
                }
                Verdict::Exclude { symbol, reason } => {
                    warn!(file = %file_name, %symbol, %reason, "excluding symbol from proxy");
                    exclusions.push(Exclusion {
                        file: file_name.clone(),
                        symbol,
                        reason,
                    });
                }
                Verdict::Skip => {}
            }
        }

        if declarations.is_empty() {
            debug!(file = %file_name, "no exported symbols, no output");
            return FileOutcome {
                artifact: None,
                exclusions,
            };
        }

        let mut header = vec![self.marker()];
        if !file.leading_comments.is_empty() {
            header.push(String::new());
            header.extend(file.leading_comments.iter().cloned());
        }

        let artifact = ProxyFile {
            file_name,
            package: file.package.clone(),
            header,
            header_is_package_doc: file.has_package_doc && !file.leading_comments.is_empty(),
            imports: resolver.finish(),
            original: ImportEntry::new(Some(self.ctx.alias), self.import_path),
            declarations,
        };
        debug!(
            file = %artifact.file_name,
            declarations = artifact.declarations.len(),
            imports = artifact.imports.len(),
            "assembled proxy file"
        );
        FileOutcome {
            artifact: Some(artifact),
            exclusions,
        }
    }
}
