use std::path::Path;

use crate::config::Whitelist;
use crate::error::SdkGenError;
use crate::file::syntax::{ConstBlock, ValueExpr};
use crate::model::{ConstValue, ConstantGroup, ImportBinding, ImportClass, Operand, SourcePos};

/// Rebuilds constant groups from `const` declarations, preserving source order.
///
/// A spec with a value starts a new group; a bare name list continues the
/// group before it, which is how Go repeats `iota` expressions.
///
/// ## Errors
/// Returns `Validation` for value forms other than identifier, literal and
/// `operand OP operand`, for name/value count mismatches, and for a bare
/// name list with nothing to continue.
pub fn constant_groups(path: &Path, blocks: &[ConstBlock]) -> Result<Vec<ConstantGroup>, SdkGenError> {
    let mut groups: Vec<ConstantGroup> = Vec::new();

    for (block_index, block) in blocks.iter().enumerate() {
        // The group a bare name list would extend; `None` after a multi-value spec.
        let mut current: Option<usize> = None;

        for (ordinal, spec) in block.specs.iter().enumerate() {
            if spec.values.is_empty() {
                let index = current.ok_or_else(|| {
                    SdkGenError::validation(
                        path,
                        spec.line,
                        format!(
                            "constant `{}` has no value and does not continue a single-valued group",
                            spec.names.join(", ")
                        ),
                    )
                })?;
                if spec.names.len() != 1 {
                    return Err(SdkGenError::validation(
                        path,
                        spec.line,
                        "a group continuation must declare one name per line",
                    ));
                }
                groups[index].members.extend(spec.names.iter().cloned());
                continue;
            }

            if spec.values.len() != spec.names.len() {
                return Err(SdkGenError::validation(
                    path,
                    spec.line,
                    format!(
                        "{} names but {} values in constant declaration",
                        spec.names.len(),
                        spec.values.len()
                    ),
                ));
            }

            for (name, value) in spec.names.iter().zip(&spec.values) {
                let value = const_value(path, spec.line, value)?;
                groups.push(ConstantGroup {
                    block: block_index,
                    first_ordinal: ordinal,
                    members: vec![name.clone()],
                    ty: spec.ty.clone(),
                    auto_increment: value.mentions_iota(),
                    value,
                    pos: SourcePos {
                        path: path.to_path_buf(),
                        line: spec.line,
                    },
                });
            }

            current = (spec.names.len() == 1).then(|| groups.len() - 1);
        }
    }

    Ok(groups)
}

/// Checks package-qualified constant types against the file's imports.
///
/// Shared-base types are kept for the emitter to requalify. Whitelisted ORM
/// and time types are dropped, leaving the constant untyped, since the SDK
/// never imports those packages.
///
/// ## Errors
/// Returns `Resolution` for types from any other package.
pub fn resolve_constant_types(
    groups: &mut [ConstantGroup],
    imports: &[ImportBinding],
    whitelist: &Whitelist,
) -> Result<(), SdkGenError> {
    for group in groups.iter_mut() {
        let Some((alias, _)) = group.ty.as_deref().and_then(|ty| ty.split_once('.')) else {
            continue;
        };
        let binding = imports.iter().find(|binding| binding.alias == alias);

        match binding {
            Some(binding) if binding.class == ImportClass::InternalTypespec => {}
            Some(_) if whitelist.widens_to_string(alias) => group.ty = None,
            _ => {
                return Err(SdkGenError::Resolution {
                    path: group.pos.path.clone(),
                    line: group.pos.line,
                    import: binding.map_or_else(|| alias.to_string(), |b| b.path.clone()),
                });
            }
        }
    }

    Ok(())
}

fn const_value(path: &Path, line: usize, value: &ValueExpr) -> Result<ConstValue, SdkGenError> {
    match value {
        ValueExpr::Ident(name) => Ok(ConstValue::Ident { name: name.clone() }),
        ValueExpr::Literal(text) => Ok(ConstValue::Literal { text: text.clone() }),
        ValueExpr::Binary { left, op, right } => Ok(ConstValue::Binary {
            left: operand(path, line, left)?,
            op: op.clone(),
            right: operand(path, line, right)?,
        }),
        ValueExpr::Other { kind, text } => Err(SdkGenError::validation(
            path,
            line,
            format!("unsupported constant expression `{text}` ({kind})"),
        )),
    }
}

fn operand(path: &Path, line: usize, value: &ValueExpr) -> Result<Operand, SdkGenError> {
    match value {
        ValueExpr::Ident(name) => Ok(Operand::Ident(name.clone())),
        ValueExpr::Literal(text) => Ok(Operand::Literal(text.clone())),
        ValueExpr::Binary { op, .. } => Err(SdkGenError::validation(
            path,
            line,
            format!("nested `{op}` expressions are not supported in constants"),
        )),
        ValueExpr::Other { text, .. } => Err(SdkGenError::validation(
            path,
            line,
            format!("unsupported constant operand `{text}`"),
        )),
    }
}
