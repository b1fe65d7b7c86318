use std::path::Path;

use tracing::{debug, warn};

use crate::error::SdkGenError;
use crate::file::syntax::FuncDecl;
use crate::model::{HttpMethod, RouteBinding, SourcePos};

/// Doc-comment marker introducing a route annotation.
pub const ROUTE_MARKER: &str = "@router";

/// Reads `@router PATH [METHOD]` annotations from handler doc comments.
///
/// Each binding is named after the annotated function. A function with more
/// than one annotation keeps the first.
///
/// ## Errors
/// Returns `Validation` for annotations without a path, without a method, or
/// with a method token other than GET, POST, PUT, PATCH or DELETE.
pub fn route_bindings(path: &Path, functions: &[FuncDecl]) -> Result<Vec<RouteBinding>, SdkGenError> {
    let mut routes: Vec<RouteBinding> = Vec::new();

    for func in functions {
        let first_doc_line = func.line.saturating_sub(func.doc.len());

        for (offset, line) in func.doc.iter().enumerate() {
            let Some(annotation) = annotation_body(line) else {
                continue;
            };
            let line_no = first_doc_line + offset;

            if routes.iter().any(|r| r.action == func.name) {
                warn!(action = %func.name, line = line_no, "ignoring extra route annotation");
                continue;
            }

            let binding = parse_annotation(path, line_no, &func.name, annotation)?;
            debug!(action = %binding.action, method = %binding.method, path = %binding.path, "route");
            routes.push(binding);
        }
    }

    Ok(routes)
}

/// Text after the marker when the line's first token is a route marker, in any case.
fn annotation_body(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let marker_len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
    let (marker, rest) = trimmed.split_at(marker_len);
    marker.eq_ignore_ascii_case(ROUTE_MARKER).then_some(rest)
}

fn parse_annotation(
    path: &Path,
    line: usize,
    action: &str,
    annotation: &str,
) -> Result<RouteBinding, SdkGenError> {
    let mut tokens = annotation.split_whitespace();

    let route = tokens
        .next()
        .filter(|t| t.starts_with('/'))
        .ok_or_else(|| SdkGenError::validation(path, line, format!("route for `{action}` has no path")))?;

    let method_token = tokens
        .next()
        .and_then(|t| t.strip_prefix('[').and_then(|t| t.strip_suffix(']')))
        .ok_or_else(|| {
            SdkGenError::validation(
                path,
                line,
                format!("route for `{action}` needs a `[METHOD]` after the path"),
            )
        })?;

    let method = HttpMethod::parse(method_token).ok_or_else(|| {
        SdkGenError::validation(
            path,
            line,
            format!("unsupported HTTP method `{method_token}` on `{action}`"),
        )
    })?;

    Ok(RouteBinding {
        action: action.to_string(),
        method,
        path: route.to_string(),
        pos: SourcePos {
            path: path.to_path_buf(),
            line,
        },
    })
}
