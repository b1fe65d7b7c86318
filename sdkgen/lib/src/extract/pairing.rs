use tracing::{error, warn};

use crate::error::{Diagnostic, SdkGenError};
use crate::model::{
    ActionPair, REQUEST_SUFFIX, RESPONSE_SUFFIX, RouteBinding, TypeCategory, TypeDecl,
};

/// General declarations plus the request/response pairs of one type file.
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    pub general: Vec<TypeDecl>,
    pub pairs: Vec<ActionPair>,
}

#[derive(Default)]
struct Slot {
    stem: String,
    request: Option<TypeDecl>,
    response: Option<TypeDecl>,
}

/// Pairs every Request with the Response of the same stem and attaches routes.
///
/// Pairs keep the order in which their first half was declared. A general
/// type named exactly like a stem moves into that pair as its shared shape.
///
/// ## Errors
/// Returns `UnpairedTypes` listing every half without a counterpart; each is
/// also logged with its position.
pub fn pair_types(decls: Vec<TypeDecl>, routes: Vec<RouteBinding>) -> Result<Pairing, SdkGenError> {
    let mut general: Vec<TypeDecl> = Vec::new();
    let mut slots: Vec<Slot> = Vec::new();

    for decl in decls {
        let category = decl.category;
        if category == TypeCategory::General {
            general.push(decl);
            continue;
        }

        let stem = decl.stem().to_string();
        let index = match slots.iter().position(|slot| slot.stem == stem) {
            Some(index) => index,
            None => {
                slots.push(Slot {
                    stem,
                    ..Slot::default()
                });
                slots.len() - 1
            }
        };

        match category {
            TypeCategory::Request => slots[index].request = Some(decl),
            TypeCategory::Response => slots[index].response = Some(decl),
            TypeCategory::General => {}
        }
    }

    let mut diagnostics = Vec::new();
    let mut pairs = Vec::new();

    for slot in slots {
        match (slot.request, slot.response) {
            (Some(request), Some(response)) => {
                let promoted = general.iter().position(|decl| decl.name == slot.stem);
                let shared = promoted.map(|index| general.remove(index));
                pairs.push(ActionPair {
                    action: slot.stem,
                    request,
                    response,
                    shared,
                    route: None,
                });
            }
            (Some(half), None) => diagnostics.push(unpaired(&half, RESPONSE_SUFFIX)),
            (None, Some(half)) => diagnostics.push(unpaired(&half, REQUEST_SUFFIX)),
            (None, None) => {}
        }
    }

    if !diagnostics.is_empty() {
        return Err(SdkGenError::UnpairedTypes { diagnostics });
    }

    for route in routes {
        match pairs.iter_mut().find(|pair| pair.action == route.action) {
            Some(pair) => pair.route = Some(route),
            None => warn!(
                action = %route.action,
                at = %route.pos,
                "route has no matching {REQUEST_SUFFIX}/{RESPONSE_SUFFIX} pair, skipping"
            ),
        }
    }

    Ok(Pairing { general, pairs })
}

fn unpaired(half: &TypeDecl, missing_suffix: &str) -> Diagnostic {
    let expected = format!("{}{missing_suffix}", half.stem());
    error!("no {expected} matches {} at {}", half.name, half.pos);

    Diagnostic {
        path: half.pos.path.clone(),
        line: half.pos.line,
        message: format!("{} has no matching {expected}", half.name),
    }
}
