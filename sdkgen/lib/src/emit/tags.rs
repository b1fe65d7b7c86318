//! The backtick `key:"value"` tag micro-format.

/// Tag key binding a field to a form or query parameter on the server.
pub const FORM_KEY: &str = "form";
/// Tag key read by the query-string encoder of the generated client.
pub const URL_KEY: &str = "url";
pub const JSON_KEY: &str = "json";

/// Splits a raw tag (delimiters optional) into ordered key/value pairs.
///
/// Malformed trailing text is ignored, matching how Go reads struct tags.
///
/// ```
/// use sdkgen_lib::emit::tags::parse_tag;
/// let pairs = parse_tag(r#"`json:"id,omitempty" form:"id"`"#);
/// assert_eq!(pairs, vec![("json", "id,omitempty"), ("form", "id")]);
/// ```
pub fn parse_tag(raw: &str) -> Vec<(&str, &str)> {
    let mut rest = strip_delimiters(raw);
    let mut pairs = Vec::new();

    loop {
        rest = rest.trim_start();
        let Some(colon) = rest.find(":\"") else {
            break;
        };
        let key = &rest[..colon];
        if key.is_empty() || key.contains(char::is_whitespace) {
            break;
        }

        let value_start = colon + 2;
        let Some(len) = closing_quote(&rest[value_start..]) else {
            break;
        };
        pairs.push((key, &rest[value_start..value_start + len]));
        rest = &rest[value_start + len + 1..];
    }

    pairs
}

/// Value of `key` in a raw tag.
pub fn lookup<'a>(raw: &'a str, key: &str) -> Option<&'a str> {
    parse_tag(raw).into_iter().find(|(k, _)| *k == key).map(|(_, v)| v)
}

/// Appends `url:"<form value>"` when the tag has a form key and no url key.
///
/// The original tag text is kept verbatim in every case.
///
/// ```
/// use sdkgen_lib::emit::tags::translate_form_tag;
/// assert_eq!(translate_form_tag(r#"`form:"page"`"#), r#"`form:"page" url:"page"`"#);
/// assert_eq!(translate_form_tag(r#"`json:"id"`"#), r#"`json:"id"`"#);
/// ```
pub fn translate_form_tag(raw: &str) -> String {
    match lookup(raw, FORM_KEY) {
        Some(value) if lookup(raw, URL_KEY).is_none() => {
            let inner = strip_delimiters(raw).trim_end();
            format!("`{inner} {URL_KEY}:\"{value}\"`")
        }
        _ => raw.to_string(),
    }
}

/// The wire name a tag gives a field: `form`, then the first part of `json`.
///
/// Skipped (`-`) and empty names yield `None`.
pub fn wire_name(raw: &str) -> Option<&str> {
    let named = |key: &str| {
        lookup(raw, key)
            .map(|v| v.split(',').next().unwrap_or_default())
            .filter(|name| !name.is_empty() && *name != "-")
    };

    named(FORM_KEY).or_else(|| named(JSON_KEY))
}

fn strip_delimiters(raw: &str) -> &str {
    let raw = raw.trim();
    raw.strip_prefix('`')
        .and_then(|r| r.strip_suffix('`'))
        .unwrap_or(raw)
}

/// Length up to the unescaped closing quote.
fn closing_quote(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_existing_url_keys() {
        let raw = r#"`form:"page" url:"p"`"#;
        assert_eq!(translate_form_tag(raw), raw);
    }

    #[test]
    fn preserves_unrelated_keys_verbatim() {
        assert_eq!(
            translate_form_tag(r#"`json:"size" form:"size" binding:"required"`"#),
            r#"`json:"size" form:"size" binding:"required" url:"size"`"#
        );
    }

    #[test]
    fn wire_name_prefers_form_then_json() {
        assert_eq!(wire_name(r#"`json:"page_size" form:"size"`"#), Some("size"));
        assert_eq!(wire_name(r#"`json:"page_size,omitempty"`"#), Some("page_size"));
        assert_eq!(wire_name(r#"`json:"-"`"#), None);
        assert_eq!(wire_name(r#"`binding:"required"`"#), None);
    }

    #[test]
    fn escaped_quotes_stay_inside_values() {
        let pairs = parse_tag(r#"`doc:"say \"hi\"" json:"x"`"#);
        assert_eq!(pairs, vec![("doc", r#"say \"hi\""#), ("json", "x")]);
    }
}
