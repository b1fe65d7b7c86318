//! Identifier case helpers shared by extraction and both emitters.

/// Converts `user_info` or `order-item` into `UserInfo` / `OrderItem`.
///
/// ```
/// use sdkgen_lib::naming::upper_camel;
/// assert_eq!(upper_camel("user_info"), "UserInfo");
/// assert_eq!(upper_camel("widget"), "Widget");
/// ```
pub fn upper_camel(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|part| !part.is_empty())
        .map(upper_first)
        .collect()
}

/// Uppercases the first character.
pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first character.
///
/// ```
/// use sdkgen_lib::naming::lower_first;
/// assert_eq!(lower_first("PageSize"), "pageSize");
/// ```
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases a leading acronym as a unit: `IDCard` -> `idCard`, `URL` -> `url`.
pub fn lower_camel(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let run = chars.iter().take_while(|c| c.is_uppercase()).count();

    let lowered = match run {
        0 => return name.to_string(),
        n if n == chars.len() || n == 1 => n,
        n => n - 1,
    };

    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lowered {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}
