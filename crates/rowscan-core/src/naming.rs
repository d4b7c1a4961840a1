//! Column name derivation for unannotated fields.

/// Convert a capitalized-word identifier to lowercase-underscore form.
///
/// Each uppercase letter that starts a new word begins a new segment. A run of
/// uppercase letters (an acronym) stays one segment; its last letter starts a
/// new word when followed by a lowercase letter. Names already in
/// lowercase-underscore form are returned unchanged.
///
/// ```
/// use rowscan_core::naming::snake_case;
///
/// assert_eq!(snake_case("FooColumn"), "foo_column");
/// assert_eq!(snake_case("FooJSON"), "foo_json");
/// assert_eq!(snake_case("HTTPServer"), "http_server");
/// ```
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let word_start = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if word_start {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalized_words() {
        assert_eq!(snake_case("FooColumn"), "foo_column");
        assert_eq!(snake_case("BarColumn"), "bar_column");
        assert_eq!(snake_case("FooNested"), "foo_nested");
        assert_eq!(snake_case("Foo"), "foo");
    }

    #[test]
    fn test_acronyms() {
        assert_eq!(snake_case("FooJSON"), "foo_json");
        assert_eq!(snake_case("JSONData"), "json_data");
        assert_eq!(snake_case("UserID"), "user_id");
        assert_eq!(snake_case("ID"), "id");
    }

    #[test]
    fn test_digits() {
        assert_eq!(snake_case("Address2Line"), "address2_line");
        assert_eq!(snake_case("Sha256"), "sha256");
    }

    #[test]
    fn test_already_snake_case() {
        assert_eq!(snake_case("foo_column"), "foo_column");
        assert_eq!(snake_case("created_at"), "created_at");
        assert_eq!(snake_case(""), "");
    }

    #[test]
    fn test_existing_underscore_not_doubled() {
        assert_eq!(snake_case("Foo_Bar"), "foo_bar");
    }
}
