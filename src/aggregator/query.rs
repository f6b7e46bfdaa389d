use crate::error::ValidationError;

pub const MIN_QUERY_CHARS: usize = 3;
pub const MAX_QUERY_CHARS: usize = 100;
const FORBIDDEN_CHARS: [char; 6] = ['<', '>', ';', '&', '|', '$'];

/// Check a raw query and return it with whitespace runs collapsed.
///
/// Length is measured on the query as received, so padding counts.
pub fn validate_query(query: &str) -> Result<String, ValidationError> {
    let len = query.chars().count();
    if len < MIN_QUERY_CHARS {
        return Err(ValidationError::QueryTooShort(len));
    }
    if len > MAX_QUERY_CHARS {
        return Err(ValidationError::QueryTooLong(len));
    }
    if let Some(c) = query.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(ValidationError::ForbiddenCharacter(c));
    }

    Ok(query.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_bounds() {
        assert_eq!(validate_query("ab"), Err(ValidationError::QueryTooShort(2)));
        assert_eq!(validate_query("abc").unwrap(), "abc");
        assert!(validate_query(&"a".repeat(100)).is_ok());
        assert_eq!(
            validate_query(&"a".repeat(101)),
            Err(ValidationError::QueryTooLong(101))
        );
    }

    #[test]
    fn test_forbidden_characters() {
        for bad in ["mouse<script>", "tv; rm", "a & b", "x | y", "$HOME", "a>b"] {
            assert!(matches!(
                validate_query(bad),
                Err(ValidationError::ForbiddenCharacter(_))
            ));
        }
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(validate_query("  notebook   dell  ").unwrap(), "notebook dell");
        assert_eq!(validate_query(" tv ").unwrap(), "tv");
        assert_eq!(validate_query("  a   ").unwrap(), "a");
    }
}
