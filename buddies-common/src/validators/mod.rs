use uuid::Uuid;

pub const MAX_IDENTIFIER_LENGTH: usize = 64;
pub const MAX_SEARCH_QUERY_LENGTH: usize = 128;

#[derive(Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid(&'static str),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

/// Checks the identifier a joiner typed to pick a receiver. Either a user ID or a username,
/// optionally prefixed with `@`.
pub fn validate_receiver_identifier(identifier: &str) -> Validity {
    let identifier = identifier.trim();

    if identifier.is_empty() {
        return Validity::Invalid("Enter the username of the buyer you want to ship with.");
    }

    if Uuid::parse_str(identifier).is_ok() {
        return Validity::Valid;
    }

    let username = identifier.strip_prefix('@').unwrap_or(identifier);

    if username.is_empty() {
        return Validity::Invalid("Enter the username of the buyer you want to ship with.");
    }

    if username.chars().count() > MAX_IDENTIFIER_LENGTH {
        return Validity::Invalid("Username is too long.");
    }

    if username.chars().any(char::is_whitespace) {
        return Validity::Invalid("Username cannot contain a space.");
    }

    Validity::Valid
}

pub fn validate_search_query(query: &str) -> Validity {
    let query = query.trim();

    if query.is_empty() {
        return Validity::Invalid("Search query cannot be empty.");
    }

    if query.chars().count() > MAX_SEARCH_QUERY_LENGTH {
        return Validity::Invalid("Search query is too long.");
    }

    Validity::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_receiver_identifier() {
        assert!(validate_receiver_identifier("harbor").is_valid());
        assert!(validate_receiver_identifier(" @harbor.ships ").is_valid());
        assert!(validate_receiver_identifier(&Uuid::now_v7().to_string()).is_valid());

        assert!(!validate_receiver_identifier("").is_valid());
        assert!(!validate_receiver_identifier("   ").is_valid());
        assert!(!validate_receiver_identifier("@").is_valid());
        assert!(!validate_receiver_identifier("harbor ships").is_valid());
        assert!(!validate_receiver_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_valid());
    }

    #[test]
    fn test_validate_search_query() {
        assert!(validate_search_query("mira okafor").is_valid());

        assert_eq!(
            validate_search_query(" \t "),
            Validity::Invalid("Search query cannot be empty.")
        );
        assert!(!validate_search_query(&"q".repeat(MAX_SEARCH_QUERY_LENGTH + 1)).is_valid());
    }
}
