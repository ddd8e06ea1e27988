use rand::{distr::Alphanumeric, Rng};

/// Generate a random state parameter for CSRF protection.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Derive a display name from an email when the provider sends none.
pub fn display_name_from_email(email: &str) -> String {
    match email.split('@').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "Adventurer".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_state_produces_32_char_alphanumeric() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generate_state_is_unique() {
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn display_name_from_email_extracts_local_part() {
        assert_eq!(display_name_from_email("john.doe@example.com"), "john.doe");
        assert_eq!(display_name_from_email("alice@test.org"), "alice");
    }

    #[test]
    fn display_name_from_email_handles_degenerate_input() {
        assert_eq!(display_name_from_email("no-at-sign"), "no-at-sign");
        assert_eq!(display_name_from_email(""), "Adventurer");
    }
}
