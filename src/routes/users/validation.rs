/// Special characters a password must draw at least one from.
const PASSWORD_SPECIALS: &str = "!@#$%^&*";

pub const PASSWORD_RULES: &str = "Password must be at least 8 characters long, include at least one special character and one number, and have no spaces.";

/// At least 8 characters from letters, digits and `!@#$%^&*`, with at least
/// one digit and one of the specials. Anything else, spaces included, fails.
#[must_use]
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c))
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_compliant_passwords() {
        assert!(is_valid_password("flame5hield!"));
        assert!(is_valid_password("Abcdef1#"));
    }

    #[test]
    fn rejects_weak_or_malformed_passwords() {
        for password in [
            "password",
            "pass word1!",
            "short1!",
            "nospecial12",
            "nodigits!!",
            "unicodé1!x",
            "tab\tbed1!",
        ] {
            assert!(!is_valid_password(password), "{password:?} should be rejected");
        }
    }
}
