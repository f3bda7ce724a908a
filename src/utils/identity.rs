//! Mapping between a student's phone-style number and the synthetic login
//! identifier the identity layer stores accounts under.

pub const DEFAULT_LOGIN_DOMAIN: &str = "abs-login.local";

/// Keep only ASCII digits
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `"+91 98200-12345"` → `"919820012345@abs-login.local"`.
/// Empty input (or input without digits) yields an empty string.
pub fn number_to_email(number: &str, domain: &str) -> String {
    let digits = digits_only(number);
    if digits.is_empty() {
        return String::new();
    }
    format!("{}@{}", digits, domain).to_lowercase()
}

/// Reverse of [`number_to_email`]. Returns an empty string for empty input.
pub fn email_to_number(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    digits_only(local)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting_and_appends_domain() {
        assert_eq!(
            number_to_email("+91 98200-12345", DEFAULT_LOGIN_DOMAIN),
            "919820012345@abs-login.local"
        );
    }

    #[test]
    fn domain_is_lowercased() {
        assert_eq!(number_to_email("42", "Portal.LOCAL"), "42@portal.local");
    }

    #[test]
    fn round_trip_yields_digits() {
        for raw in ["9820012345", "(982) 001-2345", "+1 555 0100", "0007"] {
            let email = number_to_email(raw, DEFAULT_LOGIN_DOMAIN);
            assert_eq!(email_to_number(&email), digits_only(raw));
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(number_to_email("", DEFAULT_LOGIN_DOMAIN), "");
        assert_eq!(number_to_email("abc", DEFAULT_LOGIN_DOMAIN), "");
        assert_eq!(email_to_number(""), "");
        assert_eq!(email_to_number("@abs-login.local"), "");
    }
}
