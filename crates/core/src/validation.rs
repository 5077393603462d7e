//! Input validation for booth usernames and admin passwords

/// Symbols accepted by the password strength check
pub const PASSWORD_SYMBOLS: &str = "@$!%*?&";

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;

/// HTML-escape `< > " ' &` and trim surrounding whitespace.
/// Missing input sanitizes to an empty string.
pub fn sanitize(input: Option<&str>) -> String {
    let Some(input) = input else {
        return String::new();
    };

    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out.trim().to_string()
}

/// Check the booth username format; the error is the user-facing message
pub fn validate_username(username: Option<&str>) -> Result<(), &'static str> {
    let username = match username {
        Some(u) if !u.is_empty() => u,
        _ => return Err("Username is required"),
    };

    let sanitized = sanitize(Some(username));
    let len = sanitized.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err("Username must be between 3 and 20 characters");
    }

    if !sanitized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username can only contain letters, numbers, underscores, and hyphens");
    }

    Ok(())
}

/// Result of a password strength check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStrength {
    pub valid: bool,
    /// Every violated rule, in a fixed order
    pub errors: Vec<&'static str>,
}

pub fn check_password_strength(password: &str) -> PasswordStrength {
    let mut errors = Vec::new();

    if password.chars().count() < PASSWORD_MIN {
        errors.push("Password must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        errors.push("Password must contain at least one number");
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        errors.push("Password must contain at least one special character");
    }

    PasswordStrength {
        valid: errors.is_empty(),
        errors,
    }
}
