pub mod password;

use thiserror::Error;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 32;
pub const PASSWORD_MIN: usize = 6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("username must be {USERNAME_MIN}-{USERNAME_MAX} characters")]
    UsernameLength,

    #[error("username may only contain letters, digits and underscores")]
    UsernameCharset,

    #[error("invalid email address")]
    Email,

    #[error("password must be at least {PASSWORD_MIN} characters")]
    PasswordTooShort,
}

/// Trims and checks a username: 3-32 word characters.
pub fn validate_username(raw: &str) -> Result<String, CredentialError> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(CredentialError::UsernameLength);
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(CredentialError::UsernameCharset);
    }
    Ok(name.to_string())
}

/// Lowercases and sanity-checks an address. Delivery is not verified.
pub fn normalize_email(raw: &str) -> Result<String, CredentialError> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@').ok_or(CredentialError::Email)?;
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || email.chars().any(char::is_whitespace)
    {
        return Err(CredentialError::Email);
    }
    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(CredentialError::PasswordTooShort);
    }
    Ok(())
}
