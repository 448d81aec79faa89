use crate::error::ValidationError;

/// Email/password login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Trimmed email, checked along with the password.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for a blank or malformed email or a blank password.
    pub fn validate(&self) -> Result<&str, ValidationError> {
        let email = validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        Ok(email)
    }
}

/// Registration form; the username doubles as the full name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub username: String,
}

impl SignUpForm {
    /// # Errors
    ///
    /// Returns `ValidationError` for blank fields, a malformed email or a
    /// password confirmation that does not match.
    pub fn validate(&self) -> Result<&str, ValidationError> {
        let email = validate_email(&self.email)?;
        if self.username.trim().is_empty() {
            return Err(ValidationError::Required("username"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required("password"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(email)
    }
}

fn validate_email(raw: &str) -> Result<&str, ValidationError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail(email.to_owned())),
    }
}
