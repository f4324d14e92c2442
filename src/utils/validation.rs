use validator::ValidationErrors;

/// Uppercase form of an email address, used as the uniqueness and lookup key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_uppercase()
}

/// Flatten `validator` errors into a single human-readable message.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        for error in field_errors {
            match &error.message {
                Some(message) => parts.push(message.to_string()),
                None => parts.push(format!("{} is invalid", field)),
            }
        }
    }
    if parts.is_empty() {
        "invalid input".to_string()
    } else {
        parts.sort();
        parts.join("; ")
    }
}
