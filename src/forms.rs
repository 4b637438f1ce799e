use serde::Deserialize;
use validator::{Validate, ValidationErrors};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, max = 250, message = "Title is required."))]
    pub title: String,
    #[validate(length(min = 1, max = 250, message = "Subtitle is required."))]
    pub subtitle: String,
    #[validate(url(message = "The image URL is not a valid URL."))]
    pub img_url: String,
    #[validate(length(min = 1, message = "The post needs a body."))]
    pub body: String,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentForm {
    #[validate(length(min = 1, message = "The comment is empty."))]
    pub body: String,
    pub csrf_token: String,
}

/// Flattens validator's per-field map into flashable lines, in a stable
/// order.
pub fn error_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .map(|err| {
            err.message
                .as_ref()
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| "Invalid input.".to_string())
        })
        .collect();
    messages.sort();
    messages
}
