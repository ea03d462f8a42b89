//! Input checks shared by catalog and auth handlers.

use std::sync::LazyLock;

use regex::Regex;

use super::errors::{CatalogError, CatalogResult};

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_MESSAGE_LEN: usize = 5_000;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trimmed, non-empty, bounded text
pub fn required(field: &str, value: &str, max_len: usize) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > max_len {
        return Err(CatalogError::Validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text, mapping blanks to `None`
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn email(value: &str) -> CatalogResult<String> {
    let trimmed = value.trim().to_lowercase();
    if !is_valid_email(&trimmed) {
        return Err(CatalogError::Validation("email is not a valid address".into()));
    }
    Ok(trimmed)
}

/// URL-safe slug: lowercase ASCII alphanumerics separated by single dashes
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Explicit slug if given (normalized), else derived from `name`
pub fn slug_for(explicit: Option<&str>, name: &str) -> CatalogResult<String> {
    let slug = slugify(explicit.unwrap_or(name));
    if slug.is_empty() {
        return Err(CatalogError::Validation(
            "slug must contain at least one letter or digit".into(),
        ));
    }
    Ok(slug)
}

pub fn price(value: f64) -> CatalogResult<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(CatalogError::Validation("price must be a non-negative number".into()));
    }
    Ok(value)
}

pub fn quantity(value: i64) -> CatalogResult<i64> {
    if value < 0 {
        return Err(CatalogError::Validation("stock_quantity must not be negative".into()));
    }
    Ok(value)
}
