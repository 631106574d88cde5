//! Pre-persist normalization.
//!
//! Every record passes through [`prepare_for_write`] before the storage layer
//! writes it, on create and on update alike. The pass is over the whole
//! record: fields the caller did not touch are normalized again.

use validator::Validate;

use crate::error::AppError;

/// A record whose text-bearing fields are stored upper-cased.
pub trait Normalize {
    fn normalize(&mut self);
}

pub fn upper(value: &mut String) {
    *value = value.to_uppercase();
}

/// Upper-cases an optional field; an empty string becomes absent.
pub fn upper_opt(value: &mut Option<String>) {
    *value = value
        .take()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_uppercase());
}

/// Optional locator fields (URLs) keep their case but drop empty strings.
pub fn blank_to_none(value: &mut Option<String>) {
    if value.as_deref().is_some_and(str::is_empty) {
        *value = None;
    }
}

/// Normalizes a lookup key so identity is case-insensitive.
pub fn key(code: &str) -> String {
    code.to_uppercase()
}

pub fn prepare_for_write<T>(mut record: T) -> Result<T, AppError>
where
    T: Normalize + Validate,
{
    record.normalize();
    record.validate()?;
    Ok(record)
}
