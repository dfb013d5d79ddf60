/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::error::Error;
use std::fmt;

use crate::builtin::{Variant, VariantType};

type Cause = Box<dyn Error + Send + Sync>;

/// Represents errors that can occur when converting values from the engine.
///
/// To create user-defined errors, you can use [`ConvertError::default()`] or [`ConvertError::new("message")`][Self::new].
#[derive(Debug)]
pub struct ConvertError {
    kind: ErrorKind,
    value: Option<Variant>,
}

impl ConvertError {
    /// Construct with a user-defined message.
    ///
    /// If you don't need a custom message, consider using [`ConvertError::default()`] instead.
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Custom(Some(user_message.into().into())),
            ..Default::default()
        }
    }

    /// Create a new custom error wrapping an [`Error`].
    pub fn with_error<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        Self {
            kind: ErrorKind::Custom(Some(error.into())),
            ..Default::default()
        }
    }

    /// No conversion exists for type `T`: it has no fast path and no registered conversion slots.
    pub fn unsupported<T: ?Sized>() -> Self {
        Self {
            kind: ErrorKind::Unsupported {
                type_name: std::any::type_name::<T>(),
            },
            value: None,
        }
    }

    pub(crate) fn with_kind(kind: ErrorKind) -> Self {
        Self { kind, value: None }
    }

    pub(crate) fn with_kind_value(kind: ErrorKind, value: &Variant) -> Self {
        Self {
            kind,
            value: Some(value.clone()),
        }
    }

    /// Whether this error signals a type without any conversion path.
    pub fn is_unsupported(&self) -> bool {
        matches!(self.kind, ErrorKind::Unsupported { .. })
    }

    /// Returns the rust-error that caused this error, if one exists.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match &self.kind {
            ErrorKind::Custom(Some(cause)) => Some(&**cause),
            _ => None,
        }
    }

    /// Returns a reference of the value that failed to convert, if one exists.
    pub fn value(&self) -> Option<&Variant> {
        self.value.as_ref()
    }

    /// Converts error into generic error type. It is useful to send error across thread.
    /// Do note that some data might get lost during conversion.
    pub fn into_erased(self) -> impl Error + Send + Sync {
        ErasedConvertError::from(self)
    }
}

impl fmt::Display for ConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(value) = &self.value {
            write!(f, ": {value:?}")?;
        }

        Ok(())
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause().map(|v| v as &(dyn Error + 'static))
    }
}

impl Default for ConvertError {
    /// Create a custom error, without any description.
    ///
    /// If you need a custom message, consider using [`ConvertError::new("message")`][Self::new] instead.
    fn default() -> Self {
        Self {
            kind: ErrorKind::Custom(None),
            value: None,
        }
    }
}

/// Erased type of [`ConvertError`].
#[derive(Debug)]
pub(crate) struct ErasedConvertError {
    kind: ErrorKind,
}

impl From<ConvertError> for ErasedConvertError {
    fn from(v: ConvertError) -> Self {
        let ConvertError { kind, .. } = v;
        Self { kind }
    }
}

impl fmt::Display for ErasedConvertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl Error for ErasedConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            ErrorKind::Custom(Some(cause)) => Some(&**cause),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    FromVariant(FromVariantError),
    FromFfi(FromFfiError),
    Unsupported { type_name: &'static str },
    Custom(Option<Cause>),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FromVariant(from_variant) => write!(f, "{from_variant}"),
            Self::FromFfi(from_ffi) => write!(f, "{from_ffi}"),
            Self::Unsupported { type_name } => {
                write!(f, "unsupported type for Variant conversion: {type_name}")
            }
            Self::Custom(cause) => write!(f, "{cause:?}"),
        }
    }
}

/// Conversion failed while reading a value out of a `Variant`.
#[derive(Eq, PartialEq, Debug)]
pub(crate) enum FromVariantError {
    /// Variant type does not match expected type.
    BadType {
        expected: VariantType,
        actual: VariantType,
    },

    /// Typed array or dictionary holds another element type.
    BadElementType {
        expected: VariantType,
        actual: VariantType,
    },

    /// Value cannot be represented in target type's domain.
    BadValue,

    /// Integer does not match any enumerator.
    InvalidEnum,

    WrongClass {
        expected: &'static str,
    },
}

impl FromVariantError {
    pub fn into_error(self, value: &Variant) -> ConvertError {
        ConvertError::with_kind_value(ErrorKind::FromVariant(self), value)
    }
}

impl fmt::Display for FromVariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadType { expected, actual } => {
                // Note: wording is the same as in CallError::failed_param_conversion_engine()
                write!(f, "expected type {expected:?}, got {actual:?}")
            }
            Self::BadElementType { expected, actual } => {
                write!(f, "expected elements of type {expected:?}, got {actual:?}")
            }
            Self::BadValue => write!(f, "value cannot be represented in target type's domain"),
            Self::InvalidEnum => write!(f, "invalid engine enum value"),
            Self::WrongClass { expected } => write!(f, "expected class {expected}"),
        }
    }
}

/// Conversion failed while reading a raw pointer slot.
#[derive(Eq, PartialEq, Debug)]
pub(crate) enum FromFfiError {
    NullRawGd,
    WrongObjectType,
    Char,
}

impl FromFfiError {
    pub fn into_error(self) -> ConvertError {
        ConvertError::with_kind(ErrorKind::FromFfi(self))
    }
}

impl fmt::Display for FromFfiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullRawGd => write!(f, "`Gd` cannot be null"),
            Self::WrongObjectType => write!(f, "given object cannot be cast to target type"),
            Self::Char => write!(f, "`char` cannot store the given value"),
        }
    }
}

fn __ensure_send_sync() {
    fn check<T: Send + Sync>() {}
    check::<ErasedConvertError>();
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_names_type() {
        struct Opaque;

        let err = ConvertError::unsupported::<Opaque>();
        assert!(err.is_unsupported());

        let msg = err.to_string();
        assert!(msg.starts_with("unsupported type for Variant conversion"), "{msg}");
        assert!(msg.contains("Opaque"), "{msg}");
    }

    #[test]
    fn custom_error_has_cause() {
        let err = ConvertError::new("broken");
        assert!(!err.is_unsupported());
        assert_eq!(err.cause().map(|c| c.to_string()), Some("broken".to_string()));
        assert!(err.value().is_none());
    }

    #[test]
    fn bad_type_wording() {
        let err = FromVariantError::BadType {
            expected: VariantType::Int,
            actual: VariantType::Bool,
        };

        assert_eq!(err.to_string(), "expected type Int, got Bool");
    }
}
