// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generation errors.
//!
//! Every variant is scoped to one entity (struct, field, parameter, callback,
//! constant). The generator records them in the report and keeps emitting
//! the sibling entities.

use thiserror::Error;

/// Raised by the type resolver for syntax it does not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported type `{0}`")]
pub struct UnsupportedType(pub String);

/// Entity-level generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("{entity}: unsupported type `{raw}`")]
    UnsupportedType { entity: String, raw: String },

    #[error("{entity}: unresolved named type `{name}`")]
    UnresolvedNamedType { entity: String, name: String },

    #[error("struct `{name}` has no layout fact for {platform}")]
    MissingLayoutFact { name: String, platform: String },

    #[error("field `{strukt}.{field}` has no layout fact for {platform}")]
    MissingFieldFact {
        strukt: String,
        field: String,
        platform: String,
    },

    #[error("callback id {id} is used by both `{first}` and `{second}`")]
    DuplicateCallbackId {
        id: i32,
        first: String,
        second: String,
    },

    #[error("callback payload `{name}`: field `{field}` has non-extern type `{ty}`")]
    NonExternPayload {
        name: String,
        field: String,
        ty: String,
    },

    #[error("constant `{name}`: cannot translate value `{value}`")]
    InvalidConstant { name: String, value: String },

    #[error("enum `{owner}`: value `{name} = {value}` does not fit in 32 bits")]
    InvalidEnumValue {
        owner: String,
        name: String,
        value: String,
    },
}

impl GenError {
    pub fn unsupported(entity: impl Into<String>, err: UnsupportedType) -> Self {
        Self::UnsupportedType {
            entity: entity.into(),
            raw: err.0,
        }
    }

    /// Fatal errors drop the entity; the rest degrade it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MissingFieldFact { .. })
    }
}
