//! Analysis errors

use goxx_ast::TypeId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("Unknown type {0}")]
    UnknownType(TypeId),

    #[error("Type {id} is a {kind}, expected a named type")]
    NotNamed { id: TypeId, kind: &'static str },
}
