//! Code generation errors

use thiserror::Error;

pub type CodegenResult<T> = std::result::Result<T, CodegenError>;

#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Unsupported construct: {construct}")]
    Unsupported { construct: String },

    #[error("Inconsistent type information for {node}: {message}")]
    InconsistentType { node: String, message: String },

    #[error("Structural mismatch: {message}")]
    StructuralMismatch { message: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<CodegenError>,
    },

    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl CodegenError {
    pub fn unsupported(construct: impl Into<String>) -> Self {
        Self::Unsupported {
            construct: construct.into(),
        }
    }

    pub fn inconsistent(node: impl ToString, message: impl Into<String>) -> Self {
        Self::InconsistentType {
            node: node.to_string(),
            message: message.into(),
        }
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::StructuralMismatch {
            message: message.into(),
        }
    }

    /// Wrap with the construct that was being generated
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, past any context wrappers
    pub fn root(&self) -> &CodegenError {
        match self {
            CodegenError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Context wrapping for code generation results
pub trait ResultExt<T> {
    fn context(self, context: impl FnOnce() -> String) -> CodegenResult<T>;
}

impl<T> ResultExt<T> for CodegenResult<T> {
    fn context(self, context: impl FnOnce() -> String) -> CodegenResult<T> {
        self.map_err(|e| e.context(context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_keeps_root() {
        let result: CodegenResult<()> = Err(CodegenError::unsupported("imaginary literal"));
        let err = result
            .context(|| "function `main`".to_string())
            .context(|| "file main.go".to_string())
            .unwrap_err();

        assert!(matches!(err.root(), CodegenError::Unsupported { .. }));
        assert_eq!(
            err.to_string(),
            "file main.go: function `main`: Unsupported construct: imaginary literal"
        );
    }
}
