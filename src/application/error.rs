use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{
        build::BuildError,
        diagnostics::{DiagnosticCode, DiagnosticError},
        store::StoreError,
    },
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Diagnostic(#[from] DiagnosticError),
    #[error(transparent)]
    Build(#[from] BuildError),
}

impl AppError {
    /// Diagnostic code behind the failure, when it has one.
    pub fn code(&self) -> Option<DiagnosticCode> {
        match self {
            AppError::Store(err) | AppError::Build(BuildError::Store(err)) => err.code(),
            AppError::Diagnostic(err) | AppError::Build(BuildError::Diagnostic(err)) => {
                Some(err.code)
            }
            AppError::Build(BuildError::Render(err)) => err.code(),
            _ => None,
        }
    }

    /// Every message in the error's source chain, outermost first.
    pub fn messages(&self) -> Vec<String> {
        let mut messages = vec![self.to_string()];
        let mut current = StdError::source(self);
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_failures_keep_their_code() {
        let err = AppError::from(BuildError::Diagnostic(DiagnosticError {
            code: DiagnosticCode::BAD_IMAGE_SRC,
            message: "missing.png".to_string(),
        }));

        assert_eq!(err.code(), Some(DiagnosticCode::BAD_IMAGE_SRC));
        assert_eq!(
            err.messages(),
            vec!["html-formatter.bad-image-src: missing.png".to_string()]
        );
    }

    #[test]
    fn configuration_failures_have_no_code() {
        let err = AppError::from(InfraError::configuration("bad"));
        assert_eq!(err.code(), None);
    }
}
