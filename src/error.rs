//! Hard failures. Everything recoverable in the core fails soft instead
//! (`Option` / `bool`), so this enum only carries configuration errors.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    /// A local `$ref` points at a location that does not exist.
    #[error("unresolvable $ref '{reference}' at schema pointer '{pointer}'")]
    UnresolvableRef { pointer: String, reference: String },

    /// Only `#...` fragments resolve; there is no retriever for anything else.
    #[error("external $ref '{reference}' at schema pointer '{pointer}' is not supported")]
    ExternalRef { pointer: String, reference: String },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// The validator collaborator refused to compile the resolved schema.
    #[error("validator build error: {0}")]
    ValidatorBuild(String),

    #[error("invalid form options: {0}")]
    Options(String),
}

pub type Result<T> = std::result::Result<T, FormError>;
