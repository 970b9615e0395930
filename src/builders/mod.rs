//! Output builders: menu includes, template processing, view expressions.

pub mod includes;
pub mod template;
pub mod views;

pub use includes::IncludesBuilder;
pub use template::TemplateBuilder;
pub use views::ViewExpressionBuilder;

use thiserror::Error;

/// Processing-time failure while producing the output document.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to serialize output document: {0}")]
    Serialize(String),
}
