//! Cross-cutting helpers.

pub mod xml;
