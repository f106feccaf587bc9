//! Concrete model loaders.

#[cfg(feature = "fasttext")]
pub mod fasttext;
