//! kicad-pcm-builder: publish KiCad component libraries through the PCM
//!
//! This library turns a library content directory and a base metadata file
//! into the files KiCad's Plugin and Content Manager consumes: a versioned
//! release archive, `packages.json` and `repository.json`.
//!
//! # Modules
//!
//! - [`config`] — Build configuration loading and validation
//! - [`error`] — Configuration error types
//! - [`pcm`] — Archives, checksums, index documents and the repository build

pub mod config;
pub mod error;
pub mod pcm;
