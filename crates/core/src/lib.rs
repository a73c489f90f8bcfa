//! Core library for dentdoc
//!
//! This crate implements the **Functional Core** of the dentdoc service,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! The project is split across three crates:
//!
//! - **`dentdoc_core`** (this crate): request models, layout tables and HTML
//!   rendering with zero I/O
//! - **`dentdoc_pdf`**: PDF composition (text overlay and background merge)
//!   on in-memory byte buffers
//! - **`dentdoc`**: the HTTP service, browser driver and export client (the
//!   Imperative Shell)
//!
//! Nothing here reads a file, opens a socket or looks at the clock. Callers
//! hand in template text, today's date and decoded assets; the functions
//! hand back values.
//!
//! # Module Organization
//!
//! - [`document`]: the `/generate-pdf` request body and its validated form
//! - [`page`]: paper size, margins and CSS length parsing
//! - [`layout`]: field anchor points per document type and their overrides
//! - [`fields`]: the text drawn for each field by the background-text mode
//! - [`wrap`]: width-bounded line wrapping
//! - [`template`]: Handlebars rendering of the document templates
//! - [`logo`]: logo source selection and data URL handling
//! - [`fallback`]: simplified HTML used when the service is unreachable
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use dentdoc_core::document::DocumentRequest;
//! use dentdoc_core::template::{template_data, TemplateRenderer};
//!
//! let request = DocumentRequest::from_json(br#"{"template":"certificate","data":{}}"#)?;
//! let renderer = TemplateRenderer::builtin();
//! let html = renderer.render("certificate", &template_data(&data, "09/11/2024", None))?;
//! ```

pub mod document;
pub mod fallback;
pub mod fields;
pub mod layout;
pub mod logo;
pub mod page;
pub mod template;
pub mod wrap;
