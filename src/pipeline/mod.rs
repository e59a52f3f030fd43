//! Request pipeline stages.
//!
//! Each submodule implements one step between the gateway event and the
//! conversion engine, so each can be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! event ──▶ input ──▶ (backend) ──▶ package
//! (envelope) (source)  (docling)    (zip)
//! ```
//!
//! 1. [`event`]   — unwrap the gateway envelope into a payload and a
//!    request line (method, path)
//! 2. [`input`]   — read conversion arguments and resolve the source to a URL
//!    or a scoped temp file
//! 3. [`package`] — render markdown with referenced images into a temp dir
//!    and zip it with flat, relative image links

pub mod event;
pub mod input;
pub mod package;
