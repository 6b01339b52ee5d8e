//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one step. Keeping stages separate
//! makes each independently testable and lets the workflow and the
//! one-shot helpers in [`crate::analyze`] share them.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ encode ──▶ extract ◀── schema
//! (file)    (accept?)   (base64)   (one request)
//! ```
//!
//! 1. [`input`] holds the candidate file (name, declared type, bytes or path)
//! 2. [`validate`] accepts or rejects by extension and declared media type;
//!    it is pure and does no I/O
//! 3. [`encode`] reads the bytes and wraps them as base64 with a resolved
//!    media tag
//! 4. [`schema`] is the closed result contract sent to the service and
//!    used to check its answer
//! 5. [`extract`] makes the single extraction call and is the only
//!    stage with network I/O

pub mod encode;
pub mod extract;
pub mod input;
pub mod schema;
pub mod validate;
