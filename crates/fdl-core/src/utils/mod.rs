//! Small pure helpers shared by the adapters.

pub mod filename;

pub use filename::{
    FALLBACK_STEM, derive_filename, extension_for_content_type, partial_path,
    resolve_destination, sanitize_filename,
};
