//! Service modules for the submission pipeline

pub mod folio_generator;
pub mod json_path;
pub mod payload_mapper;
pub mod sequence_store;

pub use json_path::{extract_folio, get_by_path, PathError};
pub use payload_mapper::{map_to_payload, PayloadContext};
pub use sequence_store::SequenceStore;
