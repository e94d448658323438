pub mod artifact_store;

pub use artifact_store::{output_file_name, uri_extension, ArtifactStore};
