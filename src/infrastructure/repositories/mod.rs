pub mod azure_batch_repository;
pub mod azure_tts_repository;
pub mod batch_synthesis_repository;
pub mod tts_repository;

pub use azure_batch_repository::AzureBatchRepository;
pub use azure_tts_repository::AzureTtsRepository;
pub use batch_synthesis_repository::{BatchSynthesisRepository, RemoteError};
pub use tts_repository::TtsRepository;
