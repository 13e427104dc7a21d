pub mod chunking;
pub mod domain;
pub mod hashtag;
pub mod keys;
pub mod mentions;
pub mod ports;
pub mod prompt;
pub mod repository;

pub use domain::{Book, Character, Location, Page, PageBeat, RollingSummary, WorldRule};
pub use ports::{
    classify_model_failure, PortError, PortResult, TableEntity, TableStore, TextGenerationService,
    UpdateMode,
};
pub use prompt::AssembledPrompt;
pub use repository::StoryRepository;
