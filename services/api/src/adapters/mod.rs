pub mod memory_store;
pub mod pg_store;
pub mod story_llm;

pub use memory_store::InMemoryTableStore;
pub use pg_store::PgTableStore;
pub use story_llm::OpenAiStoryAdapter;
