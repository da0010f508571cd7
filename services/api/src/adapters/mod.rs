pub mod db;
pub mod genai;
pub mod storage;
pub mod topic_llm;

pub use db::DbAdapter;
pub use genai::GenAiAdapter;
pub use storage::CloudinaryAdapter;
pub use topic_llm::OpenAiTopicAdapter;
