pub mod agent_state;
pub mod db;

pub use agent_state::{AgentState, MemorySource, UNAVAILABLE_PREFIX};
pub use db::{PetmindDb, DEFAULT_DB_PATH};
