//! Architecture persistence for the Skyplan editor.

pub mod architecture;
pub mod file_store;
pub mod manager;
pub mod settings;
pub mod store;

pub use architecture::{Architecture, ArchitectureSummary};
pub use file_store::FileStore;
pub use manager::{
    InstallOutcome, LoadToken, LoadedArchitecture, PendingSave, PersistenceManager, SaveRequest,
    SaveTicket,
};
pub use settings::{read_settings, write_settings, EditorSettings};
pub use store::{ArchitectureStore, MemoryStore};
