//! Case-management domain: users, cases, per-case chats and documents.
//!
//! Each entity has a repository translating between typed records and store
//! items. Operations that touch more than one entity go through
//! [`cascade::CascadeCoordinator`].

pub mod cascade;
pub mod cases;
pub mod chats;
pub mod credentials;
pub mod documents;
pub mod records;
pub mod users;

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::config::{CredentialsConfig, LookupMode, StorageConfig};
use crate::db::{Item, KeyValueStore, PRIMARY_KEY, StoreClient, scan_unique};
use crate::error::DatabaseError;

pub use cases::CaseRepository;
pub use chats::ChatRepository;
pub use credentials::Credentials;
pub use documents::DocumentRepository;
pub use records::{Case, Chat, Document, Message, User};
pub use users::UserRepository;

/// Length of generated entity ids.
pub const ID_LENGTH: usize = 16;

/// Random alphanumeric entity id. Uniqueness is assumed, not checked.
pub fn generate_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LENGTH)
        .map(char::from)
        .collect()
}

/// Strip the characters blob keys must not contain: spaces, colons, periods.
pub fn sanitize_blob_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | ':' | '.'))
        .collect()
}

/// Key for a file uploaded on its own: `<case_id>/<file name>`.
pub fn single_upload_key(case_id: &str, file_name: &str) -> String {
    sanitize_blob_key(&format!("{case_id}/{file_name}"))
}

/// Key for a file uploaded in a batch: `<case_id>/<timestamp><file name>`.
pub fn batch_upload_key(case_id: &str, timestamp: &str, file_name: &str) -> String {
    sanitize_blob_key(&format!("{case_id}/{timestamp}{file_name}"))
}

/// Fetch one item by id using the configured lookup mode.
///
/// An empty id never matches anything.
pub(crate) async fn fetch_by_id(
    store: &dyn KeyValueStore,
    table: &str,
    lookup: LookupMode,
    id: &str,
) -> Result<Option<Item>, DatabaseError> {
    if id.is_empty() {
        return Ok(None);
    }
    match lookup {
        LookupMode::Key => store.get(table, id).await,
        LookupMode::Scan => scan_unique(store, table, PRIMARY_KEY, id).await,
    }
}

/// All four entity repositories over one store client.
pub struct Repositories {
    pub users: UserRepository,
    pub cases: CaseRepository,
    pub documents: DocumentRepository,
    pub chats: ChatRepository,
}

impl Repositories {
    pub fn new(
        store: &StoreClient,
        storage: &StorageConfig,
        credentials: &CredentialsConfig,
    ) -> Self {
        let kv: Arc<dyn KeyValueStore> = Arc::clone(&store.kv);
        let lookup = storage.lookup_mode;
        Self {
            users: UserRepository::new(
                Arc::clone(&kv),
                storage.tables.users.clone(),
                lookup,
                Credentials::new(credentials.password_scheme),
            ),
            cases: CaseRepository::new(Arc::clone(&kv), storage.tables.cases.clone(), lookup),
            documents: DocumentRepository::new(
                Arc::clone(&kv),
                storage.tables.documents.clone(),
                lookup,
            ),
            chats: ChatRepository::new(kv, storage.tables.chats.clone(), lookup),
        }
    }
}
