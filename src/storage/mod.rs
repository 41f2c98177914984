pub mod blob_store;
pub mod hash;
pub mod record_store;

pub use blob_store::{BlobStore, NameResolver, StoredBlob, original_file_name};
pub use hash::{compute_hash, is_record_id, record_id};
pub use record_store::RecordStore;
