//! # Mailclerk Store
//!
//! Durable job state: the [`dropbox::BlobStore`] seam, the Dropbox HTTP
//! implementation, and the typed JSON [`datastore::Datastore`] the jobs
//! persist through.

pub mod datastore;
pub mod dropbox;

pub use datastore::Datastore;
pub use dropbox::{BlobStore, DropboxClient};
