//! Soundground Core - catalog browsing engine
//!
//! This crate provides everything that does not touch the terminal:
//! the collaborator interfaces (playback, metadata extraction, credential
//! storage), the shared list entry store, the bounded metadata fetch pool
//! and the command vocabulary.

pub mod command;
pub mod credentials;
pub mod entry;
pub mod fetch;
pub mod metadata;
pub mod playback;
pub mod signal;

pub use command::{ Command, CommandError };
pub use credentials::{ CredentialError, CredentialStore, Credentials, JsonCredentialFile };
pub use entry::{ EntryStatus, EntryStore, ListEntry };
pub use fetch::{ FetchJob, FetchPool };
pub use metadata::{ ExtractError, MetadataSource, TrackInfo };
pub use playback::{ NullPlayback, Playback, PlaybackError };
pub use signal::RedrawSignal;
