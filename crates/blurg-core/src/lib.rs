//! blurg-core - Core library for blurg
//!
//! This crate contains the entry model, the local and remote diary backends,
//! the diary registry and the wire protocol shared by the `blurg` command line
//! and the `blurg-api` diary server.

pub mod config;
pub mod diary;
pub mod error;
pub mod feed;
pub mod kvfile;
pub mod models;
pub mod protocol;
pub mod registry;
pub mod util;

pub use config::ClientSettings;
pub use diary::{Diary, DiaryKind, EntryStore, LocalDiary, RemoteClient, RemoteDiary};
pub use error::{Error, ErrorKind, Result};
pub use feed::FeedQueue;
pub use models::{Entry, EntryId};
pub use registry::{DiaryListing, Registry};
