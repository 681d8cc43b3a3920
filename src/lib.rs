//! s3nav - interactive object-storage navigator
//!
//! Maps a flat bucket/key namespace onto hierarchical directory semantics:
//! path model, listing cache, tab completion, and bookmark expansion.

pub mod bookmarks;
pub mod cache;
pub mod client;
pub mod command;
pub mod completion;
pub mod display;
pub mod error;
pub mod logger;
pub mod paths;
pub mod session;
pub mod tokeniser;
