//! Discord message builders.

pub mod embeds;
