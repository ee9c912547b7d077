//! # arxsync-source
//!
//! arXiv API client implementing [`arxsync_core::PageSource`].
//!
//! [`ArxivClient`] performs the HTTP request, [`atom::parse_feed`] turns the
//! Atom response into a [`arxsync_core::Page`], and [`query`] holds the
//! category presets.

pub mod atom;
pub mod client;
pub mod query;

pub use client::{ArxivClient, MAX_PAGE_SIZE};
