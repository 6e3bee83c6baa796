// Job Catalog: postings keyed by title, with per-title locking for cascades.

pub mod catalog;
pub mod handlers;
pub mod locks;
