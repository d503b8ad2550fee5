//! # copilot-index
//!
//! The textbook side of retrieval: chunk extracted page text into
//! overlapping word windows, embed the chunks, persist them as a flat
//! vector index, and search it by inner product.
//!
//! ```rust,ignore
//! let pages = load_pages(Path::new("pages.json"))?;
//! IndexBuilder::new(1000, 800).build(&pages, &embedder, Path::new("index"))?;
//!
//! let index = FlatIndex::open(Path::new("index"), Box::new(embedder))?;
//! let hits = index.search("What is the Bellman optimality equation?", 6)?;
//! ```

pub mod builder;
pub mod chunk;
pub mod hashed;
pub mod store;
pub mod vector;

pub use builder::{load_pages, BuildSummary, IndexBuilder, PageText, PDF_SOURCE};
pub use chunk::chunk_words;
pub use hashed::HashedEmbedder;
pub use store::{ChunkRecord, FlatIndex, META_FILE, VECTORS_FILE};

// ── Tests ─────────────────────────────────────────────────────────────────────
