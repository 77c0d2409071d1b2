pub mod part;

pub use part::{
    BatchItem, CacheEntry, CandidateRecord, CatalogHit, ComponentInput, Provenance, QueryResult,
};
