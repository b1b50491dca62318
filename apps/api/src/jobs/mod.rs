pub mod handlers;
pub mod ingest;
