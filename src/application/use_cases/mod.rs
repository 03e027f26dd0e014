// ============================================================
// USE CASES
// ============================================================

pub mod conversion_session;
pub mod export;
pub mod record_builder;
pub mod title_resolver;
