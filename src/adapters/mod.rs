// Adapters layer: 外部系統的具體實作（LLM 供應商、快取儲存）

pub mod memory_cache;
pub mod providers;
