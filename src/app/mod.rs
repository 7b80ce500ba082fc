pub mod api;
pub mod dto;

pub use api::EnhancementApi;
pub use dto::{EnhanceRequest, EnhanceResponse, TermInput};
