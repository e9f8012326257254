pub mod open_er_api;
pub mod util;

pub use open_er_api::OpenErApiProvider;
