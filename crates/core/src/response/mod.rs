//! Response construction for failed requests

pub mod builder;
pub mod suggestions;

pub use builder::ResponseBuilder;
pub use suggestions::SuggestionCatalog;
