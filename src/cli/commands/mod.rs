mod index;
mod info;
mod query;
mod serve;

pub use index::IndexArgs;
pub use info::InfoArgs;
pub use query::{QueryArgs, run_interactive};
pub use serve::ServeArgs;

pub use index::handle_index;
pub use info::handle_info;
pub use query::handle_query;
pub use serve::handle_serve;
