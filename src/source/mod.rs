// Resource fetch abstraction — pluggable backends, HTTP provided.

pub mod http_source;
pub mod traits;

pub use http_source::HttpSource;
pub use traits::{FetchedResource, ResourceSource};
