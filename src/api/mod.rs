pub mod path;
pub mod payload;
pub mod query;

pub use path::Path;
pub use payload::{Payload, Upload};
pub use query::ListQuery;
