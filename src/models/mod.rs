pub mod listing;
pub mod result;

pub use listing::{Listing, RawListing, DEFAULT_CURRENCY};
pub use result::{AggregatedResult, ProductGroup};
