// Core listing logic exports
pub mod filters;
pub mod ratings;
pub mod search;
pub mod slug;

pub use filters::{Condition, Field, Op, Page, Predicate, PropertyFilter, SortOrder, Value};
pub use ratings::{ensure_not_self, validate_rating_value, RatingError, RatingSummary};
pub use search::{LabelPolicy, SearchCriteria, SearchError};
