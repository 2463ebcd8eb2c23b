// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    default_tax, AdvertType, AgentProfile, NewProperty, NewRating, ParseLabelError, Property, PropertyDetails,
    PropertyImages, PropertyType, PropertyView, Rating, ViewOutcome,
};
pub use requests::{ImageUploadRequest, ListPropertiesQuery, RatingRequest, SearchRequest};
pub use responses::{
    DeleteResponse, ErrorResponse, HealthResponse, MessageResponse, PaginatedResponse,
    PropertyResponse, RatingResponse,
};
