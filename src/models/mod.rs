mod api;

pub use api::{HealthResponse, NamespacesResponse, ResourceResponse};
