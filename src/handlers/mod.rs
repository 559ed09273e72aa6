mod health;
mod namespaces;
mod resources;
mod util;

pub use health::{health_check, readiness_check};
pub use namespaces::{delete_namespace, list_namespaces, put_namespace};
pub use resources::{SLUG, create_child, delete_resource, get_resource, put_resource};
pub use util::RESOURCE_ROOT;
