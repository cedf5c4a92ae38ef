//! Routes: resolving a request to a router and driving it to a destination.

mod guard;
mod dispatch;
mod request;
mod service_route;

pub use request::RouteRequest;
pub use service_route::ServiceRoute;
