pub mod client;
pub mod method;
pub mod request;
pub mod response;

pub use client::Dispatcher;
pub use method::HttpMethod;
pub use request::ResolvedRequest;
pub use response::{ErrorKind, HttpResponse, Outcome, ResponseBody};
