mod lazy;
mod providers;
mod resource;
mod service;
mod tag;

pub use lazy::*;
pub use providers::*;
pub use resource::*;
pub use service::*;
pub use tag::*;
