//! Routing, resource binding and response rendering.

pub mod cache;
pub mod html;
pub mod request;
pub mod resource;
pub mod response;
pub mod router;
pub mod template;
pub mod value;

pub use cache::{Cache, CacheBackend, MemoryCache};
pub use html::{Markup, escape};
pub use request::{Param, Request, Session, UploadedFile};
pub use resource::resource;
pub use response::{Rendered, Response, content_type_for};
pub use router::{Arg, Args, Handler, HandlerResult, Methods, Router, handler};
pub use template::{FsTemplates, MemoryTemplates, Registry, TemplateStore, Templates};
pub use value::{Locatable, Value, Variables};
