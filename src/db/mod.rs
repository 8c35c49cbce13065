mod repository;
mod schema;

pub use repository::TemplateStore;
