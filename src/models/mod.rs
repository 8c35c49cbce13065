mod template;

pub use template::{NewTemplate, RenameRequest, TemplateRecord, TemplateResponse};
