mod ingest;
mod markup;
mod templates;

pub use ingest::IngestPipeline;
pub use markup::check_markup;
pub use templates::{parse_id, TemplateService};
