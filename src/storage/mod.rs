mod paths;
mod staging;

pub use paths::PathMapping;
pub use staging::{split_filename, StagedUpload, StagingArea, STAGING_PREFIX};
