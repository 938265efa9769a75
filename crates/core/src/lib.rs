mod apply;
mod blog;
mod config;
mod extract;
mod planner;
mod sources;
mod timestamp;
mod upload;

pub use apply::{apply_plan, ApplyError, ApplyResult, RenameOperation};
pub use blog::{
    caption_tag, display_shape, image_link, image_tag, parse_list, render_entry, render_tags,
    resolve_local_path, wrap_image, ListEntry, TagError, TagOptions, DEFAULT_BASE_URL,
};
pub use config::{app_paths, load_config, load_config_from, save_config_to, AppConfig, AppPaths};
pub use extract::{
    exif_key, modified_key, read_capture_time, ExtractError, KeyExtractor, KeySource,
};
pub use planner::{
    build_plan, PlanError, PlanOptions, PlanStats, RenameEntry, RenamePlan, DEFAULT_EXTENSION,
};
pub use sources::{collect_sources, SourceError, SourceOptions};
pub use timestamp::{TimestampKey, SENTINEL_KEY};
pub use upload::{
    upload_file, upload_list, ObjectStore, S3Store, StoreSettings, UploadError, DEFAULT_REGION,
};
