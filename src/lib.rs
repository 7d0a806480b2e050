pub mod config;
pub mod error;
pub mod registry;
pub mod status;
pub mod store;

pub use config::{ConfigDocument, JobTemplate, MapperSpec, ParamSpec, TemplateSummary};
pub use error::{Result, StatusError};
pub use registry::{ConfigListing, ConfigRegistry, ConfigSource, FileSource, StaticSource};
pub use status::{JobDetail, JobListPage, JobSummary, ShardDetail, StatusReader};
pub use store::{
    Counters, JobRecord, JobStore, MemoryStore, PageCursor, ResultStatus, ShardRecord,
};
