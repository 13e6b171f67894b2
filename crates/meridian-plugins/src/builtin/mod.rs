//! Built-in plugins installed by default or opted into by callers

mod cache_control;
mod disallow_get_mutations;
mod inline_trace;
mod landing_page;
mod schema_reporting;
mod usage_reporting;

pub use cache_control::CacheControlPlugin;
pub use disallow_get_mutations::DisallowGetMutationsPlugin;
pub use inline_trace::{InlineTracePlugin, FTV1, INCLUDE_TRACE_HEADER};
pub use landing_page::{DefaultLandingPagePlugin, LandingPageDisabledPlugin};
pub use schema_reporting::SchemaReportingPlugin;
pub use usage_reporting::{OperationStats, UsageReportingPlugin};
