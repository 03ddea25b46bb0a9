pub mod analytics;
pub mod dedupe;
pub mod pipeline;
pub mod refcheck;
pub mod report;
pub mod snapshot;
pub mod tracing;
pub mod validate;

pub mod util {
    pub mod env;
}
