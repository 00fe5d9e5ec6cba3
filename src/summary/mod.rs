pub mod cohort;
pub mod record;

pub use cohort::{group_cohorts, Cohort};
pub use record::{
    build_record, extract_client, run_batch, run_batch_with, BatchOutcome, ClientFailure, ClientFile,
    ClientYearRecord,
};
