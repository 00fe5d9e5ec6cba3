pub mod benefits;
pub mod fields;
pub mod layout;
pub mod numbers;
pub mod sections;
pub mod table;
pub mod vocabulary;

// Re-export key extraction types for convenience
pub use benefits::{
    extract_carryforward, extract_schedule, extract_tax_summary, BenefitKind, BenefitSchedule,
    CarryforwardAmounts, Province, TaxSummary, TotalSource,
};
pub use layout::{document_lines, PageWords, PositionedWord, DEFAULT_VERTICAL_TOLERANCE};
pub use numbers::NumberFormat;
pub use sections::{segment, segment_required, SectionKind, Sections};
pub use table::{RowAmounts, TableShape};
pub use vocabulary::{Language, Month, Vocabulary};
