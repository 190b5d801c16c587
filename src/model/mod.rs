//! Types that represent the core data model: amounts, reporting periods, tax slabs and records.
mod amount;
pub mod insights;
pub mod period;
pub mod record;
pub mod tax;

pub use amount::{Amount, AmountError};
pub use insights::{economic_insights, tax_summary, CategoryExpense, ErlInsights, TaxSummary};
pub use period::{resolve_period, CustomRange, DateRange, Period};
pub use record::{
    summarize, CategoryBreakdown, FinancialRecord, RecordError, Source, Summary, TransactionType,
};
pub use tax::{SlabOption, TaxPreview, TaxSlab, TaxType};
