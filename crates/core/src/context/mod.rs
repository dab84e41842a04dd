//! Token-budgeted assembly of the summarizer input.

pub mod allocator;
pub mod policy;

pub use allocator::{
    AllocationOutcome, AssembledContext, ContextAllocator, ContextDiagnostics, ContextInput,
    rank_comments,
};
pub use policy::BudgetPolicy;
