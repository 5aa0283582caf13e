pub mod claim;
pub mod evidence;
pub mod report;
pub mod verdict;

pub use claim::{Claim, EmptyClaim};
pub use evidence::EvidenceItem;
pub use report::{RunOutcome, VerificationReport};
pub use verdict::{Verdict, VerdictStatus, VerificationSummary};
