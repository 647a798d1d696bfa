pub mod consensus;
pub mod extractor;
pub mod formatter;
pub mod patterns;
pub mod record;

pub use consensus::{majority_vote, ConsensusAggregator, ConsensusStatus, HistoryBuffer};
pub use extractor::{extract, normalize};
pub use formatter::format_final;
pub use patterns::FieldPattern;
pub use record::{Field, FieldCandidates, FinalRecord, ScanProgress, FIELD_COUNT};
