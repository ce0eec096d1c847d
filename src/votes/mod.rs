mod aggregator;
mod ledger;

pub use aggregator::VoteAggregator;
pub use ledger::VoteLedger;
