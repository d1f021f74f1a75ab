//! The stateless single-auction algorithm: given a pool client and a
//! placement request, runs the multi-round auction for one instance.

mod bestof;
mod random_subset;
mod run;

use bestof::best_of;
use random_subset::random_subset;

pub use bestof::AllBiddersFull;
pub use run::auction;
