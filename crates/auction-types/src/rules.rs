use serde::{
    Deserialize,
    Serialize,
};

/// Tunables governing how a single auction is run.
///
/// These travel with the [`crate::AuctionRequest`] rather than being pinned
/// to a single auctioneer process, so that a coordinator can vary them per
/// batch (e.g. a smaller `max_bidding_pool` for a latency-sensitive batch).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRules {
    #[serde(rename = "mr")]
    pub max_rounds: u32,
    #[serde(rename = "mb")]
    pub max_bidding_pool: usize,
    #[serde(rename = "mc")]
    pub max_concurrent: usize,
    #[serde(rename = "r")]
    pub repick_every_round: bool,
}

impl Default for AuctionRules {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            max_bidding_pool: 20,
            max_concurrent: 20,
            repick_every_round: true,
        }
    }
}
