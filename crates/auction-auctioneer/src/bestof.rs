use auction_types::VoteResult;
use rand::seq::SliceRandom;
use thiserror::Error;

/// No representative in the bidding pool had room for the instance this
/// round.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("all the bidders were full")]
pub struct AllBiddersFull;

/// Picks a winner from a round's `Vote` replies.
///
/// Errored results are ignored. Ties are broken uniformly at random over the
/// full argmin set, so repeated identical-score rounds don't always favor
/// the same representative.
pub(crate) fn best_of(votes: &[VoteResult]) -> Result<(String, f64), AllBiddersFull> {
    let mut best_score = f64::INFINITY;
    let mut winners: Vec<&VoteResult> = Vec::new();

    for vote in votes {
        if !vote.is_ok() {
            continue;
        }
        if vote.score < best_score {
            best_score = vote.score;
            winners.clear();
            winners.push(vote);
        } else if vote.score == best_score {
            winners.push(vote);
        }
    }

    winners
        .choose(&mut rand::thread_rng())
        .map(|winner| (winner.rep.clone(), winner.score))
        .ok_or(AllBiddersFull)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn picks_the_lowest_score() {
        let votes = vec![
            VoteResult::ok("a", 0.5),
            VoteResult::ok("b", 0.1),
            VoteResult::ok("c", 0.9),
        ];
        let (winner, score) = best_of(&votes).unwrap();
        assert_eq!(winner, "b");
        assert_eq!(score, 0.1);
    }

    #[test]
    fn ignores_errored_votes() {
        let votes = vec![VoteResult::err("a", "full"), VoteResult::ok("b", 0.1)];
        let (winner, _) = best_of(&votes).unwrap();
        assert_eq!(winner, "b");
    }

    #[test]
    fn empty_or_all_errored_is_all_bidders_full() {
        assert_eq!(best_of(&[]), Err(AllBiddersFull));
        assert_eq!(best_of(&[VoteResult::err("a", "full")]), Err(AllBiddersFull));
    }

    #[test]
    fn ties_are_broken_roughly_uniformly() {
        let votes = vec![VoteResult::ok("a", 0.5), VoteResult::ok("b", 0.5)];
        let mut counts = HashMap::new();
        for _ in 0..10_000 {
            let (winner, _) = best_of(&votes).unwrap();
            *counts.entry(winner).or_insert(0) += 1;
        }
        let a = f64::from(*counts.get("a").unwrap_or(&0));
        let total = 10_000.0;
        assert!((0.45..=0.55).contains(&(a / total)), "a won {a} of {total}");
    }
}
