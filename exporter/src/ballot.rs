//! Weighted exchange-rate ballot tally.
//!
//! A [`Ballot`] collects the exchange-rate votes submitted by validators
//! for a single denom and derives the consensus rate as a power-weighted
//! median, which is robust against outlier submissions from low-power
//! voters. The tally is pure and synchronous; callers fetch the votes,
//! tally them, and discard the ballot.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// A single validator vote prepared for tallying.
///
/// An `exchange_rate` of zero denotes an abstention; abstentions keep
/// their slot in the ballot so that downstream length-based bookkeeping
/// (claims, win counts) stays aligned with the validator set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteForTally {
    /// Denom this vote prices.
    pub denom: String,
    /// Submitted exchange rate; zero for abstain.
    pub exchange_rate: Decimal,
    /// Voting validator, as an operator address string.
    pub voter: String,
    /// Voting power backing this vote.
    pub power: i64,
}

impl VoteForTally {
    pub fn new(
        exchange_rate: Decimal,
        denom: impl Into<String>,
        voter: impl Into<String>,
        power: i64,
    ) -> Self {
        Self {
            denom: denom.into(),
            exchange_rate,
            voter: voter.into(),
            power,
        }
    }
}

/// Ordered sequence of votes for one denom.
///
/// The percentile operations ([`Ballot::weighted_median`]) require the
/// ballot to be sorted ascending by exchange rate. Sorting is an explicit
/// step (`sort` / `to_cross_rate_sorted`), not a side effect.
#[derive(Clone, Debug, Default)]
pub struct Ballot(pub Vec<VoteForTally>);

impl Ballot {
    pub fn new(votes: Vec<VoteForTally>) -> Self {
        Self(votes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total voting power in the ballot, abstentions included.
    pub fn power(&self) -> i64 {
        self.0.iter().map(|v| v.power).sum()
    }

    /// Organizes the ballot into a voter -> rate map.
    ///
    /// Only positive rates are included; abstentions carry no usable
    /// reference rate.
    pub fn to_map(&self) -> HashMap<String, Decimal> {
        self.0
            .iter()
            .filter(|v| v.exchange_rate.is_sign_positive() && !v.exchange_rate.is_zero())
            .map(|v| (v.voter.clone(), v.exchange_rate))
            .collect()
    }

    /// Re-expresses each vote against a different reference asset.
    ///
    /// For a vote with rate `r` and a reference rate `b` for the same
    /// voter, the cross rate is `b / r`. A voter with no reference rate,
    /// or with a non-positive rate, becomes an abstention (rate 0,
    /// power 0) rather than being dropped; dropping would bias the power
    /// denominator of the median.
    pub fn to_cross_rate(&self, bases: &HashMap<String, Decimal>) -> Ballot {
        let votes = self
            .0
            .iter()
            .map(|vote| {
                let positive =
                    vote.exchange_rate.is_sign_positive() && !vote.exchange_rate.is_zero();
                let cross = bases
                    .get(&vote.voter)
                    .filter(|_| positive)
                    .and_then(|base| base.checked_div(vote.exchange_rate));
                match cross {
                    Some(rate) => VoteForTally {
                        exchange_rate: rate,
                        power: vote.power,
                        ..vote.clone()
                    },
                    None => VoteForTally {
                        exchange_rate: Decimal::ZERO,
                        power: 0,
                        ..vote.clone()
                    },
                }
            })
            .collect();
        Ballot(votes)
    }

    /// [`Ballot::to_cross_rate`] followed by an ascending sort, ready for
    /// the median.
    pub fn to_cross_rate_sorted(&self, bases: &HashMap<String, Decimal>) -> Ballot {
        let mut cb = self.to_cross_rate(bases);
        cb.sort();
        cb
    }

    /// Sorts the ballot ascending by exchange rate.
    pub fn sort(&mut self) {
        self.0.sort_by(|a, b| a.exchange_rate.cmp(&b.exchange_rate));
    }

    pub fn is_sorted(&self) -> bool {
        self.0
            .windows(2)
            .all(|w| w[0].exchange_rate <= w[1].exchange_rate)
    }

    /// Returns the power-weighted median exchange rate.
    ///
    /// Contract: the ballot must be sorted ascending by rate. Walks the
    /// votes accumulating power and returns the rate of the first vote at
    /// which the running total reaches half of the ballot power.
    pub fn weighted_median(&self) -> Decimal {
        let total_power = self.power();
        let mut pivot = 0i64;
        for vote in &self.0 {
            pivot += vote.power;
            if pivot >= total_power / 2 {
                return vote.exchange_rate;
            }
        }
        Decimal::ZERO
    }

    /// Like [`Ballot::weighted_median`], but panics if the ballot is not
    /// sorted. A caller that promised a sorted ballot and did not supply
    /// one is a programming error; a silently wrong median is worse than
    /// stopping.
    pub fn weighted_median_checked(&self) -> Decimal {
        if !self.is_sorted() {
            panic!("ballot must be sorted");
        }
        self.weighted_median()
    }

    /// Population standard deviation of the rates around `median`,
    /// weighted uniformly (not by power).
    ///
    /// The decimal inputs are unbounded enough that squaring a deviation
    /// can overflow the accumulator; any overflow degrades to a zero
    /// result instead of panicking.
    pub fn standard_deviation(&self, median: Decimal) -> Decimal {
        if self.0.is_empty() {
            return Decimal::ZERO;
        }

        let mut sum = Decimal::ZERO;
        for vote in &self.0 {
            let deviation = match vote.exchange_rate.checked_sub(median) {
                Some(d) => d,
                None => return Decimal::ZERO,
            };
            let squared = match deviation.checked_mul(deviation) {
                Some(s) => s,
                None => return Decimal::ZERO,
            };
            sum = match sum.checked_add(squared) {
                Some(s) => s,
                None => return Decimal::ZERO,
            };
        }

        let count = Decimal::from(self.0.len() as u64);
        let variance = match sum.checked_div(count) {
            Some(v) => v,
            None => return Decimal::ZERO,
        };

        // The square root goes through f64; rates that do not round-trip
        // cleanly lose precision here, matching the tolerance of the
        // overflow fallback above.
        variance
            .to_f64()
            .map(f64::sqrt)
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Reward-eligibility record derived from one tally pass.
///
/// Consumed by an external reward-distribution engine; carries no
/// persistent identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    pub power: i64,
    pub weight: i64,
    pub win_count: i64,
    pub did_vote: bool,
    pub recipient: String,
}

impl Claim {
    pub fn new(
        power: i64,
        weight: i64,
        win_count: i64,
        recipient: impl Into<String>,
        did_vote: bool,
    ) -> Self {
        Self {
            power,
            weight,
            win_count,
            did_vote,
            recipient: recipient.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(rate: &str, power: i64) -> VoteForTally {
        VoteForTally::new(rate.parse().expect("rate literal"), "usei", "valoper", power)
    }

    #[test]
    fn power_sums_all_votes() {
        let ballot = Ballot::new(vec![vote("1.0", 10), vote("2.0", 20), vote("0", 5)]);
        assert_eq!(ballot.power(), 35);
    }

    #[test]
    fn weighted_median_even_powers() {
        let ballot = Ballot::new(vec![vote("1", 10), vote("2", 10), vote("3", 10)]);
        // Cumulative power reaches 15/30 at the second vote.
        assert_eq!(ballot.weighted_median(), Decimal::from(2));
    }

    #[test]
    fn weighted_median_single_vote() {
        let ballot = Ballot::new(vec![vote("5", 100)]);
        assert_eq!(ballot.weighted_median(), Decimal::from(5));
    }

    #[test]
    fn weighted_median_empty_is_zero() {
        assert_eq!(Ballot::default().weighted_median(), Decimal::ZERO);
    }

    #[test]
    fn weighted_median_skewed_powers() {
        let ballot = Ballot::new(vec![vote("1", 1), vote("2", 1), vote("3", 100)]);
        assert_eq!(ballot.weighted_median(), Decimal::from(3));
    }

    #[test]
    #[should_panic(expected = "ballot must be sorted")]
    fn checked_median_rejects_unsorted() {
        let ballot = Ballot::new(vec![vote("3", 10), vote("1", 10)]);
        ballot.weighted_median_checked();
    }

    #[test]
    fn checked_median_accepts_sorted() {
        let ballot = Ballot::new(vec![vote("1", 10), vote("3", 10)]);
        assert_eq!(ballot.weighted_median_checked(), Decimal::from(1));
    }

    #[test]
    fn cross_rate_missing_base_becomes_abstention() {
        let ballot = Ballot::new(vec![
            VoteForTally::new("2".parse().unwrap(), "uusd", "val-a", 10),
            VoteForTally::new("4".parse().unwrap(), "uusd", "val-b", 20),
        ]);

        let mut bases = HashMap::new();
        bases.insert("val-a".to_string(), Decimal::from(8));

        let cross = ballot.to_cross_rate(&bases);
        assert_eq!(cross.len(), 2, "abstentions must not be dropped");
        assert_eq!(cross.0[0].exchange_rate, Decimal::from(4)); // 8 / 2
        assert_eq!(cross.0[0].power, 10);
        assert_eq!(cross.0[1].exchange_rate, Decimal::ZERO);
        assert_eq!(cross.0[1].power, 0);
    }

    #[test]
    fn cross_rate_zero_rate_becomes_abstention() {
        let ballot = Ballot::new(vec![VoteForTally::new(Decimal::ZERO, "uusd", "val-a", 10)]);
        let mut bases = HashMap::new();
        bases.insert("val-a".to_string(), Decimal::from(8));

        let cross = ballot.to_cross_rate(&bases);
        assert_eq!(cross.0[0].exchange_rate, Decimal::ZERO);
        assert_eq!(cross.0[0].power, 0);
    }

    #[test]
    fn cross_rate_sorted_orders_ascending() {
        let ballot = Ballot::new(vec![
            VoteForTally::new("2".parse().unwrap(), "uusd", "val-a", 10),
            VoteForTally::new("8".parse().unwrap(), "uusd", "val-b", 10),
        ]);
        let mut bases = HashMap::new();
        bases.insert("val-a".to_string(), Decimal::from(8)); // cross 4
        bases.insert("val-b".to_string(), Decimal::from(8)); // cross 1

        let cross = ballot.to_cross_rate_sorted(&bases);
        assert!(cross.is_sorted());
        assert_eq!(cross.0[0].exchange_rate, Decimal::from(1));
    }

    #[test]
    fn to_map_skips_abstentions() {
        let ballot = Ballot::new(vec![
            VoteForTally::new("2".parse().unwrap(), "uusd", "val-a", 10),
            VoteForTally::new(Decimal::ZERO, "uusd", "val-b", 10),
        ]);
        let map = ballot.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("val-a"), Some(&Decimal::from(2)));
    }

    #[test]
    fn standard_deviation_empty_is_zero() {
        assert_eq!(
            Ballot::default().standard_deviation(Decimal::from(2)),
            Decimal::ZERO
        );
    }

    #[test]
    fn standard_deviation_constant_rates_is_zero() {
        let ballot = Ballot::new(vec![vote("2", 1), vote("2", 1), vote("2", 1)]);
        assert_eq!(ballot.standard_deviation(Decimal::from(2)), Decimal::ZERO);
    }

    #[test]
    fn standard_deviation_simple_spread() {
        // Rates 1 and 3 around median 2: variance 1, deviation 1.
        let ballot = Ballot::new(vec![vote("1", 1), vote("3", 1)]);
        assert_eq!(ballot.standard_deviation(Decimal::from(2)), Decimal::from(1));
    }

    #[test]
    fn standard_deviation_overflow_falls_back_to_zero() {
        let huge = Decimal::MAX;
        let ballot = Ballot::new(vec![VoteForTally::new(huge, "uusd", "val-a", 1)]);
        assert_eq!(ballot.standard_deviation(Decimal::MIN), Decimal::ZERO);
    }

    #[test]
    fn claim_carries_vote_outcome() {
        let claim = Claim::new(10, 1, 3, "valoper1xyz", true);
        assert!(claim.did_vote);
        assert_eq!(claim.win_count, 3);
        assert_eq!(claim.recipient, "valoper1xyz");
    }
}
