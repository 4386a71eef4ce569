/*!
Tallies ranked ballots with the Copeland method.

Every pair of candidates is compared: the candidate ranked ahead by more ballots
wins the matchup and earns one point, a tied matchup earns half a point to each
side. The candidates with the highest score win the election.

```
use copeland_tally::*;

let names: Vec<String> = vec!["Alice".to_string(), "Bob".to_string(), "Carol".to_string()];
let ballots = vec![
    Ballot::new(vec![0, 1, 2]).with_count(2),
    Ballot::new(vec![1, 2, 0]),
];
assert_eq!(determine_winner(&names, &ballots), TallyResult::Winner("Alice".to_string()));
```
*/

pub mod builder;
mod config;
mod election;
pub mod manual;

use log::{debug, info};

use std::{
    cmp::Ordering,
    ops::AddAssign,
    sync::{
        atomic::{AtomicBool, Ordering as MemoryOrdering},
        Arc,
    },
    thread,
};

pub use crate::config::*;
pub use crate::election::Election;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

// Counts saturate at u64::MAX instead of overflowing.
impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(VoteCount::EMPTY, |acc, vc| VoteCount(acc.0.saturating_add(vc.0)))
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

// Rank position of a candidate that does not appear on a ballot.
const UNRANKED: u32 = u32::MAX;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
enum Preference {
    First,
    Second,
    Neither,
}

fn preference(first_rank: u32, second_rank: u32, rule: UnrankedRule) -> Preference {
    match (first_rank, second_rank) {
        (UNRANKED, UNRANKED) => Preference::Neither,
        (UNRANKED, _) | (_, UNRANKED) if rule == UnrankedRule::Abstain => Preference::Neither,
        (f, s) if f < s => Preference::First,
        (f, s) if s < f => Preference::Second,
        _ => Preference::Neither,
    }
}

/// The rank position of every candidate on every ballot.
///
/// Built once per tally so that each matchup reads positions directly instead of
/// searching the rankings again.
struct RankTable {
    candidate_count: usize,
    // One row of `candidate_count` positions per ballot.
    positions: Vec<u32>,
    counts: Vec<VoteCount>,
}

impl RankTable {
    fn build(candidate_count: usize, ballots: &[Ballot]) -> RankTable {
        let mut positions = vec![UNRANKED; candidate_count * ballots.len()];
        let mut counts: Vec<VoteCount> = Vec::with_capacity(ballots.len());
        for (b_idx, ballot) in ballots.iter().enumerate() {
            let row = &mut positions[b_idx * candidate_count..(b_idx + 1) * candidate_count];
            for (rank, cid) in ballot.ranking.iter().enumerate() {
                // Unknown candidates stay unranked. A repeated candidate keeps its best rank.
                if let Some(pos) = row.get_mut(*cid as usize) {
                    if *pos == UNRANKED {
                        *pos = rank as u32;
                    }
                }
            }
            counts.push(VoteCount(ballot.count));
        }
        RankTable {
            candidate_count,
            positions,
            counts,
        }
    }

    fn rank(&self, ballot: usize, cid: CandidateId) -> u32 {
        self.positions[ballot * self.candidate_count + cid.0 as usize]
    }

    fn tally_pair(&self, first: CandidateId, second: CandidateId, rule: UnrankedRule) -> PairTally {
        let mut prefers_first = VoteCount::EMPTY;
        let mut prefers_second = VoteCount::EMPTY;
        for (b_idx, count) in self.counts.iter().enumerate() {
            match preference(self.rank(b_idx, first), self.rank(b_idx, second), rule) {
                Preference::First => prefers_first += *count,
                Preference::Second => prefers_second += *count,
                Preference::Neither => {}
            }
        }
        PairTally {
            first,
            second,
            prefers_first,
            prefers_second,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct PairTally {
    first: CandidateId,
    second: CandidateId,
    prefers_first: VoteCount,
    prefers_second: VoteCount,
}

/// Shared flag to interrupt a running tally.
///
/// The flag is checked between two matchups.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, MemoryOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(MemoryOrdering::Relaxed)
    }
}

// All the matchups (i, j) with i < j, in lexicographic order.
fn candidate_pairs(candidate_count: usize) -> Vec<(CandidateId, CandidateId)> {
    let mut pairs = Vec::new();
    for i in 0..candidate_count {
        for j in (i + 1)..candidate_count {
            pairs.push((CandidateId(i as u32), CandidateId(j as u32)));
        }
    }
    pairs
}

fn tally_shard(
    table: &RankTable,
    shard: &[(CandidateId, CandidateId)],
    rule: UnrankedRule,
    cancel: &CancelToken,
) -> Result<Vec<PairTally>, VotingErrors> {
    let mut res: Vec<PairTally> = Vec::with_capacity(shard.len());
    for (first, second) in shard.iter() {
        if cancel.is_cancelled() {
            debug!("tally_shard: cancelled before matchup {:?}", (first, second));
            return Err(VotingErrors::Cancelled);
        }
        res.push(table.tally_pair(*first, *second, rule));
    }
    Ok(res)
}

/// The number of threads to use, never more than the matchups or the available cores.
fn shard_count(parallelism: Parallelism, num_pairs: usize) -> usize {
    let requested = match parallelism {
        Parallelism::Threads(n) if n > 1 => n as usize,
        _ => return 1,
    };
    let cores = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    requested.min(cores).min(num_pairs).max(1)
}

/// Tallies all the matchups, possibly split across threads.
///
/// Each thread only writes to its own list of matchups. The lists are concatenated
/// in shard order, so the output does not depend on the number of threads.
fn pairwise_tallies(
    table: &RankTable,
    rules: &TallyRules,
    cancel: &CancelToken,
) -> Result<Vec<PairTally>, VotingErrors> {
    let pairs = candidate_pairs(table.candidate_count);
    let rule = rules.unranked_rule;
    let num_shards = shard_count(rules.parallelism, pairs.len());
    if num_shards <= 1 {
        return tally_shard(table, &pairs, rule, cancel);
    }

    let shard_len = (pairs.len() + num_shards - 1) / num_shards;
    debug!(
        "pairwise_tallies: {:?} matchups in shards of {:?}",
        pairs.len(),
        shard_len
    );
    thread::scope(|s| -> Result<Vec<PairTally>, VotingErrors> {
        let handles: Vec<_> = pairs
            .chunks(shard_len)
            .map(|shard| s.spawn(move || tally_shard(table, shard, rule, cancel)))
            .collect();
        let mut res: Vec<PairTally> = Vec::with_capacity(pairs.len());
        for handle in handles {
            match handle.join() {
                Ok(shard_res) => res.extend(shard_res?),
                Err(e) => std::panic::resume_unwind(e),
            }
        }
        Ok(res)
    })
}

fn accumulate_scores(candidate_count: usize, tallies: &[PairTally]) -> ScoreVector {
    let mut half_points: Vec<u64> = vec![0; candidate_count];
    for t in tallies.iter() {
        match t.prefers_first.cmp(&t.prefers_second) {
            Ordering::Greater => half_points[t.first.0 as usize] += 2,
            Ordering::Less => half_points[t.second.0 as usize] += 2,
            Ordering::Equal => {
                half_points[t.first.0 as usize] += 1;
                half_points[t.second.0 as usize] += 1;
            }
        }
    }
    ScoreVector { half_points }
}

/// Computes the Copeland score of every candidate.
///
/// Returns `None` when no ballot was cast. The computation is always sequential,
/// see [`run_tally`] for the threaded version.
pub fn compute_scores(
    candidate_count: usize,
    ballots: &[Ballot],
    rules: &TallyRules,
) -> Option<ScoreVector> {
    if ballots.is_empty() {
        return None;
    }
    let table = RankTable::build(candidate_count, ballots);
    let tallies: Vec<PairTally> = candidate_pairs(candidate_count)
        .iter()
        .map(|(first, second)| table.tally_pair(*first, *second, rules.unranked_rule))
        .collect();
    Some(accumulate_scores(candidate_count, &tallies))
}

/// Finds the candidates with the highest score.
///
/// All the candidates sharing the highest score are returned, in candidate order.
pub fn resolve_winner(scores: ScoreVector, candidate_names: &[String]) -> TallyResult {
    let mut max_score: Option<u64> = None;
    let mut leaders: Vec<usize> = Vec::new();
    for (pos, hp) in scores.half_points.iter().enumerate() {
        match max_score {
            Some(m) if *hp < m => {}
            Some(m) if *hp == m => leaders.push(pos),
            _ => {
                max_score = Some(*hp);
                leaders.clear();
                leaders.push(pos);
            }
        }
    }
    debug!("resolve_winner: leaders: {:?} score: {:?}", leaders, max_score);

    let name_of = |pos: usize| {
        candidate_names
            .get(pos)
            .cloned()
            .unwrap_or_else(|| format!("candidate #{}", pos))
    };
    match leaders.as_slice() {
        [] => TallyResult::NoVotes,
        [pos] => TallyResult::Winner(name_of(*pos)),
        _ => TallyResult::Tie(leaders.iter().map(|pos| name_of(*pos)).collect()),
    }
}

/// Determines the winner of an election.
///
/// Arguments:
/// * `candidate_names` the candidates, in the order the ballot rankings refer to
/// * `ballots` the rankings, as positions in `candidate_names`
pub fn determine_winner(candidate_names: &[String], ballots: &[Ballot]) -> TallyResult {
    match compute_scores(candidate_names.len(), ballots, &TallyRules::DEFAULT_RULES) {
        None => TallyResult::NoVotes,
        Some(scores) => resolve_winner(scores, candidate_names),
    }
}

/// Runs the tally and collects the statistics of every matchup.
pub fn run_tally(
    election: &Election,
    ballots: &[Ballot],
    rules: &TallyRules,
) -> Result<TallyReport, VotingErrors> {
    run_tally_with_cancel(election, ballots, rules, &CancelToken::new())
}

pub fn run_tally_with_cancel(
    election: &Election,
    ballots: &[Ballot],
    rules: &TallyRules,
    cancel: &CancelToken,
) -> Result<TallyReport, VotingErrors> {
    info!(
        "Processing {:?} ballots, {:?} candidates, rules: {:?}",
        ballots.len(),
        election.candidate_count(),
        rules
    );
    election.check_ordering(ballots)?;

    for (idx, c) in election.candidates().iter().enumerate() {
        info!("Candidate: {}: {}", idx, c.name);
    }

    for (idx, b) in ballots.iter().enumerate() {
        debug!("Ballot {}: {:?} x{}", b.label(idx), b.ranking, b.count);
    }

    let total: VoteCount = ballots.iter().map(|b| VoteCount(b.count)).sum();
    if ballots.is_empty() || election.candidate_count() == 0 {
        info!("Outcome: {}", TallyResult::NoVotes);
        return Ok(TallyReport {
            result: TallyResult::NoVotes,
            scores: vec![],
            pairwise: vec![],
            ballots: total.0,
        });
    }

    let table = RankTable::build(election.candidate_count(), ballots);
    let tallies = pairwise_tallies(&table, rules, cancel)?;
    let scores = accumulate_scores(election.candidate_count(), &tallies);

    let names = election.candidate_names();
    let mut pairwise: Vec<PairwiseStats> = Vec::with_capacity(tallies.len());
    for t in tallies.iter() {
        debug!(
            "run_tally: {} vs {}: {:?} - {:?}",
            names[t.first.0 as usize],
            names[t.second.0 as usize],
            t.prefers_first.0,
            t.prefers_second.0
        );
        pairwise.push(PairwiseStats {
            first: names[t.first.0 as usize].clone(),
            second: names[t.second.0 as usize].clone(),
            prefers_first: t.prefers_first.0,
            prefers_second: t.prefers_second.0,
        });
    }
    let named_scores: Vec<(String, f64)> = names.iter().cloned().zip(scores.scores()).collect();
    for (name, score) in named_scores.iter() {
        info!("{:>8} {}", score, name);
    }

    let result = resolve_winner(scores, &names);
    info!("Outcome: {}", result);
    Ok(TallyReport {
        result,
        scores: named_scores,
        pairwise,
        ballots: total.0,
    })
}
