// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A registered candidate.
///
/// Candidates are identified by their position in the election ordering, the name
/// is only used for display and for mapping names written on ballots.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub name: String,
    pub code: Option<String>,
}

impl Candidate {
    pub fn new(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            code: None,
        }
    }
}

/// The digest of a candidate ordering.
///
/// Ballots carry the fingerprint of the ordering they were cast against, so that a
/// ballot is never scored against a reordered candidate list.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct OrderingFingerprint(pub String);

impl OrderingFingerprint {
    pub fn of<'a, I>(names: I) -> OrderingFingerprint
    where
        I: IntoIterator<Item = &'a str>,
    {
        // Length prefixes keep ["ab", "c"] and ["a", "bc"] apart.
        let mut buf = String::new();
        for name in names {
            buf.push_str(&format!("{}:{};", name.len(), name));
        }
        OrderingFingerprint(sha256::digest(buf.as_str()))
    }
}

impl Display for OrderingFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A ballot: the positions of the candidates, from the most preferred to the least preferred.
///
/// Positions that do not refer to a candidate of the election are treated as if the
/// candidate was not ranked at all.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Ballot {
    pub voter: Option<String>,
    pub ranking: Vec<u32>,
    /// The number of identical ballots this entry stands for.
    pub count: u64,
    pub ordering: Option<OrderingFingerprint>,
}

impl Ballot {
    pub fn new(ranking: Vec<u32>) -> Ballot {
        Ballot {
            voter: None,
            ranking,
            count: 1,
            ordering: None,
        }
    }

    pub fn with_count(self, count: u64) -> Ballot {
        Ballot { count, ..self }
    }

    pub fn with_voter(self, voter: &str) -> Ballot {
        Ballot {
            voter: Some(voter.to_string()),
            ..self
        }
    }

    pub fn with_ordering(self, ordering: &OrderingFingerprint) -> Ballot {
        Ballot {
            ordering: Some(ordering.clone()),
            ..self
        }
    }

    /// The voter id, or the position of the ballot in its collection when there is none.
    pub fn label(&self, position: usize) -> String {
        match &self.voter {
            Some(v) => v.clone(),
            None => format!("#{}", position),
        }
    }
}

// ******** Output data structures *********

/// The Copeland score of every candidate, indexed by position.
///
/// Scores are kept in half points so that ties are detected exactly.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ScoreVector {
    pub(crate) half_points: Vec<u64>,
}

impl ScoreVector {
    pub fn len(&self) -> usize {
        self.half_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.half_points.is_empty()
    }

    pub fn score(&self, position: usize) -> Option<f64> {
        self.half_points.get(position).map(|hp| *hp as f64 / 2.0)
    }

    pub fn scores(&self) -> Vec<f64> {
        self.half_points.iter().map(|hp| *hp as f64 / 2.0).collect()
    }

    pub fn total(&self) -> f64 {
        self.half_points.iter().sum::<u64>() as f64 / 2.0
    }
}

/// The outcome of a tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyResult {
    Winner(String),
    /// All the candidates sharing the highest score, in candidate order.
    Tie(Vec<String>),
    NoVotes,
}

impl TallyResult {
    pub const NO_VOTES: &'static str = "no votes cast";

    pub fn winners(&self) -> Vec<String> {
        match self {
            TallyResult::Winner(name) => vec![name.clone()],
            TallyResult::Tie(names) => names.clone(),
            TallyResult::NoVotes => vec![],
        }
    }
}

impl Display for TallyResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyResult::Winner(name) => write!(f, "{}", name),
            TallyResult::Tie(names) => write!(f, "{}", names.join(", ")),
            TallyResult::NoVotes => write!(f, "{}", TallyResult::NO_VOTES),
        }
    }
}

/// Statistics for one pairwise matchup.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PairwiseStats {
    pub first: String,
    pub second: String,
    pub prefers_first: u64,
    pub prefers_second: u64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TallyReport {
    pub result: TallyResult,
    /// The score of each candidate, in candidate order. Empty when no vote was cast.
    pub scores: Vec<(String, f64)>,
    pub pairwise: Vec<PairwiseStats>,
    /// The number of ballots, counting the weight of each ballot.
    pub ballots: u64,
}

/// Errors that prevent the tally from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VotingErrors {
    EmptyElection,
    DuplicateCandidate(String),
    StaleOrdering {
        ballot: usize,
        expected: OrderingFingerprint,
        found: OrderingFingerprint,
    },
    Cancelled,
}

impl Error for VotingErrors {}

impl Display for VotingErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VotingErrors::EmptyElection => write!(f, "no candidates registered for this election"),
            VotingErrors::DuplicateCandidate(name) => {
                write!(f, "candidate {:?} is registered more than once", name)
            }
            VotingErrors::StaleOrdering {
                ballot,
                expected,
                found,
            } => write!(
                f,
                "ballot {} was cast against candidate ordering {} but the election uses {}",
                ballot, found, expected
            ),
            VotingErrors::Cancelled => write!(f, "tally cancelled"),
        }
    }
}

// ********* Configuration **********

/// How a ballot compares a ranked candidate with a candidate it does not mention.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UnrankedRule {
    /// Any ranked candidate is preferred to an unranked one.
    RankedBeatsUnranked,
    /// The ballot expresses no preference in a matchup involving an unranked candidate.
    Abstain,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Parallelism {
    Sequential,
    /// Splits the pairwise matchups across this many threads.
    Threads(u32),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub unranked_rule: UnrankedRule,
    pub parallelism: Parallelism,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        unranked_rule: UnrankedRule::RankedBeatsUnranked,
        parallelism: Parallelism::Sequential,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
