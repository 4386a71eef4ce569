use log::debug;

pub use crate::config::*;
use crate::election::Election;

/// A builder for adding votes by candidate names.
///
/// The names are turned into positions in the candidate ordering, and each ballot
/// is stamped with the fingerprint of that ordering.
///
/// ```
/// pub use copeland_tally::builder::Builder;
/// pub use copeland_tally::TallyRules;
/// # use copeland_tally::{TallyResult, VotingErrors};
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_vote_simple(&["Anna".to_string(), "Clara".to_string(), "".to_string()])?;
/// builder.add_vote(&["Bob".to_string()], 2)?;
///
/// let report = builder.tally()?;
/// assert_eq!(report.result, TallyResult::Winner("Bob".to_string()));
///
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _election: Option<Election>,
    pub(crate) _ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, VotingErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _election: None,
            _ballots: Vec::new(),
        })
    }

    /// Sets the candidate ordering. Previously added ballots are dropped.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, VotingErrors> {
        Ok(Builder {
            _rules: self._rules,
            _election: Some(Election::from_names(cands)?),
            _ballots: Vec::new(),
        })
    }

    pub fn with_election(self, election: Election) -> Builder {
        Builder {
            _rules: self._rules,
            _election: Some(election),
            _ballots: Vec::new(),
        }
    }

    /// Adds a vote to the builder.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_vote_simple(&mut self, candidates: &[String]) -> Result<(), VotingErrors> {
        self.add_vote(candidates, 1)
    }

    /// Adds a vote, with a weight attached to it.
    ///
    /// candidates: the names chosen by the voter, in order of preference. Blank names and
    /// names that are not registered candidates are left out of the ranking.
    pub fn add_vote(&mut self, candidates: &[String], count: u64) -> Result<(), VotingErrors> {
        let ballot = self.make_ballot(candidates)?.with_count(count);
        self.add_ballot(ballot)
    }

    /// Converts candidate names to a ballot for the registered candidates, without adding it.
    pub fn make_ballot(&self, candidates: &[String]) -> Result<Ballot, VotingErrors> {
        let election = self.election()?;
        let mut ranking: Vec<u32> = Vec::with_capacity(candidates.len());
        for name in candidates {
            match election.position(name) {
                Some(pos) => ranking.push(pos),
                None if name.is_empty() => {}
                None => {
                    debug!("make_ballot: {:?} is not a registered candidate, left unranked", name);
                }
            }
        }
        Ok(Ballot::new(ranking).with_ordering(election.fingerprint()))
    }

    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), VotingErrors> {
        self._ballots.push(ballot);
        Ok(())
    }

    pub fn election(&self) -> Result<&Election, VotingErrors> {
        self._election.as_ref().ok_or(VotingErrors::EmptyElection)
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self._ballots
    }

    pub fn tally(&self) -> Result<TallyReport, VotingErrors> {
        crate::run_tally(self.election()?, &self._ballots, &self._rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn votes_need_candidates() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES).unwrap();
        assert_eq!(
            builder.add_vote_simple(&names(&["A"])),
            Err(VotingErrors::EmptyElection)
        );
        assert_eq!(builder.tally(), Err(VotingErrors::EmptyElection));
    }

    #[test]
    fn names_are_mapped_to_positions() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["A", "B", "C"]))
            .unwrap();
        builder
            .add_vote(&names(&["C", "", "Zed", "A"]), 4)
            .unwrap();
        let ballot = &builder.ballots()[0];
        assert_eq!(ballot.ranking, vec![2, 0]);
        assert_eq!(ballot.count, 4);
        assert_eq!(
            ballot.ordering.as_ref(),
            Some(builder.election().unwrap().fingerprint())
        );
    }

    #[test]
    fn builder_tally() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["Alice", "Bob", "Carol"]))
            .unwrap();
        builder
            .add_vote(&names(&["Alice", "Bob", "Carol"]), 2)
            .unwrap();
        builder
            .add_vote_simple(&names(&["Bob", "Carol", "Alice"]))
            .unwrap();
        let report = builder.tally().unwrap();
        assert_eq!(report.result, TallyResult::Winner("Alice".to_string()));
        assert_eq!(report.ballots, 3);
    }

    #[test]
    fn ballots_from_another_ordering_are_rejected() {
        let other = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["B", "A"]))
            .unwrap();
        let stale = other.make_ballot(&names(&["A", "B"])).unwrap();

        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&names(&["A", "B"]))
            .unwrap();
        builder.add_ballot(stale).unwrap();
        assert!(matches!(
            builder.tally(),
            Err(VotingErrors::StaleOrdering { ballot: 0, .. })
        ));
    }
}
