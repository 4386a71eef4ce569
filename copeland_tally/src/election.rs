use std::collections::HashSet;

use log::warn;

use crate::config::*;

/// The canonical candidate ordering of an election.
///
/// Every ballot ranking refers to positions in this ordering. The ordering cannot be
/// changed once created; its fingerprint is computed at construction.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    candidates: Vec<Candidate>,
    fingerprint: OrderingFingerprint,
}

impl Election {
    pub fn new(candidates: Vec<Candidate>) -> Result<Election, VotingErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for c in candidates.iter() {
            if !seen.insert(c.name.as_str()) {
                return Err(VotingErrors::DuplicateCandidate(c.name.clone()));
            }
        }
        let fingerprint = OrderingFingerprint::of(candidates.iter().map(|c| c.name.as_str()));
        Ok(Election {
            candidates,
            fingerprint,
        })
    }

    pub fn from_names(names: &[String]) -> Result<Election, VotingErrors> {
        Election::new(names.iter().map(|n| Candidate::new(n)).collect())
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate_names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name.clone()).collect()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn position(&self, name: &str) -> Option<u32> {
        self.candidates
            .iter()
            .position(|c| c.name == name)
            .map(|idx| idx as u32)
    }

    pub fn fingerprint(&self) -> &OrderingFingerprint {
        &self.fingerprint
    }

    /// Checks that every ballot that declares an ordering declares this one.
    pub(crate) fn check_ordering(&self, ballots: &[Ballot]) -> Result<(), VotingErrors> {
        for (idx, b) in ballots.iter().enumerate() {
            match &b.ordering {
                Some(fp) if *fp != self.fingerprint => {
                    warn!(
                        "check_ordering: ballot {} was cast against another candidate ordering",
                        b.label(idx)
                    );
                    return Err(VotingErrors::StaleOrdering {
                        ballot: idx,
                        expected: self.fingerprint.clone(),
                        found: fp.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ns: &[&str]) -> Vec<String> {
        ns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let res = Election::from_names(&names(&["A", "B", "A"]));
        assert_eq!(res, Err(VotingErrors::DuplicateCandidate("A".to_string())));
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let e1 = Election::from_names(&names(&["A", "B"])).unwrap();
        let e2 = Election::from_names(&names(&["B", "A"])).unwrap();
        let e3 = Election::from_names(&names(&["A", "B"])).unwrap();
        assert_ne!(e1.fingerprint(), e2.fingerprint());
        assert_eq!(e1.fingerprint(), e3.fingerprint());
    }

    #[test]
    fn fingerprint_separates_names() {
        let e1 = Election::from_names(&names(&["ab", "c"])).unwrap();
        let e2 = Election::from_names(&names(&["a", "bc"])).unwrap();
        assert_ne!(e1.fingerprint(), e2.fingerprint());
    }

    #[test]
    fn stale_ballots_are_reported() {
        let e1 = Election::from_names(&names(&["A", "B"])).unwrap();
        let e2 = Election::from_names(&names(&["B", "A"])).unwrap();
        let ballots = vec![
            Ballot::new(vec![0, 1]),
            Ballot::new(vec![0, 1]).with_ordering(e1.fingerprint()),
            Ballot::new(vec![1, 0]).with_ordering(e2.fingerprint()),
        ];
        assert!(e1.check_ordering(&ballots[..2]).is_ok());
        match e1.check_ordering(&ballots) {
            Err(VotingErrors::StaleOrdering { ballot, .. }) => assert_eq!(ballot, 2),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn ballot_labels() {
        assert_eq!(Ballot::new(vec![0]).label(4), "#4");
        assert_eq!(Ballot::new(vec![0]).with_voter("v-17").label(4), "v-17");
    }
}
