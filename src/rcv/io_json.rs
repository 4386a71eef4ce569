use std::fs;

use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::rcv::{io_common::make_default_id_lineno, *};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonBallot {
    id: Option<String>,
    count: Option<u64>,
    ranking: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonBallots {
    ballots: Vec<JsonBallot>,
}

/// `{ "ballots": [ { "id": .., "count": .., "ranking": [..] } ] }`
pub fn read_json(path: String) -> BRcvResult<Vec<ParsedBallot>> {
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: &path })?;
    let parsed = parse_ballots(&contents, &path)?;
    Ok(parsed)
}

fn parse_ballots(contents: &str, path: &str) -> RcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(path);
    let js: JsonBallots = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    Ok(js
        .ballots
        .into_iter()
        .enumerate()
        .map(|(idx, b)| ParsedBallot {
            id: Some(b.id.unwrap_or_else(|| default_id(idx + 1))),
            count: b.count,
            choices: b.ranking,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ballots_from_json() {
        let js = r#"{ "ballots": [ { "id": "b1", "count": 2, "ranking": ["A", "B"] },
                                  { "ranking": ["B"] } ] }"#;
        let res = parse_ballots(js, "votes.json").unwrap();
        assert_eq!(
            res,
            vec![
                ParsedBallot {
                    id: Some("b1".to_string()),
                    count: Some(2),
                    choices: vec!["A".to_string(), "B".to_string()],
                },
                ParsedBallot {
                    id: Some("votes.json-00000002".to_string()),
                    count: None,
                    choices: vec!["B".to_string()],
                },
            ]
        );
    }

    #[test]
    fn malformed_json() {
        assert!(parse_ballots(r#"{ "ballots": [ { "count": 1 } ] }"#, "x.json").is_err());
    }
}
