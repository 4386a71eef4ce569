use std::collections::HashMap;
use std::path::Path;

use log::debug;
use snafu::OptionExt;

use crate::rcv::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Ballot ids made of the file name and the line number.
pub fn make_default_id_lineno(path: &str) -> impl Fn(usize) -> String {
    let simplified_file_name = simplify_file_name(path);
    move |lineno| format!("{}-{:08}", simplified_file_name, lineno)
}

/// Orders the candidates by rank.
///
/// Candidates that share a rank are left out of the ballot.
pub fn assemble_choices(ranks: &[(String, u32)]) -> Vec<String> {
    let mut sorted: Vec<(String, u32)> = ranks.to_vec();
    sorted.sort_by_key(|(_, rank)| *rank);
    let mut choices: Vec<String> = Vec::with_capacity(sorted.len());
    for (cname, rank) in sorted.iter() {
        if sorted.iter().filter(|(_, r)| r == rank).count() > 1 {
            debug!("assemble_choices: {:?} shares rank {}, left unranked", cname, rank);
        } else {
            choices.push(cname.clone());
        }
    }
    choices
}

/// Given the header of a file (names of each of the columns) and some column labels,
/// finds the position of each label in the header.
pub fn get_col_index_mapping(
    req_col_names: &[String],
    header: &[Option<String>],
) -> RcvResult<Vec<usize>> {
    let col_names: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .rev()
        .filter_map(|(idx, x)| x.as_ref().map(|s| (s.trim(), idx)))
        .collect();

    let mut col_indexes: Vec<usize> = Vec::with_capacity(req_col_names.len());
    for cname in req_col_names {
        let idx = col_names
            .get(cname.trim())
            .context(MissingColumnSnafu { name: cname })?;
        col_indexes.push(*idx);
    }
    Ok(col_indexes)
}

/// The columns holding the ranks of a row with `num_cols` cells.
///
/// With explicit choice labels, the columns are looked up in the header. Otherwise all the
/// columns from the first vote column, except the id and count columns.
pub fn rank_columns(
    cfs: &FileSource,
    header: &[Option<String>],
    num_cols: usize,
) -> RcvResult<Vec<usize>> {
    if let Some(choices) = &cfs.choices {
        return get_col_index_mapping(choices, header);
    }
    let start = cfs.first_vote_column_index()?;
    let id_idx_o = cfs.id_column_index_int()?;
    let count_idx_o = cfs.count_column_index_int()?;
    Ok((start..num_cols)
        .filter(|c| Some(*c) != id_idx_o && Some(*c) != count_idx_o)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranks(rs: &[(&str, u32)]) -> Vec<(String, u32)> {
        rs.iter().map(|(n, r)| (n.to_string(), *r)).collect()
    }

    #[test]
    fn choices_in_rank_order() {
        let res = assemble_choices(&ranks(&[("A", 3), ("B", 1), ("C", 2)]));
        assert_eq!(res, vec!["B".to_string(), "C".to_string(), "A".to_string()]);
    }

    #[test]
    fn shared_ranks_are_dropped() {
        let res = assemble_choices(&ranks(&[("A", 1), ("B", 1), ("C", 2), ("D", 4)]));
        assert_eq!(res, vec!["C".to_string(), "D".to_string()]);
        assert!(assemble_choices(&[]).is_empty());
    }

    #[test]
    fn default_ids() {
        let f = make_default_id_lineno("/tmp/data/ballots.csv");
        assert_eq!(f(12), "ballots.csv-00000012");
    }

    #[test]
    fn columns_from_labels() {
        let header = vec![
            Some("id".to_string()),
            None,
            Some("second".to_string()),
            Some("first".to_string()),
        ];
        let res = get_col_index_mapping(&["first".to_string(), "second".to_string()], &header);
        assert_eq!(res.unwrap(), vec![3, 2]);
        assert!(get_col_index_mapping(&["third".to_string()], &header).is_err());
    }

    #[test]
    fn columns_skip_id_and_count() {
        let js = r#"{ "provider": "csv", "filePath": "b.csv",
            "firstVoteColumnIndex": 1, "idColumnIndex": 1, "countColumnIndex": "C" }"#;
        let cfs: FileSource = serde_json::from_str(js).unwrap();
        assert_eq!(rank_columns(&cfs, &[], 5).unwrap(), vec![1, 3, 4]);
    }
}
