use calamine::DataType;
use log::debug;
use snafu::OptionExt;

use crate::rcv::{
    io_common::{get_col_index_mapping, make_default_id_lineno},
    io_ess::{get_range, header_labels},
    *,
};

/// Results from the ranking widget of Microsoft Forms.
///
/// The ranking is held in a single cell, with the names separated by `;`.
pub fn read_msforms_ranking(path: String, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(&path);

    let wrange = get_range(&path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_msforms_ranking: header: {:?}", header);
    let ranking_col = match cfs.choices.as_ref().and_then(|cs| cs.first()) {
        Some(label) => get_col_index_mapping(&[label.clone()], &header_labels(header))?[0],
        None => cfs.first_vote_column_index()?,
    };
    debug!("read_msforms_ranking: ranking column: {:?}", ranking_col);

    let mut iter = wrange.rows();
    iter.next();
    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in iter.enumerate() {
        let lineno = idx + 2;
        let choices: Vec<String> = match row.get(ranking_col) {
            Some(DataType::String(s)) => s
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Some(DataType::Empty) | None => vec![],
            Some(cell) => {
                return Err(Box::new(RcvError::ExcelWrongCellType {
                    lineno: lineno as u64,
                    content: format!("{:?}", cell),
                }));
            }
        };
        debug!("read_msforms_ranking: lineno: {:?} choices: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(default_id(lineno)),
            // MS forms are not expected to handle weights.
            count: None,
            choices,
        });
    }
    Ok(res)
}
