// Primitives for reading CSV files.

use std::fs::File;

use log::debug;
use snafu::{OptionExt, ResultExt};

use crate::rcv::{
    io_common::{assemble_choices, make_default_id_lineno, rank_columns},
    *,
};

/// One column per rank.
pub fn read_csv_ranking(path: String, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let count_idx_o = cfs.count_column_index_int()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (header, records, first_row) = get_records(&path, cfs)?;
    let header_labels = header_labels(header.as_ref());

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let id = match id_idx_o {
            Some(id_idx) => line
                .get(id_idx)
                .context(CsvLineToShortSnafu { lineno })?
                .to_string(),
            None => default_id(lineno),
        };
        let count = read_count(&line, count_idx_o, lineno)?;

        let columns = rank_columns(cfs, &header_labels, line.len())?;
        let choices: Vec<String> = columns
            .iter()
            .map(|c| line.get(*c).unwrap_or("").trim().to_string())
            .collect();
        debug!("read_csv_ranking: lineno: {:?} row: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(id),
            count,
            choices,
        });
    }
    Ok(res)
}

/// One column per candidate, holding the rank given to this candidate.
pub fn read_csv_likert(path: String, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(&path);

    let id_idx_o = cfs.id_column_index_int()?;
    let count_idx_o = cfs.count_column_index_int()?;
    let start = cfs.first_vote_column_index()?;

    let (header, records, first_row) = get_records(&path, cfs)?;
    let header = header.context(MissingHeaderSnafu {})?;
    let candidate_cols: Vec<(usize, String)> = header
        .iter()
        .enumerate()
        .skip(start)
        .filter(|(c, _)| Some(*c) != id_idx_o && Some(*c) != count_idx_o)
        .map(|(c, name)| (c, name.trim().to_string()))
        .collect();
    debug!("read_csv_likert: candidate columns: {:?}", candidate_cols);

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let id = match id_idx_o {
            Some(id_idx) => line
                .get(id_idx)
                .context(CsvLineToShortSnafu { lineno })?
                .to_string(),
            None => default_id(lineno),
        };
        let count = read_count(&line, count_idx_o, lineno)?;

        let mut ranks: Vec<(String, u32)> = Vec::new();
        for (c, name) in candidate_cols.iter() {
            let cell = line.get(*c).unwrap_or("").trim();
            if cell.is_empty() {
                continue;
            }
            let rank = cell
                .parse::<u32>()
                .ok()
                .filter(|r| *r > 0)
                .context(CsvWrongRankSnafu {
                    lineno,
                    content: cell,
                })?;
            ranks.push((name.clone(), rank));
        }
        let choices = assemble_choices(&ranks);
        debug!("read_csv_likert: lineno: {:?} choices: {:?}", lineno, &choices);

        res.push(ParsedBallot {
            id: Some(id),
            count,
            choices,
        });
    }
    Ok(res)
}

fn read_count(
    line: &csv::StringRecord,
    count_idx_o: Option<usize>,
    lineno: usize,
) -> RcvResult<Option<u64>> {
    match count_idx_o {
        Some(count_idx) => {
            let s = line
                .get(count_idx)
                .context(CsvLineToShortSnafu { lineno })?
                .trim();
            let count = s
                .parse::<u64>()
                .ok()
                .context(CsvWrongCountSnafu { lineno, content: s })?;
            Ok(Some(count))
        }
        None => Ok(None),
    }
}

fn header_labels(header: Option<&csv::StringRecord>) -> Vec<Option<String>> {
    header
        .map(|h| h.iter().map(|s| Some(s.to_string())).collect())
        .unwrap_or_default()
}

/// The records from the first vote row, and the row just above it if any.
fn get_records(
    path: &str,
    cfs: &FileSource,
) -> RcvResult<(
    Option<csv::StringRecord>,
    csv::StringRecordsIntoIter<File>,
    usize,
)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    let mut header: Option<csv::StringRecord> = None;
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        header = records.next().transpose().context(CsvLineParseSnafu {})?;
    }
    Ok((header, records, first_row))
}
