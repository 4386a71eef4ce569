use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::{OptionExt, ResultExt};

use crate::rcv::{
    io_common::{make_default_id_lineno, rank_columns},
    *,
};

/// Excel spreadsheet with one column per rank.
///
/// The first row is the header. Without a count column, a number in the last rank column is
/// the count of the ballot.
pub fn read_excel_file(path: String, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let default_id = make_default_id_lineno(&path);
    let wrange = get_range(&path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_excel_file: header: {:?}", header);
    let header_labels = header_labels(header);
    let id_idx_o = cfs.id_column_index_int()?;
    let count_idx_o = cfs.count_column_index_int()?;

    let mut iter = wrange.rows();
    iter.next();
    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in iter.enumerate() {
        // The header is on line 1
        let lineno = idx + 2;
        debug!("read_excel_file: lineno: {:?} row: {:?}", lineno, row);
        let columns = rank_columns(cfs, &header_labels, row.len())?;

        let mut choices: Vec<String> = Vec::with_capacity(columns.len());
        let num_row_choices = columns.len();
        for (pos, col) in columns.iter().enumerate() {
            let cell = row.get(*col).unwrap_or(&DataType::Empty);
            let is_count_cell = count_idx_o.is_none() && pos + 1 == num_row_choices;
            if let Some(bc) = read_choice_calamine(cell, is_count_cell, lineno)? {
                choices.push(bc.trim().to_string());
            }
        }

        let count: Option<u64> = match count_idx_o {
            Some(count_idx) => match row.get(count_idx) {
                Some(DataType::Float(f)) if *f >= 0.0 => Some(*f as u64),
                Some(DataType::Int(i)) if *i >= 0 => Some(*i as u64),
                Some(DataType::String(s)) if s.trim().parse::<u64>().is_ok() => {
                    s.trim().parse::<u64>().ok()
                }
                cell => {
                    return Err(Box::new(RcvError::ExcelWrongCellType {
                        lineno: lineno as u64,
                        content: format!("{:?}", cell),
                    }));
                }
            },
            None => match columns.last().and_then(|c| row.get(*c)) {
                Some(DataType::Float(f)) => Some(*f as u64),
                Some(DataType::Int(i)) => Some(*i as u64),
                _ => None,
            },
        };

        let id = match id_idx_o.and_then(|i| row.get(i)) {
            Some(DataType::String(s)) => s.clone(),
            Some(DataType::Int(i)) => i.to_string(),
            Some(DataType::Float(f)) => f.to_string(),
            _ => default_id(lineno),
        };

        let pb = ParsedBallot {
            id: Some(id),
            count,
            choices,
        };
        debug!("read_excel_file: ballot: {:?}", pb);
        res.push(pb);
    }
    Ok(res)
}

fn read_choice_calamine(
    cell: &DataType,
    is_count_cell: bool,
    lineno: usize,
) -> RcvResult<Option<String>> {
    match cell {
        DataType::String(s) => Ok(Some(s.clone())),
        DataType::Empty => Ok(Some("".to_string())),
        // The last column may contain the count in the ESS format -> drop it in this case.
        DataType::Float(_) | DataType::Int(_) if is_count_cell => Ok(None),
        _ => Err(RcvError::ExcelWrongCellType {
            lineno: lineno as u64,
            content: format!("{:?}", cell),
        }),
    }
}

pub fn header_labels(header: &[DataType]) -> Vec<Option<String>> {
    header
        .iter()
        .map(|dt| match dt {
            DataType::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

/// The worksheet named in the source, or the only worksheet of the file.
pub fn get_range(path: &str, cfs: &FileSource) -> BRcvResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(RcvError::EmptyExcel {})),
            [(worksheet_name, wrange)] => {
                debug!("get_range: using worksheet {:?}", &worksheet_name);
                Ok(wrange.clone())
            }
            _ => Err(Box::new(RcvError::ExcelWorksheetRequired {})),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_cells() {
        let name = DataType::String("Alice".to_string());
        assert_eq!(
            read_choice_calamine(&name, false, 2).unwrap(),
            Some("Alice".to_string())
        );
        assert_eq!(
            read_choice_calamine(&DataType::Empty, false, 2).unwrap(),
            Some("".to_string())
        );
        assert_eq!(read_choice_calamine(&DataType::Int(3), true, 2).unwrap(), None);
        assert!(read_choice_calamine(&DataType::Int(3), false, 2).is_err());
        assert!(read_choice_calamine(&DataType::Bool(true), true, 2).is_err());
    }

    #[test]
    fn labels_of_header() {
        let header = vec![
            DataType::String("id".to_string()),
            DataType::Empty,
            DataType::Float(1.0),
        ];
        assert_eq!(header_labels(&header), vec![Some("id".to_string()), None, None]);
    }
}
