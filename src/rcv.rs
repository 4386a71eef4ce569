use log::{debug, info, warn};

use copeland_tally::builder::Builder;
use copeland_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::rcv::config_reader::*;

mod config_reader;
mod io_common;
mod io_csv;
mod io_ess;
mod io_json;
mod io_msforms;

#[derive(Debug, Snafu)]
pub enum RcvError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The Excel file has no usable worksheet or row"))]
    EmptyExcel {},
    #[snafu(display("The Excel file has several worksheets, the worksheet name must be provided"))]
    ExcelWorksheetRequired {},
    #[snafu(display("Line {lineno}: cannot understand cell {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Cannot find column {name} in the header"))]
    MissingColumn { name: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Cannot read a row or column index in the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineToShort { lineno: usize },
    #[snafu(display("Line {lineno}: invalid count {content}"))]
    CsvWrongCount { lineno: usize, content: String },
    #[snafu(display("Line {lineno}: invalid rank {content}"))]
    CsvWrongRank { lineno: usize, content: String },
    #[snafu(display("The first row of the file must hold the candidate names"))]
    MissingHeader {},
    #[snafu(display("No configuration file and no input file were provided"))]
    MissingInput {},
    #[snafu(display("The configuration does not define any file source"))]
    NoFileSources {},
    #[snafu(display("Provider not implemented: {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Tally error: {source}"))]
    Tally { source: VotingErrors },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type RcvResult<T> = Result<T, RcvError>;
type BRcvResult<T> = Result<T, Box<RcvError>>;

/// A ballot, as parsed by the readers.
/// The names are not checked against the candidates yet.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub choices: Vec<String>,
}

fn result_stats_to_json(report: &TallyReport) -> JSValue {
    let mut scores: JSMap<String, JSValue> = JSMap::new();
    for (name, score) in report.scores.iter() {
        scores.insert(name.clone(), json!(score));
    }
    let pairwise: Vec<JSValue> = report
        .pairwise
        .iter()
        .map(|ps| {
            json!({
                "first": ps.first,
                "second": ps.second,
                "prefersFirst": ps.prefers_first,
                "prefersSecond": ps.prefers_second,
            })
        })
        .collect();
    json!({
        "winners": report.result.winners(),
        "outcome": report.result.to_string(),
        "scores": scores,
        "pairwise": pairwise,
        "ballots": report.ballots,
    })
}

fn build_summary_js(config: &RcvConfig, report: &TallyReport) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_juridiction.clone(),
        office: config.output_settings.contest_office.clone(),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(report) })
}

fn read_ranking_data(root_path: &str, cfs: &FileSource) -> BRcvResult<Vec<ParsedBallot>> {
    let p: PathBuf = [root_path, cfs.file_path.as_str()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read rank file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_ranking(p2, cfs),
        "csv_likert" => io_csv::read_csv_likert(p2, cfs),
        "ess" => io_ess::read_excel_file(p2, cfs),
        "msforms" => io_msforms::read_msforms_ranking(p2, cfs),
        "json" => io_json::read_json(p2),
        x => Err(Box::new(RcvError::UnknownProvider {
            provider: x.to_string(),
        })),
    }
}

fn validate_rules(rcv_rules: &Option<RcvRules>) -> RcvResult<TallyRules> {
    let rcv_rules = match rcv_rules {
        Some(r) => r,
        None => return Ok(TallyRules::DEFAULT_RULES),
    };
    let res = TallyRules {
        unranked_rule: match rcv_rules.unranked_rule.as_deref() {
            None | Some("rankedBeatsUnranked") => UnrankedRule::RankedBeatsUnranked,
            Some("abstain") => UnrankedRule::Abstain,
            Some(x) => {
                whatever!("Cannot use unranked rule {:?}: currently not implemented", x)
            }
        },
        parallelism: match rcv_rules.threads {
            None | Some(0) | Some(1) => Parallelism::Sequential,
            Some(n) => Parallelism::Threads(n),
        },
    };
    Ok(res)
}

/// The candidates of the election, without the excluded ones.
///
/// If the configuration does not list any candidate, they are taken from the ballots in
/// order of first appearance.
fn build_election(config: &RcvConfig, ballots: &[ParsedBallot]) -> RcvResult<Election> {
    let candidates: Vec<Candidate> = if config.candidates.is_empty() {
        let mut names: Vec<String> = Vec::new();
        for pb in ballots.iter() {
            for name in pb.choices.iter() {
                if !name.is_empty() && !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        info!("No candidates in the configuration, using {:?}", names);
        names.iter().map(|n| Candidate::new(n)).collect()
    } else {
        config
            .candidates
            .iter()
            .filter(|c| !c.excluded.unwrap_or(false))
            .map(|c| Candidate {
                name: c.name.clone(),
                code: match c.code.clone() {
                    Some(x) if x.is_empty() => None,
                    x => x,
                },
            })
            .collect()
    };
    Election::new(candidates).context(TallySnafu {})
}

fn validate_ballots(parsed_ballots: &[ParsedBallot], builder: &mut Builder) -> RcvResult<()> {
    for pb in parsed_ballots.iter() {
        // Default of 1 if not specified
        let count = pb.count.unwrap_or(1);
        if count == 0 {
            debug!("validate_ballots: skipping ballot {:?}: null count", pb.id);
            continue;
        }
        // A ballot without any registered candidate still counts, it prefers nobody.
        let ballot = builder.make_ballot(&pb.choices).context(TallySnafu {})?;
        debug!("Ranking for ballot {:?}: {:?}", pb.id, ballot.ranking);
        let ballot = match &pb.id {
            Some(id) => ballot.with_count(count).with_voter(id),
            None => ballot.with_count(count),
        };
        builder.add_ballot(ballot).context(TallySnafu {})?;
    }
    Ok(())
}

/// Builds the configuration from the command line when no configuration file is given.
fn default_config(args: &Args) -> RcvResult<RcvConfig> {
    let input = args.input.clone().context(MissingInputSnafu {})?;
    Ok(RcvConfig {
        output_settings: OutputSettings::new(&io_common::simplify_file_name(&input)),
        cvr_file_sources: vec![source_from_args(args, None, &input)],
        candidates: vec![],
        rules: None,
    })
}

fn source_from_args(args: &Args, base: Option<&FileSource>, input: &str) -> FileSource {
    let provider = args
        .input_type
        .clone()
        .or_else(|| base.map(|b| b.provider.clone()))
        .unwrap_or_else(|| "csv".to_string());
    let mut source = match base {
        Some(b) => b.with_file(&provider, input),
        None => FileSource::new(&provider, input),
    };
    if args.choices.is_some() {
        source.choices = args.choices.clone();
    }
    if args.excel_worksheet_name.is_some() {
        source.excel_worksheet_name = args.excel_worksheet_name.clone();
    }
    source
}

/// Where to write the summary. Relative paths are taken from the output directory of the
/// configuration, itself relative to the configuration file.
fn output_path(config: &RcvConfig, root_path: &str, out: &str) -> PathBuf {
    let out_p = Path::new(out);
    match &config.output_settings.output_directory {
        Some(dir) if out_p.is_relative() => [root_path, dir.as_str(), out].iter().collect(),
        _ => out_p.to_path_buf(),
    }
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> BRcvResult<()> {
    let summary_ref = read_summary(reference_path.to_string())?;
    debug!("summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        return Err(Box::new(RcvError::ReferenceMismatch {}));
    }
    Ok(())
}

pub fn run_election(args: &Args) -> BRcvResult<()> {
    let (mut config, root_path) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?;
            (config, root_p.display().to_string())
        }
        None => (default_config(args)?, String::new()),
    };
    info!("config: {:?}", config);

    // The input file replaces the sources of the configuration. It is relative to
    // the current directory, not to the configuration.
    if let (Some(_), Some(input)) = (&args.config, &args.input) {
        let source = source_from_args(args, config.cvr_file_sources.first(), input);
        config.cvr_file_sources = vec![source];
    }
    let input_root = if args.input.is_some() { "" } else { root_path.as_str() };

    let rules = validate_rules(&config.rules)?;

    if config.cvr_file_sources.is_empty() {
        return Err(Box::new(RcvError::NoFileSources {}));
    }

    let mut data: Vec<ParsedBallot> = Vec::new();
    for cfs in config.cvr_file_sources.iter() {
        let mut file_data = read_ranking_data(input_root, cfs)?;
        data.append(&mut file_data);
    }
    info!("Read {:?} ballots", data.len());

    let election = build_election(&config, &data)?;
    let mut builder = Builder::new(&rules)
        .context(TallySnafu {})?
        .with_election(election);
    validate_ballots(&data, &mut builder)?;

    let report = builder.tally().context(TallySnafu {})?;
    info!("Outcome: {}", report.result);

    // Assemble the final json
    let result_js = build_summary_js(&config, &report);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    info!("stats:{}", pretty_js_stats);

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(out) => {
            let path = output_path(&config, &root_path, out).display().to_string();
            fs::write(&path, &pretty_js_stats).context(WritingOutputSnafu { path: &path })?;
            info!("Summary written to {:?}", path);
        }
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        check_reference(summary_p, &pretty_js_stats)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_dir() -> String {
        format!("{}/tests", env!("CARGO_MANIFEST_DIR"))
    }

    fn empty_args() -> Args {
        Args {
            config: None,
            reference: None,
            out: None,
            input: None,
            input_type: None,
            choices: None,
            excel_worksheet_name: None,
            verbose: false,
        }
    }

    fn run_election_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
        init_logger();
        info!("Running test {}", test_name);
        let args = Args {
            config: Some(format!("{}/{}/{}", test_dir(), test_name, config_lpath)),
            reference: Some(format!("{}/{}/{}", test_dir(), test_name, summary_lpath)),
            ..empty_args()
        };
        let res = run_election(&args);
        if let Err(e) = &res {
            eprintln!("An error occured {}", e);
        }
        assert!(res.is_ok());
    }

    fn test_wrapper(test_name: &str) {
        run_election_test(
            test_name,
            format!("{}_config.json", test_name).as_str(),
            format!("{}_expected_summary.json", test_name).as_str(),
        )
    }

    #[test]
    fn alice_bob_carol() {
        test_wrapper("alice_bob_carol");
    }

    #[test]
    fn even_split_likert() {
        test_wrapper("even_split_likert");
    }

    #[test]
    fn weighted_csv() {
        test_wrapper("weighted_csv");
    }

    #[test]
    fn json_ballots() {
        test_wrapper("json_ballots");
    }

    #[test]
    fn excluded_candidate() {
        test_wrapper("excluded_candidate");
    }

    #[test]
    fn no_votes() {
        test_wrapper("no_votes");
    }

    #[test]
    fn blank_ballots() {
        test_wrapper("blank_ballots");
    }

    #[test]
    fn input_without_config() {
        init_logger();
        let args = Args {
            input: Some(format!("{}/no_config/ballots.csv", test_dir())),
            reference: Some(format!("{}/no_config/expected_summary.json", test_dir())),
            ..empty_args()
        };
        assert!(run_election(&args).is_ok());
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        init_logger();
        let args = Args {
            config: Some(format!("{}/alice_bob_carol/alice_bob_carol_config.json", test_dir())),
            reference: Some(format!("{}/no_votes/no_votes_expected_summary.json", test_dir())),
            ..empty_args()
        };
        match run_election(&args) {
            Err(e) => assert!(matches!(*e, RcvError::ReferenceMismatch {})),
            Ok(_) => panic!("the summaries should differ"),
        }
    }

    #[test]
    fn missing_input() {
        match run_election(&empty_args()) {
            Err(e) => assert!(matches!(*e, RcvError::MissingInput {})),
            Ok(_) => panic!("no input was provided"),
        }
    }

    #[test]
    fn rules_from_config() {
        let rules = RcvRules {
            unranked_rule: Some("abstain".to_string()),
            threads: Some(4),
            rules_description: None,
        };
        assert_eq!(
            validate_rules(&Some(rules)).unwrap(),
            TallyRules {
                unranked_rule: UnrankedRule::Abstain,
                parallelism: Parallelism::Threads(4),
            }
        );
        assert_eq!(validate_rules(&None).unwrap(), TallyRules::DEFAULT_RULES);
        let bad = RcvRules {
            unranked_rule: Some("coinFlip".to_string()),
            threads: None,
            rules_description: None,
        };
        assert!(validate_rules(&Some(bad)).is_err());
    }

    #[test]
    fn blank_ballots_are_counted() {
        let election = Election::from_names(&["A".to_string(), "B".to_string()]).unwrap();
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .with_election(election);
        let parsed = vec![
            ParsedBallot {
                id: Some("blank".to_string()),
                count: None,
                choices: vec!["".to_string(), "".to_string()],
            },
            ParsedBallot {
                id: Some("unknown".to_string()),
                count: Some(2),
                choices: vec!["Zed".to_string()],
            },
            ParsedBallot {
                id: Some("null".to_string()),
                count: Some(0),
                choices: vec!["A".to_string()],
            },
        ];
        validate_ballots(&parsed, &mut builder).unwrap();
        assert_eq!(builder.ballots().len(), 2);
        assert_eq!(builder.ballots()[1].voter, Some("unknown".to_string()));
        let report = builder.tally().unwrap();
        assert_eq!(report.ballots, 3);
        assert_eq!(
            report.result,
            TallyResult::Tie(vec!["A".to_string(), "B".to_string()])
        );
    }

    #[test]
    fn output_in_configured_directory() {
        let mut config = RcvConfig {
            output_settings: OutputSettings::new("test"),
            cvr_file_sources: vec![],
            candidates: vec![],
            rules: None,
        };
        assert_eq!(
            output_path(&config, "/data", "summary.json"),
            PathBuf::from("summary.json")
        );
        config.output_settings.output_directory = Some("out".to_string());
        assert_eq!(
            output_path(&config, "/data", "summary.json"),
            PathBuf::from("/data/out/summary.json")
        );
        assert_eq!(
            output_path(&config, "/data", "/tmp/summary.json"),
            PathBuf::from("/tmp/summary.json")
        );
    }

    #[test]
    fn summary_written_to_out_path() {
        init_logger();
        let out = std::env::temp_dir().join("copeland_alice_bob_carol_summary.json");
        let args = Args {
            config: Some(format!("{}/alice_bob_carol/alice_bob_carol_config.json", test_dir())),
            out: Some(out.display().to_string()),
            ..empty_args()
        };
        assert!(run_election(&args).is_ok());
        let written = read_summary(out.display().to_string()).unwrap();
        assert_eq!(written["results"]["winners"], json!(["Alice"]));
        let _ = fs::remove_file(&out);
    }

    #[test]
    fn candidates_are_inferred_from_ballots() {
        let config = RcvConfig {
            output_settings: OutputSettings::new("test"),
            cvr_file_sources: vec![],
            candidates: vec![],
            rules: None,
        };
        let ballots = vec![
            ParsedBallot {
                id: None,
                count: None,
                choices: vec!["B".to_string(), "".to_string(), "A".to_string()],
            },
            ParsedBallot {
                id: None,
                count: None,
                choices: vec!["C".to_string(), "B".to_string()],
            },
        ];
        let election = build_election(&config, &ballots).unwrap();
        assert_eq!(
            election.candidate_names(),
            vec!["B".to_string(), "A".to_string(), "C".to_string()]
        );
    }
}
