/*!

This is the long-form manual for `copeland_tally` and the `copeland` command line program.

## The Copeland method

Every pair of candidates is a matchup. For a matchup between `A` and `B`, each
ballot that ranks `A` ahead of `B` counts for `A`, each ballot that ranks `B`
ahead of `A` counts for `B`. The candidate with more ballots wins the matchup
and earns one point. When both sides have the same number of ballots (including
when no ballot expresses a preference), each side earns half a point.

The candidates with the highest total are the winners. If several candidates
share the highest total, all of them are reported, in the order of the
candidate list.

With `n` candidates, exactly `n(n-1)/2` points are handed out.

Ballots may rank only some of the candidates. By default a ranked candidate is
preferred to an unranked one (`rankedBeatsUnranked`). With the `abstain` rule,
a ballot does not take part in a matchup where one of the two candidates is
unranked. A ballot never expresses a preference between two unranked
candidates. Names on a ballot that are not registered candidates are ignored.

## Input formats

The following formats are supported:
* `csv` Comma Separated Values, one column per rank
* `csv_likert` Comma Separated Values, one column per candidate
* `ess` Excel spreadsheet, one column per rank
* `msforms` Input from Microsoft Forms when using the ranking widget
* `json` A list of ballots in JSON

### csv

Each column (in order) is considered to be a choice. The name of the choice in the header is not significant.

```text
id,count,choice 1,choice 2,choice 3
id1,20,A,B,C
id2,20,A,C,B
```

The `id` and `count` columns are optional. Headers in the first row are optional.
See the [Configuration section](#configuration) on controlling the optional rows and columns.

### csv_likert

CSV sorted by candidates. This format is also created by Qualtrics polls. The file is expected to look as follows:

```text
id,count,A,B,C
id1,20,1,2,3
id2,20,1,,2
```

The candidate names must all be a column and defined in the first row of the CSV file. The numbers below are the ranks of
this candidate for each ballot (or empty if this candidate was not ranked). Candidates that share the same rank on a
ballot are left unranked on this ballot.

### ess

Votes recorded in an Excel spreadsheet, with one column per rank starting at `firstVoteColumnIndex`. The first row is the
header. If the last column holds a number, it is the count of this ballot.

### msforms

Results from Microsoft Forms when using the ranking widget. The input file is expected to be in Excel (.xlsx) format. The
cell at `firstVoteColumnIndex` holds the ranking, with the names separated by `;`.

### json

```text
{ "ballots": [ { "id": "b1", "count": 2, "ranking": ["A", "B"] }, { "ranking": ["B"] } ] }
```

## Configuration

The program accepts a configuration file in JSON, modeled after the configuration of the RCVTab program:

```text
{
  "outputSettings": { "contestName": "Board election" },
  "cvrFileSources": [ { "provider": "csv", "filePath": "ballots.csv", "firstVoteColumnIndex": 3,
                        "firstVoteRowIndex": 2, "idColumnIndex": 1, "countColumnIndex": 2 } ],
  "candidates": [ { "name": "A" }, { "name": "B" }, { "name": "C", "excluded": true } ],
  "rules": { "unrankedRule": "rankedBeatsUnranked", "threads": 4 }
}
```

FileSource:
 - `firstVoteColumnIndex`, `firstVoteRowIndex`, `idColumnIndex`, `countColumnIndex`: 1-based indexes (numbers,
   or column letters such as `"C"`). When `countColumnIndex` is not provided, every ballot has a count of 1.
 - `excelWorksheetName` (string, optional): for Excel-based inputs, the name of the worksheet.

Candidates:
 - when the list is empty, the candidates are taken from the ballots, in order of first appearance.
 - excluded candidates are removed before the tally. Ballots that mention them are treated as if they
   had not ranked them.

Rules:
 - `unrankedRule`: `rankedBeatsUnranked` (default) or `abstain`.
 - `threads`: the number of threads used to compute the matchups (default 1). It is capped by the number
   of cores of the machine.

Output:
 - `outputDirectory` (optional, in `outputSettings`): the directory, relative to the configuration file,
   in which a relative `--out` path is written.
 - Ballots with a count of 0 are ignored. Blank ballots, and ballots that only name unknown candidates,
   count in the number of ballots but do not prefer any candidate.

*/
