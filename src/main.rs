use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sheetwise::api::{run_api_server, ApiConfig};
use sheetwise::cli;
use sheetwise::config::Settings;
use sheetwise::core::columns::ColumnRef;
use sheetwise::core::concatenate::ConcatPart;
use sheetwise::core::lookup::{LookupRequest, MatchMode, ReturnMode};
use sheetwise::core::pivot::{PivotRequest, ValueSpec};
use sheetwise::logging;
use sheetwise::service::{ConcatJob, PivotJob, VlookupJob};

#[derive(Parser)]
#[command(name = "sheetwise")]
#[command(about = "Spreadsheet lookups, pivots and column joins from the command line.")]
#[command(long_about = "Sheetwise - spreadsheet table transformations

COMMANDS:
  sheets   - List worksheets of a workbook
  columns  - Show first-row headers with their column letters
  vlookup  - Join a lookup sheet onto a main sheet by (composite) key
  pivot    - Group, aggregate and write a styled pivot table
  concat   - Join columns into one new column
  serve    - Run the HTTP API server

Columns are addressed by letter: A, B, ..., Z, AA, AB, ...

EXAMPLES:
  sheetwise columns orders.xlsx --sheet Orders
  sheetwise vlookup orders.xlsx prices.xlsx --main-keys A,B --lookup-keys C,D \\
      --match-type multi --return E
  sheetwise pivot sales.xlsx --rows A --value C:sum --value C:mean
  sheetwise concat people.xlsx --part A:- --part B")]
#[command(version)]
struct Cli {
    /// YAML settings file (result directory, limits, totals label)
    #[arg(short, long, global = true, env = "SHEETWISE_CONFIG")]
    config: Option<PathBuf>,

    /// Show debug logging and extra detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List worksheets of a workbook
    Sheets {
        /// Workbook (.xlsx, .xlsm, .xls, .ods)
        file: PathBuf,
    },

    /// Show first-row headers with their column letters
    Columns {
        file: PathBuf,

        /// Worksheet name (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,
    },

    #[command(long_about = "Composite-key VLOOKUP.

Both sheets are read without a header row. Key values are standardized before
matching: numbers and numeric text compare equal (\"5\", \"5.0\", 5), whitespace
is trimmed and collapsed, empty cells match empty cells. Multi-column keys are
joined with '|'.

With --match-type single only the first listed key column is used. With
--return-type single only the first return column is appended. Lookup rows
whose return value is empty are ignored; when a key repeats, the later row wins.

The command fails when no row matches at all.")]
    /// Join a lookup sheet onto a main sheet
    Vlookup {
        /// Main workbook
        main: PathBuf,

        /// Lookup workbook (may be the same file)
        lookup: PathBuf,

        #[arg(long)]
        main_sheet: Option<String>,

        #[arg(long)]
        lookup_sheet: Option<String>,

        /// Key columns in the main sheet (comma separated letters)
        #[arg(long, value_delimiter = ',', required = true)]
        main_keys: Vec<String>,

        /// Key columns in the lookup sheet (comma separated letters)
        #[arg(long, value_delimiter = ',', required = true)]
        lookup_keys: Vec<String>,

        /// Columns of the lookup sheet to append (comma separated letters)
        #[arg(short, long = "return", value_delimiter = ',', required = true)]
        return_columns: Vec<String>,

        /// single | multi
        #[arg(long, default_value = "single")]
        match_type: MatchMode,

        /// single | multi
        #[arg(long, default_value = "single")]
        return_type: ReturnMode,

        /// Output workbook (default: result directory with a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    #[command(long_about = "Pivot aggregation.

The first row of the sheet supplies column names. Rows are grouped by the
--rows columns (then --cols), each --value is aggregated per group and a
totals row is appended. Text columns only support count.

Value specs are COLUMN:FUNC with FUNC one of sum, mean, count, max, min.
Columns named '(mean)' get two decimals; everything else is shown as an
integer with thousands separators.")]
    /// Group, aggregate and write a styled pivot table
    Pivot {
        file: PathBuf,

        #[arg(short, long)]
        sheet: Option<String>,

        /// Row label columns (comma separated letters)
        #[arg(long, value_delimiter = ',', required = true)]
        rows: Vec<String>,

        /// Column label columns (comma separated letters)
        #[arg(long, value_delimiter = ',')]
        cols: Vec<String>,

        /// Value column and aggregation, e.g. C:sum (repeatable)
        #[arg(long = "value", required = true)]
        values: Vec<ValueSpec>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Join columns into one new column
    Concat {
        file: PathBuf,

        #[arg(short, long)]
        sheet: Option<String>,

        /// Column part COLUMN[:SEPARATOR[:before|after]] (repeatable, in order)
        #[arg(long = "part", required = true)]
        parts: Vec<ConcatPart>,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the HTTP API server
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1", env = "SHEETWISE_HOST")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080", env = "SHEETWISE_PORT")]
        port: u16,
    },
}

fn letters(columns: Vec<String>) -> Vec<ColumnRef> {
    columns.into_iter().map(ColumnRef::ByLetter).collect()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(match (&cli.command, cli.verbose) {
        (_, true) => "sheetwise=debug,tower_http=debug",
        (Commands::Serve { .. }, false) => "sheetwise=info,tower_http=info",
        _ => "sheetwise=warn",
    });

    let settings = Settings::load_or_default(cli.config.as_deref())?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Sheets { file } => cli::sheets(&settings, file)?,

        Commands::Columns { file, sheet } => cli::columns(&settings, file, sheet)?,

        Commands::Vlookup {
            main,
            lookup,
            main_sheet,
            lookup_sheet,
            main_keys,
            lookup_keys,
            return_columns,
            match_type,
            return_type,
            output,
        } => {
            let job = VlookupJob {
                main_file: main,
                main_sheet,
                lookup_file: lookup,
                lookup_sheet,
                request: LookupRequest {
                    main_match_type: match_type,
                    main_columns: letters(main_keys),
                    lookup_match_type: match_type,
                    lookup_match_columns: letters(lookup_keys),
                    return_type,
                    return_columns: letters(return_columns),
                },
                output,
            };
            cli::vlookup(&settings, job, verbose)?
        }

        Commands::Pivot {
            file,
            sheet,
            rows,
            cols,
            values,
            output,
        } => {
            let job = PivotJob {
                file,
                sheet,
                request: PivotRequest {
                    rows: letters(rows),
                    cols: letters(cols),
                    values,
                },
                output,
            };
            cli::pivot(&settings, job, verbose)?
        }

        Commands::Concat {
            file,
            sheet,
            parts,
            output,
        } => cli::concat(
            &settings,
            ConcatJob {
                file,
                sheet,
                parts,
                output,
            },
        )?,

        Commands::Serve { host, port } => {
            let config = ApiConfig { host, port, settings };
            tokio::runtime::Runtime::new()?.block_on(run_api_server(config))?
        }
    }

    Ok(())
}
