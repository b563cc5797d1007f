// Command-line front end for the event comparison report.
//
// Loads one CSV, prints the period-over-period report for the selected
// range and writes the detail export. With `--interactive` the user can
// re-run the report for other ranges without reloading the file.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use event_report::{
    loader, output, util, ComparisonReport, Dataset, Period, ReportError, ReportOptions,
    Schema, SchemaVariant,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "event_report", version, about = "Event performance period comparison")]
struct Cli {
    /// CSV export of per-day event records
    #[arg(short, long)]
    input: PathBuf,

    /// First day of the selected period (defaults to the earliest date in the data)
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<NaiveDate>,

    /// Last day of the selected period (defaults to the latest date in the data)
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t = SchemaVariant::Basic, env = "EVENT_REPORT_VARIANT")]
    variant: SchemaVariant,

    /// JSON schema descriptor; overrides --variant
    #[arg(long)]
    schema: Option<PathBuf>,

    #[arg(long, default_value_t = 3)]
    top: usize,

    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 10)]
    preview_rows: usize,

    #[arg(long, default_value = "원")]
    currency: String,

    /// Prompt for further periods after the first report
    #[arg(long)]
    interactive: bool,
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    util::parse_date_lenient(s).ok_or_else(|| format!("unrecognised date '{}'", s))
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Ask whether to run another period. `true` for `Y`, `false` for `N`.
fn prompt_another_period() -> bool {
    loop {
        match read_line("Analyse another period (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            // EOF reads as an empty line.
            "N" | "" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_period(dataset: &Dataset) -> (NaiveDate, NaiveDate) {
    let ask = |label: &str, default: NaiveDate| loop {
        let input = read_line(&format!("{} [{}]: ", label, default));
        if input.is_empty() {
            return default;
        }
        match util::parse_date_lenient(&input) {
            Some(d) => return d,
            None => println!("Unrecognised date '{}'.", input),
        }
    };
    (ask("Start date", dataset.min_date), ask("End date", dataset.max_date))
}

fn load_schema(cli: &Cli) -> Result<Schema> {
    match &cli.schema {
        Some(path) => Schema::from_json_file(path)
            .with_context(|| format!("failed to load schema {}", path.display())),
        None => Ok(Schema::for_variant(cli.variant)),
    }
}

fn print_load_summary(dataset: &Dataset) {
    let r = &dataset.report;
    println!(
        "Processing dataset... ({} rows loaded, {} with a valid date)",
        util::format_int(r.total_rows),
        util::format_int(r.kept_rows)
    );
    if r.dropped_undated_rows > 0 {
        println!(
            "Note: {} rows skipped because the date could not be parsed.",
            util::format_int(r.dropped_undated_rows)
        );
    }
    println!("Data covers {} ~ {}\n", dataset.min_date, dataset.max_date);
}

fn print_report(report: &ComparisonReport, options: &ReportOptions, preview_rows: usize) {
    println!("선택 기간:   {}", report.current_period);
    println!("이전 동기간: {}\n", report.previous_period);

    let (views, revenue) = output::totals_lines(&report.totals, &options.currency_suffix);
    println!("총 CPV 조회 수: {}", views);
    println!("총 CPV 매출:    {}\n", revenue);

    println!("조회 수 TOP {} 이벤트", options.top_n);
    output::preview_table_rows(&report.top_views, options.top_n);
    println!("CPV 매출 TOP {} 이벤트", options.top_n);
    output::preview_table_rows(&report.top_revenue, options.top_n);

    println!("이벤트별 상세 성과");
    let detail = output::detail_display_rows(&report.rows, &options.currency_suffix);
    output::preview_table_rows(&detail, preview_rows);
}

/// One report for one period. An empty selection is reported and swallowed;
/// a reversed range is only swallowed when another period can be offered.
fn run_period(
    cli: &Cli,
    schema: &Schema,
    dataset: &Dataset,
    options: &ReportOptions,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    let outcome = Period::new(start, end)
        .and_then(|p| event_report::generate_report(dataset, schema, p, options));
    let report = match outcome {
        Ok(r) => r,
        Err(e @ ReportError::InvalidRange { .. }) if !cli.interactive => return Err(e.into()),
        Err(e @ (ReportError::EmptyRange { .. } | ReportError::InvalidRange { .. })) => {
            println!("{}. Please select a different period.\n", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    print_report(&report, options, cli.preview_rows);

    let path = output::write_export(&cli.out_dir, &report.current_period, &report.rows, &schema.attributes)?;
    println!("(Full table exported to {})", path.display());
    let summary_path = cli.out_dir.join("summary.json");
    output::write_json(&summary_path, &output::totals_summary(&report.totals))?;
    println!("(Totals saved to {})\n", summary_path.display());
    Ok(())
}

/// `RUST_LOG` directives when present and valid, `info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let cli = Cli::parse();
    let schema = load_schema(&cli)?;
    let options = ReportOptions {
        top_n: cli.top,
        currency_suffix: cli.currency.clone(),
    };

    let dataset = match loader::load_and_clean(&cli.input, &schema) {
        Ok(d) => d,
        Err(e) => {
            error!("Failed to load {}: {}", cli.input.display(), e);
            return Err(e).with_context(|| format!("cannot analyse {}", cli.input.display()));
        }
    };
    print_load_summary(&dataset);

    let start = cli.start.unwrap_or(dataset.min_date);
    let end = cli.end.unwrap_or(dataset.max_date);
    run_period(&cli, &schema, &dataset, &options, start, end)?;

    if cli.interactive {
        while prompt_another_period() {
            let (start, end) = prompt_period(&dataset);
            run_period(&cli, &schema, &dataset, &options, start, end)?;
        }
        println!("Exiting the program.");
    }
    Ok(())
}
