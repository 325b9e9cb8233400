//! pdfrows CLI - tabular record extraction from decoded PDF page dumps

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use encoding_rs::Encoding;
use indicatif::{ProgressBar, ProgressStyle};

use pdfrows::{
    BatchOrchestrator, BatchSummary, DocumentSource, Error as PdfError, ExtractOptions,
    ExtractionMethod, ExtractionResult, MemoryDocument, PageContent, PageRange, Strategy,
    Template, TextPattern,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "pdfrows")]
#[command(author = "iyulab")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(about = "Extract tabular records from decoded PDF pages to delimited text", long_about = None)]
struct Cli {
    /// Page dump files (JSON)
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records from one or more page dumps
    #[command(alias = "run")]
    Extract {
        /// Page dump files (JSON)
        #[arg(value_name = "FILE", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: Settings,
    },

    /// Show page dump information
    Info {
        /// Page dump file (JSON)
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Args, Default)]
struct Settings {
    /// Extraction options file (JSON)
    #[arg(long, value_name = "FILE", env = "PDFROWS_OPTIONS")]
    options: Option<PathBuf>,

    /// Output template file (JSON)
    #[arg(long, value_name = "FILE", env = "PDFROWS_TEMPLATE")]
    template: Option<PathBuf>,

    /// Extraction method
    #[arg(long, value_enum)]
    method: Option<Method>,

    /// Named text pattern, NAME=REGEX (repeatable)
    #[arg(short, long = "pattern", value_name = "NAME=REGEX")]
    patterns: Vec<String>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Field delimiter (single character, or "tab")
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Output encoding label (e.g., "utf-8", "windows-1252")
    #[arg(long)]
    encoding: Option<String>,

    /// Treat the first table row as data, not as a header
    #[arg(long)]
    no_header: bool,

    /// Number of parallel workers
    #[arg(long)]
    workers: Option<usize>,

    /// Per-document time budget in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Also write each extraction result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Pick a strategy per document
    Auto,
    /// Geometric table detection
    Table,
    /// Named text patterns
    Pattern,
    /// Form field values
    Form,
}

impl From<Method> for ExtractionMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Auto => ExtractionMethod::Auto,
            Method::Table => ExtractionMethod::Table,
            Method::Pattern => ExtractionMethod::Pattern,
            Method::Form => ExtractionMethod::Form,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Extract {
            inputs,
            output,
            settings,
        }) => cmd_extract(&inputs, output.as_deref(), &settings),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            if cli.inputs.is_empty() {
                println!("{}", "Usage: pdfrows <FILE>... [-o DIR]".yellow());
                println!("       pdfrows --help for more information");
                Ok(())
            } else {
                cmd_extract(&cli.inputs, cli.output.as_deref(), &Settings::default())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// Options file first, then command-line overrides.
fn build_options(settings: &Settings) -> CliResult<ExtractOptions> {
    let mut options: ExtractOptions = match &settings.options {
        Some(path) => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        None => ExtractOptions::default(),
    };

    if let Some(method) = settings.method {
        options = options.with_method(method.into());
    }
    for arg in &settings.patterns {
        options.text_patterns.push(parse_pattern(arg));
    }
    if let Some(pages) = &settings.pages {
        options = options.with_pages(PageRange::parse(pages)?);
    }
    if let Some(delimiter) = &settings.delimiter {
        options = options.with_delimiter(delimiter.clone());
    }
    if let Some(encoding) = &settings.encoding {
        options = options.with_encoding(encoding.clone());
    }
    if settings.no_header {
        options = options.with_header_row(false);
    }
    if let Some(workers) = settings.workers {
        options = options.with_max_workers(workers);
    }
    if let Some(ms) = settings.timeout_ms {
        options = options.with_timeout(Duration::from_millis(ms));
    }

    options.validate()?;
    Ok(options)
}

fn load_template(path: &Path) -> CliResult<Template> {
    let template: Template = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    template.validate()?;
    Ok(template)
}

/// `NAME=REGEX`, or a bare regex named after itself.
fn parse_pattern(arg: &str) -> TextPattern {
    match arg.split_once('=') {
        Some((name, pattern)) if !name.is_empty() => TextPattern::new(name, pattern),
        _ => TextPattern::new(arg, arg),
    }
}

/// A page dump read on first access, so loading counts against the
/// document's time budget and a broken file fails only its own document.
struct FileDocument {
    path: PathBuf,
    label: String,
    loaded: OnceLock<Result<MemoryDocument, String>>,
}

impl FileDocument {
    fn new(path: PathBuf) -> Self {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            label,
            loaded: OnceLock::new(),
        }
    }

    fn document(&self) -> pdfrows::Result<&MemoryDocument> {
        self.loaded
            .get_or_init(|| pdfrows::load_document(&self.path).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|msg| PdfError::Decode(msg.clone()))
    }
}

impl DocumentSource for FileDocument {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_count(&self) -> pdfrows::Result<usize> {
        self.document()?.page_count()
    }

    fn decode_page(&self, page_index: usize) -> pdfrows::Result<PageContent> {
        self.document()?.decode_page(page_index)
    }
}

/// Delimited-text serializer honouring `delimiter`, `encoding` and `header_row`.
struct DelimitedWriter {
    delimiter: u8,
    header: bool,
    encoding: &'static Encoding,
}

impl DelimitedWriter {
    fn new(options: &ExtractOptions) -> CliResult<Self> {
        let delimiter = delimiter_byte(&options.delimiter)?;
        let encoding = Encoding::for_label(options.encoding.trim().as_bytes())
            .ok_or_else(|| format!("Unknown encoding: {}", options.encoding))?;
        Ok(Self {
            delimiter,
            header: options.header_row,
            encoding,
        })
    }

    fn extension(&self) -> &'static str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }

    /// Encode a result as delimited text.
    ///
    /// UTF-16 labels fall back to UTF-8 output, following the WHATWG
    /// encoder rules.
    fn render(&self, result: &ExtractionResult) -> CliResult<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        if self.header && !result.columns.is_empty() {
            writer.write_record(&result.columns)?;
        }
        for record in &result.records {
            writer.write_record(record.conform(&result.columns).values())?;
        }

        let bytes = writer.into_inner().map_err(|e| e.to_string())?;
        let text = String::from_utf8(bytes)?;
        let (encoded, used, unmappable) = self.encoding.encode(&text);
        if unmappable {
            log::warn!(
                "Some characters cannot be represented in {}; replaced with references",
                used.name()
            );
        }
        Ok(encoded.into_owned())
    }

    fn write_file(&self, result: &ExtractionResult, path: &Path) -> CliResult<()> {
        fs::write(path, self.render(result)?)?;
        Ok(())
    }
}

fn delimiter_byte(delimiter: &str) -> Result<u8, String> {
    match delimiter {
        "\t" | "\\t" | "tab" => Ok(b'\t'),
        d if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
        d => Err(format!(
            "Delimiter must be a single ASCII character, got '{}'",
            d
        )),
    }
}

/// File stem for a document's output, without a trailing `.pages`.
fn output_stem(label: &str) -> String {
    let stem = Path::new(label)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = stem.strip_suffix(".pages").unwrap_or(&stem);
    if stem.is_empty() {
        "document".to_string()
    } else {
        stem.to_string()
    }
}

fn unique_stem(label: &str, used: &mut HashSet<String>) -> String {
    let base = output_stem(label);
    let mut stem = base.clone();
    let mut n = 2;
    while !used.insert(stem.clone()) {
        stem = format!("{}_{}", base, n);
        n += 1;
    }
    stem
}

fn cmd_extract(inputs: &[PathBuf], output: Option<&Path>, settings: &Settings) -> CliResult<()> {
    let options = build_options(settings)?;
    let template = match &settings.template {
        Some(path) => load_template(path)?,
        None => Template::new(),
    };
    let writer = DelimitedWriter::new(&options)?;

    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("pdfrows_output"));
    fs::create_dir_all(&output_dir)?;

    let documents: Vec<Arc<dyn DocumentSource>> = inputs
        .iter()
        .map(|path| Arc::new(FileDocument::new(path.clone())) as Arc<dyn DocumentSource>)
        .collect();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Extracting {} document(s)...", documents.len()));
    let summary = BatchOrchestrator::new(options)
        .with_template(template)
        .run(&documents);
    spinner.finish_and_clear();

    let pb = ProgressBar::new(summary.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut used = HashSet::new();
    let mut written = Vec::new();
    for outcome in &summary.documents {
        pb.set_message(outcome.label.clone());
        if !outcome.result.is_failed() {
            let stem = unique_stem(&outcome.label, &mut used);
            let path = output_dir.join(format!("{}.{}", stem, writer.extension()));
            writer.write_file(&outcome.result, &path)?;
            written.push(path);

            if settings.json {
                let path = output_dir.join(format!("{}.result.json", stem));
                fs::write(&path, serde_json::to_string_pretty(&outcome.result)?)?;
                written.push(path);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    print_summary(&summary);

    if !written.is_empty() {
        println!("\n{}", "Output files:".green().bold());
        for (i, path) in written.iter().enumerate() {
            let branch = if i + 1 == written.len() { "└─" } else { "├─" };
            println!("  {} {}", branch.dimmed(), path.display());
        }
    }

    if !summary.is_empty() && summary.succeeded() == 0 {
        return Err("no document could be extracted".into());
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    println!("\n{}", "Results".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());

    for outcome in &summary.documents {
        let result = &outcome.result;
        let status = if result.is_failed() {
            "FAILED".red()
        } else if result.warnings.is_empty() {
            "ok".green()
        } else {
            "warn".yellow()
        };
        println!(
            "  {:<6} {:<32} {:>6} records {:>4} warnings {:>6} ms",
            status,
            outcome.label,
            result.record_count(),
            result.warnings.len(),
            outcome.elapsed_ms
        );
    }

    let stats = summary.stats();
    let elapsed = (summary.finished_at - summary.started_at).num_milliseconds();

    println!();
    println!("{}: {}", "Documents".bold(), summary.len());
    println!("{}: {}", "Succeeded".bold(), summary.succeeded());
    println!("{}: {}", "Failed".bold(), summary.failed());
    println!(
        "{}: {:.1}%",
        "Success rate".bold(),
        summary.success_rate() * 100.0
    );
    println!("{}: {}", "Records".bold(), summary.total_records());
    println!("{}: {}", "Tables".bold(), stats.tables_detected);
    println!("{}: {}", "Pattern matches".bold(), stats.pattern_matches);
    println!("{}: {}", "OCR pages".bold(), stats.ocr_pages);
    println!("{}: {} ms", "Elapsed".bold(), elapsed);

    if summary.failed() > 0 {
        println!("\n{}", "Failures".red().bold());
        for (label, error) in summary.failures() {
            println!("  {} {}: {}", "✗".red(), label, error);
        }
    }
}

fn cmd_info(input: &Path) -> CliResult<()> {
    let doc = pdfrows::load_document(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Label".bold(), doc.label);
    println!("{}: {}", "Pages".bold(), doc.pages.len());

    let strategy = Strategy::resolve(&ExtractOptions::default(), &doc.pages);
    println!("{}: {:?}", "Auto strategy".bold(), strategy);

    println!();
    println!("{}", "Page Content".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for (i, page) in doc.pages.iter().enumerate() {
        println!(
            "{} {}: {} fragments, {} lines, {} form fields{}",
            "Page".bold(),
            i + 1,
            page.fragments.len(),
            page.lines.len(),
            page.form_fields.len(),
            if page.has_text() { "" } else { " (no text)" }
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfrows".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Tabular record extraction from PDF page content");
    println!();
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfrows::Record;

    fn sample_result() -> ExtractionResult {
        let mut result = ExtractionResult::new();
        result.columns = vec!["Name".to_string(), "City".to_string()];
        result.records = vec![
            Record::from_pairs([("Name", "Alice"), ("City", "Zürich")]),
            Record::from_pairs([("Name", "Bob, Jr.")]),
        ];
        result
    }

    fn writer(delimiter: &str, encoding: &str, header: bool) -> DelimitedWriter {
        let options = ExtractOptions::default()
            .with_delimiter(delimiter)
            .with_encoding(encoding)
            .with_header_row(header);
        DelimitedWriter::new(&options).unwrap()
    }

    #[test]
    fn test_delimiter_byte() {
        assert_eq!(delimiter_byte(",").unwrap(), b',');
        assert_eq!(delimiter_byte(";").unwrap(), b';');
        assert_eq!(delimiter_byte("tab").unwrap(), b'\t');
        assert_eq!(delimiter_byte("\\t").unwrap(), b'\t');
        assert!(delimiter_byte("::").is_err());
        assert!(delimiter_byte("§").is_err());
    }

    #[test]
    fn test_parse_pattern() {
        let named = parse_pattern(r"total=Total:\s*(\d+)");
        assert_eq!(named.name, "total");
        assert_eq!(named.pattern, r"Total:\s*(\d+)");

        let bare = parse_pattern(r"INV-\d+");
        assert_eq!(bare.name, bare.pattern);
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem("invoice.pages.json"), "invoice");
        assert_eq!(output_stem("report.json"), "report");
        assert_eq!(output_stem(""), "document");
    }

    #[test]
    fn test_unique_stem() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("a.json", &mut used), "a");
        assert_eq!(unique_stem("dir/a.json", &mut used), "a_2");
        assert_eq!(unique_stem("a.pages.json", &mut used), "a_3");
    }

    #[test]
    fn test_render_with_header() {
        let text = writer(",", "utf-8", true).render(&sample_result()).unwrap();
        assert_eq!(
            String::from_utf8(text).unwrap(),
            "Name,City\nAlice,Zürich\n\"Bob, Jr.\",\n"
        );
    }

    #[test]
    fn test_render_without_header_and_semicolon() {
        let text = writer(";", "utf-8", false).render(&sample_result()).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "Alice;Zürich\nBob, Jr.;\n");
    }

    #[test]
    fn test_render_legacy_encoding() {
        let bytes = writer(",", "windows-1252", false)
            .render(&sample_result())
            .unwrap();
        assert!(bytes.contains(&0xFC));
        assert!(std::str::from_utf8(&bytes).is_err());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let options = ExtractOptions::default().with_encoding("klingon");
        assert!(DelimitedWriter::new(&options).is_err());
    }

    #[test]
    fn test_file_document_missing() {
        let doc = FileDocument::new(PathBuf::from("missing/broken.json"));
        assert_eq!(doc.label(), "broken.json");
        assert!(matches!(doc.page_count(), Err(PdfError::Decode(_))));
    }

    #[test]
    fn test_extract_writes_delimited_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("people.pages.json");
        fs::write(
            &input,
            r#"{"pages": [{"fragments": [
                {"text": "Name", "x0": 0, "y0": 0, "x1": 30, "y1": 10},
                {"text": "Age", "x0": 100, "y0": 0, "x1": 120, "y1": 10},
                {"text": "Alice", "x0": 0, "y0": 20, "x1": 30, "y1": 30},
                {"text": "30", "x0": 100, "y0": 20, "x1": 115, "y1": 30}
            ]}]}"#,
        )
        .unwrap();
        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();

        let out = dir.path().join("out");
        let settings = Settings {
            json: true,
            ..Settings::default()
        };
        cmd_extract(&[input, broken], Some(&out), &settings).unwrap();

        let csv = fs::read_to_string(out.join("people.csv")).unwrap();
        assert_eq!(csv, "Name,Age\nAlice,30\n");
        assert!(out.join("people.result.json").exists());
        assert!(!out.join("broken.csv").exists());
    }

    #[test]
    fn test_extract_with_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("totals.json");
        fs::write(
            &input,
            r#"{"pages": [{"fragments": [
                {"text": "Total: 42", "x0": 0, "y0": 0, "x1": 60, "y1": 10}
            ]}]}"#,
        )
        .unwrap();
        let template = dir.path().join("template.json");
        fs::write(&template, r#"{"field_mappings": {"total": "Amount"}}"#).unwrap();

        let out = dir.path().join("out");
        let settings = Settings {
            template: Some(template),
            method: Some(Method::Pattern),
            patterns: vec![r"total=Total:\s*(\d+)".to_string()],
            delimiter: Some("tab".to_string()),
            ..Settings::default()
        };
        cmd_extract(&[input], Some(&out), &settings).unwrap();

        let tsv = fs::read_to_string(out.join("totals.tsv")).unwrap();
        assert_eq!(tsv, "Amount\n42\n");
    }

    #[test]
    fn test_extract_all_failed_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let missing = dir.path().join("missing.json");
        assert!(cmd_extract(&[missing], Some(&out), &Settings::default()).is_err());
    }
}
