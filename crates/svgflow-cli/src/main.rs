use chrono::{DateTime, Utc};
use futures::executor::block_on;
use serde::Serialize;
use std::io::{Read, Write};
use svgflow::{DataFrame, Panel, PanelOptions, RenderOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Svgflow(svgflow::Error),
    Json(serde_json::Error),
    InvalidNow(chrono::ParseError),
    Superseded,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Svgflow(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::InvalidNow(err) => write!(f, "invalid --now timestamp: {err}"),
            CliError::Superseded => write!(f, "render pass was superseded"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<svgflow::Error> for CliError {
    fn from(value: svgflow::Error) -> Self {
        Self::Svgflow(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<chrono::ParseError> for CliError {
    fn from(value: chrono::ParseError) -> Self {
        Self::InvalidNow(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Render,
    Check,
    Format,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    svg: Option<String>,
    rules: Option<String>,
    frames: Option<String>,
    options: Option<String>,
    now: Option<DateTime<Utc>>,
    out: Option<String>,
    tooltips: Option<String>,
    decimals: Option<u32>,
    pretty: bool,
    positional: Vec<String>,
}

fn usage() -> &'static str {
    "svgflow-cli\n\
\n\
USAGE:\n\
  svgflow-cli render --svg <path> --rules <path> [--frames <path>|-] [--options <path>] [--now <rfc3339>] [--out <path>] [--tooltips <path>] [--pretty]\n\
  svgflow-cli check <rules.yaml>|-\n\
  svgflow-cli format <value> [<unit>] [--decimals <n>]\n\
\n\
NOTES:\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - --frames takes a JSON array of query-result frames; '-' reads stdin. Without it no data is applied.\n\
  - --options takes the panel options as JSON.\n\
  - --tooltips writes the tooltip records as JSON; --pretty indents it (render only).\n\
  - check prints the normalized rule document.\n\
  - Set RUST_LOG (e.g. RUST_LOG=svgflow_core=debug) for diagnostics on stderr.\n\
"
}

fn next_value<'a>(it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String, CliError> {
    it.next().ok_or(CliError::Usage(usage()))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" if args.positional.is_empty() => args.command = Command::Render,
            "check" if args.positional.is_empty() => args.command = Command::Check,
            "format" if args.positional.is_empty() => args.command = Command::Format,
            "--pretty" => args.pretty = true,
            "--svg" => args.svg = Some(next_value(&mut it)?.clone()),
            "--rules" => args.rules = Some(next_value(&mut it)?.clone()),
            "--frames" => args.frames = Some(next_value(&mut it)?.clone()),
            "--options" => args.options = Some(next_value(&mut it)?.clone()),
            "--out" => args.out = Some(next_value(&mut it)?.clone()),
            "--tooltips" => args.tooltips = Some(next_value(&mut it)?.clone()),
            "--now" => {
                let raw = next_value(&mut it)?;
                args.now = Some(DateTime::parse_from_rfc3339(raw.trim())?.with_timezone(&Utc));
            }
            "--decimals" => {
                let raw = next_value(&mut it)?;
                args.decimals = Some(raw.parse::<u32>().map_err(|_| CliError::Usage(usage()))?);
            }
            "-" => args.positional.push(a.clone()),
            other if other.starts_with('-') && other.parse::<f64>().is_err() => {
                return Err(CliError::Usage(usage()));
            }
            value => args.positional.push(value.to_string()),
        }
    }

    let positional_ok = match args.command {
        Command::Render => args.positional.is_empty() && args.svg.is_some() && args.rules.is_some(),
        Command::Check => args.positional.len() <= 1 && !args.pretty,
        Command::Format => (1..=2).contains(&args.positional.len()) && !args.pretty,
    };
    if !positional_ok {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn write_json_file(value: &impl Serialize, path: &str, pretty: bool) -> Result<(), CliError> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut file, value)?;
    } else {
        serde_json::to_writer(&mut file, value)?;
    }
    file.flush()?;
    Ok(())
}

fn run_render(args: &Args) -> Result<(), CliError> {
    let options: PanelOptions = match args.options.as_deref() {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => PanelOptions::default(),
    };
    let frames: Vec<DataFrame> = match args.frames.as_deref() {
        Some(input) => serde_json::from_str(&read_input(Some(input))?)?,
        None => Vec::new(),
    };

    let panel = Panel::new(options).with_fixed_now(args.now);
    panel.set_svg(&read_input(args.svg.as_deref())?)?;
    let rule_count = panel.try_set_rules_yaml(&read_input(args.rules.as_deref())?)?;
    tracing::info!(rules = rule_count, frames = frames.len(), "rendering panel");

    let out = match block_on(panel.render(async { frames })) {
        RenderOutcome::Rendered(out) => out,
        RenderOutcome::Superseded => return Err(CliError::Superseded),
    };
    tracing::info!(
        painted = out.stats.painted,
        labeled = out.stats.labeled,
        linked = out.stats.linked,
        missing = out.stats.missing,
        "render finished"
    );

    write_text(&out.svg, args.out.as_deref())?;
    if let Some(path) = args.tooltips.as_deref() {
        write_json_file(&out.tooltips, path, args.pretty)?;
    }
    Ok(())
}

fn run_check(args: &Args) -> Result<(), CliError> {
    let yaml = read_input(args.positional.first().map(String::as_str))?;
    let rules = svgflow::parse_yaml_to_grouped_rules(&yaml)
        .map_err(svgflow::Error::from)?
        .normalized();
    tracing::info!(
        groups = rules.groups.len(),
        rules = rules.rule_count(),
        "rules parsed"
    );
    let yaml = svgflow::grouped_rules_to_yaml(&rules).map_err(svgflow::Error::from)?;
    write_text(&yaml, None)
}

fn run_format(args: &Args) -> Result<(), CliError> {
    let value = args
        .positional
        .first()
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .ok_or(CliError::Usage(usage()))?;
    let unit = args.positional.get(1).map(String::as_str);
    println!("{}", svgflow::format_value(value, unit, args.decimals));
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    match args.command {
        Command::Render => run_render(&args),
        Command::Check => run_check(&args),
        Command::Format => run_format(&args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() {
    init_tracing();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
