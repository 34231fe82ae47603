use envision::render::{SvgOptions, render_svg};
use envision::{
    EnvisionConfig, EnvisionSession, GenerationResponse, LayerType, MemoryPromptCache, NodeId,
    QueuedGenerationService, SessionEvent,
};
use std::io::Read;
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Envision(envision::Error),
    Json(serde_json::Error),
    EmptySummary,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Envision(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::EmptySummary => write!(f, "The functionality summary is empty"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<envision::Error> for CliError {
    fn from(value: envision::Error) -> Self {
        Self::Envision(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Svg,
    Stats,
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "svg" => Ok(Self::Svg),
            "stats" => Ok(Self::Stats),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    input: Option<String>,
    cache: Option<String>,
    config: Option<String>,
    format: OutputFormat,
    prompt: String,
    use_cases_only: bool,
    seed: u64,
    out: Option<String>,
}

fn usage() -> &'static str {
    "envision-cli\n\
\n\
USAGE:\n\
  envision-cli [run] --cache <path> [--config <path>] [--format text|json|svg|stats] [--prompt <text>] [--use-cases-only] [--seed <n>] [--out <path>] [<summary>|-]\n\
\n\
NOTES:\n\
  - If <summary> is omitted or '-', the functionality summary is read from stdin.\n\
  - Generation requests are answered from the prompt cache only; misses are reported as failed.\n\
  - Stakeholders are generated for every use case (and harms for every stakeholder)\n\
    unless --use-cases-only is given.\n\
  - --config takes a JSON file overriding the default quotas, layout and templates.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "run" => {}
            "--use-cases-only" => args.use_cases_only = true,
            "--cache" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.cache = Some(path.clone());
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = fmt
                    .parse::<OutputFormat>()
                    .map_err(|_| CliError::Usage(usage()))?;
            }
            "--prompt" => {
                let Some(prompt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.prompt = prompt.clone();
            }
            "--seed" => {
                let Some(seed) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.seed = seed.parse::<u64>().map_err(|_| CliError::Usage(usage()))?;
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            summary => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(summary.to_string());
            }
        }
    }

    if args.cache.is_none() {
        return Err(CliError::Usage(usage()));
    }
    Ok(args)
}

fn read_summary(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(text) => Ok(text.to_string()),
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

/// Answers every outstanding request: cache replays are delivered, misses fail.
/// Returns how many responses were handled.
fn deliver(session: &mut EnvisionSession) -> Result<usize, CliError> {
    let mut responses: Vec<GenerationResponse> = session
        .service_mut()
        .take_requests()
        .into_iter()
        .map(|req| GenerationResponse::Failed {
            error_message: format!("no cached response for {}", req.request_id),
            request_id: req.request_id,
        })
        .collect();
    responses.extend(session.service_mut().flush());

    let n = responses.len();
    for response in responses {
        session.handle_response(response)?;
    }
    Ok(n)
}

/// Use cases whose stakeholders have not been asked for yet.
fn unexpanded_use_cases(session: &EnvisionSession) -> Vec<NodeId> {
    let tree = session.tree();
    tree.visible()
        .into_iter()
        .filter_map(|v| tree.node(&v.id))
        .filter(|n| n.layer() == LayerType::UseCase)
        .filter(|n| !n.is_empty() && !n.is_pending() && n.candidates.is_empty())
        .map(|n| n.id.clone())
        .collect()
}

fn run(args: Args) -> Result<(), CliError> {
    let summary = read_summary(args.input.as_deref())?.trim().to_string();
    if summary.is_empty() {
        return Err(CliError::EmptySummary);
    }

    let config = match args.config.as_deref() {
        Some(path) => EnvisionConfig::from_json_str(&std::fs::read_to_string(path)?)
            .map_err(envision::Error::from)?,
        None => EnvisionConfig::default(),
    };
    let cache = match args.cache.as_deref() {
        Some(path) => MemoryPromptCache::load(path)?,
        None => MemoryPromptCache::new(),
    };
    tracing::debug!(entries = cache.len(), "prompt cache loaded");

    let mut session = EnvisionSession::new(config, QueuedGenerationService::new())
        .with_cache(cache)
        .with_seed(args.seed);
    session.set_prompt(&args.prompt);

    drop(session.start(&summary)?);
    let mut expanded = Vec::new();
    loop {
        let handled = deliver(&mut session)?;
        session.settle()?;
        if handled > 0 {
            continue;
        }
        if args.use_cases_only {
            break;
        }
        let next: Vec<NodeId> = unexpanded_use_cases(&session)
            .into_iter()
            .filter(|id| !expanded.contains(id))
            .collect();
        if next.is_empty() {
            break;
        }
        for id in next {
            session.add(&id)?;
            expanded.push(id);
        }
    }

    for event in session.drain_events() {
        if let SessionEvent::GenerationFailed { target, message } = event {
            match target {
                Some(id) => eprintln!("warning: generation for {id} failed: {message}"),
                None => eprintln!("warning: generation failed: {message}"),
            }
        }
    }

    let text = match args.format {
        OutputFormat::Text => session.export_text(),
        OutputFormat::Json => session.export_json()?,
        OutputFormat::Svg => render_svg(session.scene(), &SvgOptions::default()),
        OutputFormat::Stats => serde_json::to_string_pretty(session.stats())?,
    };
    write_text(&text, args.out.as_deref())
}

fn main() {
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
