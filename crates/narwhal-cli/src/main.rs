use futures::executor::block_on;
use narwhal::{
    Algorithm, ComboForceOptions, GForceOptions, Graph, LayoutHooks, LayoutStatus, YieldFrames,
};
use serde::Serialize;
use std::io::Read;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Layout(narwhal::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<narwhal::Error> for CliError {
    fn from(value: narwhal::Error) -> Self {
        Self::Layout(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    GForce,
    Combo,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    options: Option<String>,
    max_iterations: Option<usize>,
    seed: Option<u64>,
    pretty: bool,
    animate: bool,
    progress: bool,
    verbose: bool,
}

#[derive(Serialize)]
struct LayoutOut<'a> {
    status: LayoutStatus,
    iterations: usize,
    graph: &'a Graph,
}

fn usage() -> &'static str {
    "narwhal-cli\n\
\n\
USAGE:\n\
  narwhal-cli [gforce] [--options <json-path>] [--max-iterations <n>] [--seed <n>] [--animate] [--progress] [--pretty] [--verbose] [<path>|-]\n\
  narwhal-cli combo [--options <json-path>] [--max-iterations <n>] [--animate] [--progress] [--pretty] [--verbose] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the graph JSON is read from stdin.\n\
  - The graph is printed back with positions, wrapped with the run status and iteration count.\n\
  - --options takes a camelCase JSON object of engine options; flags override it.\n\
  - --animate runs one iteration per executor yield instead of back to back.\n\
  - --progress logs every iteration to stderr.\n\
  - Logging follows RUST_LOG; --verbose defaults it to debug for the layout crates.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "gforce" => args.command = Command::GForce,
            "combo" => args.command = Command::Combo,
            "--pretty" => args.pretty = true,
            "--animate" => args.animate = true,
            "--progress" => args.progress = true,
            "--verbose" | "-v" => args.verbose = true,
            "--options" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.options = Some(path.clone());
            }
            "--max-iterations" => {
                let Some(n) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.max_iterations =
                    Some(n.parse::<usize>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--seed" => {
                let Some(seed) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.seed = Some(seed.parse::<u64>().map_err(|_| CliError::Usage(usage()))?);
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if args.seed.is_some() && matches!(args.command, Command::Combo) {
        return Err(CliError::Usage(usage()));
    }

    Ok(args)
}

fn init_tracing(args: &Args) {
    let default = match (args.verbose, args.progress) {
        (true, _) => "warn,narwhal=debug,narwhal_cli=debug",
        (false, true) => "warn,narwhal_cli=info",
        (false, false) => "warn",
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .try_init();
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

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn progress_hooks() -> LayoutHooks {
    LayoutHooks::default().on_tick(|p, _nodes| {
        tracing::info!(
            iteration = p.iteration,
            budget = p.budget,
            movement = p.movement,
            alpha = ?p.alpha,
            "tick"
        );
    })
}

fn build_algorithm(args: &Args) -> Result<Algorithm, CliError> {
    let raw = args
        .options
        .as_deref()
        .map(std::fs::read_to_string)
        .transpose()?;

    let algorithm = match args.command {
        Command::GForce => {
            let mut opts = match raw.as_deref() {
                Some(raw) => GForceOptions::from_json_str(raw)?,
                None => GForceOptions::default(),
            };
            if let Some(n) = args.max_iterations {
                opts.max_iteration = n;
            }
            if let Some(seed) = args.seed {
                opts.seed = seed;
            }
            if args.progress {
                opts.hooks = progress_hooks();
            }
            Algorithm::GForce(opts)
        }
        Command::Combo => {
            let mut opts = match raw.as_deref() {
                Some(raw) => ComboForceOptions::from_json_str(raw)?,
                None => ComboForceOptions::default(),
            };
            if let Some(n) = args.max_iterations {
                opts.max_iteration = n;
            }
            if args.progress {
                opts.hooks = progress_hooks();
            }
            Algorithm::ComboForce(opts)
        }
    };
    Ok(algorithm)
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut graph: Graph = serde_json::from_str(&text)?;
    let algorithm = build_algorithm(&args)?;

    tracing::info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        combos = graph.combos.len(),
        "laying out graph"
    );
    let outcome = if args.animate {
        block_on(narwhal::layout_animated(
            &mut graph,
            algorithm,
            &mut YieldFrames,
            None,
        ))?
    } else {
        narwhal::layout(&mut graph, algorithm)?
    };

    write_json(
        &LayoutOut {
            status: outcome.status,
            iterations: outcome.iterations,
            graph: &graph,
        },
        args.pretty,
    )
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
    init_tracing(&args);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
