use erdgraph::export::SvgExporter;
use erdgraph::layout::LayoutConfig;
use erdgraph::parser::{self, ParseError};
use erdgraph::{DiagramCompiler, DiagramEvent, DiagramMode, EditOutcome, reduce_document};
use std::env;
use std::fs;
use std::process;
use tracing_subscriber::EnvFilter;

fn usage(program: &str) {
    eprintln!("Usage: {} <schema.json> [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <file>   Output file (default: stdout)");
    eprintln!("  -m, --mode <mode>     Diagram mode: conceptual, logical (default: conceptual)");
    eprintln!("  -c, --config <file>   Layout configuration JSON");
    eprintln!("  -e, --events <file>   Replay a JSON array of diagram events before output");
    eprintln!("      --svg             Emit SVG instead of graph JSON");
    eprintln!("      --schema          Emit the (edited) schema JSON instead of the graph");
    eprintln!("      --strict          Fail if anything is dropped or an event is ignored");
    eprintln!("  -v, --verbose         Debug logging on stderr (RUST_LOG overrides)");
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn read(path: &str) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path, e)))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage(&args[0]);
        process::exit(1);
    }

    let input_path = &args[1];
    let mut output_path: Option<String> = None;
    let mut config_path: Option<String> = None;
    let mut events_path: Option<String> = None;
    let mut mode = DiagramMode::Conceptual;
    let mut svg = false;
    let mut emit_schema = false;
    let mut strict = false;
    let mut verbose = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                i += 1;
                if i < args.len() {
                    output_path = Some(args[i].clone());
                }
            }
            "-m" | "--mode" => {
                i += 1;
                if i < args.len() {
                    mode = DiagramMode::from_str(&args[i])
                        .unwrap_or_else(|| fail(format!("Invalid mode: {}", args[i])));
                }
            }
            "-c" | "--config" => {
                i += 1;
                if i < args.len() {
                    config_path = Some(args[i].clone());
                }
            }
            "-e" | "--events" => {
                i += 1;
                if i < args.len() {
                    events_path = Some(args[i].clone());
                }
            }
            "--svg" => svg = true,
            "--schema" => emit_schema = true,
            "--strict" => strict = true,
            "-v" | "--verbose" => verbose = true,
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    init_logging(verbose);

    let config: LayoutConfig = match &config_path {
        Some(path) => serde_json::from_str(&read(path))
            .unwrap_or_else(|e| fail(format!("Invalid config {}: {}", path, e))),
        None => LayoutConfig::default(),
    };

    let input = read(input_path);
    if strict {
        parser::parse_strict(&input).unwrap_or_else(|e| fail(e));
    }
    let mut document: serde_json::Value =
        serde_json::from_str(&input).unwrap_or_else(|e| fail(ParseError::from(e)));

    if let Some(path) = &events_path {
        let events: Vec<DiagramEvent> = serde_json::from_str(&read(path))
            .unwrap_or_else(|e| fail(format!("Invalid events {}: {}", path, e)));
        for (index, event) in events.iter().enumerate() {
            if let EditOutcome::Ignored(diagnostic) = reduce_document(&mut document, event) {
                if strict {
                    fail(format!("Event #{} ignored: {}", index, diagnostic));
                }
            }
        }
    }

    let schema = parser::parse_value(&document).schema;
    let compiler = DiagramCompiler::new(config.clone());
    let graph = if strict {
        compiler
            .compile_strict(&schema, mode)
            .unwrap_or_else(|e| fail(e))
    } else {
        compiler.compile(&schema, mode)
    };

    let output = if emit_schema {
        serde_json::to_string_pretty(&document)
            .unwrap_or_else(|e| fail(format!("Failed to serialize schema: {}", e)))
    } else if svg {
        SvgExporter::new(config)
            .render(&graph)
            .unwrap_or_else(|e| fail(e))
    } else {
        serde_json::to_string_pretty(&graph)
            .unwrap_or_else(|e| fail(format!("Failed to serialize graph: {}", e)))
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &output) {
                fail(format!("Failed to write {}: {}", path, e));
            }
        }
        None => println!("{}", output),
    }
}
