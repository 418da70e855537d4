use std::{env, fs, path::PathBuf, process::ExitCode};

use render_tree::{
    build_tree, parse_description, resolve_labeled_display_mapping, resolve_mapping,
    ElementIdSource, RenderError,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct BuildOptions {
    pretty: bool,
    values: bool,
    prefix: Option<String>,
    schema_file: Option<PathBuf>,
    data_file: Option<PathBuf>,
}

#[derive(Debug)]
struct ResolveOptions {
    data_file: Option<PathBuf>,
    labeled: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<(), String> {
    if args.len() < 3 {
        return Err("not enough arguments".to_string());
    }

    let command = args[1].as_str();
    let file = PathBuf::from(&args[2]);

    match command {
        "build" => {
            let options = parse_build_options(&args[3..])?;
            run_build(&file, &options)
        }
        "resolve" => {
            let options = parse_resolve_options(&args[3..])?;
            run_resolve(&file, &options)
        }
        _ => Err(format!("unknown command '{command}'")),
    }
}

fn run_build(file: &PathBuf, options: &BuildOptions) -> Result<(), String> {
    let input = fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))?;
    let mut description = parse_description(&input).map_err(|e| e.to_string())?;

    if let Some(schema_file) = &options.schema_file {
        description.schema = read_json(schema_file)?;
    }
    if let Some(data_file) = &options.data_file {
        description.data = read_json(data_file)?;
    }
    if options.prefix.is_some() {
        description.prefix = options.prefix.clone();
    }

    let ids = ElementIdSource::new();
    let mut tree = build_tree(&description, &ids).map_err(|e| e.to_string())?;
    if options.values {
        tree.compute_values(&description.data);
    }

    let output = tree
        .to_json_string(options.pretty)
        .map_err(|e: RenderError| e.to_string())?;
    println!("{output}");
    Ok(())
}

fn run_resolve(file: &PathBuf, options: &ResolveOptions) -> Result<(), String> {
    let mapping = read_json(file)?;
    let data = match &options.data_file {
        Some(data_file) => read_json(data_file)?,
        None => serde_json::Value::Null,
    };

    if options.labeled {
        let resolved = resolve_labeled_display_mapping(&mapping, &data);
        if let Some(label) = &resolved.label {
            println!("{label}: {}", resolved.value.as_deref().unwrap_or(""));
        } else if let Some(value) = &resolved.value {
            println!("{value}");
        } else {
            eprintln!("no value resolved");
        }
        return Ok(());
    }

    match resolve_mapping(&mapping, &data) {
        Some(value) => println!("{value}"),
        None => eprintln!("no value resolved"),
    }
    Ok(())
}

fn read_json(file: &PathBuf) -> Result<serde_json::Value, String> {
    let input = fs::read_to_string(file)
        .map_err(|e| format!("failed to read '{}': {e}", file.display()))?;
    serde_json::from_str(&input)
        .map_err(|e| format!("invalid JSON in '{}': {e}", file.display()))
}

fn parse_build_options(args: &[String]) -> Result<BuildOptions, String> {
    let mut pretty = false;
    let mut values = false;
    let mut prefix = None;
    let mut schema_file = None;
    let mut data_file = None;
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--pretty" => {
                pretty = true;
                i += 1;
            }
            "--values" => {
                values = true;
                i += 1;
            }
            "--prefix" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --prefix".to_string());
                }
                prefix = Some(args[i + 1].clone());
                i += 2;
            }
            "--schema" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --schema".to_string());
                }
                schema_file = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--data" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --data".to_string());
                }
                data_file = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    Ok(BuildOptions {
        pretty,
        values,
        prefix,
        schema_file,
        data_file,
    })
}

fn parse_resolve_options(args: &[String]) -> Result<ResolveOptions, String> {
    let mut data_file = None;
    let mut labeled = false;
    let mut i = 0usize;

    while i < args.len() {
        match args[i].as_str() {
            "--data" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --data".to_string());
                }
                data_file = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--labeled" => {
                labeled = true;
                i += 1;
            }
            other => return Err(format!("unknown option '{other}'")),
        }
    }

    Ok(ResolveOptions { data_file, labeled })
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!(
        "  render-tree build <description.json> [--schema <file>] [--data <file>] [--prefix <p>] [--values] [--pretty]"
    );
    eprintln!("  render-tree resolve <mapping.json> [--data <file>] [--labeled]");
    eprintln!();
    eprintln!("build options:");
    eprintln!("  --schema <file>   replace the description's schema with the file contents");
    eprintln!("  --data <file>     replace the description's data with the file contents");
    eprintln!("  --prefix <p>      element-ID prefix (default: generated)");
    eprintln!("  --values          populate node values from the data before printing");
    eprintln!("  --pretty          pretty-print the output tree");
    eprintln!();
    eprintln!("resolve options:");
    eprintln!("  --data <file>     data document to resolve path mappings against");
    eprintln!("  --labeled         treat the mapping as a labeled display mapping");
}
