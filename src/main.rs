//! moonpack CLI.
//!
//! `init` scaffolds a project, `build` runs the pipeline once, `watch`
//! runs one build and defers continuous rebuilds to the external watcher
//! companion.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use tracing::{error, info, warn};

use moonpack::{
    build_dependency_graph, generate_bundle, lint_graph, load_config, BuildOptions, BundleError,
    LintResult, CONFIG_FILE,
};

fn main() {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = match args.first().map(String::as_str) {
        Some("init") => cmd_init(project_dir(args.get(1))),
        Some("build") => cmd_build(project_dir(args.get(1))),
        Some("watch") => cmd_watch(project_dir(args.get(1))),
        Some("help") | None => {
            print_usage();
            0
        }
        Some("--version") | Some("-v") => {
            println!("moonpack {}", env!("CARGO_PKG_VERSION"));
            0
        }
        Some(other) => {
            eprintln!("unknown command '{other}'");
            print_usage();
            1
        }
    };
    process::exit(code);
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn print_usage() {
    println!(
        "usage: moonpack <command> [dir]\n\n\
         commands:\n  \
         init [dir]     scaffold moonpack.json and a src/main.lua entry\n  \
         build [dir]    bundle the project into <outDir>/<name>.lua\n  \
         watch [dir]    build once; continuous rebuilds run via the watcher companion\n  \
         help           show this message\n  \
         --version      print the version"
    );
}

fn project_dir(arg: Option<&String>) -> PathBuf {
    arg.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_build(root: PathBuf) -> i32 {
    match run_build(&root) {
        Ok(output) => {
            info!("bundle written to {}", output.display());
            0
        }
        Err(message) => {
            error!("{message}");
            1
        }
    }
}

fn run_build(root: &Path) -> Result<PathBuf, String> {
    let (config, config_path) = load_config(root).map_err(tagged)?;
    info!("building {} ({})", config.name, config_path.display());

    let entry_path = root.join(&config.entry);
    let source_root = entry_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let graph = build_dependency_graph(&BuildOptions {
        entry_path,
        source_root,
    })
    .map_err(tagged)?;
    info!("{} module(s) discovered", graph.modules.len());

    report_lint(&lint_graph(&graph));

    let bundle = generate_bundle(&graph, &config);

    let out_dir = if Path::new(&config.out_dir).is_absolute() {
        PathBuf::from(&config.out_dir)
    } else {
        root.join(&config.out_dir)
    };
    let output = out_dir.join(format!("{}.lua", config.name));

    fs::create_dir_all(&out_dir)
        .map_err(|e| format!("failed to create output dir '{}': {e}", out_dir.display()))?;
    fs::write(&output, &bundle)
        .map_err(|e| format!("failed to write '{}': {e}", output.display()))?;

    Ok(output)
}

fn tagged(err: BundleError) -> String {
    format!("[{}] {}", err.code(), err)
}

fn report_lint(result: &LintResult) {
    for group in &result.duplicate_assignments {
        let places: Vec<String> = group
            .occurrences
            .iter()
            .map(|o| format!("{}:{}", o.file_path, o.line))
            .collect();
        warn!(
            "'{}' is assigned in multiple files: {}",
            group.property_path,
            places.join(", ")
        );
    }
    for event in &result.moonloader_events_in_modules {
        warn!(
            "'{}' in {}:{} is a MoonLoader event; it only fires when defined in the entry",
            event.event_name, event.file_path, event.line
        );
    }
    for unused in &result.unused_requires {
        warn!(
            "'{}' ({}) in {}:{} is required but never used",
            unused.var_name, unused.module_name, unused.file_path, unused.line
        );
    }
}

fn cmd_watch(root: PathBuf) -> i32 {
    let code = cmd_build(root);
    info!("watch delegates continuous rebuilds to the moonpack watcher companion");
    code
}

fn cmd_init(root: PathBuf) -> i32 {
    if let Err(e) = fs::create_dir_all(&root) {
        eprintln!("failed to create '{}': {e}", root.display());
        return 1;
    }

    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() {
        eprintln!("refusing to overwrite existing {}", config_path.display());
        return 1;
    }

    let name = root
        .canonicalize()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "my-script".to_string());

    let config = serde_json::json!({
        "name": name,
        "version": "0.1.0",
        "entry": "src/main.lua",
        "outDir": "dist"
    });

    let steps = [
        (
            config_path.clone(),
            format!(
                "{}\n",
                serde_json::to_string_pretty(&config).expect("static config")
            ),
        ),
        (
            root.join("src").join("main.lua"),
            "function main()\n    print('hello from moonpack')\nend\n".to_string(),
        ),
    ];

    for (path, contents) in steps {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("failed to create '{}': {e}", parent.display());
                return 1;
            }
        }
        if let Err(e) = fs::write(&path, contents) {
            eprintln!("failed to write '{}': {e}", path.display());
            return 1;
        }
    }

    info!("scaffolded {} in {}", CONFIG_FILE, root.display());
    0
}
