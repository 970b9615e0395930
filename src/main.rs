use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use skinshortcuts_compiler::config::constants::compile_time::files::INCLUDES_FILE;
use skinshortcuts_compiler::{logging, pipeline, BuildOptions, BuildOutcome};

fn main() -> ExitCode {
    if let Err(e) = logging::init_global_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_help(&args[0]);
        return if args.len() < 2 {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    let parsed = parse_arguments(&args[1..]);
    let action = parsed
        .get("type")
        .map(String::as_str)
        .unwrap_or("buildxml")
        .to_string();

    let options = match build_options(&parsed) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Run '{} --help' for usage.", args[0]);
            return ExitCode::FAILURE;
        }
    };

    let result = match action.as_str() {
        "buildxml" => pipeline::build(&options),
        "resetall" => pipeline::reset_all(&options),
        "resetmenus" => pipeline::reset_menus(&options),
        "resetviews" => pipeline::reset_views(&options),
        "clear" => {
            let menu = parsed.get("menu").map(String::as_str).unwrap_or("");
            let item = parsed.get("item").map(String::as_str).unwrap_or("");
            if menu.is_empty() || item.is_empty() {
                eprintln!("Error: clear requires menu= and item=");
                return ExitCode::FAILURE;
            }
            let suffix = parsed.get("suffix").map(String::as_str).unwrap_or("");
            let property = parsed.get("property").map(String::as_str).unwrap_or("");
            pipeline::clear_custom_widget(&options, menu, item, suffix, property)
        }
        other => {
            eprintln!("Error: unknown action '{}'", other);
            return ExitCode::FAILURE;
        }
    };

    logging::print_cargo_style_summary();

    match result {
        Ok(BuildOutcome::Built) => {
            println!("Build complete.");
            ExitCode::SUCCESS
        }
        Ok(BuildOutcome::UpToDate) => {
            println!("Up to date.");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("FAILED: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn parse_arguments(args: &[String]) -> HashMap<String, String> {
    let mut parsed = HashMap::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                parsed.insert(key.to_string(), value.to_string());
            }
            None => {
                eprintln!("Warning: ignoring argument '{}' (expected key=value)", arg);
            }
        }
    }
    parsed
}

fn build_options(parsed: &HashMap<String, String>) -> Result<BuildOptions, String> {
    let shortcuts_dir = parsed
        .get("path")
        .map(PathBuf::from)
        .ok_or("path= is required (the skin's shortcuts folder)")?;

    if !shortcuts_dir.is_dir() {
        return Err(format!(
            "shortcuts folder does not exist: {}",
            shortcuts_dir.display()
        ));
    }

    let output_paths: Vec<PathBuf> = parsed
        .get("output")
        .map(String::as_str)
        .unwrap_or("")
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let path = PathBuf::from(p.trim());
            // A directory means "the standard includes file inside it".
            if path.is_dir() {
                path.join(INCLUDES_FILE)
            } else {
                path
            }
        })
        .collect();

    if output_paths.is_empty() {
        return Err("output= is required (file or directory, comma-separated for multiple)".into());
    }

    let mut options = BuildOptions::new(shortcuts_dir, output_paths);

    if let Some(userdata) = parsed.get("userdata") {
        options.userdata_path = Some(PathBuf::from(userdata));
    }
    if let Some(hashes) = parsed.get("hashes") {
        options.hash_path = PathBuf::from(hashes);
    }
    if let Some(skin) = parsed.get("skin") {
        options.skin_dir = skin.clone();
    }
    if let Some(host) = parsed.get("host") {
        options.host_version = host.clone();
    }
    options.force = parsed
        .get("force")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok(options)
}

fn print_help(program_name: &str) {
    println!(
        "Skin Shortcuts Compiler v{}",
        env!("CARGO_PKG_VERSION")
    );
    println!("Compiles declarative skin menu configuration into include XML");
    println!();
    println!("USAGE:");
    println!("    {} path=<shortcuts-dir> output=<file-or-dir> [options]", program_name);
    println!();
    println!("ARGUMENTS:");
    println!("    path=DIR           Skin shortcuts folder (menus.xml, templates.xml, ...)");
    println!("    output=PATHS       Output file(s) or folder(s), comma-separated");
    println!();
    println!("OPTIONS:");
    println!("    type=ACTION        buildxml (default), resetall, resetmenus,");
    println!("                       resetviews, clear");
    println!("    userdata=FILE      User customization JSON");
    println!("    hashes=FILE        Fingerprint store (default: next to first output)");
    println!("    skin=NAME          Skin identifier recorded in the fingerprints");
    println!("    host=VERSION       Host major version recorded in the fingerprints");
    println!("    force=true         Rebuild even when fingerprints match");
    println!();
    println!("CLEAR ACTION:");
    println!("    menu=NAME item=NAME [suffix=.N] [property=PREFIX]");
    println!("    Clears a custom widget slot and its widget properties");
    println!();
    println!("EXAMPLES:");
    println!("    {} path=skin/shortcuts output=skin/xml", program_name);
    println!(
        "    {} path=skin/shortcuts output=a/includes.xml,b/includes.xml force=true",
        program_name
    );
    println!(
        "    {} path=skin/shortcuts output=skin/xml type=clear menu=mainmenu item=movies",
        program_name
    );
}
