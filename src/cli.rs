//! Command-line interface (`eemc`): a thin wrapper over the four library
//! entry points.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::complexity::ComplexityMode;
use crate::config::{Backend, OptionBag};

#[derive(Parser)]
#[command(name = "eemc")]
#[command(about = "Source-to-source compiler for partial-charge calculation methods", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse and semantically analyze a method, reporting the first error if any
    Check {
        /// Path to the method's source file
        path: PathBuf,
    },
    /// Print the method's symbolic cost formula
    Complexity {
        /// Path to the method's source file
        path: PathBuf,
        /// Print the exact polynomial rather than the dominant asymptotic term
        #[arg(long)]
        exact: bool,
    },
    /// Run a back end over the method and write its generated files
    Translate {
        /// Path to the method's source file
        path: PathBuf,
        /// Back end to target: native, latex or graph
        #[arg(long)]
        backend: Backend,
        /// Directory to write generated files into (defaults to the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
        /// A `key=value` back-end option; may be repeated
        #[arg(long = "opt", value_parser = parse_opt)]
        opts: Vec<(String, String)>,
    },
}

fn parse_opt(s: &str) -> Result<(String, String), String> {
    OptionBag::from_pair(s)
}

/// Entry point for the CLI.
pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { path } => cmd_check(&path),
        Commands::Complexity { path, exact } => cmd_complexity(&path, exact),
        Commands::Translate { path, backend, out, opts } => cmd_translate(&path, backend, out.as_deref(), &opts),
    }
}

fn read_source(path: &std::path::Path) -> Result<String, Box<dyn std::error::Error>> {
    Ok(fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {e}", path.display()))?)
}

fn render_compile_error(err: &crate::Error, source: &str) -> String {
    match err {
        crate::Error::Compile(e) => e.display_with_source(source),
        other => other.to_string(),
    }
}

fn cmd_check(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = read_source(path)?;
    match crate::compile(&source) {
        Ok(_) => {
            println!("Check passed");
            Ok(())
        }
        Err(err) => Err(render_compile_error(&err, &source).into()),
    }
}

fn cmd_complexity(path: &std::path::Path, exact: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = read_source(path)?;
    let mode = if exact { ComplexityMode::Exact } else { ComplexityMode::Asymptotic };
    match crate::complexity(&source, mode) {
        Ok(formula) => {
            println!("{formula}");
            Ok(())
        }
        Err(err) => Err(render_compile_error(&err, &source).into()),
    }
}

fn cmd_translate(
    path: &std::path::Path,
    backend: Backend,
    out: Option<&std::path::Path>,
    opts: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let source = read_source(path)?;

    let mut bag = OptionBag::new();
    for (k, v) in opts {
        bag.set(k, v);
    }
    let options = bag.into_translate_options().map_err(|e| format!("invalid --opt: {e}"))?;

    let files = crate::translate(&source, backend, &options).map_err(|err| render_compile_error(&err, &source))?;

    let out_dir = out.map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&out_dir)?;
    for file in &files {
        let dest = out_dir.join(&file.relative_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &file.contents)?;
        println!("wrote {}", dest.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn source_file(contents: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn cmd_check_succeeds_on_a_well_formed_method() {
        let f = source_file("name m\nk = 1\n");
        assert!(cmd_check(f.path()).is_ok());
    }

    #[test]
    fn cmd_check_reports_the_first_compile_error() {
        let f = source_file("name bad\nk = 0\nk = 1.5\n");
        let err = cmd_check(f.path()).unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("TypeError"));
        assert!(rendered.contains("k = 1.5"));
    }

    #[test]
    fn cmd_check_surfaces_an_unreadable_path_as_an_error() {
        let missing = std::path::PathBuf::from("/nonexistent/eemc-cli-test-input.method");
        assert!(cmd_check(&missing).is_err());
    }

    #[test]
    fn cmd_complexity_prints_the_asymptotic_formula_by_default() {
        let f = source_file("name m\ni is atom\nfor each j is atom:\nend\n");
        assert!(cmd_complexity(f.path(), false).is_ok());
    }

    #[test]
    fn cmd_translate_writes_every_generated_file_into_the_output_directory() {
        let f = source_file("name m\nk = 1\n");
        let out = tempfile::tempdir().unwrap();
        cmd_translate(f.path(), Backend::Native, Some(out.path()), &[]).unwrap();
        assert!(out.path().join("m.rs").exists());
        assert!(out.path().join("Cargo.toml").exists());
    }

    #[test]
    fn cmd_translate_rejects_an_unknown_opt_key_value_shape() {
        let pair = parse_opt("not_a_kv_pair");
        assert!(pair.is_err());
    }

    #[test]
    fn parse_opt_splits_on_the_first_equals_sign() {
        let (k, v) = parse_opt("format_code=false").unwrap();
        assert_eq!(k, "format_code");
        assert_eq!(v, "false");
    }
}

