//! Minimal CLI: schema (+ layout, data, options) → (resolved | layout | data | report)
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use schemaform::{FormOptions, JsonSchemaForm, normalize_draft, resolve_schema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// build JSON-Schema forms offline and print the trees the form engine derives
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// resolve `$ref`s and print the resolved schema with its recursion maps
    Resolve(ResolveOut),
    /// build the form and print its layout tree
    Layout(FormOut),
    /// build the form and print the formatted data
    Format(FormOut),
    /// build the form and print the validation report
    Validate(FormOut),
}

#[derive(Args, Debug, Clone)]
struct FormInput {
    /// JSON Schema file
    #[arg(long, short)]
    schema: PathBuf,

    /// layout file (a JSON array of layout items)
    #[arg(long)]
    layout: Option<PathBuf>,

    /// initial data file
    #[arg(long)]
    data: Option<PathBuf>,

    /// form options file, e.g. {"listItems": 1, "returnEmptyFields": true}
    #[arg(long)]
    options: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct ResolveOut {
    /// JSON Schema file
    #[arg(long, short)]
    schema: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct FormOut {
    #[command(flatten)]
    input: FormInput,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl FormInput {
    fn load(&self) -> Result<JsonSchemaForm> {
        let mut form = JsonSchemaForm::new(read_json(&self.schema)?);
        if let Some(path) = &self.layout {
            form = form.with_layout(read_json(path)?);
        }
        if let Some(path) = &self.data {
            form = form.with_data(read_json(path)?);
        }
        if let Some(path) = &self.options {
            let src = read_source(path)?;
            let options = FormOptions::from_json_str(&src)
                .with_context(|| format!("failed to load options from {}", path.display()))?;
            form = form.with_options(options);
        }
        form.initialize()
            .with_context(|| format!("failed to build form for {}", self.schema.display()))?;
        Ok(form)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Resolve(target) => {
                let schema = read_json(&target.schema)?;
                let resolved = resolve_schema(&normalize_draft(&schema))
                    .with_context(|| format!("failed to resolve {}", target.schema.display()))?;
                info!(
                    library = resolved.ref_library.len(),
                    recursive = resolved.schema_recursive_refs.len(),
                    "resolved schema"
                );
                emit(&resolved, target.out.as_deref())
            }
            Command::Layout(target) => {
                let form = target.input.load()?;
                emit(&form.layout(), target.out.as_deref())
            }
            Command::Format(target) => {
                let form = target.input.load()?;
                emit(&form.data(), target.out.as_deref())
            }
            Command::Validate(target) => {
                let form = target.input.load()?;
                emit(&form.validation(), target.out.as_deref())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json(path: &Path) -> Result<Value> {
    let source = read_source(path)?;
    serde_json::from_str(&source).with_context(|| format!("failed to parse JSON source file ({})", path.display()))
}

fn emit<T: Serialize>(value: &T, out: Option<&Path>) -> Result<()> {
    let source = serde_json::to_string_pretty(value)?;
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &source).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{source}"),
    }
    Ok(())
}
