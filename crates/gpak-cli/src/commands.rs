use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use colored::Colorize;
use gpak_loader::{
    BufferPayload, Container, GraphCollector, LoadConfig, LoadedObject, Loader, ResolvedOpcode,
    ValidationConfig,
};
use gpak_tables::{flags, ChunkKind};
use gpak_types::LoadMode;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;
use crate::demo;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref())?;
    let format = cli.format;
    match cli.command {
        Command::Inspect(args) => cmd_inspect(&args.file, &config, format)?,
        Command::Validate(args) => return cmd_validate(args, format),
        Command::Dump(args) => cmd_dump(args, config, format)?,
        Command::Deps(args) => cmd_deps(&args.file, &config, format)?,
        Command::Demo(args) => cmd_demo(&args.out, format)?,
    }
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LoadConfig> {
    let Some(path) = path else {
        return Ok(LoadConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config = LoadConfig::from_toml_str(&text)?;
    debug!(path = %path.display(), mode = %config.mode, "loader config read");
    Ok(config)
}

fn open(path: &Path, validation: &ValidationConfig) -> anyhow::Result<Container> {
    let container = Container::open(path, validation)
        .with_context(|| format!("opening {}", path.display()))?;
    debug!(
        path = %path.display(),
        mapped = container.is_mapped(),
        exports = container.tables().exports().len(),
        "container opened"
    );
    Ok(container)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_inspect(path: &Path, config: &LoadConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(path, &config.validation)?;
    let header = container.header();
    if format == OutputFormat::Json {
        return print_json(header);
    }

    println!("{} {}", "Container".bold(), path.display());
    println!("  Version: {}", header.version.to_string().cyan());
    let mut names = Vec::new();
    if header.has_flag(flags::HAS_BUFFERS) {
        names.push("has-buffers");
    }
    if header.has_flag(flags::INCREMENTAL) {
        names.push("incremental");
    }
    println!("  Flags: {:#x} [{}]", header.flags, names.join(", "));
    println!("  Header crc: {:#010x}", header.header_crc);
    println!(
        "  Regions: tables ..{}  objects ..{}  buffers ..{}",
        header.headers_end, header.objects_end, header.buffers_end
    );
    println!("  Objects checksum: {:#018x}", header.objects_checksum);
    println!("  Buffers checksum: {:#018x}", header.buffers_checksum);
    println!();
    println!(
        "  {:<12} {:>10} {:>10} {:>8} {:>10}",
        "chunk".bold(),
        "offset".bold(),
        "size".bold(),
        "count".bold(),
        "crc32".bold()
    );
    for kind in ChunkKind::ALL {
        let chunk = header.chunk(kind);
        println!(
            "  {:<12} {:>10} {:>10} {:>8} {:>10}",
            kind.name(),
            chunk.offset,
            chunk.size,
            chunk.count,
            format!("{:08x}", chunk.crc32).dimmed()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ValidationOutcome {
    file: String,
    valid: bool,
    checks: ValidationConfig,
    error: Option<String>,
}

/// In JSON mode a failed validation is reported in the document and through
/// the exit status only.
fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let validation = if args.release {
        ValidationConfig::release()
    } else {
        ValidationConfig::default()
    };
    let result = Container::open(&args.file, &validation);
    if format == OutputFormat::Json {
        let outcome = ValidationOutcome {
            file: args.file.display().to_string(),
            valid: result.is_ok(),
            checks: validation,
            error: result.as_ref().err().map(|e| e.to_string()),
        };
        print_json(&outcome)?;
        return Ok(if outcome.valid {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let container = result.with_context(|| format!("validating {}", args.file.display()))?;
    let tables = container.tables();
    println!("{} {} is valid", "✓".green().bold(), args.file.display());
    println!(
        "  {} exports, {} buffers, {} imports",
        tables.exports().len(),
        tables.buffers().len(),
        tables.imports().len().saturating_sub(1)
    );
    if args.release {
        println!("  {}", "checksums not verified (--release)".yellow());
    }
    Ok(ExitCode::SUCCESS)
}

fn describe(op: &ResolvedOpcode<'_>) -> String {
    match op {
        ResolvedOpcode::SkipHeader { end } => format!("skip -> {end}"),
        ResolvedOpcode::SkipLabel => "label".to_owned(),
        ResolvedOpcode::Property(p) => {
            format!("{}.{}: {}", p.class, p.name.bold(), p.value_type.cyan())
        }
        ResolvedOpcode::DataBlock { width, bytes } => {
            let preview = hex::encode(&bytes[..bytes.len().min(16)]);
            let more = if bytes.len() > 16 { "..." } else { "" };
            format!("block{width} [{}] {preview}{more}", bytes.len())
        }
        ResolvedOpcode::DataTypeRef(t) => format!("type {t}"),
        ResolvedOpcode::DataName(n) => format!("name {n}"),
        ResolvedOpcode::DataObjectPointer(Some(e)) => format!("object -> export {e}"),
        ResolvedOpcode::DataObjectPointer(None) => "object -> null".to_owned(),
        ResolvedOpcode::DataResourceRef(Some(key)) => format!("resource {}", key.to_string().blue()),
        ResolvedOpcode::DataResourceRef(None) => "resource -> none".to_owned(),
        ResolvedOpcode::DataAdaptiveNumber(v) => format!("number {v}"),
        ResolvedOpcode::DataInlineBuffer(b) => format!("inline buffer [{}]", b.len()),
        ResolvedOpcode::DataDeferredBuffer(BufferPayload::Loaded(b)) => {
            format!("buffer loaded [{}]", b.len())
        }
        ResolvedOpcode::DataDeferredBuffer(BufferPayload::Deferred(h)) => {
            let info = h.info();
            format!(
                "buffer deferred {:#018x} [{} -> {}, {}]",
                info.checksum, info.compressed_size, info.uncompressed_size, info.compression
            )
        }
    }
}

fn print_object(object: &LoadedObject) {
    println!(
        "{} {} {}",
        "export".dimmed(),
        object.export.to_string().yellow().bold(),
        object.class.bold()
    );
    let mut depth = 1;
    for op in &object.opcodes {
        if matches!(op, ResolvedOpcode::SkipLabel) {
            depth = depth.max(2) - 1;
        }
        println!("{:indent$}{}", "", describe(op), indent = depth * 2);
        if matches!(op, ResolvedOpcode::SkipHeader { .. }) {
            depth += 1;
        }
    }
}

#[derive(Serialize)]
struct DumpOutput<'a> {
    report: &'a gpak_loader::LoadReport,
    objects: &'a [LoadedObject],
}

fn cmd_dump(args: DumpArgs, mut config: LoadConfig, format: OutputFormat) -> anyhow::Result<()> {
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    let container = open(&args.file, &config.validation)?;
    let mut collector = GraphCollector::new();
    let report = Loader::new(&container, config)
        .load(&mut collector)
        .with_context(|| format!("loading {}", args.file.display()))?;

    if format == OutputFormat::Json {
        return print_json(&DumpOutput {
            report: &report,
            objects: collector.objects(),
        });
    }
    for object in collector.objects() {
        print_object(object);
    }
    if report.mode == LoadMode::DependenciesOnly {
        for key in &report.dependencies {
            println!("  {} {}", "import".dimmed(), key.to_string().blue());
        }
    }
    println!(
        "{} {} objects, {} opcodes, {} buffers fetched, {} deferred ({})",
        "✓".green(),
        report.objects,
        report.opcodes,
        report.buffers_fetched,
        report.buffers_deferred,
        report.mode
    );
    Ok(())
}

fn cmd_deps(path: &Path, config: &LoadConfig, format: OutputFormat) -> anyhow::Result<()> {
    let container = open(path, &config.validation)?;
    let deps = container.dependencies()?;
    if format == OutputFormat::Json {
        return print_json(&deps);
    }
    if deps.is_empty() {
        println!("No external dependencies.");
    }
    for key in &deps {
        println!("  {} {}", key.class.bold(), key.guid.to_string().cyan());
    }
    Ok(())
}

fn cmd_demo(out: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let report = demo::write_demo(out).with_context(|| format!("writing {}", out.display()))?;
    if format == OutputFormat::Json {
        return print_json(&report);
    }
    println!(
        "{} Wrote {} ({} objects, {} bytes, {} bytes of skip padding)",
        "✓".green().bold(),
        out.display().to_string().bold(),
        report.objects.len(),
        report.bytes_written,
        report.wasted_bytes
    );
    Ok(())
}
