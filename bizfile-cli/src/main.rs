use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use bizfile_core::processor::ExtractionStages;
use bizfile_core::{
    DocumentProcessor, ExtractionResult, LayoutBackend, LayoutProfile, ProcessOptions,
    ProfileRegistry, UnfinishedRecordPolicy, DEFAULT_PROFILE,
};

#[derive(Parser)]
#[command(name = "bizfile")]
#[command(about = "Rebuild company records from the laid-out pages of a business filing")]
struct Args {
    /// Layout file to process (.json pages or pdftotext -bbox-layout .xhtml)
    #[arg(short, long)]
    input: Option<String>,

    /// Name of a registered layout profile
    #[arg(short, long, default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Path to a custom profile file (YAML format); registered and used instead of --profile
    #[arg(short, long)]
    config: Option<String>,

    /// Output format: full or summary
    #[arg(short = 'f', long, default_value = "full")]
    output_format: String,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<String>,

    /// Show registered profiles and exit
    #[arg(long)]
    show_profiles: bool,

    /// What to do with records still waiting for a continuation at document end
    #[arg(long, value_enum)]
    unfinished: Option<UnfinishedArg>,

    /// Keep duplicate records instead of collapsing them
    #[arg(long)]
    keep_duplicates: bool,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile_steps: bool,

    /// Skip cache and force fresh processing
    #[arg(long)]
    skip_cache: bool,

    /// Cache directory for extraction results
    #[arg(long, default_value = ".bizfile-cache")]
    cache_dir: String,

    /// Dump fragments, rows and the result of every stage to a directory
    #[arg(long)]
    dump_stages: bool,

    /// Directory for stage dump output
    #[arg(long, default_value = "test_outputs/stages")]
    stages_dir: String,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum UnfinishedArg {
    /// Emit the record with the fields it has
    Emit,
    /// Discard it
    Drop,
}

impl From<UnfinishedArg> for UnfinishedRecordPolicy {
    fn from(arg: UnfinishedArg) -> Self {
        match arg {
            UnfinishedArg::Emit => UnfinishedRecordPolicy::Emit,
            UnfinishedArg::Drop => UnfinishedRecordPolicy::Drop,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    println!("🏢 Bizfile Extractor");

    let mut registry = ProfileRegistry::new();
    let profile_name = match &args.config {
        Some(config_path) => {
            let name = registry
                .load_profile_from_file(config_path)
                .with_context(|| format!("Failed to load profile from {config_path}"))?;
            println!("📋 Loaded profile '{}' from: {}", name, config_path);
            name
        }
        None => args.profile.clone(),
    };

    if args.show_profiles {
        show_profiles(&registry);
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        println!("⚠️  No input given. Use --input <path> or --show-profiles.");
        return Ok(());
    };

    if !Path::new(input).exists() {
        println!("⚠️  Input not found at: {}", input);
        println!("   Please check the file path.");
        return Ok(());
    }
    if !LayoutBackend::supports_file_type(Path::new(input)) {
        println!("⚠️  Unsupported input type: {}", input);
        println!("   Expected .json, .html, .xhtml or .xml");
        return Ok(());
    }

    let mut profile = registry.get(&profile_name)?.clone();
    apply_overrides(&mut profile, &args);
    println!("📋 Using profile: {}", profile.name);

    let mut processor = if args.skip_cache {
        DocumentProcessor::new_without_cache()
    } else {
        DocumentProcessor::new_cli_with_cache(&args.cache_dir)?
    };

    println!("📄 Processing: {}", input);

    if args.dump_stages {
        println!("\n🔬 Pipeline stage dump mode");
        match processor.capture_stages(input, &profile) {
            Ok(stages) => {
                save_stages(&stages, input, &args.stages_dir)?;
                println!("\n✅ All stages dumped to: {}", args.stages_dir);
            }
            Err(e) => {
                eprintln!("❌ Stage dump failed: {e}");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let options = ProcessOptions {
        profiling: args.profile_steps,
        skip_cache: args.skip_cache,
    };

    match processor.process_file(input, &profile, options) {
        Ok(result) => {
            println!("✅ Successfully processed document");
            print_metrics(&result);

            let output_path = args
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(input, &profile.name));
            save_result(&result, &output_path, &args.output_format)?;
        }
        Err(e) => {
            eprintln!("❌ Processing failed: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply_overrides(profile: &mut LayoutProfile, args: &Args) {
    if let Some(policy) = args.unfinished {
        profile.unfinished_records = policy.into();
    }
    if args.keep_duplicates {
        profile.dedupe = false;
    }
}

fn default_output_path(input: &str, profile_name: &str) -> String {
    let input_name = Path::new(input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{input_name}_{profile_name}_bizfile.json")
}

fn print_metrics(result: &ExtractionResult) {
    let summary = result.to_summary_format();
    println!("📊 Extraction metrics:");
    println!("   - Pages: {}", summary.page_count);
    if let Some(registration_no) = &summary.registration_no {
        println!("   - Registration No.: {}", registration_no);
    }
    for (table, count) in &summary.records {
        println!("   - {}: {}", table, count);
    }
    if summary.unfinished_records > 0 {
        println!("   - Unfinished records: {}", summary.unfinished_records);
    }
}

fn show_profiles(registry: &ProfileRegistry) {
    println!("\n📋 Registered Profiles:");
    for name in registry.names() {
        let description = registry
            .get(name)
            .ok()
            .and_then(|profile| profile.description.clone())
            .unwrap_or_default();
        println!("  {:<20} {}", name, description);
    }

    println!("\n📄 Output Formats:");
    println!("  full     - Every extracted record plus the company block (default)");
    println!("  summary  - Record counts per table and the company identity");

    println!("\n📝 Usage Examples:");
    println!("  bizfile -i filing.json");
    println!("  bizfile -i filing.xhtml -o /path/to/output.json");
    println!("  bizfile -i filing.json -c custom-profile.yaml -f summary");
}

fn save_stages(stages: &ExtractionStages, input: &str, output_dir: &str) -> Result<()> {
    use std::fs;
    fs::create_dir_all(output_dir)?;

    // Stage 1: fragments per page
    let pages_path = format!("{}/stage1_fragments.json", output_dir);
    fs::write(&pages_path, serde_json::to_string_pretty(&stages.pages)?)?;
    let fragment_count: usize = stages.pages.iter().map(|page| page.fragments.len()).sum();
    println!("  💾 {} ({} fragments)", pages_path, fragment_count);

    // Stage 2: rows, bottom-up
    let rows_path = format!("{}/stage2_rows.json", output_dir);
    fs::write(&rows_path, serde_json::to_string_pretty(&stages.rows)?)?;
    println!("  💾 {} ({} rows)", rows_path, stages.rows.len());

    // Stage 3: records
    let result_path = format!("{}/stage3_result.json", output_dir);
    stages.result.save_with_format(&result_path, "full")?;
    println!("  💾 {}", result_path);

    let summary = serde_json::json!({
        "input": input,
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "pages": stages.pages.len(),
            "fragments": fragment_count,
            "rows": stages.rows.len(),
        },
        "result": stages.result.to_summary_format(),
    });
    let summary_path = format!("{}/summary.json", output_dir);
    fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    println!("  💾 {}", summary_path);

    Ok(())
}

fn save_result(result: &ExtractionResult, output_path: &str, format: &str) -> Result<()> {
    result.save_with_format(output_path, format)?;

    match format {
        "summary" => println!("💾 Summary results saved to: {}", output_path),
        "full" => println!("💾 Full results saved to: {}", output_path),
        _ => {
            println!("⚠️  Unknown output format '{}', using full format", format);
            println!("💾 Full results saved to: {}", output_path);
        }
    }

    Ok(())
}
