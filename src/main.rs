use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crm_dedupe::fixtures::SeedData;
use crm_dedupe::merge::FieldChoices;
use crm_dedupe::models::{ContactId, DuplicateGroup};
use crm_dedupe::progress::{create_progress_bar, create_spinner, format_duration, set_log_only};
use crm_dedupe::scoring::ScoringConfig;
use crm_dedupe::store::ContactStore;
use crm_dedupe::Crm;

#[derive(Parser)]
#[command(name = "crm-dedupe")]
#[command(about = "Find and merge duplicate CRM contacts")]
struct Args {
    /// Seed data JSON (contacts, deals, activities). Defaults to the built-in set.
    #[arg(long, global = true)]
    fixtures: Option<PathBuf>,

    #[arg(long, short, global = true)]
    verbose: bool,

    /// Hide progress bars and print periodic log lines instead
    #[arg(long, global = true)]
    log_only: bool,

    #[arg(long, default_value = "0", global = true)]
    workers: usize,

    /// Override the retention threshold (composite score must be above it)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Write detection statistics as JSON to this path
    #[arg(long, global = true)]
    stats: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List likely duplicate contacts, ranked by score
    Duplicates {
        /// Only look for duplicates of this contact
        #[arg(long)]
        contact: Option<ContactId>,

        #[arg(long)]
        json: bool,
    },

    /// Merge duplicates into a primary contact
    Merge {
        #[arg(long)]
        primary: ContactId,

        #[arg(long = "duplicate", required = true)]
        duplicates: Vec<ContactId>,

        /// Field choice as FIELD=ID, e.g. email=3 or customFields.industry=3
        #[arg(long = "choose")]
        choices: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Search contacts, deals and activities
    Search { query: String },

    /// Deal count and value per pipeline stage
    Pipeline,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn print_groups(groups: &[DuplicateGroup]) {
    if groups.is_empty() {
        println!("No duplicates found.");
        return;
    }
    for group in groups {
        let original = &group.original;
        println!("\n[{}] {} <{}> ({})", original.id, original.name, original.email, original.company);
        for candidate in &group.duplicates {
            let reasons: Vec<String> = candidate.reasons.iter().map(|r| r.to_string()).collect();
            println!(
                "    {:>4}  [{}] {} <{}>  {}",
                candidate.score,
                candidate.contact.id,
                candidate.contact.name,
                candidate.contact.email,
                reasons.join("; ")
            );
        }
    }
}

fn run_duplicates(crm: &Crm, args: &Args, scope: Option<ContactId>, json: bool) -> Result<()> {
    let subjects = match scope {
        Some(_) => 1,
        None => crm.contacts().len() as u64,
    };
    let pb = create_progress_bar(subjects, "Scanning contacts");
    let report = crm.scan_duplicates(scope, Some(&pb));
    pb.finish_with_message(format!("Scanned {} contacts", report.stats.subjects_scanned));

    if json {
        println!("{}", serde_json::to_string_pretty(&report.groups)?);
    } else {
        print_groups(&report.groups);
    }

    if args.verbose {
        report.stats.log_phase("DETECT");
    }
    if let Some(path) = &args.stats {
        report
            .stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
        info!(path = %path.display(), "stats written");
    }
    Ok(())
}

fn run_merge(
    crm: &mut Crm,
    primary: ContactId,
    duplicates: &[ContactId],
    raw_choices: &[String],
    json: bool,
) -> Result<()> {
    let mut choices = FieldChoices::new();
    for raw in raw_choices {
        let (key, id) = FieldChoices::parse_assignment(raw)
            .with_context(|| format!("Invalid --choose value {:?}", raw))?;
        debug!(field = %key, source = %id, "field choice");
        choices.insert(key, id);
    }

    let merged = crm
        .merge_contacts(primary, duplicates, &choices)
        .context("Merge failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else {
        println!("Merged into [{}] {} <{}>", merged.id, merged.name, merged.email);
        println!("  Company: {}", merged.company);
        if let Some(phone) = &merged.phone {
            println!("  Phone:   {}", phone);
        }
        println!("  Status:  {}", merged.status);
        println!("  Tags:    {}", merged.tags.join(", "));
        for (key, value) in &merged.custom_fields {
            println!("  {}: {}", key, value);
        }
    }
    println!("{} contacts remain", crm.contacts().len());
    Ok(())
}

fn run_search(crm: &Crm, query: &str) {
    let hits = crm.global_search(query);
    if hits.is_empty() {
        println!("No results found.");
        return;
    }
    for hit in hits {
        println!("{}", hit);
    }
}

fn run_pipeline(crm: &Crm) {
    println!("{:<12} {:>6} {:>14}", "Stage", "Deals", "Value");
    println!("{:-<34}", "");
    for row in crm.pipeline_summary() {
        println!("{:<12} {:>6} {:>14.2}", row.stage.to_string(), row.count, row.total_value);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    let start = Instant::now();

    let spinner = create_spinner("Loading fixtures");
    let seed = SeedData::load(args.fixtures.as_deref()).with_context(|| match &args.fixtures {
        Some(path) => format!("Failed to load fixtures from {}", path.display()),
        None => "Failed to parse embedded fixtures".to_string(),
    })?;

    let mut config = ScoringConfig::default();
    if let Some(threshold) = args.threshold {
        config.retain_threshold = threshold;
    }
    let mut crm = Crm::from_seed(seed, config).context("Invalid fixture data")?;
    spinner.finish_with_message(format!("Loaded {} contacts", crm.contacts().len()));

    match &args.command {
        Command::Duplicates { contact, json } => run_duplicates(&crm, &args, *contact, *json)?,
        Command::Merge {
            primary,
            duplicates,
            choices,
            json,
        } => run_merge(&mut crm, *primary, duplicates, choices, *json)?,
        Command::Search { query } => run_search(&crm, query),
        Command::Pipeline => run_pipeline(&crm),
    }

    debug!(elapsed = %format_duration(start.elapsed()), "done");
    Ok(())
}
