use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::Value;

use policy_catalog_api::POLICY_LIST_QUERY;
use policy_catalog_core::{
    dataset_fingerprint, demo_dataset, generate_dataset, read_snapshot, resolve_policy_page,
    write_snapshot, FixtureConfig, PageRequest, PolicyStore, SortCache, SortOrder, SortSpec,
    Timestamp, DEFAULT_FIXTURE_CUSTOMERS, DEFAULT_FIXTURE_POLICIES,
};

const CLI_CONTRACT: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "policy-catalog")]
#[command(about = "Seed, inspect, and query the insurance policy catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a deterministic dataset and write it as a snapshot.
    Seed(SeedArgs),
    /// Resolve one page offline against a snapshot or the demo data.
    Page(PageArgs),
    /// Print the fingerprint of a snapshot.
    Fingerprint(FingerprintArgs),
    /// Send the policy-list query to a running service.
    Query(QueryArgs),
}

#[derive(Debug, Args)]
struct SeedArgs {
    /// Directory the snapshot files are written into.
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    seed: u64,
    /// Reference instant for generation, RFC 3339.
    #[arg(long)]
    now: String,
    #[arg(long, default_value_t = DEFAULT_FIXTURE_CUSTOMERS)]
    customers: usize,
    #[arg(long, default_value_t = DEFAULT_FIXTURE_POLICIES)]
    policies: usize,
}

#[derive(Debug, Args)]
struct PageArgs {
    /// Snapshot directory; the bundled demo dataset when omitted.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    offset: usize,
    #[arg(long)]
    limit: Option<usize>,
    /// Sort field path, dotted for nesting (customer.lastName); repeat the
    /// flag for a composite sort.
    #[arg(long)]
    sort_field: Vec<String>,
    #[arg(long, value_enum, default_value = "asc")]
    order: OrderArg,
}

#[derive(Debug, Args)]
struct FingerprintArgs {
    /// Snapshot directory to fingerprint.
    #[arg(long)]
    data_dir: PathBuf,
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// GraphQL endpoint of a running catalog service.
    #[arg(long, default_value = "http://127.0.0.1:4000/graphql")]
    endpoint: String,
    #[arg(long, default_value_t = 0)]
    offset: usize,
    #[arg(long)]
    limit: Option<usize>,
    /// Sort field path, dotted for nesting; repeat for a composite sort.
    #[arg(long)]
    sort_field: Vec<String>,
    #[arg(long, value_enum, default_value = "asc")]
    order: OrderArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl OrderArg {
    fn to_order(self) -> SortOrder {
        match self {
            Self::Asc => SortOrder::Asc,
            Self::Desc => SortOrder::Desc,
        }
    }

    fn as_wire(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

fn with_contract(value: Value) -> Value {
    let mut value = value;
    if let Value::Object(map) = &mut value {
        map.insert("contract".to_string(), Value::String(CLI_CONTRACT.to_string()));
    }
    value
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract(value))?);
    Ok(())
}

/// Expand dotted sort paths into the flat wire field list.
fn wire_fields(sort_fields: &[String]) -> Vec<String> {
    let mut fields = Vec::new();
    for path in sort_fields {
        for segment in path.split('.') {
            fields.push(segment.to_string());
        }
    }
    fields
}

fn run_seed(args: &SeedArgs) -> Result<()> {
    let now = Timestamp::parse_rfc3339(&args.now)?;
    let config = FixtureConfig {
        seed: args.seed,
        now,
        customers: args.customers,
        policies: args.policies,
    };
    let dataset = generate_dataset(&config)?;
    write_snapshot(&args.out, &dataset).context("failed to write snapshot")?;
    let fingerprint = dataset_fingerprint(&dataset)?;
    emit_json(serde_json::json!({
        "out_dir": args.out.display().to_string(),
        "seed": args.seed,
        "customers": dataset.customers.len(),
        "policies": dataset.policies.len(),
        "fingerprint": fingerprint,
    }))
}

fn run_page(args: &PageArgs) -> Result<()> {
    let dataset = match &args.data_dir {
        Some(dir) => read_snapshot(dir).context("failed to read snapshot")?,
        None => demo_dataset(),
    };
    let store = PolicyStore::from_dataset(dataset)?;
    let cache = SortCache::new(1)?;
    let sort = if args.sort_field.is_empty() {
        None
    } else {
        Some(SortSpec::from_wire_fields(&wire_fields(&args.sort_field), args.order.to_order())?)
    };
    let request = PageRequest { offset: args.offset, limit: args.limit, sort };
    let page = resolve_policy_page(&store, &cache, &request)?;

    let mut rows = Vec::with_capacity(page.policies.len());
    for policy in &page.policies {
        let customer = store
            .customer(&policy.customer_id)
            .map(|customer| format!("{} {}", customer.first_name, customer.last_name))
            .unwrap_or_default();
        let start_date = policy.start_date.to_rfc3339()?;
        let end_date = policy.end_date.to_rfc3339()?;
        let created_at = policy.created_at.to_rfc3339()?;
        rows.push(serde_json::json!({
            "id": policy.id.as_str(),
            "policy_number": policy.policy_number,
            "provider": policy.provider,
            "insurance_type": policy.insurance_type.as_str(),
            "status": policy.status.as_str(),
            "customer": customer,
            "start_date": start_date,
            "end_date": end_date,
            "created_at": created_at,
            "start_date_ms": policy.start_date.as_unix_millis(),
            "end_date_ms": policy.end_date.as_unix_millis(),
            "created_at_ms": policy.created_at.as_unix_millis(),
        }));
    }
    emit_json(serde_json::json!({
        "offset": args.offset,
        "limit": args.limit,
        "total": page.total,
        "has_next_page": page.has_next_page,
        "policies": rows,
    }))
}

fn run_fingerprint(args: &FingerprintArgs) -> Result<()> {
    let dataset = read_snapshot(&args.data_dir).context("failed to read snapshot")?;
    let fingerprint = dataset_fingerprint(&dataset)?;
    emit_json(serde_json::json!({
        "data_dir": args.data_dir.display().to_string(),
        "customers": dataset.customers.len(),
        "policies": dataset.policies.len(),
        "fingerprint": fingerprint,
    }))
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let mut variables = serde_json::json!({ "offset": args.offset });
    if let Some(limit) = args.limit {
        variables["limit"] = serde_json::json!(limit);
    }
    if !args.sort_field.is_empty() {
        variables["sort"] = serde_json::json!({
            "fields": wire_fields(&args.sort_field),
            "order": args.order.as_wire(),
        });
    }

    let response: Value = ureq::post(&args.endpoint)
        .send_json(serde_json::json!({
            "query": POLICY_LIST_QUERY,
            "variables": variables,
        }))
        .with_context(|| format!("request to {} failed", args.endpoint))?
        .into_json()
        .context("service response was not valid JSON")?;
    emit_json(serde_json::json!({
        "endpoint": args.endpoint,
        "response": response,
    }))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Seed(args) => run_seed(&args),
        Command::Page(args) => run_page(&args),
        Command::Fingerprint(args) => run_fingerprint(&args),
        Command::Query(args) => run_query(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test IDs: TCLIU-001
    #[test]
    fn dotted_paths_expand_to_wire_segments() {
        let paths = vec!["provider".to_string(), "customer.lastName".to_string()];
        assert_eq!(wire_fields(&paths), vec!["provider", "customer", "lastName"]);
    }

    // Test IDs: TCLIU-002
    #[test]
    fn contract_marker_is_stamped_onto_objects() {
        let value = with_contract(serde_json::json!({ "total": 7 }));
        assert_eq!(value["contract"], serde_json::json!("cli.v1"));
        assert_eq!(value["total"], serde_json::json!(7));
    }
}
