use std::sync::Arc;

use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::access::{canonical_path, Identity, PermissionLevel, ResourceCategory};
use crate::cli::output::output_object;
use crate::cli::OutputFormat;
use crate::gatekeeper::{CredentialChange, Decision, Gatekeeper, SessionCredential};
use crate::store::MemoryStore;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[arg(help = "Request path")]
    pub path: String,

    #[arg(long, help = "Send the request without a session")]
    pub anonymous: bool,

    #[arg(long, help = "Mark the simulated account as deactivated")]
    pub inactive: bool,

    #[arg(
        long = "grant",
        value_name = "CATEGORY=LEVEL",
        value_parser = parse_grant,
        help = "Grant a permission level, repeatable (e.g. po=view)"
    )]
    pub grants: Vec<(ResourceCategory, PermissionLevel)>,
}

fn parse_grant(raw: &str) -> Result<(ResourceCategory, PermissionLevel), String> {
    let (category, level) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=LEVEL, got '{}'", raw))?;
    let category = category.trim().parse().map_err(|e| format!("{}", e))?;
    let level = level.trim().parse().map_err(|e| format!("{}", e))?;
    Ok((category, level))
}

pub async fn handle(args: SimulateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());
    let identity = Identity::new(Uuid::new_v4()).with_email("simulated@qm.local");

    store.set_active(identity.id, !args.inactive);
    for (category, level) in &args.grants {
        store.grant(identity.id, *category, *level);
    }

    let credential = if args.anonymous {
        SessionCredential::anonymous()
    } else {
        store.open_session(&identity)
    };

    let path = canonical_path(&args.path)?;
    let gatekeeper = Gatekeeper::new(store.clone(), store.clone());
    let verdict = gatekeeper.evaluate(&path, &credential).await;

    let outcome = match &verdict.decision {
        Decision::PassThrough => "pass through".to_string(),
        Decision::Forward { identity } => format!("forward as {}", identity.id),
        Decision::Redirect { to } => format!("redirect to {}", to),
    };
    let cookies = match &verdict.credential {
        CredentialChange::Keep => "keep",
        CredentialChange::Refresh(_) => "refresh",
        CredentialChange::Clear => "clear",
    };

    output_object(
        &output_format,
        &format!("Simulated {}", args.path),
        json!({
            "path": path,
            "category": gatekeeper.routes().category_for(&path),
            "decision": verdict.decision,
            "outcome": outcome,
            "cookies": cookies,
            "permission_lookups": store.permission_lookups(),
        }),
    )
}
