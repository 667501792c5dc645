use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::IngestArgs;
use crate::config::load_tables;
use crate::model::{IngestPaths, IngestRunManifest};
use crate::roll::{RollPipeline, table};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    let tables = load_tables(args.tables.as_deref())?;
    let pipeline = RollPipeline::new(&tables)?;

    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read roll text: {}", args.input.display()))?;

    let parsed = pipeline.parse_roll(text.lines());

    info!(
        lines = parsed.counts.lines_seen,
        records = parsed.counts.records_emitted,
        complete = parsed.counts.complete_records,
        partial = parsed.counts.partial_records,
        coerced_fields = parsed.counts.coerced_field_count,
        "roll parsed"
    );

    if args.dry_run {
        info!("dry-run requested, skipping outputs");
        return Ok(());
    }

    table::write_records(&args.output, &parsed.records)?;
    info!(path = %args.output.display(), rows = parsed.records.len(), "wrote roll table");

    let issues_path = args
        .issues_path
        .unwrap_or_else(|| args.output.with_extension("issues.txt"));

    if !parsed.issues.is_empty() {
        let mut body = String::new();
        for issue in &parsed.issues {
            body.push_str(issue.category.as_str());
            body.push('\t');
            body.push_str(&issue.line);
            body.push('\n');
        }

        fs::write(&issues_path, body)
            .with_context(|| format!("failed to write issues file: {}", issues_path.display()))?;
        info!(
            path = %issues_path.display(),
            count = parsed.issues.len(),
            "wrote parse issues"
        );
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.output.with_extension("manifest.json"));

    let mut warnings = Vec::new();
    if parsed.counts.partial_records > 0 {
        warnings.push(format!(
            "{} lines failed field extraction; see {}",
            parsed.counts.partial_records,
            issues_path.display()
        ));
    }
    if parsed.counts.coerced_field_count > 0 {
        warnings.push(format!(
            "{} fields carried unusable text and were coerced to zero",
            parsed.counts.coerced_field_count
        ));
    }

    let manifest = IngestRunManifest {
        manifest_version: 1,
        run_id: format!("ingest-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        source_sha256: sha256_file(&args.input)?,
        paths: IngestPaths {
            source_path: args.input.display().to_string(),
            output_path: args.output.display().to_string(),
            issues_path: issues_path.display().to_string(),
            manifest_path: manifest_path.display().to_string(),
        },
        counts: parsed.counts,
        warnings,
    };

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote ingest manifest");

    Ok(())
}
