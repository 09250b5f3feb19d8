use sprout::bootstrap::{AssetSummary, ContentSummary, ImportCounts, ModelSummary, UserSummary};

pub fn content(summary: &ContentSummary, dry_run: bool) {
    let report = &summary.instantiated;
    let verb = if dry_run { "would create" } else { "created" };
    println!("documents: {}, nodes: {}", summary.documents, summary.nodes);
    println!("pages {verb}: {}, skipped: {}, deferred relations: {}",
        report.created, report.skipped, report.deferred);

    if let Some(resolved) = &summary.resolved {
        let tally = resolved.tally;
        println!("relations resolved: {}, objects: {}, nulled: {}, dropped: {}",
            resolved.batches, resolved.items,
            report.tally.nulled + tally.nulled, report.tally.dropped + tally.dropped);
        println!("sites: {}", summary.sites);
    }

    for failure in &report.failures {
        println!("failed: {} ({} below skipped)\n{}", failure.path, failure.skipped, failure.error);
    }
}

fn counts(name: &str, c: &ImportCounts) {
    println!("{name}: total: {}, unchanged: {}, replaced: {}, new: {}, ignored: {}",
        c.total, c.unchanged, c.altered, c.inserted, c.ignored);
}

pub fn assets(summary: &AssetSummary) {
    counts("images", &summary.images);
    counts("documents", &summary.documents);
}

pub fn models(summary: &ModelSummary) {
    println!("model files: {}, created: {}, updated: {}", summary.files, summary.created, summary.updated);
}

pub fn users(summary: &UserSummary) {
    println!("users created: {}, skipped: {}", summary.created, summary.skipped);
}
