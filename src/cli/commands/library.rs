//! Ingestion, listing and statistics commands.

use std::io::Write;
use tokio::runtime::Runtime;

use pic_curator::db::ListFilter;
use pic_curator::engine::Curator;
use pic_curator::library::IngestEvent;

/// Scan the managed root and reconcile it with the database
pub fn cmd_ingest(rt: &Runtime, curator: &Curator, verbose: bool) -> anyhow::Result<()> {
    println!("Ingesting: {}", curator.root().display());

    let mut count = 0usize;
    let summary = rt.block_on(curator.ingest_with(|event| {
        count += 1;
        match event {
            IngestEvent::Unreadable { path, message } | IngestEvent::Failed { path, message } => {
                eprintln!("\nError processing {path}: {message}");
            }
            IngestEvent::Duplicate {
                path,
                original,
                hidden_path,
            } if verbose => println!("DUPLICATE: {path} (of {original}) -> {hidden_path}"),
            IngestEvent::Relocated { from, to } if verbose => println!("MOVED: {from} -> {to}"),
            IngestEvent::Added { path } if verbose => println!("+ {path}"),
            IngestEvent::Backfilled { path } if verbose => println!("~ {path}"),
            _ => {}
        }
        if !verbose && count % 100 == 0 {
            print!("\rProcessed {count} files...");
            let _ = std::io::stdout().flush();
        }
    }))?;

    println!(
        "\nIngest complete: {} files, {} added, {} backfilled, {} relocated, {} duplicates, {} unchanged, {} unreadable, {} failed",
        summary.discovered,
        summary.added,
        summary.backfilled,
        summary.relocated,
        summary.duplicates,
        summary.unchanged,
        summary.unreadable,
        summary.failed
    );
    Ok(())
}

/// List images by rating
pub fn cmd_list(
    rt: &Runtime,
    curator: &Curator,
    hidden: bool,
    visible: bool,
    json: bool,
) -> anyhow::Result<()> {
    let filter = match (hidden, visible) {
        (true, _) => ListFilter::Hidden,
        (_, true) => ListFilter::Visible,
        _ => ListFilter::All,
    };
    let images = rt.block_on(curator.list(filter))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(());
    }

    for image in &images {
        println!(
            "{:>5}  shown {:>3}  extra {:>2}{}  {}",
            image.elo_rating,
            image.shown_times,
            image.extra_count,
            if image.hidden { "  [hidden]" } else { "" },
            image.path
        );
    }
    println!("{} images", images.len());
    Ok(())
}

/// Show library statistics
pub fn cmd_stats(rt: &Runtime, curator: &Curator, json: bool) -> anyhow::Result<()> {
    let stats = rt.block_on(curator.stats())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Images:    {} ({} visible, {} hidden)", stats.total, stats.visible, stats.hidden);
    println!("Landscape: {}", stats.landscape);
    println!("Portrait:  {}", stats.portrait);
    for (dir, count) in &stats.tiers {
        println!("  {dir:<12} {count}");
    }
    if stats.unsorted > 0 {
        println!("  {:<12} {}", "(unsorted)", stats.unsorted);
    }
    Ok(())
}
