//! Comparison rounds and tier commands.

use tokio::runtime::Runtime;

use pic_curator::engine::Curator;
use pic_curator::model::Image;

fn print_image(label: &str, image: &Image) {
    println!(
        "{label:<8} {:>5}  {:>4}x{:<4} {:<9}  {}",
        image.elo_rating, image.width, image.height, image.orientation, image.path
    );
}

/// Show the next comparison set
pub fn cmd_next(rt: &Runtime, curator: &Curator, count: Option<u32>, json: bool) -> anyhow::Result<()> {
    let images = rt.block_on(curator.select_next(count))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
        return Ok(());
    }

    let Some((pivot, neighbors)) = images.split_last() else {
        println!("No images available for comparison.");
        return Ok(());
    };
    for image in neighbors {
        print_image("", image);
    }
    print_image("pivot", pivot);
    Ok(())
}

/// Record the outcome of a comparison round
pub fn cmd_rate(rt: &Runtime, curator: &Curator, winner: &str, losers: &[String]) -> anyhow::Result<()> {
    let updated = rt.block_on(curator.record_result(winner, losers))?;

    if updated.is_empty() {
        eprintln!("Winner not found: {winner}");
        return Ok(());
    }
    for image in &updated {
        print_image("", image);
    }
    Ok(())
}

/// Hide an image
pub fn cmd_hide(rt: &Runtime, curator: &Curator, path: &str) -> anyhow::Result<()> {
    match rt.block_on(curator.hide(path))? {
        Some(image) => println!("HIDDEN: {path} -> {}", image.path),
        None => eprintln!("Not found: {path}"),
    }
    Ok(())
}

/// Restore the most recently hidden image
pub fn cmd_restore(rt: &Runtime, curator: &Curator) -> anyhow::Result<()> {
    match rt.block_on(curator.restore_last())? {
        Some(image) => println!("RESTORED: {}", image.path),
        None => println!("Nothing to restore."),
    }
    Ok(())
}

/// Rebuild the top-10 directory
pub fn cmd_top10(rt: &Runtime, curator: &Curator) -> anyhow::Result<()> {
    let report = rt.block_on(curator.build_top10())?;

    for path in &report.removed {
        println!("- {path}");
    }
    for path in &report.added {
        println!("+ {path}");
    }
    println!(
        "Top 10: {} images ({} added, {} removed, {} kept)",
        report.target,
        report.added.len(),
        report.removed.len(),
        report.kept
    );
    Ok(())
}

/// Adjust an image's selection boost
pub fn cmd_bump(rt: &Runtime, curator: &Curator, path: &str, delta: i64) -> anyhow::Result<()> {
    let image = rt.block_on(curator.bump_extra_count(path, delta))?;
    println!("{}: extra_count = {}", image.path, image.extra_count);
    Ok(())
}
