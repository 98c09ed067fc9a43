use anyhow::{Context, Result};
use plmkit_io::count_amps_by_length;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

pub fn execute(input: PathBuf, threshold: f64) -> Result<()> {
    let file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
    let counts = count_amps_by_length(BufReader::new(file), threshold)?;
    info!(
        lengths = counts.len(),
        total = counts.values().sum::<usize>(),
        "counted AMPs"
    );
    for (length, count) in counts {
        println!("{length}\t{count}");
    }
    Ok(())
}
