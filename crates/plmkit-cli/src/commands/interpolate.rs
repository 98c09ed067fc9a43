use anyhow::{Context, Result};
use plmkit_core::{
    decode_sequences, interpolation_path, levenshtein_distance, linspace, InterpolationScheme,
    NormalizedModel, ProteinModel, ZScoreNormalizer,
};
use plmkit_models::{device, ESM2Models, ESM2Runner};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

pub struct InterpolateArgs {
    pub start: String,
    pub end: String,
    pub steps: usize,
    pub scheme: InterpolationScheme,
    pub model: ESM2Models,
    pub cpu: bool,
    pub normalizer: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PathPoint {
    lambda: f64,
    sequence: String,
    distance_to_start: usize,
    distance_to_end: usize,
}

pub fn execute(args: InterpolateArgs) -> Result<()> {
    let device = device(args.cpu)?;
    let runner = ESM2Runner::load_model(args.model, device)?;
    let normalizer = args
        .normalizer
        .as_ref()
        .map(|path| {
            ZScoreNormalizer::load(path)
                .with_context(|| format!("loading normalizer {}", path.display()))
        })
        .transpose()?;
    let model = NormalizedModel::new(runner, normalizer);

    let start = model.encode(&args.start)?;
    let end = model.encode(&args.end)?;
    let lambdas = linspace(0.0, 1.0, args.steps);
    info!(scheme = %args.scheme, steps = lambdas.len(), "interpolating");
    let path = interpolation_path(&start, &end, &lambdas, args.scheme)?;
    let sequences = decode_sequences(&path, &model)?;

    let points: Vec<PathPoint> = lambdas
        .iter()
        .zip(sequences)
        .map(|(&lambda, sequence)| PathPoint {
            lambda,
            distance_to_start: levenshtein_distance(sequence.as_str(), &args.start),
            distance_to_end: levenshtein_distance(sequence.as_str(), &args.end),
            sequence: sequence.into_string(),
        })
        .collect();

    match args.output {
        Some(output) => {
            let file = File::create(&output)
                .with_context(|| format!("creating {}", output.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &points)?;
            info!(path = %output.display(), "wrote interpolation path");
        }
        None => {
            println!("lambda\tsequence\tlevenshtein_start\tlevenshtein_end");
            for point in &points {
                println!(
                    "{:.4}\t{}\t{}\t{}",
                    point.lambda, point.sequence, point.distance_to_start, point.distance_to_end
                );
            }
        }
    }
    Ok(())
}
