//! Train a demand model on synthetic trips, persist it, and query it.
//!
//! Run with: RUST_LOG=info cargo run --example train_synthetic [config.toml]

use chrono::{Duration, TimeZone, Utc};
use rideshare_demand::config::PipelineConfig;
use rideshare_demand::core::{TripBatch, TripRecord};
use rideshare_demand::models::FittedModel;
use rideshare_demand::pipeline::{DemandPipeline, PredictionRequest};

/// A week of trips around five pickup hot spots with morning and evening peaks.
fn synthetic_trips() -> Vec<TripRecord> {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    let spots = [
        (40.71, -74.01, 3),
        (40.75, -73.99, 5),
        (40.78, -73.96, 2),
        (40.69, -73.94, 1),
        (40.85, -73.90, 2),
    ];
    let mut trips = Vec::new();
    for bucket in 0..(7 * 24 * 4) {
        let hour = (bucket / 4) % 24;
        let peak = match hour {
            7..=9 | 17..=19 => 3,
            0..=5 => 0,
            _ => 1,
        };
        for (s, &(lat, lon, weight)) in spots.iter().enumerate() {
            let n = weight * peak + (bucket * 31 + s as i64 * 7) % 3;
            for j in 0..n {
                let offset = Duration::minutes(15 * bucket) + Duration::seconds((j * 53) % 900);
                let wobble = ((j * 13 + s as i64) % 9) as f64 * 3e-4;
                trips.push(TripRecord::new(start + offset, lat + wobble, lon - wobble));
            }
        }
    }
    trips
}

fn main() -> rideshare_demand::Result<()> {
    pretty_env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default().k_regions(5),
    };
    println!("=== rideshare-demand synthetic training ===\n");
    println!(
        "k_regions={} bucket={}min lag_window={} horizon={}",
        config.k_regions, config.bucket_width_minutes, config.lag_window, config.horizon
    );

    let trips = synthetic_trips();
    println!("Generated {} trips", trips.len());

    let outcome = DemandPipeline::new(config)?.run(TripBatch::new(trips))?;
    let summary = &outcome.summary;
    println!(
        "\n{} regions, {} buckets, {} train / {} test rows (cutoff {})",
        summary.n_regions, summary.n_buckets, summary.n_train, summary.n_test, summary.cutoff
    );

    println!("\n--- Held-out accuracy ---");
    for report in [&outcome.model_report, &outcome.baseline_report] {
        println!(
            "  {:<18} MAE {:.3}  RMSE {:.3}  R2 {:.3}",
            report.predictor, report.overall.mae, report.overall.rmse, report.overall.r_squared
        );
    }
    println!("\n--- Worst regions ---");
    for (region, metrics) in outcome.model_report.worst_regions(3) {
        println!("  region {region}: MAE {:.3} over {} rows", metrics.mae, metrics.n);
    }

    let path = std::env::temp_dir().join("rideshare_demand_model.json");
    outcome.artifact.save(&path)?;
    let model = FittedModel::load(&path)?;
    println!("\nSaved and reloaded artifact at {}", path.display());

    println!("\n--- Next-bucket demand per region ---");
    for region in model.regions()? {
        let request = PredictionRequest::for_region(region.id, outcome.panel.end());
        match model.predict_request(&request, &outcome.panel) {
            Ok(prediction) => println!(
                "  region {} ({:.4}, {:.4}) @ {}: {:.2} trips",
                region.id,
                region.centroid.latitude,
                region.centroid.longitude,
                prediction.target_bucket,
                prediction.demand
            ),
            Err(e) => println!("  region {}: {e}", region.id),
        }
    }

    Ok(())
}
