//! Example running a monitoring session on the demo facility
//!
//! This example shows how to:
//! 1. Build the demo facility and print its temperature formula
//! 2. Feed a monitoring session with simulated probes
//! 3. Follow the regression models computed from the lapse samples
//! 4. Compare the fitted coefficients with the facility heat sources
//!
//! To run this example:
//! ```bash
//! cd backend
//! cargo run --example simulate_monitoring
//! ```

use std::sync::Arc;
use std::time::Duration;

use watts_rust::config::SamplingSettings;
use watts_rust::models::demo_facility;
use watts_rust::monitoring::{MonitoringEvent, MonitoringSession, ProbeSimulator};
use watts_rust::regression::{RegressionModel, RidgeRegressionService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Facility Monitoring Simulation ===\n");

    // Step 1: Facility
    println!("1. Building the demo facility...");
    let facility = Arc::new(demo_facility()?);
    println!("   {}: f(t) = {}\n", facility.name(), facility.temperature_formula()?);

    // Step 2: Session fed by fast probes
    println!("2. Starting the monitoring session...");
    let settings = SamplingSettings {
        initial_delay_ms: 0,
        period_ms: 2,
        ..SamplingSettings::default()
    };
    let session = MonitoringSession::new(Arc::new(RidgeRegressionService::default()), None);
    let mut events = session.subscribe();
    let readings = ProbeSimulator::seeded(Arc::clone(&facility), &settings, 2024).into_stream(&settings);
    let info = session.start(readings).await;
    println!("   Session {} started at {}\n", info.session_id, info.started_at);

    // Step 3: Follow the models for a few seconds
    println!("3. Collecting models...");
    let mut last_model: Option<RegressionModel> = None;
    let (mut updates, mut skipped) = (0usize, 0usize);
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while let Ok(Ok(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
        match event {
            MonitoringEvent::LapseSampleUpdate(_) => updates += 1,
            MonitoringEvent::ModelSkipped => skipped += 1,
            MonitoringEvent::ModelUpdate(model) => {
                if model.is_some() {
                    last_model = model;
                }
            }
        }
    }
    session.stop().await;
    println!("   {} lapse sample updates, {} skipped model rounds\n", updates, skipped);

    for sample in session.lapse_samples() {
        println!(
            "   {:>6}  mean={:>7}  std={:>6}  n={:>4}  on={:?}",
            sample.timeslot,
            sample.mean_temperature.map_or("-".to_string(), |t| format!("{:.2}", t)),
            sample.std_deviation().map_or("-".to_string(), |s| format!("{:.2}", s)),
            sample.sample_count,
            sample.statuses_on,
        );
    }

    // Step 4: Model vs facility
    println!("\n4. Last regression model:");
    match last_model {
        Some(model) => {
            println!("   intercept={:.2} (idle temperature {})", model.intercept, facility.idle_temperature());
            for coefficient in &model.coefficients {
                let expected = facility
                    .heat_sources()
                    .iter()
                    .find(|entry| entry.heat_source().name() == coefficient.source)
                    .map(|entry| entry.weight() * entry.heat_source().temperature());
                println!(
                    "   {:<8} coef={:>6.2}  weight*temperature={:?}",
                    coefficient.source, coefficient.coef, expected
                );
            }
            println!("   R² = {:.3}", model.score);
        }
        None => println!("   no model computed"),
    }

    Ok(())
}
