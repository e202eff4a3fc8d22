//! Sample Customer Generator
//!
//! Generates random customer records and submits them to a running
//! predictor's JSON API.

use bank_marketing_predictor::types::record::{
    Contact, Education, InputRecord, Job, Marital, Month, Poutcome, YesNo,
};
use bank_marketing_predictor::PredictionResponse;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Customer generator for exercising the predictor
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// A customer resembling past subscribers
    fn generate_likely(&mut self) -> InputRecord {
        InputRecord {
            age: self.rng.gen_range(25..70),
            job: self.random_choice(&[Job::Management, Job::Retired, Job::Student, Job::Admin]),
            marital: self.random_choice(&[Marital::Single, Marital::Married]),
            education: self.random_choice(&[Education::Tertiary, Education::Secondary]),
            default: YesNo::No,
            balance: self.rng.gen_range(1500.0..20000.0_f64).round(),
            housing: self.random_choice(&[YesNo::No, YesNo::No, YesNo::Yes]),
            loan: YesNo::No,
            contact: Contact::Cellular,
            day: self.rng.gen_range(1..=31),
            month: self.random_choice(&[Month::Mar, Month::Sep, Month::Oct, Month::Dec, Month::Apr]),
            campaign: self.rng.gen_range(1..3),
            pdays: self.rng.gen_range(30..200),
            previous: self.rng.gen_range(1..6),
            poutcome: Poutcome::Success,
        }
    }

    /// A customer drawn from the whole domain, biased towards non-subscribers
    fn generate_unlikely(&mut self) -> InputRecord {
        InputRecord {
            age: self.rng.gen_range(18..95),
            job: self.random_choice(Job::ALL),
            marital: self.random_choice(Marital::ALL),
            education: self.random_choice(Education::ALL),
            default: self.random_choice(&[YesNo::No, YesNo::No, YesNo::Yes]),
            balance: self.rng.gen_range(-2000.0..3000.0_f64).round(),
            housing: YesNo::Yes,
            loan: self.random_choice(YesNo::ALL),
            contact: self.random_choice(&[Contact::Unknown, Contact::Telephone, Contact::Cellular]),
            day: self.rng.gen_range(1..=31),
            month: self.random_choice(&[Month::May, Month::Jun, Month::Jul, Month::Aug]),
            campaign: self.rng.gen_range(3..20),
            pdays: -1,
            previous: 0,
            poutcome: Poutcome::Unknown,
        }
    }

    fn random_choice<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_customers=info".parse()?),
        )
        .init();

    info!("Starting Sample Customer Generator");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let url = args.get(1).map(|s| s.trim_end_matches('/')).unwrap_or("http://127.0.0.1:8080");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(50);
    let likely_rate: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        url = %url,
        count = count,
        likely_rate = likely_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let health = format!("{url}/health");
    match client.get(&health).send().await {
        Ok(response) if response.status().is_success() => info!("Predictor is up at {}", url),
        Ok(response) => {
            warn!(status = %response.status(), "Predictor unhealthy. Running in dry-run mode.");
            return run_dry_mode(count, likely_rate, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Predictor unreachable. Running in dry-run mode.");
            return run_dry_mode(count, likely_rate, delay_ms).await;
        }
    }

    let endpoint = format!("{url}/api/predict");
    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();

    let mut subscribe_count = 0;
    let mut not_subscribe_count = 0;
    let mut failed_count = 0;

    info!("Submitting {} customers...", count);

    for i in 0..count {
        let customer = if rng.gen_bool(likely_rate) {
            generator.generate_likely()
        } else {
            generator.generate_unlikely()
        };

        let response = client.post(&endpoint).json(&customer).send().await;
        match response {
            Ok(r) if r.status().is_success() => {
                let prediction: PredictionResponse = r.json().await?;
                if prediction.prediction.label.is_subscribe() {
                    subscribe_count += 1;
                } else {
                    not_subscribe_count += 1;
                }
            }
            Ok(r) => {
                failed_count += 1;
                let status = r.status();
                let body = r.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "Prediction request refused");
            }
            Err(e) => {
                failed_count += 1;
                warn!(error = %e, "Prediction request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Submitted {}/{} customers ({} subscribe, {} not subscribe, {} failed)",
                i + 1,
                count,
                subscribe_count,
                not_subscribe_count,
                failed_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Submitted {} customers ({} subscribe, {} not subscribe, {} failed)",
        count, subscribe_count, not_subscribe_count, failed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, likely_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no predictor connection)");

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let customer = if rng.gen_bool(likely_rate) {
            generator.generate_likely()
        } else {
            generator.generate_unlikely()
        };

        let json = serde_json::to_string_pretty(&customer)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample customer {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
