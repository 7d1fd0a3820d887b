use rand::Rng;
use serde_json::json;

use super::{EvaluationResult, Outcome};
use crate::schema::Application;

/// Prefix carried by every synthesized token; live tokens never start with it.
pub const SIMULATED_TOKEN_PREFIX: &str = "SIM-";

const TOKEN_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const TOKEN_LENGTH: usize = 8;

/// Outcome keyed off the applicant's last name, ignoring case.
pub fn simulated_outcome(name_last: &str) -> Outcome {
    match name_last.to_lowercase().as_str() {
        "review" => Outcome::ManualReview,
        "deny" | "denied" => Outcome::Denied,
        _ => Outcome::Approved,
    }
}

fn synthetic_token() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..TOKEN_LENGTH)
        .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
        .collect();
    format!("{SIMULATED_TOKEN_PREFIX}{suffix}")
}

pub(super) fn simulate(application: &Application) -> EvaluationResult {
    let outcome = simulated_outcome(application.name_last());
    let summary = json!({ "outcome": outcome.as_str() });
    EvaluationResult::new(outcome, Some(synthetic_token()), summary)
}
