pub mod claims;
pub mod detection;
pub mod fact_checkers;
pub mod misinformation;
pub mod types;
pub mod verification;

#[cfg(test)]
mod tests;

pub use claims::{extract_claims, extract_date_claims};
pub use detection::ViralClusterDetector;
pub use fact_checkers::{fact_checker, fact_checkers, normalize_rating, FactChecker};
pub use misinformation::detect_misinformation;
pub use verification::{calculate_verification_confidence, CrossSourceVerifier};
