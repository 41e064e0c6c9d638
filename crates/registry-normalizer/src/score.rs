//! Heuristic credit score for a company profile.

use chrono::NaiveDate;
use registry_core::CompanyStatus;

const BASE_SCORE: i32 = 60;

/// Score in `[0, 100]` from capital, status and age.
///
/// - capital ≥ 10M: +20, ≥ 1M: +15, ≥ 100K: +10, any other positive amount: +5
/// - status 存续: +15; 注销 or 吊销: −30
/// - age ≥ 10 years: +10, ≥ 5 years: +5 (age measured against `today`)
///
/// Missing inputs contribute nothing.
pub fn company_score(
    capital: Option<f64>,
    status: Option<&str>,
    established: Option<NaiveDate>,
    today: NaiveDate,
) -> u8 {
    let mut score = BASE_SCORE;

    score += match capital {
        Some(c) if c >= 10_000_000.0 => 20,
        Some(c) if c >= 1_000_000.0 => 15,
        Some(c) if c >= 100_000.0 => 10,
        Some(c) if c > 0.0 => 5,
        _ => 0,
    };

    if let Some(status) = status {
        let status = CompanyStatus::parse(status);
        if status.is_active() {
            score += 15;
        } else if status.is_terminated() {
            score -= 30;
        }
    }

    if let Some(established) = established {
        let years = (today - established).num_days() / 365;
        if years >= 10 {
            score += 10;
        } else if years >= 5 {
            score += 5;
        }
    }

    u8::try_from(score.clamp(0, 100)).unwrap_or(0)
}
