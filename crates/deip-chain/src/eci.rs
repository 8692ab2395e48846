//! Expertise Contribution Index pricing (§4.4). Recomputes a research
//! content's per-discipline ECI from its reviews and review votes whenever
//! one of them changes, then rolls the delta up into the owning research.

use deip_core::constants::{C_CURATOR_BONUS, C_EA, C_VA};
use deip_core::error::DeipError;
use deip_core::model::{EciHistoryRecord, EciSource, Research, ResearchContent};
use deip_core::types::{DisciplineId, ExternalId, Timestamp};
use deip_core::virtual_op::VirtualOperation;

use deip_chainbase::Database;

/// `weight(r, d) = round(m_r * C_r * E_r) + m_r * votes_r * C_curator_bonus`
/// where `C_r = (1/n) * C_ea * (E_avg / E_r) + C_va * (1 - 1/n)`.
///
/// Rounding of `C_r * E_r` truncates toward zero (§9 open question,
/// resolved in DESIGN.md): `as i64` on an `f64` already truncates that way.
fn review_weight(is_positive: bool, n: usize, expertise: i64, avg_expertise: f64, votes: i64) -> i64 {
    let m_r: f64 = if is_positive { 1.0 } else { -1.0 };
    let n = n.max(1) as f64;
    let e_r = expertise as f64;
    let c_r = if e_r == 0.0 {
        C_VA * (1.0 - 1.0 / n)
    } else {
        (1.0 / n) * C_EA * (avg_expertise / e_r) + C_VA * (1.0 - 1.0 / n)
    };
    let base = (m_r * c_r * e_r) as i64;
    base + (m_r as i64) * votes * C_CURATOR_BONUS
}

/// Recomputes the ECI of `content_external_id` in `discipline` from scratch
/// over its current reviews and review votes, records the history entry,
/// and rolls the delta into the owning research's aggregate (§4.4).
pub fn recompute_content_eci(
    db: &mut Database,
    content_external_id: ExternalId,
    discipline: DisciplineId,
    now: Timestamp,
) -> Result<VirtualOperation, DeipError> {
    let reviews = db.reviews_for_content(&content_external_id);
    let in_discipline: Vec<_> = reviews.into_iter().filter(|r| r.disciplines.contains(&discipline)).collect();
    let n = in_discipline.len();

    let expertise_per_review: Vec<i64> = in_discipline
        .iter()
        .map(|r| *r.expertise_tokens_amount_per_discipline.get(&discipline).unwrap_or(&0))
        .collect();
    let avg_expertise = if expertise_per_review.is_empty() {
        0.0
    } else {
        expertise_per_review.iter().sum::<i64>() as f64 / expertise_per_review.len() as f64
    };

    let mut total = 0i64;
    for (review, expertise) in in_discipline.iter().zip(expertise_per_review.iter()) {
        let votes = db.review_votes_for(&review.external_id, discipline).len() as i64;
        total += review_weight(review.is_positive, n, *expertise, avg_expertise, votes);
    }

    let content_id = db.get_research_content(&content_external_id)?.id;
    let previous = db
        .get::<ResearchContent>(content_id)?
        .eci_per_discipline
        .get(&discipline)
        .copied()
        .unwrap_or(0);

    db.modify::<ResearchContent>(content_id, |c| {
        c.eci_per_discipline.insert(discipline, total);
    })?;

    let research_external_id = db.get::<ResearchContent>(content_id)?.research_external_id;
    rebalance_research_eci(db, research_external_id, discipline)?;

    db.upsert_expertise_contribution(discipline, research_external_id, content_external_id, total);

    db.create::<EciHistoryRecord>(|id| EciHistoryRecord {
        id,
        discipline,
        source_type: EciSource::ResearchContent,
        source_id: content_external_id,
        previous,
        new: total,
        timestamp: now,
    });

    Ok(VirtualOperation::EciHistory {
        discipline,
        source_type: EciSource::ResearchContent,
        source_id: content_external_id,
        previous,
        new: total,
        timestamp: now,
        criteria_snapshot: None,
    })
}

/// Research ECI in a discipline is the sum of its content's ECI in that
/// discipline (§4.4).
fn rebalance_research_eci(db: &mut Database, research_external_id: ExternalId, discipline: DisciplineId) -> Result<(), DeipError> {
    let total: i64 = db
        .research_content_for(&research_external_id)
        .iter()
        .filter_map(|c| c.eci_per_discipline.get(&discipline))
        .sum();

    let research_id = db.get_research(&research_external_id)?.id;
    db.modify::<Research>(research_id, |r| {
        r.eci_per_discipline.insert(discipline, total);
    })?;
    Ok(())
}
