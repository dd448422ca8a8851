/// QR unlock resolution
///
/// A totem page unlocks when the `qr` token from the scanned URL equals the
/// totem's stored slug. An unlock records the visit in the session's passport.
use crate::{
    catalog::TotemStore,
    db::models::Totem,
    error::DistimResult,
    metrics,
    passport::{PassportService, VisitRecord},
    session::AuthSession,
};
use serde::Serialize;

/// Exact token match against the totem's slug
///
/// A missing token, a missing slug, or an empty slug never unlocks.
pub fn is_unlocked(totem: &Totem, token: Option<&str>) -> bool {
    match (totem.qr_slug.as_deref(), token) {
        (Some(slug), Some(token)) => !slug.is_empty() && slug == token,
        _ => false,
    }
}

/// Bonus page of a totem as seen by one visitor
#[derive(Debug, Clone, Serialize)]
pub struct BonusPage {
    pub totem: Totem,
    pub unlocked: bool,
    /// Bonus story, present only when unlocked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus_text: Option<String>,
    /// The visitor holds this totem's stamp (before or after this visit)
    pub stamp_collected: bool,
    /// Set when the token matched and the visit was recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visit: Option<VisitRecord>,
}

/// Decides unlocks and records visits
#[derive(Clone)]
pub struct UnlockResolver {
    totems: TotemStore,
    passport: PassportService,
}

impl UnlockResolver {
    pub fn new(totems: TotemStore, passport: PassportService) -> Self {
        Self { totems, passport }
    }

    /// Resolve a totem page load carrying an optional QR token
    pub async fn resolve(
        &self,
        session: &AuthSession,
        totem_id: &str,
        token: Option<&str>,
    ) -> DistimResult<BonusPage> {
        let totem = self.totems.require(totem_id).await?;
        let unlocked = is_unlocked(&totem, token);

        metrics::record_unlock_attempt(match (unlocked, token.is_some()) {
            (true, _) => "unlocked",
            (false, true) => "invalid_token",
            (false, false) => "no_token",
        });

        if !unlocked {
            if token.is_some() {
                tracing::info!("Invalid QR token for totem {}", totem.id);
            }
            let stamp_collected = self.passport.has_stamp(session, &totem.id).await;
            return Ok(BonusPage {
                totem,
                unlocked: false,
                bonus_text: None,
                stamp_collected,
                visit: None,
            });
        }

        let visit = self.passport.record_visit(session, &totem).await;

        Ok(BonusPage {
            bonus_text: totem.locked_text.clone(),
            totem,
            unlocked: true,
            stamp_collected: visit.recorded || visit.already_collected,
            visit: Some(visit),
        })
    }
}
