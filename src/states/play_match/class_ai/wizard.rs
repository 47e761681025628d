//! Wizard AI Module
//!
//! ## Priority Order
//! 1. Thunderstorm (ultimate, at or below its health threshold)
//! 2. Chain Lightning
//! 3. Lightning Bolt
//! 4. Static Shield (below 65% health, when no shield is up)

use super::{AbilityDecision, ClassAI, CombatContext};
use crate::states::play_match::abilities::AbilityKey;
use crate::states::play_match::components::auras::EffectKind;
use crate::states::play_match::constants::SHIELD_HP_THRESHOLD;

/// Wizard AI implementation
pub struct WizardAI;

impl ClassAI for WizardAI {
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision {
        if let Some(ultimate) = ctx.ready_ultimate() {
            return AbilityDecision::SelfBuff { ability: ultimate };
        }
        if ctx.can_cast(AbilityKey::ChainLightning) {
            return AbilityDecision::at_hero(AbilityKey::ChainLightning);
        }
        if ctx.can_cast(AbilityKey::LightningBolt) {
            return AbilityDecision::at_hero(AbilityKey::LightningBolt);
        }
        if ctx.health_pct() < SHIELD_HP_THRESHOLD
            && !ctx.has_effect(EffectKind::Shield)
            && ctx.can_cast(AbilityKey::StaticShield)
        {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::StaticShield,
            };
        }
        AbilityDecision::None
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::duel;
    use super::*;
    use crate::states::match_config::HeroClass;

    #[test]
    fn test_chain_lightning_when_in_range() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[1].position.x = heroes[0].position.x + 400.0;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            WizardAI.decide_action(&ctx),
            AbilityDecision::at_hero(AbilityKey::ChainLightning)
        );
    }

    #[test]
    fn test_shield_only_when_hurt() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        // Out of spell range: only the shield is a candidate
        heroes[1].position.x = heroes[0].position.x + 600.0;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(WizardAI.decide_action(&ctx), AbilityDecision::None);

        heroes[0].current_health = heroes[0].max_health * 0.5;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            WizardAI.decide_action(&ctx),
            AbilityDecision::SelfBuff {
                ability: AbilityKey::StaticShield
            }
        );
    }
}
