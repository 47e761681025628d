//! Assassin AI Module
//!
//! ## Priority Order
//! 1. Death Mark (ultimate)
//! 2. Shadow Step to close distance when not already stealthed
//! 3. Envenom once in reach
//! 4. Smoke Bomb when hurt

use super::{AbilityDecision, ClassAI, CombatContext};
use crate::states::play_match::abilities::AbilityKey;
use crate::states::play_match::components::auras::EffectKind;
use crate::states::play_match::constants::{
    ENVENOM_REACH, SHADOW_STEP_MIN_DISTANCE, SMOKE_BOMB_HP_THRESHOLD,
};

/// Assassin AI implementation
pub struct AssassinAI;

impl ClassAI for AssassinAI {
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision {
        if let Some(ultimate) = ctx.ready_ultimate() {
            return AbilityDecision::at_hero(ultimate);
        }
        let distance = ctx.distance();
        if distance > SHADOW_STEP_MIN_DISTANCE
            && !ctx.has_effect(EffectKind::Stealth)
            && ctx.can_cast(AbilityKey::ShadowStep)
        {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::ShadowStep,
            };
        }
        if distance <= ENVENOM_REACH && ctx.can_cast(AbilityKey::Envenom) {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::Envenom,
            };
        }
        if ctx.health_pct() < SMOKE_BOMB_HP_THRESHOLD
            && !ctx.has_effect(EffectKind::SmokeBomb)
            && ctx.can_cast(AbilityKey::SmokeBomb)
        {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::SmokeBomb,
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
    fn test_shadow_step_from_spawn() {
        let (catalog, heroes) = duel(HeroClass::Assassin, HeroClass::Wizard);
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            AssassinAI.decide_action(&ctx),
            AbilityDecision::SelfBuff {
                ability: AbilityKey::ShadowStep
            }
        );
    }

    #[test]
    fn test_envenom_in_melee() {
        let (catalog, mut heroes) = duel(HeroClass::Assassin, HeroClass::Wizard);
        heroes[0].position.x = heroes[1].position.x - 40.0;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            AssassinAI.decide_action(&ctx),
            AbilityDecision::SelfBuff {
                ability: AbilityKey::Envenom
            }
        );
    }
}
