//! Ranger AI Module
//!
//! ## Priority Order
//! 1. Rain of Fire (ultimate)
//! 2. Hunter's Mark once the enemy bleeds
//! 3. Bloodlust at two or more enemy bleed stacks
//! 4. Summon Pet while Bloodlust runs and no pet is alive

use super::{AbilityDecision, ClassAI, CombatContext};
use crate::states::play_match::abilities::AbilityKey;
use crate::states::play_match::components::auras::EffectKind;

/// Ranger AI implementation
pub struct RangerAI;

impl ClassAI for RangerAI {
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision {
        if let Some(ultimate) = ctx.ready_ultimate() {
            return AbilityDecision::SelfBuff { ability: ultimate };
        }
        let bleeds = ctx.enemy_bleeds();
        if bleeds >= 1 && ctx.can_cast(AbilityKey::HuntersMark) {
            return AbilityDecision::at_hero(AbilityKey::HuntersMark);
        }
        if bleeds >= 2 && ctx.can_cast(AbilityKey::Bloodlust) {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::Bloodlust,
            };
        }
        if !ctx.pet_alive()
            && ctx.has_effect(EffectKind::Bloodlust)
            && ctx.can_cast(AbilityKey::SummonPet)
        {
            return AbilityDecision::SelfBuff {
                ability: AbilityKey::SummonPet,
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
    use crate::states::play_match::components::auras::{DotKind, StatModifiers};

    #[test]
    fn test_waits_for_bleeds() {
        let (catalog, mut heroes) = duel(HeroClass::Ranger, HeroClass::Barbarian);
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(RangerAI.decide_action(&ctx), AbilityDecision::None);

        heroes[1].add_dot(DotKind::Bleed, 0, 8);
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            RangerAI.decide_action(&ctx),
            AbilityDecision::at_hero(AbilityKey::HuntersMark)
        );
    }

    #[test]
    fn test_pet_follows_bloodlust() {
        let (catalog, mut heroes) = duel(HeroClass::Ranger, HeroClass::Barbarian);
        heroes[0]
            .effects
            .apply(EffectKind::Bloodlust, 0, 2500, 0.05, StatModifiers::default());
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            RangerAI.decide_action(&ctx),
            AbilityDecision::SelfBuff {
                ability: AbilityKey::SummonPet
            }
        );
    }
}
