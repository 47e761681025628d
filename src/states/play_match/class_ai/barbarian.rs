//! Barbarian AI Module
//!
//! ## Priority Order
//! 1. Berserker (ultimate)
//! 2. Charge (between its minimum and maximum range)
//! 3. War Cry (in close range)

use super::{AbilityDecision, ClassAI, CombatContext};
use crate::states::play_match::abilities::AbilityKey;

/// Barbarian AI implementation
pub struct BarbarianAI;

impl ClassAI for BarbarianAI {
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision {
        if let Some(ultimate) = ctx.ready_ultimate() {
            return AbilityDecision::SelfBuff { ability: ultimate };
        }
        if ctx.can_cast(AbilityKey::Charge) {
            return AbilityDecision::at_hero(AbilityKey::Charge);
        }
        if ctx.can_cast(AbilityKey::WarCry) {
            return AbilityDecision::at_hero(AbilityKey::WarCry);
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
    fn test_charge_then_war_cry() {
        let (catalog, mut heroes) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        heroes[1].position.x = heroes[0].position.x + 300.0;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            BarbarianAI.decide_action(&ctx),
            AbilityDecision::at_hero(AbilityKey::Charge)
        );

        heroes[1].position.x = heroes[0].position.x + 60.0;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(
            BarbarianAI.decide_action(&ctx),
            AbilityDecision::at_hero(AbilityKey::WarCry)
        );
    }
}
