//! Custom Build AI Module
//!
//! Used for player custom builds, generated ladder opponents and dungeon
//! monsters (which have an empty kit and never cast).
//!
//! ## Priority Order
//! 1. The build's ultimate, once unlocked
//! 2. Skills in kit order. Defensive self-buffs wait until health drops
//!    below 70%, and buffs that are already running are skipped.

use super::{AbilityDecision, ClassAI, CombatContext};
use crate::states::play_match::components::auras::{EffectKind, EffectTarget};
use crate::states::play_match::constants::DEFENSIVE_HP_THRESHOLD;

/// Custom build AI implementation
pub struct CustomAI;

fn is_defensive(kind: EffectKind) -> bool {
    matches!(
        kind,
        EffectKind::Riposte
            | EffectKind::Thorns
            | EffectKind::Shield
            | EffectKind::SmokeBomb
            | EffectKind::LastStand
    )
}

impl ClassAI for CustomAI {
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision {
        if let Some(ultimate) = ctx.ready_ultimate() {
            return AbilityDecision::SelfBuff { ability: ultimate };
        }

        for &ability in &ctx.me.abilities {
            let Some(config) = ctx.catalog.get(ability) else {
                continue;
            };
            if config.is_ultimate() || !ctx.can_cast(ability) {
                continue;
            }

            let mut self_buffs = config
                .effects
                .iter()
                .filter(|spec| spec.target == EffectTarget::Caster);
            let defensive = config
                .effects
                .iter()
                .any(|spec| spec.target == EffectTarget::Caster && is_defensive(spec.kind));
            if defensive && ctx.health_pct() >= DEFENSIVE_HP_THRESHOLD {
                continue;
            }
            if self_buffs.any(|spec| ctx.has_effect(spec.kind)) {
                continue;
            }

            let offensive = config.is_damage()
                || config
                    .effects
                    .iter()
                    .any(|spec| spec.target == EffectTarget::Opponent);
            return if offensive {
                AbilityDecision::at_hero(ability)
            } else {
                AbilityDecision::SelfBuff { ability }
            };
        }
        AbilityDecision::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::match_config::{CustomBuild, HeroClass, Side};
    use crate::states::play_match::abilities::AbilityKey;
    use crate::states::play_match::ability_config::{BaseStats, ClassCatalog};
    use crate::states::play_match::components::Hero;

    fn build(skills: Vec<AbilityKey>, ultimate: Option<AbilityKey>) -> CustomBuild {
        CustomBuild {
            name: "Tester".to_string(),
            stats: BaseStats {
                hp: 4000.0,
                base_damage: 120.0,
                attack_speed: 0.8,
                defense: 30.0,
                evasion: 0.05,
                move_speed: 100.0,
                attack_range: 300.0,
            },
            resource_max: 100.0,
            resource_regen: 2.0,
            skills,
            ultimate,
            ranged: true,
        }
    }

    #[test]
    fn test_defensive_skills_wait_for_damage() {
        let catalog = ClassCatalog::builtin().unwrap();
        let mut me = Hero::from_custom(&build(vec![AbilityKey::Riposte, AbilityKey::Ignite], None), Side::Left);
        let mut enemy = Hero::from_class(HeroClass::Barbarian, Side::Right, &catalog).unwrap();
        enemy.position.x = me.position.x + 300.0;

        let ctx = CombatContext::new(&me, &enemy, &catalog, 0);
        assert_eq!(CustomAI.decide_action(&ctx), AbilityDecision::at_hero(AbilityKey::Ignite));

        me.current_health = me.max_health * 0.5;
        let ctx = CombatContext::new(&me, &enemy, &catalog, 0);
        assert_eq!(
            CustomAI.decide_action(&ctx),
            AbilityDecision::SelfBuff {
                ability: AbilityKey::Riposte
            }
        );
    }

    #[test]
    fn test_monsters_never_cast() {
        let catalog = ClassCatalog::builtin().unwrap();
        let monster = Hero::from_monster(&catalog.monsters()[0], Side::Right);
        let hero = Hero::from_class(HeroClass::Wizard, Side::Left, &catalog).unwrap();
        let ctx = CombatContext::new(&monster, &hero, &catalog, 0);
        assert_eq!(CustomAI.decide_action(&ctx), AbilityDecision::None);
    }
}
