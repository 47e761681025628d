//! Class-Specific AI Modules
//!
//! This module contains the AI decision logic for each hero class.
//! Each class has its own module that implements the `ClassAI` trait.
//!
//! ## Architecture
//!
//! The combat AI works in two phases:
//! 1. **Context Building**: `CombatContext` borrows both heroes and the catalog
//! 2. **Decision Making**: Each class's `decide_action()` returns an `AbilityDecision`
//!
//! Policies are stateless and read-only. Whatever they decide still goes
//! through `validate_cast`, so a bad decision is rejected, never applied.

pub mod assassin;
pub mod barbarian;
pub mod custom;
pub mod ranger;
pub mod wizard;

use crate::states::match_config::HeroClass;

use super::abilities::{validate_cast, AbilityKey, ActionIntent};
use super::ability_config::ClassCatalog;
use super::components::auras::EffectKind;
use super::components::Hero;
use super::projectiles::TargetRef;
use super::utils::gap;

/// Read-only view of the match for one deciding hero.
pub struct CombatContext<'a> {
    pub me: &'a Hero,
    pub enemy: &'a Hero,
    pub catalog: &'a ClassCatalog,
    /// Current match time in milliseconds
    pub now: u64,
}

impl<'a> CombatContext<'a> {
    pub fn new(me: &'a Hero, enemy: &'a Hero, catalog: &'a ClassCatalog, now: u64) -> Self {
        Self {
            me,
            enemy,
            catalog,
            now,
        }
    }

    /// Distance to the enemy hero
    pub fn distance(&self) -> f32 {
        gap(self.me, self.enemy)
    }

    /// Health as a fraction (0.0 to 1.0)
    pub fn health_pct(&self) -> f32 {
        self.me.health_fraction()
    }

    /// All preconditions pass right now
    pub fn can_cast(&self, ability: AbilityKey) -> bool {
        validate_cast(self.me, self.enemy, ability, self.catalog, self.now).is_ok()
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.me.effects.is_active(kind, self.now)
    }

    pub fn enemy_bleeds(&self) -> usize {
        self.enemy.bleed_stacks()
    }

    pub fn pet_alive(&self) -> bool {
        self.me.living_followers().any(|f| f.is_pet)
    }

    /// The first ultimate in the kit, if it can fire now
    pub fn ready_ultimate(&self) -> Option<AbilityKey> {
        self.me.abilities.iter().copied().find(|key| {
            self.catalog
                .get(*key)
                .map(|config| config.is_ultimate())
                .unwrap_or(false)
                && self.can_cast(*key)
        })
    }
}

/// The result of an AI decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityDecision {
    /// Do nothing this tick
    None,
    /// Use an ability against the enemy side
    Offensive {
        ability: AbilityKey,
        target: TargetRef,
    },
    /// Use an ability that only affects the caster
    SelfBuff { ability: AbilityKey },
}

impl AbilityDecision {
    pub fn into_intent(self) -> Option<ActionIntent> {
        match self {
            AbilityDecision::None => None,
            AbilityDecision::Offensive { ability, target } => Some(ActionIntent::at(ability, target)),
            AbilityDecision::SelfBuff { ability } => Some(ActionIntent::new(ability)),
        }
    }

    /// Shorthand for an offensive decision aimed at the enemy hero
    pub fn at_hero(ability: AbilityKey) -> Self {
        AbilityDecision::Offensive {
            ability,
            target: TargetRef::Hero,
        }
    }
}

/// Trait for class-specific AI logic.
///
/// Each class implements this trait to provide its decision-making logic.
/// The trait takes a read-only context and returns a decision.
pub trait ClassAI {
    /// Decide what ability (if any) to use this tick.
    ///
    /// Returns `AbilityDecision::None` if no ability should be used.
    fn decide_action(&self, ctx: &CombatContext) -> AbilityDecision;
}

/// Get the AI implementation for a given class.
pub fn get_class_ai(class: HeroClass) -> Box<dyn ClassAI> {
    match class {
        HeroClass::Wizard => Box::new(wizard::WizardAI),
        HeroClass::Ranger => Box::new(ranger::RangerAI),
        HeroClass::Assassin => Box::new(assassin::AssassinAI),
        HeroClass::Barbarian => Box::new(barbarian::BarbarianAI),
        HeroClass::Custom => Box::new(custom::CustomAI),
    }
}

/// Run the right policy for `me` and return its intent, if any.
pub fn decide_for(me: &Hero, enemy: &Hero, catalog: &ClassCatalog, now: u64) -> Option<ActionIntent> {
    if !me.is_alive() || !enemy.is_alive() || me.is_stunned(now) {
        return None;
    }
    let ctx = CombatContext::new(me, enemy, catalog, now);
    get_class_ai(me.class).decide_action(&ctx).into_intent()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::states::match_config::Side;

    pub fn duel(left: HeroClass, right: HeroClass) -> (ClassCatalog, [Hero; 2]) {
        let catalog = ClassCatalog::builtin().unwrap();
        let heroes = [
            Hero::from_class(left, Side::Left, &catalog).unwrap(),
            Hero::from_class(right, Side::Right, &catalog).unwrap(),
        ];
        (catalog, heroes)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::duel;
    use super::*;
    use crate::states::play_match::components::auras::StatModifiers;

    #[test]
    fn test_stunned_heroes_decide_nothing() {
        let (catalog, mut heroes) = duel(HeroClass::Wizard, HeroClass::Barbarian);
        heroes[1].position.x = heroes[0].position.x + 200.0;
        heroes[0]
            .effects
            .apply(EffectKind::Stun, 0, 450, 0.0, StatModifiers::default());
        assert_eq!(decide_for(&heroes[0], &heroes[1], &catalog, 10), None);
        assert!(decide_for(&heroes[0], &heroes[1], &catalog, 450).is_some());
    }

    #[test]
    fn test_ultimate_comes_first_once_unlocked() {
        let (catalog, mut heroes) = duel(HeroClass::Barbarian, HeroClass::Wizard);
        heroes[0].current_health = heroes[0].max_health * 0.2;
        let ctx = CombatContext::new(&heroes[0], &heroes[1], &catalog, 0);
        assert_eq!(ctx.ready_ultimate(), Some(AbilityKey::Berserker));
    }
}
