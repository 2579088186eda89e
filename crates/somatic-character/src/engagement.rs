//! Combat engagement and targeting.
//!
//! A character moves through `Unengaged -> EngagedMelee | EngagedRanged ->
//! Fleeing | TruceRequested -> Unengaged`. Engaging merges the two sides'
//! [`Combat`](crate::combat::Combat) aggregates. Melee range is tied to
//! colocation: whenever either side leaves the other's room or layer the
//! flag is cleared in the same call that moved them.
//!
//! [`Realm::check_combat_status`] is the per-heartbeat consistency pass. It
//! retargets away from opponents that can no longer be fought and takes a
//! character out of combat once nobody targets it and it targets nobody.

use rand::seq::IndexedRandom;
use somatic_types::{
    CharacterId, CheckType, CombatId, CombatStatus, Consciousness, Facing, RoomId,
};
use tracing::{debug, info};

use crate::combat::CombatAggregate;
use crate::effects::{Capabilities, Effect, EffectKind};
use crate::error::CharacterError;
use crate::realm::{CharacterView, Realm};
use crate::refusal::EngageRefusal;

/// Result of a successful engagement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngageReport {
    /// The combat both sides now belong to.
    pub combat: CombatId,
    /// Whether the two locked into melee.
    pub melee: bool,
    /// Bonus granted because the target never saw the attack coming.
    pub ambush_bonus: u8,
}

/// Result of a combat consistency pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombatCheck {
    /// Melee range was lost.
    pub melee_cleared: bool,
    /// The target changed; `Some(None)` means the target was dropped.
    pub retargeted: Option<Option<CharacterId>>,
    /// The character left combat.
    pub left_combat: bool,
}

impl CharacterView<'_> {
    /// Whether the character can attack `target`.
    pub fn can_engage(&self, target: CharacterId, ranged: bool) -> bool {
        self.why_cannot_engage(target, ranged).is_none()
    }

    /// Why the character cannot attack `target`.
    pub fn why_cannot_engage(&self, target: CharacterId, ranged: bool) -> Option<EngageRefusal> {
        let c = self.character;
        if !c.consciousness.can_act() {
            return Some(EngageRefusal::NotAwake(c.consciousness));
        }
        if target == c.id {
            return Some(EngageRefusal::SelfTarget);
        }
        if c.combat_target == Some(target) {
            return Some(EngageRefusal::AlreadyTargeting);
        }
        let Some(t) = self.realm.roster.get(target) else {
            return Some(EngageRefusal::OutOfRange);
        };
        let peaceful_room = |room: RoomId| self.realm.world.room(room).is_some_and(|r| r.peaceful);
        if peaceful_room(c.room)
            || peaceful_room(t.room)
            || c.effects.has(Capabilities::PEACEFUL)
            || t.effects.has(Capabilities::PEACEFUL)
        {
            return Some(EngageRefusal::PeacefulLocation);
        }
        if c.effects.has(Capabilities::PACIFISM) {
            return Some(EngageRefusal::Pacifist);
        }
        let sparring_elsewhere =
            |partner: Option<CharacterId>, other: CharacterId| partner.is_some_and(|p| p != other);
        if sparring_elsewhere(c.effects.friendly_bout_opponent(), target)
            || sparring_elsewhere(t.effects.friendly_bout_opponent(), c.id)
        {
            return Some(EngageRefusal::FriendlyBout);
        }
        if let Some(reason) = c.effects.blocking("engage") {
            return Some(EngageRefusal::Blocked(reason));
        }
        if c.is_falling() {
            return Some(EngageRefusal::Falling);
        }
        if c.effects.rescued_from(target) {
            return Some(EngageRefusal::RecentlyRescued);
        }
        if t.consciousness == Consciousness::Dead {
            return Some(EngageRefusal::TargetDead);
        }
        if t.consciousness.is_helpless() && !c.combat_settings.attack_helpless {
            return Some(EngageRefusal::TargetHelpless);
        }
        let reachable = if ranged {
            self.realm.in_line_of_sight(c.id, target)
        } else {
            c.room == t.room
        };
        (!reachable).then_some(EngageRefusal::OutOfRange)
    }

    /// Which side of this character `opponent` is attacking.
    pub fn get_facing_for(&self, opponent: CharacterId) -> Facing {
        let c = self.character;
        let exposed = self.realm.roster.get(opponent).is_some_and(|o| {
            o.combat_status == CombatStatus::Fleeing || o.effects.has(Capabilities::SKIRMISHING)
        });
        if exposed && !c.combat_settings.forbid_flanking {
            return Facing::Rear;
        }
        c.effects.fixed_facing_for(opponent).unwrap_or_default()
    }

    fn combat_refusal(&self, action: &str) -> Option<EngageRefusal> {
        let c = self.character;
        if !c.consciousness.can_act() {
            return Some(EngageRefusal::NotAwake(c.consciousness));
        }
        if c.combat.is_none() {
            return Some(EngageRefusal::NotInCombat);
        }
        c.effects.blocking(action).map(EngageRefusal::Blocked)
    }

    /// Whether the character can try to flee.
    pub fn can_flee(&self) -> bool {
        self.why_cannot_flee().is_none()
    }

    /// Why the character cannot try to flee.
    pub fn why_cannot_flee(&self) -> Option<EngageRefusal> {
        if let Some(refusal) = self.combat_refusal("flee") {
            return Some(refusal);
        }
        (self.character.combat_status == CombatStatus::Fleeing)
            .then_some(EngageRefusal::AlreadyFleeing)
    }

    /// Whether the character can ask for a truce.
    pub fn can_request_truce(&self) -> bool {
        self.why_cannot_request_truce().is_none()
    }

    /// Why the character cannot ask for a truce.
    pub fn why_cannot_request_truce(&self) -> Option<EngageRefusal> {
        if let Some(refusal) = self.combat_refusal("truce") {
            return Some(refusal);
        }
        (self.character.combat_status == CombatStatus::TruceRequested)
            .then_some(EngageRefusal::AlreadyRequestedTruce)
    }
}

impl Realm {
    /// Attack `target`, in melee when both stand together and neither
    /// prefers to open at range.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a missing
    /// combat aggregate.
    pub fn engage(
        &mut self,
        id: CharacterId,
        target: CharacterId,
        ranged: bool,
    ) -> Result<Result<EngageReport, EngageRefusal>, CharacterError> {
        if let Some(refusal) = self.view(id)?.why_cannot_engage(target, ranged) {
            debug!(character = %id, target = %target, %refusal, "engage refused");
            return Ok(Err(refusal));
        }
        let ambush_bonus = if self.spots_attacker(target, id)? {
            0
        } else {
            self.config.combat.ambush_bonus
        };
        let combat = self.join_combats(id, target)?;

        let prefers_ranged = self.roster.require(id)?.combat_settings.prefer_ranged;
        let (target_prefers_ranged, target_free) = {
            let t = self.roster.require(target)?;
            (
                t.combat_settings.prefer_ranged,
                t.combat_target.is_none_or(|other| other == id),
            )
        };
        let melee =
            self.colocated(id, target) && !ranged && !prefers_ranged && !target_prefers_ranged;
        let status = if melee {
            CombatStatus::EngagedMelee
        } else {
            CombatStatus::EngagedRanged
        };

        let attacker = self.roster.require_mut(id)?;
        attacker.combat_target = Some(target);
        attacker.melee_range = melee;
        attacker.combat_status = status;
        let attacker_name = attacker.name.clone();
        let attacker_room = attacker.room;

        let defender = self.roster.require_mut(target)?;
        if target_free {
            defender.combat_target = Some(id);
            defender.melee_range = melee;
            defender.combat_status = status;
        } else if defender.combat_status == CombatStatus::Unengaged {
            defender.combat_status = CombatStatus::EngagedRanged;
        }
        let defender_name = defender.name.clone();
        let defender_room = defender.room;

        if melee {
            self.clinch(id, target)?;
            if target_free {
                self.clinch(target, id)?;
            }
        }

        let text = if melee {
            format!("{attacker_name} closes in on {defender_name}!")
        } else {
            format!("{attacker_name} attacks {defender_name} from a distance!")
        };
        self.echo(attacker_room, id, text.clone());
        if defender_room != attacker_room {
            self.echo(defender_room, id, text);
        }
        info!(
            character = %id,
            target = %target,
            combat = %combat,
            melee,
            ambush_bonus,
            "engaged"
        );
        Ok(Ok(EngageReport {
            combat,
            melee,
            ambush_bonus,
        }))
    }

    /// A grappler closing to melee holds its opponent in a clinch.
    fn clinch(&mut self, grappler: CharacterId, opponent: CharacterId) -> Result<(), CharacterError> {
        if !self
            .roster
            .require(grappler)?
            .effects
            .has(Capabilities::GRAPPLER)
        {
            return Ok(());
        }
        self.roster
            .require_mut(opponent)?
            .effects
            .add(Effect::new(EffectKind::Clinch {
                opponent: grappler,
            }));
        debug!(character = %grappler, opponent = %opponent, "clinch");
        Ok(())
    }

    /// Whether `watcher` notices `attacker` before the blow lands.
    fn spots_attacker(
        &mut self,
        watcher: CharacterId,
        attacker: CharacterId,
    ) -> Result<bool, CharacterError> {
        let w = self.roster.require(watcher)?;
        if !w.consciousness.can_act() {
            return Ok(false);
        }
        if w.combat_target == Some(attacker) {
            return Ok(true);
        }
        let attacker_room = self.roster.require(attacker)?.room;
        let mut difficulty = self.world.require_room(attacker_room)?.terrain.hide_difficulty;
        if attacker_room != w.room {
            difficulty = difficulty.harder(1);
        }
        Ok(self
            .roll(watcher, CheckType::SpotAttacker, difficulty)?
            .outcome
            .is_pass())
    }

    /// Put both characters into one combat, merging or creating as needed,
    /// and forget any truce talk.
    fn join_combats(
        &mut self,
        id: CharacterId,
        target: CharacterId,
    ) -> Result<CombatId, CharacterError> {
        let mine = self.roster.require(id)?.combat;
        let theirs = self.roster.require(target)?.combat;
        let combat = match (mine, theirs) {
            (Some(into), Some(from)) => {
                for moved in self.combats.merge(into, from)? {
                    if let Some(c) = self.roster.get_mut(moved) {
                        c.combat = Some(into);
                    }
                }
                into
            }
            (Some(into), None) => {
                self.combats.require_mut(into)?.join(target);
                into
            }
            (None, Some(into)) => {
                self.combats.require_mut(into)?.join(id);
                into
            }
            (None, None) => self.combats.create([id, target]),
        };
        self.roster.require_mut(id)?.combat = Some(combat);
        self.roster.require_mut(target)?.combat = Some(combat);

        let aggregate = self.combats.require_mut(combat)?;
        aggregate.reset_truce();
        let members: Vec<CharacterId> = aggregate.combatants().iter().copied().collect();
        for member in members {
            if let Some(c) = self.roster.get_mut(member)
                && c.combat_status == CombatStatus::TruceRequested
            {
                c.combat_status = if c.melee_range {
                    CombatStatus::EngagedMelee
                } else {
                    CombatStatus::EngagedRanged
                };
            }
        }
        Ok(combat)
    }

    /// Pick a new target from the combatants attacking this character,
    /// preferring those close enough for melee. Drops the target when no
    /// attacker is within reach.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn acquire_target(
        &mut self,
        id: CharacterId,
    ) -> Result<Option<CharacterId>, CharacterError> {
        let c = self.roster.require(id)?;
        let combat = c.combat;
        let attack_helpless = c.combat_settings.attack_helpless;
        let prefers_ranged = c.combat_settings.prefer_ranged;
        let attackers: Vec<CharacterId> = self
            .roster
            .attackers_of(id)
            .into_iter()
            .filter(|a| {
                self.roster.get(*a).is_some_and(|o| {
                    o.combat.is_some()
                        && o.combat == combat
                        && o.consciousness != Consciousness::Dead
                        && (attack_helpless || !o.consciousness.is_helpless())
                })
            })
            .collect();
        let close: Vec<CharacterId> = attackers
            .iter()
            .copied()
            .filter(|a| self.colocated(id, *a))
            .collect();
        let pool = if close.is_empty() {
            attackers
                .into_iter()
                .filter(|a| self.in_line_of_sight(id, *a))
                .collect()
        } else {
            close
        };
        let chosen = pool.choose(&mut self.rng).copied();
        let melee = chosen.is_some_and(|t| self.colocated(id, t)) && !prefers_ranged;

        let c = self.roster.require_mut(id)?;
        c.combat_target = chosen;
        c.melee_range = melee;
        if chosen.is_some()
            && matches!(
                c.combat_status,
                CombatStatus::EngagedMelee | CombatStatus::EngagedRanged
            )
        {
            c.combat_status = if melee {
                CombatStatus::EngagedMelee
            } else {
                CombatStatus::EngagedRanged
            };
        }
        debug!(character = %id, target = ?chosen, "target acquired");
        Ok(chosen)
    }

    /// Per-heartbeat consistency pass over one character's combat state.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a missing
    /// combat aggregate.
    pub fn check_combat_status(&mut self, id: CharacterId) -> Result<CombatCheck, CharacterError> {
        let mut report = CombatCheck::default();
        let c = self.roster.require(id)?;
        let Some(combat) = c.combat else {
            return Ok(report);
        };
        let (attack_helpless, melee_range) = (c.combat_settings.attack_helpless, c.melee_range);
        if let Some(target) = c.combat_target {
            let fightable = self.roster.get(target).is_some_and(|t| {
                t.combat == Some(combat)
                    && t.consciousness != Consciousness::Dead
                    && (attack_helpless || !t.consciousness.is_helpless())
            }) && self.in_line_of_sight(id, target);
            if !fightable {
                report.retargeted = Some(self.acquire_target(id)?);
            } else if melee_range && !self.colocated(id, target) {
                report.melee_cleared = self.drop_melee(id)?;
            }
        }
        let targeted = self.roster.attackers_of(id).into_iter().any(|a| {
            self.roster
                .get(a)
                .is_some_and(|o| o.combat == Some(combat))
        });
        if self.roster.require(id)?.combat_target.is_none() && !targeted {
            report.left_combat = self.leave_combat(id)?;
        }
        Ok(report)
    }

    fn drop_melee(&mut self, id: CharacterId) -> Result<bool, CharacterError> {
        let c = self.roster.require_mut(id)?;
        if !c.melee_range {
            return Ok(false);
        }
        c.melee_range = false;
        if c.combat_status == CombatStatus::EngagedMelee {
            c.combat_status = CombatStatus::EngagedRanged;
        }
        c.effects
            .remove_where(|kind| matches!(kind, EffectKind::Clinch { .. }));
        debug!(character = %id, "melee range lost");
        Ok(true)
    }

    /// Clear melee range between `id` and anyone it is no longer standing
    /// with, in both directions.
    pub(crate) fn refresh_melee(&mut self, id: CharacterId) -> Result<(), CharacterError> {
        if let Some(target) = self.roster.require(id)?.combat_target
            && !self.colocated(id, target)
        {
            self.drop_melee(id)?;
        }
        for attacker in self.roster.attackers_of(id) {
            if !self.colocated(id, attacker) {
                self.drop_melee(attacker)?;
            }
        }
        Ok(())
    }

    /// End combat for a fleeing character that no attacker can reach.
    pub(crate) fn check_flee_success(&mut self, id: CharacterId) -> Result<bool, CharacterError> {
        let c = self.roster.require(id)?;
        if c.combat_status != CombatStatus::Fleeing {
            return Ok(false);
        }
        let (room, combat) = (c.room, c.combat);
        let cornered = self.roster.attackers_of(id).into_iter().any(|a| {
            self.roster
                .get(a)
                .is_some_and(|o| o.combat == combat && o.room == room)
        });
        if cornered {
            return Ok(false);
        }
        let name = self.roster.require(id)?.name.clone();
        self.echo(room, id, format!("{name} has escaped."));
        self.leave_combat(id)
    }

    /// Take a character out of combat entirely. Anyone who was targeting it
    /// looks for a new target and may leave combat in turn. Returns whether
    /// the character had been in combat.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a missing
    /// combat aggregate.
    pub fn leave_combat(&mut self, id: CharacterId) -> Result<bool, CharacterError> {
        let c = self.roster.require_mut(id)?;
        let Some(combat) = c.combat else {
            return Ok(false);
        };
        c.clear_combat();
        c.effects
            .remove_where(|kind| matches!(kind, EffectKind::Clinch { .. }));
        self.combats.leave(combat, id)?;
        for other in self.roster.ids() {
            if let Some(o) = self.roster.get_mut(other) {
                o.effects.remove_where(
                    |kind| matches!(kind, EffectKind::Clinch { opponent } if *opponent == id),
                );
            }
        }
        debug!(character = %id, combat = %combat, "left combat");
        for attacker in self.roster.attackers_of(id) {
            if self.roster.get(attacker).is_some_and(|o| o.combat.is_some()) {
                self.check_combat_status(attacker)?;
            }
        }
        Ok(true)
    }

    /// Try to get away. Movement out of melee is allowed while fleeing, and
    /// arriving somewhere no attacker can reach ends the fight.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character.
    pub fn flee(&mut self, id: CharacterId) -> Result<Result<(), EngageRefusal>, CharacterError> {
        if let Some(refusal) = self.view(id)?.why_cannot_flee() {
            return Ok(Err(refusal));
        }
        let c = self.roster.require_mut(id)?;
        c.combat_status = CombatStatus::Fleeing;
        let (room, text) = (c.room, format!("{} tries to flee!", c.name));
        self.echo(room, id, text);
        debug!(character = %id, "fleeing");
        Ok(Ok(()))
    }

    /// Ask for a truce. Returns whether the combat dissolved because every
    /// combatant has now asked.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError`] for an unknown character or a missing
    /// combat aggregate.
    pub fn request_truce(
        &mut self,
        id: CharacterId,
    ) -> Result<Result<bool, EngageRefusal>, CharacterError> {
        if let Some(refusal) = self.view(id)?.why_cannot_request_truce() {
            return Ok(Err(refusal));
        }
        let c = self.roster.require_mut(id)?;
        c.combat_status = CombatStatus::TruceRequested;
        let (room, name, combat) = (c.room, c.name.clone(), c.combat);
        self.echo(room, id, format!("{name} asks for a truce."));
        let Some(combat) = combat else {
            return Ok(Ok(false));
        };
        let aggregate = self.combats.require_mut(combat)?;
        if !aggregate.request_truce(id) {
            return Ok(Ok(false));
        }
        let members: Vec<CharacterId> = aggregate.combatants().iter().copied().collect();
        for member in members {
            self.leave_combat(member)?;
        }
        self.echo(room, id, String::from("The fighting stops."));
        info!(combat = %combat, "combat ended by truce");
        Ok(Ok(true))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use somatic_types::{Outcome, PositionState, RoomLayer};

    use super::*;
    use crate::body::LimbBody;
    use crate::character::{Character, CombatSettings, MoveRequest};
    use crate::realm::tests::{realm, realm_with, spawn};
    use crate::skill_check::ScriptedOracle;

    fn fight(realm: &mut Realm, a: CharacterId, b: CharacterId) -> EngageReport {
        realm.engage(a, b, false).unwrap().unwrap()
    }

    #[test]
    fn engaging_in_the_same_room_locks_melee() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        let report = fight(&mut realm, a, b);
        assert!(report.melee);
        assert_eq!(report.ambush_bonus, 0);
        let (ca, cb) = (realm.character(a).unwrap(), realm.character(b).unwrap());
        assert_eq!(ca.combat_target, Some(b));
        assert_eq!(cb.combat_target, Some(a));
        assert_eq!(ca.combat, Some(report.combat));
        assert_eq!(cb.combat, Some(report.combat));
        assert!(ca.melee_range && cb.melee_range);
        assert_eq!(ca.combat_status, CombatStatus::EngagedMelee);
        assert!(realm.combats().get(report.combat).unwrap().contains(b));
    }

    #[test]
    fn different_layers_fight_at_range() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.forest_edge);
        let b = realm
            .login(
                Character::new("Bren", ids.forest_edge, Box::new(LimbBody::humanoid(100.0)))
                    .on_layer(RoomLayer::InTrees),
            )
            .unwrap();
        let report = fight(&mut realm, a, b);
        assert!(!report.melee);
        assert_eq!(
            realm.character(a).unwrap().combat_status,
            CombatStatus::EngagedRanged
        );
    }

    #[test]
    fn refusals_in_order() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        let view = realm.view(a).unwrap();
        assert_eq!(
            view.why_cannot_engage(a, false),
            Some(EngageRefusal::SelfTarget)
        );
        fight(&mut realm, a, b);
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(b, false),
            Some(EngageRefusal::AlreadyTargeting)
        );
    }

    #[test]
    fn no_fighting_at_the_shrine() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.shrine);
        let b = spawn(&mut realm, "Bren", ids.shrine);
        assert_eq!(
            realm.engage(a, b, false).unwrap(),
            Err(EngageRefusal::PeacefulLocation)
        );
        assert!(realm.combats().is_empty());
    }

    #[test]
    fn pacifists_and_sparring_partners() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        let c = spawn(&mut realm, "Cato", ids.meadow);
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::FriendlyBout { opponent: b }));
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(c, false),
            Some(EngageRefusal::FriendlyBout)
        );
        assert!(realm.view(a).unwrap().can_engage(b, false));
        realm
            .character_mut(c)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::Pacifism));
        assert_eq!(
            realm.view(c).unwrap().why_cannot_engage(b, false),
            Some(EngageRefusal::Pacifist)
        );
    }

    #[test]
    fn falling_and_rescued_characters_hold_off() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::until(EffectKind::RescuedFrom { attacker: b }, 15_000));
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(b, false),
            Some(EngageRefusal::RecentlyRescued)
        );
        realm.start_fall(a).unwrap();
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(b, false),
            Some(EngageRefusal::Falling)
        );
    }

    #[test]
    fn helpless_targets_need_permission() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        realm.set_consciousness(b, Consciousness::Sleeping).unwrap();
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(b, false),
            Some(EngageRefusal::TargetHelpless)
        );
        realm.character_mut(a).unwrap().combat_settings.attack_helpless = true;
        let report = fight(&mut realm, a, b);
        assert_eq!(report.ambush_bonus, realm.config().combat.ambush_bonus);
    }

    #[test]
    fn range_depends_on_adjacency() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let near = spawn(&mut realm, "Bren", ids.forest_edge);
        let far = spawn(&mut realm, "Cato", ids.deep_wood);
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(near, false),
            Some(EngageRefusal::OutOfRange)
        );
        assert_eq!(
            realm.view(a).unwrap().why_cannot_engage(far, true),
            Some(EngageRefusal::OutOfRange)
        );
        let report = realm.engage(a, near, true).unwrap().unwrap();
        assert!(!report.melee);
    }

    #[test]
    fn unseen_attacker_gets_ambush_bonus() {
        let (mut realm, ids) = realm_with(ScriptedOracle::always_pass().then([Outcome::Fail]));
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        assert_eq!(fight(&mut realm, a, b).ambush_bonus, 2);
    }

    #[test]
    fn cross_engagement_merges_combats() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        let c = spawn(&mut realm, "Cato", ids.meadow);
        let d = spawn(&mut realm, "Dara", ids.meadow);
        let first = fight(&mut realm, a, b).combat;
        fight(&mut realm, c, d);
        assert_eq!(realm.combats().len(), 2);
        fight(&mut realm, a, c);
        assert_eq!(realm.combats().len(), 1);
        for id in [a, b, c, d] {
            assert_eq!(realm.character(id).unwrap().combat, Some(first));
        }
        assert_eq!(realm.character(c).unwrap().combat_target, Some(d));
    }

    #[test]
    fn grapplers_clinch_their_target() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::Grappler));
        fight(&mut realm, a, b);
        assert!(
            realm
                .character(b)
                .unwrap()
                .effects
                .has(Capabilities::CLINCHED)
        );
        realm.leave_combat(a).unwrap();
        assert!(
            !realm
                .character(b)
                .unwrap()
                .effects
                .has(Capabilities::CLINCHED)
        );
    }

    #[test]
    fn fleeing_out_of_the_room_ends_the_fight() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        fight(&mut realm, a, b);
        assert_eq!(
            realm.view(b).unwrap().why_cannot_move(&MoveRequest::new("east")),
            Some(crate::refusal::MoveRefusal::InMelee)
        );
        realm.flee(b).unwrap().unwrap();
        assert_eq!(realm.flee(b).unwrap(), Err(EngageRefusal::AlreadyFleeing));
        let report = realm.begin_move(b, MoveRequest::new("east")).unwrap().unwrap();
        let arrival = realm.complete_move(b, report.token).unwrap().unwrap();
        assert!(arrival.fled);
        assert!(realm.character(b).unwrap().combat.is_none());
        assert!(realm.character(a).unwrap().combat.is_none());
        assert!(!realm.character(a).unwrap().melee_range);
        assert!(realm.combats().is_empty());
    }

    #[test]
    fn falling_out_of_melee_clears_the_flag() {
        let (mut realm, ids) = realm();
        let in_trees = |name: &str| {
            Character::new(name, ids.forest_edge, Box::new(LimbBody::humanoid(100.0)))
                .on_layer(RoomLayer::InTrees)
        };
        let a = realm.login(in_trees("Ayla")).unwrap();
        let b = realm.login(in_trees("Bren")).unwrap();
        assert!(fight(&mut realm, a, b).melee);
        let fall = realm.start_fall(b).unwrap();
        realm.complete_fall(b, fall.token).unwrap().unwrap();
        assert!(!realm.character(a).unwrap().melee_range);
        assert!(!realm.character(b).unwrap().melee_range);
        assert_eq!(
            realm.character(a).unwrap().combat_status,
            CombatStatus::EngagedRanged
        );
    }

    #[test]
    fn truce_needs_every_combatant() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        fight(&mut realm, a, b);
        assert_eq!(realm.request_truce(a).unwrap(), Ok(false));
        assert_eq!(
            realm.request_truce(a).unwrap(),
            Err(EngageRefusal::AlreadyRequestedTruce)
        );
        assert_eq!(realm.request_truce(b).unwrap(), Ok(true));
        assert!(realm.combats().is_empty());
        assert_eq!(
            realm.character(a).unwrap().combat_status,
            CombatStatus::Unengaged
        );
        assert_eq!(
            realm.request_truce(a).unwrap(),
            Err(EngageRefusal::NotInCombat)
        );
    }

    #[test]
    fn death_removes_both_sides() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        let combat = fight(&mut realm, a, b).combat;
        realm.kill(b).unwrap();
        assert!(realm.character(b).unwrap().combat.is_none());
        assert!(realm.combats().get(combat).is_none());
        assert!(realm.character(a).unwrap().combat_target.is_none());
    }

    #[test]
    fn sleeping_target_is_dropped_on_the_heartbeat() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        fight(&mut realm, a, b);
        realm.set_consciousness(b, Consciousness::Unconscious).unwrap();
        let check = realm.check_combat_status(a).unwrap();
        assert_eq!(check.retargeted, Some(None));
        assert!(!check.left_combat);
        assert!(realm.character(a).unwrap().combat.is_some());
    }

    #[test]
    fn acquire_prefers_attackers_close_at_hand() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let near = spawn(&mut realm, "Bren", ids.meadow);
        let far = spawn(&mut realm, "Cato", ids.forest_edge);
        realm.engage(far, a, true).unwrap().unwrap();
        fight(&mut realm, near, a);
        realm.character_mut(a).unwrap().combat_target = None;
        for _ in 0..8 {
            assert_eq!(realm.acquire_target(a).unwrap(), Some(near));
        }
        assert!(realm.character(a).unwrap().melee_range);
    }

    #[test]
    fn facing_follows_flanking_rules() {
        let (mut realm, ids) = realm();
        let a = spawn(&mut realm, "Ayla", ids.meadow);
        let b = spawn(&mut realm, "Bren", ids.meadow);
        fight(&mut realm, a, b);
        assert_eq!(realm.view(a).unwrap().get_facing_for(b), Facing::Front);
        realm
            .character_mut(a)
            .unwrap()
            .effects
            .add(Effect::new(EffectKind::FixedFacing {
                opponent: b,
                facing: Facing::Flank,
            }));
        assert_eq!(realm.view(a).unwrap().get_facing_for(b), Facing::Flank);
        realm.flee(b).unwrap().unwrap();
        assert_eq!(realm.view(a).unwrap().get_facing_for(b), Facing::Rear);
        realm.character_mut(a).unwrap().combat_settings = CombatSettings {
            forbid_flanking: true,
            ..CombatSettings::default()
        };
        assert_eq!(realm.view(a).unwrap().get_facing_for(b), Facing::Flank);
    }

    #[test]
    fn prefer_ranged_keeps_distance() {
        let (mut realm, ids) = realm();
        let a = realm
            .login(
                Character::new("Ayla", ids.meadow, Box::new(LimbBody::humanoid(100.0)))
                    .with_settings(CombatSettings {
                        prefer_ranged: true,
                        ..CombatSettings::default()
                    })
                    .in_position(PositionState::Standing),
            )
            .unwrap();
        let b = spawn(&mut realm, "Bren", ids.meadow);
        assert!(!fight(&mut realm, a, b).melee);
    }
}
