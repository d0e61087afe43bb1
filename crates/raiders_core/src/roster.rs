//! In-memory guild roster.
//!
//! The roster is the authoritative record of guild members and parties:
//! who exists, which scene they are assigned to and whether they are alive.
//! Scenes only read it (through [`RosterSource`]) and write back deaths.
//!
//! Every mutation bumps [`GuildRoster::revision`], which is how scenes
//! notice they have to re-sync.

use serde::{Deserialize, Serialize};

use crate::components::MemberId;
use crate::error::{Result, SimError};
use crate::math::Millis;

/// Scene identifier ("town", "hell", "open_world_grass", ...).
pub type SceneId = String;

/// Identifier of a party.
pub type PartyId = String;

/// Scene members are sent back to when they leave a party or get recalled.
pub const TOWN: &str = "town";

/// How long a member stays dead in the field before being recalled.
pub const DEAD_RECALL_MS: Millis = 60_000.0;

/// What a guild member does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    /// Fights.
    #[default]
    Adventurer,
    /// Gathers and flees from danger.
    Worker,
}

/// A persisted guild member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildMember {
    /// Member id.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: MemberRole,
    /// Catalog key of the unit this member spawns as.
    pub unit_def_id: String,
    /// Scene the member is assigned to.
    pub scene_id: SceneId,
    /// Party, if any.
    #[serde(default)]
    pub party_id: Option<PartyId>,
    /// Level.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Current hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// When the member died, if dead.
    #[serde(default)]
    pub dead_at_ms: Option<Millis>,
}

const fn default_level() -> u32 {
    1
}

impl GuildMember {
    /// Level 1 member at full health in town.
    #[must_use]
    pub fn new(
        id: impl Into<MemberId>,
        name: impl Into<String>,
        role: MemberRole,
        unit_def_id: impl Into<String>,
        max_hp: f32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            unit_def_id: unit_def_id.into(),
            scene_id: TOWN.to_string(),
            party_id: None,
            level: 1,
            hp: max_hp,
            max_hp,
            dead_at_ms: None,
        }
    }

    /// Whether the member has hit points left.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }
}

/// A group of members deployed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Party id.
    pub id: PartyId,
    /// Display name.
    pub name: String,
    /// Members, in join order.
    #[serde(default)]
    pub member_ids: Vec<MemberId>,
    /// Scene the party is deployed to.
    pub scene_id: SceneId,
}

/// The fields a scene needs from one roster entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RosterEntry<'a> {
    /// Member id.
    pub id: &'a str,
    /// Assigned scene.
    pub scene_id: &'a str,
    /// Current hit points.
    pub hp: f32,
    /// Catalog key to spawn.
    pub unit_def_id: &'a str,
    /// Role.
    pub role: MemberRole,
}

/// Read-only roster view consumed by scene synchronization.
pub trait RosterSource {
    /// All members, in a stable order.
    fn entries(&self) -> Vec<RosterEntry<'_>>;

    /// Changes whenever any entry changes.
    fn revision(&self) -> u64;
}

/// Guild members and parties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildRoster {
    members: Vec<GuildMember>,
    parties: Vec<Party>,
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    next_member: u64,
    #[serde(default)]
    next_party: u64,
}

impl GuildRoster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster built from existing members and parties.
    #[must_use]
    pub fn from_parts(members: Vec<GuildMember>, parties: Vec<Party>) -> Self {
        Self {
            next_member: members.len() as u64,
            next_party: parties.len() as u64,
            members,
            parties,
            revision: 0,
        }
    }

    /// The starting guild: two adventurers and a worker in town, with the
    /// first adventurer in "Party 1".
    #[must_use]
    pub fn create_starter_guild() -> Self {
        let mut roster = Self::new();
        let party = roster.create_party("Party 1");

        let mut dealer = GuildMember::new("", "damage dealer", MemberRole::Adventurer, "lizardman1", 140.0);
        dealer.party_id = Some(party.clone());
        let dealer = roster.add_member(dealer);
        roster.add_member(GuildMember::new("", "tank", MemberRole::Adventurer, "lizardman1", 140.0));
        roster.add_member(GuildMember::new("", "miner", MemberRole::Worker, "lizardman1", 140.0));

        for p in roster.parties.iter_mut().filter(|p| p.id == party) {
            p.member_ids.push(dealer.clone());
        }
        roster
    }

    fn bump(&mut self) {
        self.revision += 1;
    }

    /// All members.
    #[must_use]
    pub fn members(&self) -> &[GuildMember] {
        &self.members
    }

    /// All parties.
    #[must_use]
    pub fn parties(&self) -> &[Party] {
        &self.parties
    }

    /// Member by id.
    #[must_use]
    pub fn member(&self, id: &str) -> Option<&GuildMember> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Party by id.
    #[must_use]
    pub fn party(&self, id: &str) -> Option<&Party> {
        self.parties.iter().find(|p| p.id == id)
    }

    fn member_mut(&mut self, id: &str) -> Result<&mut GuildMember> {
        self.members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| SimError::MemberNotFound(id.to_string()))
    }

    fn party_mut(&mut self, id: &str) -> Result<&mut Party> {
        self.parties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| SimError::PartyNotFound(id.to_string()))
    }

    /// Add a member. An empty id is replaced by a generated one.
    pub fn add_member(&mut self, mut member: GuildMember) -> MemberId {
        if member.id.is_empty() {
            self.next_member += 1;
            member.id = format!("gm_{}", self.next_member);
        }
        let id = member.id.clone();
        tracing::debug!(member = %id, name = %member.name, "member added");
        self.members.push(member);
        self.bump();
        id
    }

    /// Create an empty party in town.
    pub fn create_party(&mut self, name: impl Into<String>) -> PartyId {
        self.next_party += 1;
        let id = format!("party_{}", self.next_party);
        self.parties.push(Party {
            id: id.clone(),
            name: name.into(),
            member_ids: Vec::new(),
            scene_id: TOWN.to_string(),
        });
        self.bump();
        id
    }

    /// Move a member into a party. The member leaves its old party and
    /// takes the party's scene.
    pub fn add_member_to_party(&mut self, member_id: &str, party_id: &str) -> Result<()> {
        let scene = self
            .party(party_id)
            .map(|p| p.scene_id.clone())
            .ok_or_else(|| SimError::PartyNotFound(party_id.to_string()))?;
        let old_party = self.member_mut(member_id)?.party_id.clone();

        if let Some(old) = old_party.as_deref() {
            if let Ok(p) = self.party_mut(old) {
                p.member_ids.retain(|m| m != member_id);
            }
        }

        let party = self.party_mut(party_id)?;
        if !party.member_ids.iter().any(|m| m == member_id) {
            party.member_ids.push(member_id.to_string());
        }

        let member = self.member_mut(member_id)?;
        member.party_id = Some(party_id.to_string());
        member.scene_id = scene;
        self.bump();
        Ok(())
    }

    /// Take a member out of its party and send it back to town. A member
    /// without a party is left alone.
    pub fn remove_member_from_party(&mut self, member_id: &str) -> Result<()> {
        let Some(party_id) = self.member_mut(member_id)?.party_id.clone() else {
            return Ok(());
        };

        if let Ok(p) = self.party_mut(&party_id) {
            p.member_ids.retain(|m| m != member_id);
        }
        let member = self.member_mut(member_id)?;
        member.party_id = None;
        member.scene_id = TOWN.to_string();
        self.bump();
        Ok(())
    }

    /// Deploy a party and all its members to `scene`.
    pub fn send_party_to_scene(&mut self, party_id: &str, scene: &str) -> Result<()> {
        let party = self.party_mut(party_id)?;
        party.scene_id = scene.to_string();
        let member_ids = party.member_ids.clone();

        for m in self.members.iter_mut().filter(|m| member_ids.contains(&m.id)) {
            m.scene_id = scene.to_string();
        }
        tracing::debug!(party = %party_id, scene = %scene, "party deployed");
        self.bump();
        Ok(())
    }

    /// Assign a single member to `scene`.
    pub fn set_member_scene(&mut self, member_id: &str, scene: &str) -> Result<()> {
        self.member_mut(member_id)?.scene_id = scene.to_string();
        self.bump();
        Ok(())
    }

    /// Set hit points, clamped to `[0, max_hp]`.
    pub fn set_member_hp(&mut self, member_id: &str, hp: f32) -> Result<()> {
        let member = self.member_mut(member_id)?;
        member.hp = hp.clamp(0.0, member.max_hp);
        self.bump();
        Ok(())
    }

    /// Record a death at `now`.
    pub fn mark_member_dead(&mut self, member_id: &str, now: Millis) -> Result<()> {
        let member = self.member_mut(member_id)?;
        member.hp = 0.0;
        member.dead_at_ms = Some(now);
        tracing::debug!(member = %member_id, now, "member died");
        self.bump();
        Ok(())
    }

    /// Members dead for at least [`DEAD_RECALL_MS`] leave their party and
    /// return to town at full health. Returns the recalled ids.
    pub fn recall_dead_members(&mut self, now: Millis) -> Vec<MemberId> {
        let due: Vec<MemberId> = self
            .members
            .iter()
            .filter(|m| m.dead_at_ms.is_some_and(|at| now - at >= DEAD_RECALL_MS))
            .map(|m| m.id.clone())
            .collect();

        for id in &due {
            for p in &mut self.parties {
                p.member_ids.retain(|m| m != id);
            }
            if let Ok(m) = self.member_mut(id) {
                m.party_id = None;
                m.scene_id = TOWN.to_string();
                m.hp = m.max_hp;
                m.dead_at_ms = None;
            }
            tracing::debug!(member = %id, "dead member recalled");
        }

        if !due.is_empty() {
            self.bump();
        }
        due
    }
}

impl RosterSource for GuildRoster {
    fn entries(&self) -> Vec<RosterEntry<'_>> {
        self.members
            .iter()
            .map(|m| RosterEntry {
                id: &m.id,
                scene_id: &m.scene_id,
                hp: m.hp,
                unit_def_id: &m.unit_def_id,
                role: m.role,
            })
            .collect()
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_guild() {
        let roster = GuildRoster::create_starter_guild();
        assert_eq!(roster.members().len(), 3);
        assert!(roster.members().iter().all(|m| m.scene_id == TOWN));

        let party = &roster.parties()[0];
        assert_eq!(party.name, "Party 1");
        assert_eq!(party.member_ids, vec![roster.members()[0].id.clone()]);
        assert_eq!(roster.members()[0].party_id.as_deref(), Some(party.id.as_str()));
        assert!(roster.members()[1..].iter().all(|m| m.party_id.is_none()));
        assert_eq!(roster.members()[2].role, MemberRole::Worker);
    }

    #[test]
    fn test_joining_party_takes_its_scene_and_leaves_old_one() {
        let mut roster = GuildRoster::create_starter_guild();
        let a = roster.members()[0].id.clone();
        let first = roster.parties()[0].id.clone();
        let second = roster.create_party("Party 2");
        roster.send_party_to_scene(&second, "hell").unwrap();

        roster.add_member_to_party(&a, &second).unwrap();
        assert!(roster.party(&first).is_some_and(|p| p.member_ids.is_empty()));
        let member = roster.member(&a).unwrap();
        assert_eq!(member.scene_id, "hell");
        assert_eq!(member.party_id.as_deref(), Some(second.as_str()));
    }

    #[test]
    fn test_leaving_party_returns_to_town() {
        let mut roster = GuildRoster::create_starter_guild();
        let a = roster.members()[0].id.clone();
        let party = roster.parties()[0].id.clone();
        roster.send_party_to_scene(&party, "hell").unwrap();
        assert_eq!(roster.member(&a).unwrap().scene_id, "hell");

        roster.remove_member_from_party(&a).unwrap();
        assert_eq!(roster.member(&a).unwrap().scene_id, TOWN);
        assert!(roster.member(&a).unwrap().party_id.is_none());
    }

    #[test]
    fn test_unknown_ids_are_errors() {
        let mut roster = GuildRoster::create_starter_guild();
        assert!(matches!(
            roster.set_member_scene("nobody", "hell"),
            Err(SimError::MemberNotFound(_))
        ));
        assert!(matches!(
            roster.send_party_to_scene("nothing", "hell"),
            Err(SimError::PartyNotFound(_))
        ));
    }

    #[test]
    fn test_hp_is_clamped() {
        let mut roster = GuildRoster::create_starter_guild();
        let a = roster.members()[0].id.clone();
        roster.set_member_hp(&a, 1000.0).unwrap();
        assert_eq!(roster.member(&a).unwrap().hp, 140.0);
        roster.set_member_hp(&a, -5.0).unwrap();
        assert_eq!(roster.member(&a).unwrap().hp, 0.0);
    }

    #[test]
    fn test_recall_after_delay() {
        let mut roster = GuildRoster::create_starter_guild();
        let a = roster.members()[0].id.clone();
        let party = roster.parties()[0].id.clone();
        roster.send_party_to_scene(&party, "hell").unwrap();
        roster.mark_member_dead(&a, 1_000.0).unwrap();

        assert!(roster.recall_dead_members(60_999.0).is_empty());
        assert_eq!(roster.recall_dead_members(61_000.0), vec![a.clone()]);

        let member = roster.member(&a).unwrap();
        assert_eq!(member.scene_id, TOWN);
        assert!(member.party_id.is_none());
        assert!(member.is_alive());
        assert!(roster.party(&party).unwrap().member_ids.is_empty());
    }

    #[test]
    fn test_revision_bumps_on_change() {
        let mut roster = GuildRoster::create_starter_guild();
        let before = roster.revision();
        let a = roster.members()[1].id.clone();
        roster.set_member_scene(&a, "hell").unwrap();
        assert!(roster.revision() > before);

        let unchanged = roster.revision();
        roster.recall_dead_members(0.0);
        assert_eq!(roster.revision(), unchanged);
    }
}
