//! Scenes driven by the built-in catalog and a real roster.

use std::sync::Arc;

use raiders_core::prelude::*;
use raiders_core::roster::TOWN;
use raiders_core::scene::HELL;
use raiders_test_utils::determinism::verify_determinism;
use raiders_test_utils::fixtures::DT;

fn catalog() -> Arc<UnitCatalog> {
    Arc::new(UnitCatalog::builtin().expect("builtin catalog"))
}

fn party_id(roster: &GuildRoster) -> String {
    roster.parties()[0].id.clone()
}

#[test]
fn test_starter_guild_in_town() {
    let mut roster = GuildRoster::create_starter_guild();
    let mut town = SceneRuntime::new(SceneConfig::town(), catalog(), 11);
    let report = town.enter(0.0, &roster);
    assert_eq!(report.added.len(), 3);

    let mut now = 0.0;
    for _ in 0..600 {
        now += DT;
        let frame = town.frame(now, DT, &mut roster);
        assert!(frame.events.hits.is_empty());
    }

    let center = Vec2::new(1024.0, 1024.0);
    for unit in town.system().units() {
        assert!(unit.member_id().is_some());
        assert!(unit.pos().distance(center) < 800.0);
    }
}

#[test]
fn test_party_moves_from_town_to_hell() {
    let mut roster = GuildRoster::create_starter_guild();
    let party = party_id(&roster);
    let catalog = catalog();

    let mut town = SceneRuntime::new(SceneConfig::town(), Arc::clone(&catalog), 1);
    let mut hell = SceneRuntime::new(SceneConfig::hell(), catalog, 2);
    town.enter(0.0, &roster);
    hell.enter(0.0, &roster);
    assert_eq!(town.system().len(), 3);
    assert!(hell.system().is_empty());

    roster.send_party_to_scene(&party, HELL).expect("party exists");
    let town_frame = town.frame(DT, DT, &mut roster);
    let hell_frame = hell.frame(DT, DT, &mut roster);

    assert_eq!(town_frame.sync.map(|s| s.removed.len()), Some(1));
    assert_eq!(hell_frame.sync.map(|s| s.added.len()), Some(1));
    assert_eq!(town.system().len(), 2);

    let dealer = &roster.parties()[0].member_ids[0];
    let unit = hell
        .party_sync()
        .unit_for_member(dealer)
        .expect("dealer spawned in hell");
    assert_eq!(hell.system().controller_name(unit), Some("combat"));
    let pos = hell.system().get(unit).map(UnitEntity::pos).expect("unit");
    assert!(pos.distance(Vec2::new(100.0, 100.0)) < 5.0);
}

#[test]
fn test_hell_fight_keeps_invariants() {
    let mut roster = GuildRoster::create_starter_guild();
    let party = party_id(&roster);
    for m in roster.members().iter().map(|m| m.id.clone()).collect::<Vec<_>>() {
        roster.add_member_to_party(&m, &party).expect("ids valid");
    }
    roster.send_party_to_scene(&party, HELL).expect("party exists");

    let mut hell = SceneRuntime::new(SceneConfig::hell(), catalog(), 5);
    hell.enter(0.0, &roster);

    let mut now = 0.0;
    let mut hits = 0;
    for _ in 0..3000 {
        now += DT;
        let frame = hell.frame(now, DT, &mut roster);
        hits += frame.events.hits.len();

        assert!(hell.system().alive_count(Team::Enemy) <= 10);
        for unit in hell.system().units() {
            let s = unit.stats();
            assert!(s.hp >= 0.0 && s.hp <= s.max_hp);
            if unit.team() == Team::Enemy {
                assert!(!unit.is_dead(), "dead enemies are purged the same tick");
            }
        }
        roster.recall_dead_members(now);
    }
    assert!(hits > 0);
}

#[test]
fn test_scene_replays_from_seed() {
    let catalog = catalog();
    let result = verify_determinism(
        3,
        1500,
        || {
            let mut roster = GuildRoster::create_starter_guild();
            let party = party_id(&roster);
            roster.send_party_to_scene(&party, HELL).expect("party exists");
            let mut scene = SceneRuntime::new(SceneConfig::hell(), Arc::clone(&catalog), 77);
            scene.enter(0.0, &roster);
            (scene, roster)
        },
        |(scene, roster), tick| {
            scene.frame(tick as f64 * DT, DT, roster);
        },
        |(scene, _)| scene.system().state_hash(),
    );
    result.assert_deterministic();
}

#[test]
fn test_open_world_removes_every_corpse() {
    let mut roster = GuildRoster::create_starter_guild();
    let party = party_id(&roster);
    roster
        .send_party_to_scene(&party, "plains/autumn_1")
        .expect("party exists");

    let mut world = SceneRuntime::new(SceneConfig::open_world("plains/autumn_1"), catalog(), 3);
    world.enter(0.0, &roster);
    assert_eq!(world.system().len(), 1);

    let mut now = 0.0;
    for _ in 0..2000 {
        now += DT;
        world.frame(now, DT, &mut roster);
        assert!(world.system().units().all(|u| !u.is_dead()));
    }
}

#[test]
fn test_recalled_member_returns_to_town() {
    let mut roster = GuildRoster::create_starter_guild();
    let party = party_id(&roster);
    roster.send_party_to_scene(&party, HELL).expect("party exists");
    let dealer = roster.parties()[0].member_ids[0].clone();

    let mut town = SceneRuntime::new(SceneConfig::town(), catalog(), 4);
    town.enter(0.0, &roster);
    assert!(town.party_sync().unit_for_member(&dealer).is_none());

    roster.mark_member_dead(&dealer, 0.0).expect("member exists");
    assert!(roster.recall_dead_members(59_999.0).is_empty());
    assert_eq!(roster.recall_dead_members(60_000.0), vec![dealer.clone()]);

    let member = roster.member(&dealer).expect("member exists");
    assert_eq!(member.scene_id, TOWN);
    assert!(member.is_alive());

    town.frame(60_016.0, DT, &mut roster);
    assert!(town.party_sync().unit_for_member(&dealer).is_some());
}
