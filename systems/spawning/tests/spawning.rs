use std::collections::BTreeMap;

use glam::Vec3;
use ridge_defence_core::{
    testing::RecordingFactory, BlockType, CellCoord, CellDefinition, EnemyData, EnemyId, Event,
    FragmentDefinition, ResourceKind, SimulationError, TextureSet, UnitCatalog, WaveDefinition,
    Waypoint,
};
use ridge_defence_system_spawning::WaveScheduler;
use ridge_defence_world::{EnemyRoster, GridMap};

fn flat_map() -> GridMap {
    let mut cells = Vec::new();
    for z in 0..2 {
        for x in 0..3 {
            cells.push(CellDefinition {
                x,
                z,
                block_type: BlockType::Placeable,
                placeable: false,
                passable: true,
                height_alpha: if x == 0 { 2.0 } else { 1.0 },
                texture: TextureSet::default(),
                building_info: None,
            });
        }
    }
    GridMap::new("flat", 3, 2, &cells)
}

fn catalog() -> UnitCatalog {
    let mut enemy = BTreeMap::new();
    let _ = enemy.insert("slime".to_owned(), EnemyData { move_speed: 1.0 });
    let _ = enemy.insert("saber".to_owned(), EnemyData { move_speed: 2.0 });
    UnitCatalog {
        operator: BTreeMap::new(),
        enemy,
    }
}

fn fragment(time: f32, name: &str, path: Vec<Waypoint>) -> FragmentDefinition {
    FragmentDefinition {
        time,
        name: name.to_owned(),
        path,
    }
}

fn walk(to: u32) -> Vec<Waypoint> {
    vec![
        Waypoint::Move(CellCoord::new(0, 0)),
        Waypoint::Pause { pause: 3.0 },
        Waypoint::Move(CellCoord::new(to, 0)),
    ]
}

fn single_wave(fragments: Vec<FragmentDefinition>) -> Vec<WaveDefinition> {
    vec![WaveDefinition {
        max_waiting_time: 10.0,
        fragments,
    }]
}

#[test]
fn releases_fragment_at_its_time_and_seats_it_on_the_cell() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new().with_unit_size(Vec3::new(4.0, 6.0, 4.0));
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&single_wave(vec![fragment(5.0, "slime", walk(2))]));
    let mut events = Vec::new();

    let early = scheduler
        .handle(4.9, &map, &catalog, &mut roster, &mut factory, &mut events)
        .expect("no fault");
    assert_eq!(early, None);
    assert!(roster.is_empty());

    let spawned = scheduler
        .handle(4.995, &map, &catalog, &mut roster, &mut factory, &mut events)
        .expect("no fault");
    assert_eq!(spawned, Some(EnemyId::new(0)));
    assert_eq!(
        events,
        vec![Event::EnemySpawned {
            enemy: EnemyId::new(0),
            name: "slime".to_owned(),
            cell: CellCoord::new(0, 0),
            at: 4.995,
        }]
    );

    let enemy = roster.get(EnemyId::new(0)).expect("active enemy");
    assert_eq!(
        enemy.route().iter().copied().collect::<Vec<_>>(),
        vec![
            Waypoint::Pause { pause: 3.0 },
            Waypoint::Move(CellCoord::new(2, 0))
        ]
    );
    assert_eq!(enemy.world_position(), Vec3::new(5.0, 23.0, 5.0));
    assert_eq!(scheduler.pending_waves(), 0);
    assert_eq!(
        factory.state("enemy:slime").expect("handle").position,
        Vec3::new(5.0, 23.0, 5.0)
    );
}

#[test]
fn late_ticks_release_one_fragment_at_a_time() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new();
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&[
        WaveDefinition {
            max_waiting_time: 0.0,
            fragments: vec![fragment(1.0, "slime", walk(1)), fragment(1.0, "saber", walk(2))],
        },
        WaveDefinition {
            max_waiting_time: 0.0,
            fragments: vec![fragment(2.0, "slime", walk(2))],
        },
    ]);
    let mut events = Vec::new();

    for expected in 0..3 {
        let spawned = scheduler
            .handle(30.0, &map, &catalog, &mut roster, &mut factory, &mut events)
            .expect("no fault");
        assert_eq!(spawned, Some(EnemyId::new(expected)));
        assert_eq!(roster.len(), expected as usize + 1);
    }
    assert_eq!(scheduler.pending_fragments(), 0);
    assert_eq!(
        scheduler.handle(30.0, &map, &catalog, &mut roster, &mut factory, &mut events),
        Ok(None)
    );
    assert_eq!(
        roster.get(EnemyId::new(1)).map(|enemy| enemy.move_speed()),
        Some(2.0)
    );
}

#[test]
fn unknown_unit_data_is_a_hard_error_and_discards_the_fragment() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new();
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&single_wave(vec![fragment(0.0, "ghost", walk(1))]));
    let mut events = Vec::new();

    let result = scheduler.handle(0.0, &map, &catalog, &mut roster, &mut factory, &mut events);
    assert_eq!(
        result,
        Err(SimulationError::MissingUnitData {
            name: "ghost".to_owned()
        })
    );
    assert_eq!(scheduler.pending_fragments(), 0);
    assert!(roster.is_empty());
    assert!(events.is_empty());
}

#[test]
fn missing_enemy_model_is_a_hard_error() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new().without("slime");
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&single_wave(vec![fragment(0.0, "slime", walk(1))]));
    let mut events = Vec::new();

    let result = scheduler.handle(0.0, &map, &catalog, &mut roster, &mut factory, &mut events);
    assert_eq!(
        result,
        Err(SimulationError::ResourceUnavailable {
            kind: ResourceKind::Enemy,
            name: "slime".to_owned(),
        })
    );
    assert_eq!(scheduler.pending_fragments(), 0);
}

#[test]
fn faulty_fragment_does_not_block_the_queue() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new();
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&single_wave(vec![
        fragment(1.0, "ghost", walk(1)),
        fragment(1.0, "slime", walk(2)),
    ]));
    let mut events = Vec::new();

    assert!(scheduler
        .handle(1.0, &map, &catalog, &mut roster, &mut factory, &mut events)
        .is_err());
    let spawned = scheduler
        .handle(1.125, &map, &catalog, &mut roster, &mut factory, &mut events)
        .expect("no fault");
    assert_eq!(spawned, Some(EnemyId::new(0)));
    assert_eq!(scheduler.pending_fragments(), 0);
    assert_eq!(roster.len(), 1);
}

#[test]
fn routes_must_start_on_a_terrain_cell() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new();
    let mut roster = EnemyRoster::new();
    let mut events = Vec::new();

    let mut paused_first = WaveScheduler::new(&single_wave(vec![fragment(
        0.0,
        "slime",
        vec![Waypoint::Pause { pause: 1.0 }],
    )]));
    assert!(matches!(
        paused_first.handle(0.0, &map, &catalog, &mut roster, &mut factory, &mut events),
        Err(SimulationError::MalformedRoute { .. })
    ));

    let mut off_map = WaveScheduler::new(&single_wave(vec![fragment(
        0.0,
        "slime",
        vec![Waypoint::Move(CellCoord::new(7, 7))],
    )]));
    assert!(matches!(
        off_map.handle(0.0, &map, &catalog, &mut roster, &mut factory, &mut events),
        Err(SimulationError::MalformedRoute { .. })
    ));
    assert_eq!(factory.live_count(), 0);
}

#[test]
fn reset_restores_every_fragment() {
    let map = flat_map();
    let catalog = catalog();
    let mut factory = RecordingFactory::new();
    let mut roster = EnemyRoster::new();
    let mut scheduler = WaveScheduler::new(&single_wave(vec![
        fragment(1.0, "slime", walk(1)),
        fragment(2.0, "saber", walk(2)),
    ]));
    let mut events = Vec::new();

    let _ = scheduler
        .handle(1.0, &map, &catalog, &mut roster, &mut factory, &mut events)
        .expect("no fault");
    assert_eq!(scheduler.next_spawn_time(), Some(2.0));

    scheduler.reset();
    assert_eq!(scheduler.pending_fragments(), 2);
    assert_eq!(scheduler.next_spawn_time(), Some(1.0));

    let _ = roster.clear();
    let respawned = scheduler
        .handle(1.0, &map, &catalog, &mut roster, &mut factory, &mut events)
        .expect("no fault");
    assert_eq!(respawned, Some(EnemyId::new(1)), "identifiers are not reused");
    let enemy = roster.get(EnemyId::new(1)).expect("active enemy");
    assert_eq!(enemy.route().len(), 2, "template route is intact");
}
