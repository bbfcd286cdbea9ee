use glam::{Vec2, Vec3};
use ridge_defence_core::{
    testing::RecordingFactory, BlockType, CellCoord, Event, Facing, GameStatus, MapDefinition,
    OverlayDepth, ResourceKind, SimulationError, UnitCatalog,
};
use ridge_defence_system_economy::DeployRejection;
use ridge_defence_system_session::{Session, SessionError};
use serde_json::{json, Value};

const TICK: f32 = 0.125;

fn flat_cells(width: u32, height: u32, block_type: &str) -> Vec<Value> {
    let mut cells = Vec::new();
    for z in 0..height {
        for x in 0..width {
            cells.push(json!({
                "x": x, "z": z, "blockType": block_type,
                "placeable": true, "passable": true, "heightAlpha": 1
            }));
        }
    }
    cells
}

fn map_definition(
    width: u32,
    height: u32,
    cells: Vec<Value>,
    waves: Value,
    ctl_data: Value,
) -> MapDefinition {
    serde_json::from_value(json!({
        "name": "test-ridge",
        "mapWidth": width,
        "mapHeight": height,
        "blockInfo": cells,
        "waves": waves,
        "ctlData": ctl_data,
    }))
    .expect("valid map definition")
}

fn ctl_data(life: u32, enemies: u32, initial_cost: f32, limit: usize) -> Value {
    json!({
        "maxLP": life, "enemyNum": enemies, "initCost": initial_cost,
        "maxCost": 99, "costInc": 1, "moveSpdMulti": 1, "oprLimit": limit
    })
}

fn catalog() -> UnitCatalog {
    serde_json::from_value(json!({
        "operator": {
            "exusiai": { "posType": "ALL", "cost": 20, "respawnTime": 30, "atkArea": [[0, 0]] },
            "sniper": { "posType": "RANGED", "cost": 0, "respawnTime": 5,
                        "atkArea": [[0, 0], [1, 0]] },
            "archer": { "posType": "RANGED", "cost": 0, "atkArea": [[0, 0]] },
            "guard": { "posType": "MELEE", "cost": 0, "atkArea": [[1, 0]] }
        },
        "enemy": {
            "slime": { "moveSpd": 1 }
        }
    }))
    .expect("valid catalogue")
}

fn mixed_strip() -> Vec<Value> {
    vec![
        json!({ "x": 0, "z": 0, "blockType": "ALL", "placeable": true, "passable": true,
                "heightAlpha": 1, "buildingInfo": { "desc": "tree" } }),
        json!({ "x": 1, "z": 0, "blockType": "MELEE", "placeable": true, "passable": true,
                "heightAlpha": 1 }),
        json!({ "x": 2, "z": 0, "blockType": "RANGED", "placeable": true, "passable": true,
                "heightAlpha": 1 }),
        json!({ "x": 3, "z": 0, "blockType": "RANGED", "placeable": false, "passable": true,
                "heightAlpha": 1 }),
    ]
}

fn strip_session(factory: RecordingFactory) -> Session<RecordingFactory> {
    let definition = map_definition(4, 1, mixed_strip(), json!([]), ctl_data(3, 1, 0.0, 2));
    Session::new(definition, catalog(), factory).expect("session builds")
}

fn picker(pointer: Vec2) -> Option<Vec3> {
    Some(Vec3::new(pointer.x, 10.0, pointer.y))
}

#[test]
fn regenerated_cost_pays_for_deployment_after_twenty_seconds() {
    let definition = map_definition(5, 5, flat_cells(5, 5, "ALL"), json!([]), ctl_data(3, 1, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();

    assert_eq!(session.start(&mut events), GameStatus::Running);
    for _ in 0..40 {
        let _ = session.advance(0.5, &mut events).expect("no fault");
    }
    assert!((session.economy().cost() - 20.0).abs() < 1e-4);

    let remaining = session
        .deploy_operator("exusiai", CellCoord::new(2, 2), Facing::Right, &mut events)
        .expect("deploys");
    assert_eq!(remaining, 7);
    assert!(session.economy().cost().abs() < 1e-4);
    assert_eq!(session.timeline().format(), "00:20.000");
}

#[test]
fn enemy_pauses_walks_and_leaks_exactly_one_life() {
    let waves = json!([{ "maxWaitingTime": 10, "fragments": [
        { "time": 5, "name": "slime", "path": [{ "x": 0, "z": 0 }, { "pause": 3 }, { "x": 2, "z": 0 }] }
    ] }]);
    let definition = map_definition(3, 1, flat_cells(3, 1, "ALL"), waves, ctl_data(3, 1, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();
    let _ = session.start(&mut events);

    let mut spawned_at = None;
    let mut moving_at = None;
    let mut leaked_at = None;
    while leaked_at.is_none() {
        events.clear();
        let _ = session.advance(TICK, &mut events).expect("no fault");
        let now = session.timeline().elapsed();
        assert!(now < 20.0, "enemy never leaked");

        for event in &events {
            match event {
                Event::EnemySpawned { at, cell, .. } => {
                    assert_eq!(*cell, CellCoord::new(0, 0));
                    spawned_at = Some(*at);
                }
                Event::EnemyLeaked { at, .. } => leaked_at = Some(*at),
                _ => {}
            }
        }
        if let Some(enemy) = session.enemies().iter().next() {
            if moving_at.is_none() && enemy.position() != Vec2::new(0.5, 0.5) {
                moving_at = Some(now);
            }
        }
        if leaked_at.is_none() {
            assert_eq!(session.economy().life_points(), 3, "no damage before the leak");
        }
    }

    assert_eq!(spawned_at, Some(5.0));
    let moving_at = moving_at.expect("enemy moved");
    assert!((7.875..=8.25).contains(&moving_at), "started moving at {moving_at}");
    let leaked_at = leaked_at.expect("leaked");
    assert!((9.75..=10.25).contains(&leaked_at), "leaked at {leaked_at}");

    assert_eq!(session.economy().life_points(), 2);
    assert_eq!(session.status(), GameStatus::Victory);
    assert!(events.contains(&Event::StatusChanged {
        status: GameStatus::Victory
    }));
    assert!(!session.timeline().is_running());
    assert!(session.enemies().is_empty());
}

#[test]
fn losing_the_last_life_is_a_defeat_and_freezes_the_battle() {
    let waves = json!([{ "fragments": [
        { "time": 0, "name": "slime", "path": [{ "x": 0, "z": 0 }] },
        { "time": 0, "name": "slime", "path": [{ "x": 0, "z": 0 }] }
    ] }]);
    let definition = map_definition(1, 1, flat_cells(1, 1, "ALL"), waves, ctl_data(1, 2, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();
    let _ = session.start(&mut events);

    let mut status = GameStatus::Running;
    for _ in 0..10 {
        status = session.advance(TICK, &mut events).expect("no fault");
        if status.is_terminal() {
            break;
        }
    }
    assert_eq!(status, GameStatus::Defeat);

    let frozen = session.timeline().elapsed();
    assert_eq!(session.advance(TICK, &mut events), Ok(GameStatus::Defeat));
    assert_eq!(session.start(&mut events), GameStatus::Defeat);
    assert_eq!(session.timeline().elapsed(), frozen);
}

#[test]
fn paused_battle_does_not_advance() {
    let definition = map_definition(1, 1, flat_cells(1, 1, "ALL"), json!([]), ctl_data(3, 1, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();

    let _ = session.advance(1.0, &mut events).expect("no fault");
    assert_eq!(session.timeline().elapsed(), 0.0);

    let _ = session.start(&mut events);
    let _ = session.advance(1.0, &mut events).expect("no fault");
    assert_eq!(session.pause(&mut events), GameStatus::Standby);
    let _ = session.advance(1.0, &mut events).expect("no fault");
    assert_eq!(session.timeline().elapsed(), 1.0);
    assert!((session.economy().cost() - 1.0).abs() < 1e-6);
    assert_eq!(
        events,
        vec![
            Event::StatusChanged {
                status: GameStatus::Running
            },
            Event::StatusChanged {
                status: GameStatus::Standby
            },
        ]
    );
}

#[test]
fn integrity_faults_surface_from_advance() {
    let waves = json!([{ "fragments": [
        { "time": 0, "name": "ghost", "path": [{ "x": 0, "z": 0 }] }
    ] }]);
    let definition = map_definition(1, 1, flat_cells(1, 1, "ALL"), waves, ctl_data(3, 1, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();
    let _ = session.start(&mut events);

    assert_eq!(
        session.advance(TICK, &mut events),
        Err(SimulationError::MissingUnitData {
            name: "ghost".to_owned()
        })
    );
}

#[test]
fn faulty_fragment_does_not_freeze_enemies_already_walking() {
    let waves = json!([{ "fragments": [
        { "time": 0, "name": "slime", "path": [{ "x": 0, "z": 0 }, { "x": 4, "z": 0 }] },
        { "time": 1, "name": "ghost", "path": [{ "x": 0, "z": 0 }] }
    ] }]);
    let definition = map_definition(5, 1, flat_cells(5, 1, "ALL"), waves, ctl_data(3, 2, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();
    let _ = session.start(&mut events);

    let mut faults = Vec::new();
    let mut leaked = false;
    for _ in 0..400 {
        match session.advance(TICK, &mut events) {
            Ok(_) => {}
            Err(fault) => faults.push(fault),
        }
        if events.iter().any(|event| matches!(event, Event::EnemyLeaked { .. })) {
            leaked = true;
            break;
        }
    }

    assert_eq!(
        faults,
        vec![SimulationError::MissingUnitData {
            name: "ghost".to_owned()
        }]
    );
    assert!(leaked, "the slime stopped walking after the fault");
    assert_eq!(session.economy().life_points(), 2);
    assert_eq!(session.status(), GameStatus::Running);
}

#[test]
fn sixtieth_second_frames_afford_the_deployment_at_twenty_seconds() {
    let definition = map_definition(5, 5, flat_cells(5, 5, "ALL"), json!([]), ctl_data(3, 1, 0.0, 8));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();

    let _ = session.start(&mut events);
    for _ in 0..1200 {
        let _ = session.advance(1.0 / 60.0, &mut events).expect("no fault");
    }
    assert_eq!(session.timeline().format(), "00:20.000");

    assert_eq!(
        session.deploy_operator("exusiai", CellCoord::new(2, 2), Facing::Right, &mut events),
        Ok(7)
    );
}

#[test]
fn missing_building_model_fails_session_construction() {
    let definition = map_definition(4, 1, mixed_strip(), json!([]), ctl_data(3, 1, 0.0, 2));
    let result = Session::new(definition, catalog(), RecordingFactory::new().without("tree"));
    assert!(matches!(
        result,
        Err(SimulationError::ResourceUnavailable {
            kind: ResourceKind::Building,
            ..
        })
    ));
}

#[test]
fn deployment_respects_cell_class_and_occupancy() {
    let mut session = strip_session(RecordingFactory::new());
    let mut events = Vec::new();

    assert_eq!(
        session.deploy_operator("sniper", CellCoord::new(1, 0), Facing::Right, &mut events),
        Err(SessionError::NotPlaceable {
            cell: CellCoord::new(1, 0),
            name: "sniper".to_owned(),
        })
    );
    assert!(matches!(
        session.deploy_operator("sniper", CellCoord::new(3, 0), Facing::Right, &mut events),
        Err(SessionError::NotPlaceable { .. })
    ));
    assert_eq!(
        session.deploy_operator("sniper", CellCoord::new(9, 9), Facing::Right, &mut events),
        Err(SessionError::UnknownCell {
            cell: CellCoord::new(9, 9)
        })
    );
    assert!(matches!(
        session.deploy_operator("nobody", CellCoord::new(2, 0), Facing::Right, &mut events),
        Err(SessionError::Deploy(DeployRejection::UnknownOperator { .. }))
    ));

    assert_eq!(
        session.deploy_operator("sniper", CellCoord::new(2, 0), Facing::Up, &mut events),
        Ok(1)
    );
    assert_eq!(
        session.deploy_operator("archer", CellCoord::new(2, 0), Facing::Up, &mut events),
        Err(SessionError::Occupied {
            cell: CellCoord::new(2, 0)
        })
    );
    assert_eq!(session.operator_at(CellCoord::new(2, 0)), Some("sniper"));

    let handle = session.factory().state("operator:sniper").expect("instance");
    assert_eq!(handle.position, Vec3::new(25.0, 12.0, 5.0));
    assert!((handle.rotation_y - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    assert_eq!(
        events,
        vec![Event::OperatorDeployed {
            name: "sniper".to_owned(),
            cell: CellCoord::new(2, 0),
            facing: Facing::Up,
            remaining_slots: 1,
        }]
    );
}

#[test]
fn buildings_block_deployment() {
    let cells = vec![json!({ "x": 0, "z": 0, "blockType": "ALL", "placeable": true,
                             "passable": true, "heightAlpha": 1,
                             "buildingInfo": { "desc": "tree" } })];
    let definition = map_definition(1, 1, cells, json!([]), ctl_data(3, 1, 50.0, 2));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let mut events = Vec::new();

    assert_eq!(
        session.deploy_operator("exusiai", CellCoord::new(0, 0), Facing::Right, &mut events),
        Err(SessionError::Occupied {
            cell: CellCoord::new(0, 0)
        })
    );
    assert!((session.economy().cost() - 50.0).abs() < 1e-6, "nothing was charged");
}

#[test]
fn missing_operator_model_leaves_the_economy_untouched() {
    let mut session = strip_session(RecordingFactory::new().without("archer"));
    let mut events = Vec::new();

    assert_eq!(
        session.deploy_operator("archer", CellCoord::new(2, 0), Facing::Right, &mut events),
        Err(SessionError::Simulation(SimulationError::ResourceUnavailable {
            kind: ResourceKind::Operator,
            name: "archer".to_owned(),
        }))
    );
    assert_eq!(session.economy().remaining_slots(), 2);
    assert!(session.deployed("archer").is_none());
}

#[test]
fn withdrawal_disposes_the_operator_and_frees_the_cell() {
    let mut session = strip_session(RecordingFactory::new());
    let mut events = Vec::new();
    let _ = session
        .deploy_operator("sniper", CellCoord::new(2, 0), Facing::Right, &mut events)
        .expect("deploys");

    let withdrawal = session.withdraw_operator("sniper", &mut events).expect("withdraws");
    assert_eq!(withdrawal.remaining_slots, 2);
    assert!(session
        .factory()
        .state("operator:sniper")
        .expect("instance")
        .disposed);
    assert_eq!(session.operator_at(CellCoord::new(2, 0)), None);
    assert!(matches!(
        events.last(),
        Some(Event::OperatorWithdrawn { name, .. }) if name == "sniper"
    ));

    assert!(matches!(
        session.deploy_operator("sniper", CellCoord::new(2, 0), Facing::Right, &mut events),
        Err(SessionError::Deploy(DeployRejection::CoolingDown { .. }))
    ));
    assert_eq!(
        session.deploy_operator("archer", CellCoord::new(2, 0), Facing::Right, &mut events),
        Ok(1)
    );
}

#[test]
fn placement_preview_follows_the_pointer() {
    let mut session = strip_session(RecordingFactory::new());
    session.begin_placement("sniper").expect("known operator");

    let placement = session
        .overlays()
        .layer(OverlayDepth::PLACEMENT)
        .expect("placement layer");
    assert_eq!(
        placement.enable_area(),
        session.map().placeable_area(Some(BlockType::RangedOnly)).as_slice()
    );
    assert_eq!(placement.visibility(), Some(true));

    assert!(session.pointer_moved(&picker, Vec2::new(25.0, 5.0)));
    assert_eq!(session.drop_target(), Some(CellCoord::new(2, 0)));
    let lit: Vec<_> = session
        .map()
        .cells()
        .filter(|cell| cell.overlay_visible(OverlayDepth::ATTACK) == Some(true))
        .map(|cell| cell.coord())
        .collect();
    assert_eq!(lit, vec![CellCoord::new(2, 0), CellCoord::new(3, 0)]);

    assert!(session.set_placement_facing(Facing::Left));
    let lit: Vec<_> = session
        .map()
        .cells()
        .filter(|cell| cell.overlay_visible(OverlayDepth::ATTACK) == Some(true))
        .map(|cell| cell.coord())
        .collect();
    assert_eq!(lit, vec![CellCoord::new(1, 0), CellCoord::new(2, 0)]);

    assert!(session.pointer_moved(&picker, Vec2::new(15.0, 5.0)));
    assert_eq!(session.drop_target(), None);
    assert_eq!(
        session
            .overlays()
            .layer(OverlayDepth::ATTACK)
            .and_then(|layer| layer.visibility()),
        Some(false)
    );

    session.end_placement();
    assert_eq!(
        session
            .overlays()
            .layer(OverlayDepth::PLACEMENT)
            .and_then(|layer| layer.visibility()),
        Some(false)
    );
    assert!(!session.pointer_moved(&picker, Vec2::new(25.0, 5.0)));
}

#[test]
fn reset_tears_everything_down() {
    let waves = json!([{ "fragments": [
        { "time": 0, "name": "slime", "path": [{ "x": 1, "z": 0 }, { "pause": 60 }] }
    ] }]);
    let definition = map_definition(4, 1, mixed_strip(), waves, ctl_data(3, 1, 10.0, 2));
    let mut session = Session::new(definition, catalog(), RecordingFactory::new()).expect("builds");
    let baseline = session.factory().live_count();
    let mut events = Vec::new();

    let _ = session.start(&mut events);
    let _ = session.advance(TICK, &mut events).expect("no fault");
    let _ = session
        .deploy_operator("sniper", CellCoord::new(2, 0), Facing::Right, &mut events)
        .expect("deploys");
    session.begin_placement("guard").expect("known operator");
    assert_eq!(session.enemies().len(), 1);
    assert_eq!(session.factory().live_count(), baseline + 2);

    events.clear();
    session.reset(&mut events);

    assert_eq!(session.factory().live_count(), baseline);
    assert!(session.enemies().is_empty());
    assert!(session.deployed("sniper").is_none());
    assert_eq!(session.scheduler().pending_fragments(), 1);
    assert_eq!(session.timeline().elapsed(), 0.0);
    assert!((session.economy().cost() - 10.0).abs() < 1e-6);
    assert_eq!(session.status(), GameStatus::Standby);
    assert_eq!(
        events,
        vec![Event::StatusChanged {
            status: GameStatus::Standby
        }]
    );
    assert!(session.map().cells().all(|cell| {
        cell.overlay_visible(OverlayDepth::PLACEMENT) != Some(true)
            && cell.overlay_visible(OverlayDepth::ATTACK) != Some(true)
    }));
}
