//! End-to-end engine scenarios: family membership through the engine,
//! listener ordering, system lifecycle hooks and system listeners.

use std::cell::RefCell;
use std::rc::Rc;

use kith_engine::prelude::*;

// -- Component types --------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct A;
impl Component for A {}

#[derive(Debug, Clone, PartialEq)]
struct B;
impl Component for B {}

#[derive(Debug, Clone, PartialEq)]
struct C;
impl Component for C {}

type Log = Rc<RefCell<Vec<String>>>;

fn log_of(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

// -- Listeners --------------------------------------------------------------

struct Recorder {
    name: &'static str,
    log: Log,
}

impl EntityListener for Recorder {
    fn entity_added(&mut self, _entity: &Entity) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("+{}", self.name));
        Ok(())
    }

    fn entity_removed(&mut self, _entity: &Entity) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("-{}", self.name));
        Ok(())
    }
}

fn recorder(name: &'static str, log: &Log) -> Box<dyn EntityListener> {
    Box::new(Recorder {
        name,
        log: Rc::clone(log),
    })
}

struct SystemLog {
    log: Log,
    fail_on_remove: bool,
}

impl SystemListener for SystemLog {
    fn system_added(&mut self, info: &SystemInfo) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("added:{}", info.priority));
        Ok(())
    }

    fn system_removed(&mut self, info: &SystemInfo) -> anyhow::Result<()> {
        self.log.borrow_mut().push(format!("removed:{}", info.priority));
        if self.fail_on_remove {
            anyhow::bail!("removal rejected");
        }
        Ok(())
    }
}

// -- Systems ----------------------------------------------------------------

/// Records its hooks and removes itself on the first update.
struct SelfRemoving {
    log: Log,
}

impl System for SelfRemoving {
    fn priority(&self) -> i32 {
        7
    }

    fn added_to_engine(&mut self, _engine: &mut Engine) {
        self.log.borrow_mut().push("hook:added".to_owned());
    }

    fn removed_from_engine(&mut self, _engine: &mut Engine) {
        self.log.borrow_mut().push("hook:removed".to_owned());
    }

    fn update(&mut self, engine: &mut Engine, _dt: f32) {
        self.log.borrow_mut().push("update:start".to_owned());
        assert!(engine.remove_system::<SelfRemoving>().is_none());
        self.log.borrow_mut().push("update:end".to_owned());
    }
}

struct Counter {
    priority: i32,
    updates: u32,
}

impl System for Counter {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn update(&mut self, _engine: &mut Engine, _dt: f32) {
        self.updates += 1;
    }
}

/// Adds a `Counter` from inside its update.
struct Spawner;

impl System for Spawner {
    fn update(&mut self, engine: &mut Engine, _dt: f32) {
        if engine.get_system::<Counter>().is_none() {
            engine.add_system(Counter {
                priority: 1,
                updates: 0,
            });
        }
    }
}

// -- Tests ------------------------------------------------------------------

#[test]
fn family_excluding_c_contains_only_e1() {
    init_tracing();
    let mut engine = Engine::new();
    let family = engine.family(Family::all::<(A, B)>().exclude::<(C,)>());

    let e1 = engine.create_entity();
    engine.entity_mut(e1).unwrap().add(A).add(B);
    let e2 = engine.create_entity();
    engine.entity_mut(e2).unwrap().add(A).add(B).add(C);
    engine.add_entity(e1).unwrap();
    engine.add_entity(e2).unwrap();

    let view = engine.get_entities_for(&family);
    assert_eq!(engine.view(view), &[e1]);

    // Same family built again resolves to the same view.
    let again = engine.family(Family::all::<(A, B)>().exclude::<(C,)>());
    assert_eq!(again.index(), family.index());
    assert_eq!(engine.get_entities_for(&again), view);

    engine.entity_mut(e2).unwrap().remove::<C>();
    assert_eq!(engine.view(view), &[e1, e2]);
}

#[test]
fn listeners_fire_in_priority_order() {
    init_tracing();
    let log: Log = Rc::default();
    let mut engine = Engine::new();
    let family = engine.family(Family::all::<(A,)>());
    engine.add_entity_listener(&family, 0, recorder("L1", &log));
    engine.add_entity_listener(&family, 5, recorder("L2", &log));
    engine.add_entity_listener(&family, 0, recorder("L3", &log));

    let e = engine.create_entity();
    engine.entity_mut(e).unwrap().add(A);
    engine.add_entity(e).unwrap();
    assert_eq!(log_of(&log), ["+L1", "+L3", "+L2"]);

    log.borrow_mut().clear();
    engine.entity_mut(e).unwrap().remove::<A>();
    assert_eq!(log_of(&log), ["-L1", "-L3", "-L2"]);
}

#[test]
fn empty_family_listener_sees_every_entity() {
    init_tracing();
    let log: Log = Rc::default();
    let mut engine = Engine::new();
    let everything = engine.family(Family::all::<()>());
    let id = engine.add_entity_listener(&everything, 0, recorder("all", &log));

    let plain = engine.create_entity();
    let tagged = engine.create_entity();
    engine.entity_mut(tagged).unwrap().add(C);
    engine.add_entity(plain).unwrap();
    engine.add_entity(tagged).unwrap();
    engine.remove_all_entities();
    assert_eq!(log_of(&log), ["+all", "+all", "-all", "-all"]);

    assert!(engine.remove_entity_listener(id).is_some());
    engine.add_entity(plain).unwrap();
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn destroyed_entity_id_goes_stale() {
    init_tracing();
    let mut engine = Engine::new();
    let family = engine.family(Family::all::<(A,)>());
    let view = engine.get_entities_for(&family);

    let e = engine.create_entity();
    engine.entity_mut(e).unwrap().add(A);
    engine.add_entity(e).unwrap();
    assert_eq!(engine.view(view).len(), 1);

    let entity = engine.destroy_entity(e).unwrap();
    assert!(entity.has_component::<A>());
    assert!(engine.view(view).is_empty());
    assert!(engine.entity(e).is_none());
    assert!(matches!(engine.add_entity(e), Err(EcsError::StaleEntity { .. })));
}

#[test]
fn self_removal_defers_hook_until_update_returns() {
    init_tracing();
    let log: Log = Rc::default();
    let sys_log: Log = Rc::default();
    let mut engine = Engine::new();
    engine.add_system_listener(Box::new(SystemLog {
        log: Rc::clone(&sys_log),
        fail_on_remove: false,
    }));
    engine.add_system(SelfRemoving {
        log: Rc::clone(&log),
    });

    engine.update(0.016);
    assert_eq!(
        log_of(&log),
        ["hook:added", "update:start", "update:end", "hook:removed"]
    );
    assert_eq!(log_of(&sys_log), ["added:7", "removed:7"]);
    assert!(engine.get_systems().is_empty());

    // Not registered any more: the next update does nothing.
    engine.update(0.016);
    assert_eq!(log.borrow().len(), 4);
}

#[test]
fn system_added_during_update_is_registered() {
    init_tracing();
    let mut engine = Engine::new();
    engine.add_system(Spawner);
    engine.update(0.016);
    assert!(engine.get_system::<Counter>().is_some());

    engine.update(0.016);
    let updates = engine.get_system::<Counter>().unwrap().updates;
    assert!((1..=2).contains(&updates));
}

#[test]
fn remove_all_systems_notifies_listeners() {
    init_tracing();
    let sys_log: Log = Rc::default();
    let mut engine = Engine::new();
    engine.add_system(Counter {
        priority: 3,
        updates: 0,
    });
    engine.add_system(Spawner);
    let listener = engine.add_system_listener(Box::new(SystemLog {
        log: Rc::clone(&sys_log),
        fail_on_remove: true,
    }));

    engine.remove_all_systems();
    assert_eq!(log_of(&sys_log), ["removed:0", "removed:3"]);
    assert_eq!(engine.listener_failures(), 2);
    assert!(engine.get_systems().is_empty());

    assert!(engine.remove_system_listener(listener).is_some());
    engine.add_system(Spawner);
    assert_eq!(sys_log.borrow().len(), 2);
}

#[test]
fn failing_entity_listener_is_counted() {
    struct Grumpy;
    impl EntityListener for Grumpy {
        fn entity_added(&mut self, _entity: &Entity) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("no thanks"))
        }
    }

    init_tracing();
    let log: Log = Rc::default();
    let mut engine = Engine::new();
    let family = engine.family(Family::all::<(B,)>());
    engine.add_entity_listener(&family, -1, Box::new(Grumpy));
    engine.add_entity_listener(&family, 0, recorder("ok", &log));

    for _ in 0..3 {
        let e = engine.create_entity();
        engine.entity_mut(e).unwrap().add(B);
        engine.add_entity(e).unwrap();
    }
    assert_eq!(engine.listener_failures(), 3);
    assert_eq!(log.borrow().len(), 3);
}
