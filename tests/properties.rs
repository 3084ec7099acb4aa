//! Property tests for the loop core

use glam::Vec2;
use proptest::prelude::*;

use arcade_loop::Settings;
use arcade_loop::consts::STEP_MS;
use arcade_loop::games::{Asteroids, Snake};
use arcade_loop::persistence::MemorySink;
use arcade_loop::sim::{
    Category, Command, Direction, EdgePolicy, EntityStore, GamePhase, Motion, Playfield,
    Scheduler, Session, Shape, Spawn, first_contacts,
};
use arcade_loop::tuning::{Difficulty, LinearCurve};
use arcade_loop::wrap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Shot,
    Target,
}

impl Category for Kind {
    fn cap(self) -> Option<usize> {
        match self {
            Kind::Shot => Some(8),
            Kind::Target => None,
        }
    }

    fn motion(self) -> Motion {
        Motion::Free
    }

    fn edge(self) -> EdgePolicy {
        EdgePolicy::Wrap
    }
}

fn run_chunks(scheduler: &mut Scheduler, chunks: &[f64]) -> u64 {
    for &chunk in chunks {
        for _ in 0..scheduler.accumulate(chunk) {
            scheduler.consume_tick();
        }
    }
    scheduler.ticks()
}

fn curves() -> Vec<LinearCurve> {
    vec![
        LinearCurve::asteroids(),
        LinearCurve::breakout(),
        LinearCurve::flappy(),
        LinearCurve::invaders(),
        LinearCurve::snake(),
        LinearCurve::tetris(),
        LinearCurve::frogger(),
        LinearCurve::pong(),
    ]
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Fire),
        Just(Command::Pause),
        Just(Command::Reset),
        Just(Command::Start),
        prop::sample::select(Direction::ALL.to_vec()).prop_map(|dir| Command::Move { dir, active: true }),
    ]
}

proptest! {
    #[test]
    fn prop_chunking_does_not_change_tick_count(chunks in prop::collection::vec(0u32..=40, 0..6)) {
        let chunks: Vec<f64> = chunks.into_iter().map(f64::from).collect();
        let total: f64 = chunks.iter().sum();

        let mut many = Scheduler::default();
        let mut one = Scheduler::default();
        prop_assert_eq!(run_chunks(&mut many, &chunks), run_chunks(&mut one, &[total]));
        prop_assert!(many.accumulator_ms() < STEP_MS);
    }

    #[test]
    fn prop_population_never_exceeds_cap(requests in 0usize..40) {
        let mut store: EntityStore<Kind, ()> = EntityStore::new();
        let mut accepted = 0;
        for i in 0..requests {
            let spawn = Spawn::new(Vec2::new(i as f32, 0.0), Vec2::X, Shape::Point, ());
            if store.spawn(Kind::Shot, spawn).is_some() {
                accepted += 1;
            }
        }
        prop_assert_eq!(accepted, requests.min(8));
        prop_assert!(store.count(Kind::Shot) <= 8);
    }

    #[test]
    fn prop_wrap_lands_in_field(value in -1.0e6f32..1.0e6, max in 1.0f32..2000.0) {
        let wrapped = wrap(value, max);
        prop_assert!((0.0..max).contains(&wrapped));
    }

    #[test]
    fn prop_wrapped_entities_stay_inside(
        start in (0.0f32..100.0, 0.0f32..100.0),
        vel in (-500.0f32..500.0, -500.0f32..500.0),
        ticks in 1usize..200,
    ) {
        let field = Playfield::new(100.0, 100.0);
        let mut store: EntityStore<Kind, ()> = EntityStore::new();
        store.spawn(
            Kind::Target,
            Spawn::new(Vec2::new(start.0, start.1), Vec2::new(vel.0, vel.1), Shape::Point, ()),
        );
        for _ in 0..ticks {
            store.advance(STEP_MS, &field);
        }
        for e in store.iter() {
            prop_assert!(e.pos.x >= 0.0 && e.pos.x < field.width);
            prop_assert!(e.pos.y >= 0.0 && e.pos.y < field.height);
        }
    }

    #[test]
    fn prop_each_entity_in_at_most_one_contact(
        shots in prop::collection::vec((0.0f32..60.0, 0.0f32..60.0), 0..8),
        targets in prop::collection::vec((0.0f32..60.0, 0.0f32..60.0, 2.0f32..20.0), 0..12),
    ) {
        let mut store: EntityStore<Kind, ()> = EntityStore::new();
        for (x, y) in shots {
            store.spawn(Kind::Shot, Spawn::new(Vec2::new(x, y), Vec2::ZERO, Shape::Point, ()));
        }
        for (x, y, radius) in targets {
            store.spawn(
                Kind::Target,
                Spawn::new(Vec2::new(x, y), Vec2::ZERO, Shape::Circle { radius }, ()),
            );
        }

        let contacts = first_contacts(&store, Kind::Shot, Kind::Target);
        let mut seen = Vec::new();
        for contact in &contacts {
            prop_assert!(!seen.contains(&contact.a));
            prop_assert!(!seen.contains(&contact.b));
            seen.push(contact.a);
            seen.push(contact.b);
        }
    }

    #[test]
    fn prop_difficulty_never_eases(level in 1u32..200) {
        for curve in curves() {
            let now = curve.params(level);
            let next = curve.params(level + 1);
            prop_assert!(next.speed_scale >= now.speed_scale);
            prop_assert!(next.population >= now.population);
            prop_assert!(next.spawn_interval_ms <= now.spawn_interval_ms);
            prop_assert!(next.hostile_cap >= now.hostile_cap);
            prop_assert!(next.size_scale <= now.size_scale);
        }
    }

    #[test]
    fn prop_pause_pairs_cancel(pauses in 0usize..6, elapsed in 0.0f64..100.0) {
        let mut session = Session::new(Snake::new(), &Settings::default(), Box::new(MemorySink::new()));
        session.push(Command::Start);
        session.frame(0.0);
        prop_assert_eq!(session.phase(), GamePhase::Running);

        for _ in 0..pauses {
            session.push(Command::Pause);
        }
        let ran = session.frame(elapsed);
        if pauses % 2 == 0 {
            prop_assert_eq!(session.phase(), GamePhase::Running);
        } else {
            prop_assert_eq!(session.phase(), GamePhase::Paused);
            prop_assert_eq!(ran, 0);
        }
    }

    #[test]
    fn prop_lifecycle_transitions(commands in prop::collection::vec(command(), 1..40)) {
        let mut session = Session::new(Asteroids::new(), &Settings::default(), Box::new(MemorySink::new()));
        for command in commands {
            let before = session.phase();
            session.push(command);
            session.frame(STEP_MS);
            let after = session.phase();

            if command == Command::Reset && before != GamePhase::Ready {
                prop_assert_eq!(after, GamePhase::Ready);
            }
            if before == GamePhase::GameOver && command != Command::Reset {
                prop_assert_eq!(after, GamePhase::GameOver);
            }
            if before == GamePhase::Ready && command.starts_round() {
                prop_assert_eq!(after, GamePhase::Running);
            }
        }
    }

    #[test]
    fn prop_same_seed_same_run(commands in prop::collection::vec(command(), 1..20)) {
        let run = || {
            let mut session = Session::new(Asteroids::new(), &Settings::default(), Box::new(MemorySink::new()));
            session.push(Command::Start);
            for &command in &commands {
                session.push(command);
                session.frame(4.0 * STEP_MS);
            }
            serde_json::to_string(&session.snapshot()).unwrap_or_default()
        };
        prop_assert_eq!(run(), run());
    }
}
