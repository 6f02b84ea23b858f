//! State machine scenarios against a scripted screen

use super::states::instantiate_with_timeout;
use super::test_support::*;
use super::types::{AutomationEvent, BattleKind, Continuation, StateKind, StateSpec};
use super::params::ParamValue;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

fn enter(harness: &mut Harness, spec: StateSpec) {
    harness.bot.set_state(spec);
    harness.input.take();
}

fn enter_with_timeout(harness: &mut Harness, spec: StateSpec, timeout: Duration) {
    harness.bot.enter(instantiate_with_timeout(spec, timeout));
    harness.input.take();
}

#[test]
fn test_start_binds_loads_and_enters_init() {
    let mut harness = Harness::new();
    assert_eq!(harness.bot.current_state(), Some(StateKind::Init));
    assert_eq!(harness.bot.templates().len(), ALL_KEYS.len());
    assert_eq!(harness.screen.binds(), 1);

    let events = harness.drain_events();
    assert!(events.contains(&AutomationEvent::StateChanged(StateKind::Init)));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, AutomationEvent::Log(line) if line.contains("loaded 18 templates")))
    );
}

#[test]
fn test_start_without_window_fails() {
    let screen = ScriptedScreen::new();
    screen.close_window();
    let (sink, _events) = super::channels::create_automation_channels();
    let config = super::fsm::BotConfig {
        title: "Maze".into(),
        templates_dir: "./no-templates".into(),
        debug: false,
    };
    let mut bot = super::fsm::MazeBot::new(
        config,
        screen,
        RecordingInput::default(),
        sink,
        super::params::ParamMap::new,
    );
    let err = bot.start().unwrap_err();
    assert!(err.is_window_not_found());
    assert_eq!(bot.current_state(), None);
}

#[test]
fn test_missing_template_dir_is_reported_and_bot_continues() {
    let screen = ScriptedScreen::new();
    let (sink, mut events) = super::channels::create_automation_channels();
    let config = super::fsm::BotConfig {
        title: "Maze".into(),
        templates_dir: "./definitely-missing-templates".into(),
        debug: false,
    };
    let mut bot = super::fsm::MazeBot::new(
        config,
        screen,
        RecordingInput::default(),
        sink,
        super::params::ParamMap::new,
    );
    bot.start().unwrap();
    assert!(bot.templates().is_empty());
    assert_eq!(bot.current_state(), Some(StateKind::Init));

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        saw_error |= matches!(event, AutomationEvent::Error(line) if line.contains("not found"));
    }
    assert!(saw_error);
}

#[test]
fn test_init_rebinds_and_presses_next() {
    let mut harness = Harness::new();
    harness.screen.show(Scene::new().with("btn_next", 300, 250));

    assert_eq!(harness.bot.step().unwrap(), None);
    assert_eq!(harness.screen.binds(), 2);
    assert_eq!(harness.input.take(), vec![center_of(300, 250)]);

    // Re-binding only happens on entry
    harness.screen.show(Scene::new().with("btn_explore", 100, 200));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Prepare));
    assert_eq!(harness.screen.binds(), 2);
}

#[test]
fn test_init_triage_destinations() {
    let cases = [
        ("tag_select", StateKind::Prepare),
        ("title_route", StateKind::RouteSelection),
        (
            "btn_route_confirm",
            StateKind::RouteConfirmation {
                battle: BattleKind::Standard,
            },
        ),
        ("btn_battle_skip", StateKind::Battle(BattleKind::Standard)),
        ("title_relic", StateKind::RelicSelection),
    ];
    for (key, expected) in cases {
        let mut harness = Harness::new();
        harness.screen.show(Scene::new().with(key, 150, 120));
        assert_eq!(harness.bot.step().unwrap(), Some(expected), "{key}");
        assert!(harness.input.clicks().is_empty());
    }
}

#[test]
fn test_init_times_out_to_route_selection() {
    let mut harness = Harness::new();
    enter_with_timeout(&mut harness, StateSpec::to(StateKind::Init), Duration::ZERO);
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
    assert!(harness.input.clicks().is_empty());
}

#[test]
fn test_prepare_explores_then_confirms() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Prepare));

    harness.screen.show(Scene::new().with("btn_explore", 100, 200));
    assert_eq!(harness.bot.step().unwrap(), None);
    assert_eq!(harness.input.take(), vec![center_of(100, 200)]);

    // Explore is only pressed once
    assert_eq!(harness.bot.step().unwrap(), None);
    assert!(harness.input.take().is_empty());

    harness.screen.show(Scene::new().with("btn_explore_confirm", 300, 250));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
    assert_eq!(harness.input.take(), vec![center_of(300, 250)]);
}

#[test]
fn test_route_priority_beats_score() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::RouteSelection));

    // event_shop is an exact copy, event_boss only a close one, but boss
    // comes first in the priority list
    harness.screen.show(
        Scene::new()
            .with("title_route", 150, 10)
            .with_degraded("event_boss", 40, 100)
            .with("event_shop", 120, 100),
    );

    assert_eq!(
        harness.bot.step().unwrap(),
        Some(StateKind::RouteConfirmation {
            battle: BattleKind::Boss
        })
    );
    assert_eq!(harness.input.take(), vec![center_of(40, 100)]);
}

#[test]
fn test_route_custom_priority() {
    let params = [(
        "event_priority".to_string(),
        ParamValue::from("event_shop,event_boss"),
    )]
    .into_iter()
    .collect();
    let mut harness = Harness::with_params(params);
    enter(&mut harness, StateSpec::to(StateKind::RouteSelection));

    harness.screen.show(
        Scene::new()
            .with("title_route", 150, 10)
            .with("event_boss", 40, 100)
            .with("event_shop", 120, 100),
    );
    assert_eq!(
        harness.bot.step().unwrap(),
        Some(StateKind::RouteConfirmation {
            battle: BattleKind::Standard
        })
    );
    assert_eq!(harness.input.take(), vec![center_of(120, 100)]);
}

#[test]
fn test_route_second_pass_widens_region() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::RouteSelection));

    // x = 240 is right of the first pass region (ends at 224) but inside
    // the widened one (ends at 272)
    harness.screen.show(
        Scene::new()
            .with("title_route", 150, 10)
            .with("event_battle", 240, 100),
    );
    assert_eq!(
        harness.bot.step().unwrap(),
        Some(StateKind::RouteConfirmation {
            battle: BattleKind::Standard
        })
    );
    assert_eq!(harness.input.take(), vec![center_of(240, 100)]);
}

#[test]
fn test_route_waits_when_nothing_is_eligible() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::RouteSelection));

    // Far right of the map is never searched
    harness.screen.show(
        Scene::new()
            .with("title_route", 150, 10)
            .with("event_boss", 350, 100),
    );
    assert_eq!(harness.bot.step().unwrap(), None);
    assert!(harness.input.clicks().is_empty());
}

#[test]
fn test_route_selection_delegates_off_screen() {
    let cases = [
        ("btn_battle_skip", StateKind::Battle(BattleKind::Standard)),
        ("title_relic", StateKind::RelicSelection),
        (
            "btn_route_confirm",
            StateKind::RouteConfirmation {
                battle: BattleKind::Standard,
            },
        ),
        ("btn_shop_skip", StateKind::Init),
    ];
    for (key, expected) in cases {
        let mut harness = Harness::new();
        enter(&mut harness, StateSpec::to(StateKind::RouteSelection));
        harness.screen.show(Scene::new().with(key, 200, 150));
        assert_eq!(harness.bot.step().unwrap(), Some(expected), "{key}");
    }
}

#[test]
fn test_route_confirmation_carries_battle_kind() {
    let mut harness = Harness::new();
    enter(
        &mut harness,
        StateSpec::to(StateKind::RouteConfirmation {
            battle: BattleKind::Boss,
        }),
    );
    harness.screen.show(Scene::new().with("btn_route_confirm", 200, 200));

    assert_eq!(
        harness.bot.step().unwrap(),
        Some(StateKind::Battle(BattleKind::Boss))
    );
    assert_eq!(harness.input.take(), vec![center_of(200, 200)]);
}

#[test]
fn test_battle_double_clicks_skip() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Battle(BattleKind::Standard)));
    harness.screen.show(Scene::new().with("btn_battle_skip", 330, 20));

    assert_eq!(harness.bot.step().unwrap(), None);
    let skip = center_of(330, 20);
    assert_eq!(harness.input.take(), vec![skip, skip]);
}

#[test]
fn test_battle_taps_through_intro() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Battle(BattleKind::Standard)));

    assert_eq!(harness.bot.step().unwrap(), None);
    // 0.94 * 400 = 376; 0.10, 0.112, 0.113 of 300 = 30, 33, 33
    assert_eq!(
        harness.input.take(),
        vec![ORIGIN.offset(376, 30), ORIGIN.offset(376, 33), ORIGIN.offset(376, 33)]
    );
}

#[test]
fn test_boss_chain_runs_through_shop_and_support() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Battle(BattleKind::Boss)));

    harness.screen.show(Scene::new().with("btn_next", 300, 250));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RelicSelection));
    assert_eq!(harness.input.take(), vec![center_of(300, 250)]);

    // No diamond: leftmost card at (0.20, 0.62)
    harness.screen.show(Scene::new());
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Shop));
    assert_eq!(harness.input.take(), vec![ORIGIN.offset(80, 186)]);

    harness.screen.show(Scene::new().with("btn_shop_skip", 300, 250));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Support));
    assert_eq!(harness.input.take(), vec![center_of(300, 250)]);

    harness.screen.show(Scene::new().with("btn_next", 300, 250));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
    assert_eq!(harness.input.take(), vec![center_of(300, 250)]);
}

#[test]
fn test_standard_battle_returns_to_route_after_relic() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Battle(BattleKind::Standard)));

    harness.screen.show(Scene::new().with("btn_next", 300, 250));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RelicSelection));

    harness.screen.show(Scene::new().with("relic_diamond", 200, 100));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
    assert_eq!(harness.input.take(), vec![center_of(300, 250), center_of(200, 100)]);
}

#[test]
fn test_relic_with_empty_chain_picks_and_waits() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::RelicSelection));

    assert_eq!(harness.bot.step().unwrap(), None);
    assert_eq!(harness.input.take(), vec![ORIGIN.offset(80, 186)]);

    // Inside the cooldown nothing is clicked
    assert_eq!(harness.bot.step().unwrap(), None);
    assert!(harness.input.take().is_empty());
    assert_eq!(harness.bot.current_state(), Some(StateKind::RelicSelection));

    harness.screen.show(Scene::new().with("title_route", 150, 10));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
}

#[test]
fn test_relic_watchdog_goes_to_init() {
    let mut harness = Harness::new();
    enter_with_timeout(
        &mut harness,
        StateSpec::with_after(StateKind::RelicSelection, BattleKind::Boss.post_chain()),
        Duration::ZERO,
    );
    harness.drain_events();
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Init));
    let events = harness.drain_events();
    assert!(events.contains(&AutomationEvent::Log("[RELIC] watchdog -> Init".into())));
}

#[test]
fn test_shop_blind_clicks_then_pops_chain_on_timeout() {
    let mut harness = Harness::new();
    let after = Continuation::from([StateKind::Support, StateKind::RouteSelection]);
    enter_with_timeout(
        &mut harness,
        StateSpec::with_after(StateKind::Shop, after),
        Duration::from_millis(300),
    );

    // (0.72, 0.82, 0.98, 0.98) on 400x300 spans x 288..392, y 245..294
    let blind = ORIGIN.offset(340, 269);
    assert_eq!(harness.bot.step().unwrap(), None);
    assert_eq!(harness.bot.step().unwrap(), None);
    assert_eq!(harness.input.take(), vec![blind, blind]);

    std::thread::sleep(Duration::from_millis(350));
    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Support));
    assert!(harness.input.take().is_empty());
}

#[test]
fn test_run_stops_and_reports() {
    let snapshots = Rc::new(Cell::new(0));
    let counter = snapshots.clone();
    let screen = ScriptedScreen::new();
    let (sink, mut events) = super::channels::create_automation_channels();
    let config = super::fsm::BotConfig {
        title: "Maze".into(),
        templates_dir: "./definitely-missing-templates".into(),
        debug: false,
    };
    let stop = super::channels::StopHandle::new();
    let stop_from_provider = stop.clone();
    let mut bot = super::fsm::MazeBot::new(
        config,
        screen.clone(),
        RecordingInput::default(),
        sink,
        move || {
            counter.set(counter.get() + 1);
            // Ask to stop on the first loop iteration
            if counter.get() >= 2 {
                stop_from_provider.request_stop();
            }
            super::params::ParamMap::new()
        },
    )
    .with_stop_handle(stop);

    bot.run().unwrap();

    // Once in start, once at the top of the loop
    assert_eq!(snapshots.get(), 2);
    assert_eq!(screen.binds(), 1);

    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(AutomationEvent::Stopped));
}

#[test]
fn test_run_surfaces_bind_failure() {
    let screen = ScriptedScreen::new();
    screen.close_window();
    let (sink, mut events) = super::channels::create_automation_channels();
    let config = super::fsm::BotConfig {
        title: "Maze".into(),
        templates_dir: "./templates".into(),
        debug: false,
    };
    let mut bot = super::fsm::MazeBot::new(
        config,
        screen,
        RecordingInput::default(),
        sink,
        super::params::ParamMap::new,
    );

    assert!(bot.run().unwrap_err().is_window_not_found());
    let mut collected = Vec::new();
    while let Ok(event) = events.try_recv() {
        collected.push(event);
    }
    assert!(matches!(collected.first(), Some(AutomationEvent::Error(_))));
    assert_eq!(collected.last(), Some(&AutomationEvent::Stopped));
}

#[test]
fn test_stop_interrupts_intro_taps() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Battle(BattleKind::Standard)));
    harness.bot.stop_handle().request_stop();

    assert_eq!(harness.bot.step().unwrap(), None);
    assert!(harness.input.clicks().is_empty());
}

#[test]
fn test_start_clears_an_earlier_stop() {
    let mut harness = Harness::new();
    harness.bot.stop();
    assert!(harness.bot.stop_handle().is_stop_requested());

    harness.bot.start().unwrap();
    assert!(!harness.bot.stop_handle().is_stop_requested());
    assert_eq!(harness.bot.current_state(), Some(StateKind::Init));
}

#[test]
fn test_prepare_follows_route_title() {
    let mut harness = Harness::new();
    enter(&mut harness, StateSpec::to(StateKind::Prepare));
    harness.screen.show(Scene::new().with("title_route", 150, 10));

    assert_eq!(harness.bot.step().unwrap(), Some(StateKind::RouteSelection));
    assert!(harness.input.clicks().is_empty());
}

#[test]
fn test_route_confirmation_short_circuits() {
    let cases = [
        ("btn_battle_skip", StateKind::Battle(BattleKind::Boss)),
        ("title_relic", StateKind::RelicSelection),
    ];
    for (key, expected) in cases {
        let mut harness = Harness::new();
        enter(
            &mut harness,
            StateSpec::to(StateKind::RouteConfirmation {
                battle: BattleKind::Boss,
            }),
        );
        harness.screen.show(Scene::new().with(key, 330, 20));
        assert_eq!(harness.bot.step().unwrap(), Some(expected), "{key}");
        assert!(harness.input.clicks().is_empty(), "{key}");
    }
}

#[test]
fn test_relic_returns_to_battle_on_skip_button() {
    let mut harness = Harness::new();
    enter(
        &mut harness,
        StateSpec::with_after(StateKind::RelicSelection, BattleKind::Boss.post_chain()),
    );
    harness.screen.show(Scene::new().with("btn_battle_skip", 330, 20));

    assert_eq!(
        harness.bot.step().unwrap(),
        Some(StateKind::Battle(BattleKind::Standard))
    );
    assert!(harness.input.clicks().is_empty());
}

#[test]
fn test_watchdogs_fall_back_to_init() {
    let kinds = [
        StateKind::Prepare,
        StateKind::RouteSelection,
        StateKind::RouteConfirmation {
            battle: BattleKind::Standard,
        },
        StateKind::Battle(BattleKind::Boss),
    ];
    for kind in kinds {
        let mut harness = Harness::new();
        enter_with_timeout(&mut harness, StateSpec::to(kind), Duration::ZERO);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(harness.bot.step().unwrap(), Some(StateKind::Init), "{kind}");
        assert!(harness.input.clicks().is_empty(), "{kind}");
    }
}
