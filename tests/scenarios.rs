//! End-to-end page scenarios against an in-memory store, display and clock

use coffee_rs::storage::{MugOwner, SqliteStore, Store};
use coffee_rs::system::{ManualClock, SimulatedSystem, UiConfig};
use coffee_rs::ui::{AnimationTiming, AppSession, Lcd, MemoryDisplay, Page};
use embassy_time::Duration;
use std::sync::Arc;

struct Appliance {
    session: AppSession<MemoryDisplay>,
    store: Arc<SqliteStore>,
    clock: ManualClock,
}

impl Appliance {
    fn new() -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let clock = ManualClock::new();
        let timing = AnimationTiming {
            scroll_interval: std::time::Duration::from_secs(60),
            blink_interval: std::time::Duration::from_secs(60),
        };
        let lcd = Lcd::new(MemoryDisplay::new(16, 2), timing).unwrap();
        let mut session = AppSession::new(
            lcd,
            store.clone(),
            Arc::new(SimulatedSystem::new("192.168.1.20")),
            Arc::new(clock.clone()),
            UiConfig::default(),
        );
        session.start().unwrap();
        Self {
            session,
            store,
            clock,
        }
    }

    fn wait_ms(&self, ms: u64) {
        self.clock.advance(Duration::from_millis(ms));
    }

    fn top_line(&mut self) -> String {
        self.session.with_display(|d| d.row_text(0)).unwrap()
    }
}

#[test]
fn test_person_summary_and_back() {
    let mut app = Appliance::new();
    app.session.person_pressed(3).unwrap();
    assert_eq!(app.session.page(), &Page::PersonSummary { button_id: 3 });
    assert_eq!(app.top_line(), "3:");

    app.session.cancel().unwrap();
    assert_eq!(app.session.page(), &Page::Home);
    assert_eq!(app.top_line(), "Retour ...");
}

#[test]
fn test_mug_split_between_two_people() {
    let mut app = Appliance::new();
    app.session.mug_served(120.0).unwrap();
    assert!(matches!(
        app.session.page(),
        Page::MugAttribution { mug_weight: Some(w), persons } if *w == 120.0 && persons.is_empty()
    ));

    app.session.person_pressed(1).unwrap();
    app.session.person_pressed(2).unwrap();
    app.session.confirm().unwrap();
    assert_eq!(app.session.page(), &Page::Home);
    assert_eq!(app.top_line(), "OK !");

    for button_id in [1, 2] {
        let mugs = app.store.get_mugs(&MugOwner::Button(button_id), true).unwrap();
        assert_eq!(mugs.len(), 1);
        assert!((mugs[0].volume_ml - 60.0).abs() < 1e-9);
    }
}

#[test]
fn test_name_a_button() {
    let mut app = Appliance::new();
    app.session.rotate(true).unwrap();
    app.session.confirm().unwrap();
    assert_eq!(app.top_line(), "Quel bouton ?");

    app.session.person_pressed(5).unwrap();
    app.session.confirm().unwrap(); // A
    app.session.rotate(true).unwrap();
    app.session.confirm().unwrap(); // B
    app.session.rotate(false).unwrap(); // wraps onto the enter glyph
    app.session.confirm().unwrap();

    assert_eq!(app.session.page(), &Page::Menu { selected: 0 });
    assert_eq!(app.store.get_name(5).unwrap(), "AB");
    assert_eq!(app.top_line(), "Nom enregistre:");
}

#[test]
fn test_idle_mug_page_commits_itself() {
    let mut app = Appliance::new();
    app.session.mug_served(200.0).unwrap();
    app.session.person_pressed(7).unwrap();

    app.wait_ms(4_999);
    app.session.check_timeout().unwrap();
    assert!(matches!(app.session.page(), Page::MugAttribution { .. }));

    app.wait_ms(1);
    app.session.check_timeout().unwrap();
    assert_eq!(app.session.page(), &Page::Home);
    assert!(!app.session.is_display_on());

    let totals = app.store.get_totals().unwrap();
    assert_eq!(totals.count, 1);
    assert!((totals.volume_ml - 200.0).abs() < 1e-9);
}

#[test]
fn test_menu_rotation_round_trip() {
    let mut app = Appliance::new();
    app.session.rotate(true).unwrap();
    for clockwise in [false, true, true, false] {
        app.session.rotate(clockwise).unwrap();
    }
    assert_eq!(app.session.page(), &Page::Menu { selected: 0 });
}

#[test]
fn test_repeated_timeout_checks_without_time_passing() {
    let mut app = Appliance::new();
    app.session.rotate(true).unwrap();
    for _ in 0..5 {
        app.session.check_timeout().unwrap();
    }
    assert_eq!(app.session.page(), &Page::Menu { selected: 0 });
    assert!(app.session.is_display_on());
}

#[test]
fn test_pour_while_pot_away_then_weighed() {
    let mut app = Appliance::new();
    app.session.pot_removed().unwrap();
    assert_eq!(app.top_line(), "Service...");
    app.session.person_pressed(4).unwrap();

    app.session.mug_served(150.0).unwrap();
    app.session.confirm().unwrap();

    let mugs = app.store.get_mugs(&MugOwner::Button(4), false).unwrap();
    assert_eq!(mugs.len(), 1);
    assert!((mugs[0].volume_ml - 150.0).abs() < 1e-9);
}
