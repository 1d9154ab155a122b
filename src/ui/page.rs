//! Pages of the LCD interface
//! Pages: Home, Menu, NameAssignment, PersonSummary, MugAttribution, Stats, Shutdown, HostnameInfo
//!
//! Each handler gets the active page mutably and returns either
//! `Transition::Stay` or the page to switch to. Power, clearing, drawing and
//! the activity timestamp are handled by the session for every event.

use super::lcd::{Line, Screen};
use crate::storage::{MugOwner, Store};
use crate::system::config::UiConfig;
use crate::system::host::SystemControl;
use crate::types::{ButtonId, Totals, BUTTON_COUNT, ENTER_GLYPH_SLOT, NAME_MAX_LEN};
use anyhow::Result;
use chrono::{DateTime, Local};
use embassy_time::Duration;
use log::{debug, info, warn};

/// Character written for the custom "enter" glyph.
pub const ENTER: char = ENTER_GLYPH_SLOT as char;

/// Letters A to Z followed by the enter glyph.
pub const ALPHABET_LEN: usize = 27;

pub fn alphabet(index: usize) -> char {
    match index {
        0..=25 => char::from(b'A' + index as u8),
        _ => ENTER,
    }
}

fn step(index: usize, clockwise: bool, len: usize) -> usize {
    if clockwise {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEntry {
    NameButton,
    Stats,
    Hostname,
    Shutdown,
    Restart,
}

impl MenuEntry {
    pub const ALL: [MenuEntry; 5] = [
        MenuEntry::NameButton,
        MenuEntry::Stats,
        MenuEntry::Hostname,
        MenuEntry::Shutdown,
        MenuEntry::Restart,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuEntry::NameButton => "Nommer bouton",
            MenuEntry::Stats => "Stats",
            MenuEntry::Hostname => "Host name",
            MenuEntry::Shutdown => "Eteindre",
            MenuEntry::Restart => "Redemarrer",
        }
    }

    fn page(&self) -> Page {
        match self {
            MenuEntry::NameButton => Page::name_assignment(),
            MenuEntry::Stats => Page::Stats { totals: None },
            MenuEntry::Hostname => Page::HostnameInfo { address: None },
            MenuEntry::Shutdown => Page::Shutdown { restart: false },
            MenuEntry::Restart => Page::Shutdown { restart: true },
        }
    }
}

pub type PersonSet = heapless::Vec<ButtonId, BUTTON_COUNT>;

#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Home,
    Menu {
        selected: usize,
    },
    NameAssignment {
        target: Option<ButtonId>,
        name: heapless::String<NAME_MAX_LEN>,
        cursor: usize,
    },
    PersonSummary {
        button_id: ButtonId,
    },
    /// `mug_weight` is `None` while the pot is away from the scale.
    MugAttribution {
        mug_weight: Option<f32>,
        persons: PersonSet,
    },
    Stats {
        totals: Option<Totals>,
    },
    Shutdown {
        restart: bool,
    },
    HostnameInfo {
        address: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Stay,
    To(Page),
}

/// Transient text shown over the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub top: String,
    pub bottom: Option<String>,
    pub duration: Duration,
}

impl Message {
    pub fn screen(&self) -> Screen {
        Screen::Lines {
            top: Line::Static(self.top.clone()),
            bottom: self
                .bottom
                .clone()
                .map(Line::Static)
                .unwrap_or(Line::Empty),
        }
    }
}

/// Collaborators and side channels available to page handlers.
pub struct PageContext<'a> {
    pub store: &'a dyn Store,
    pub system: &'a dyn SystemControl,
    pub config: &'a UiConfig,
    /// Wall-clock time of the event, stored with new records.
    pub timestamp: DateTime<Local>,
    message: Option<Message>,
    shutdown: Option<bool>,
}

impl<'a> PageContext<'a> {
    pub fn new(
        store: &'a dyn Store,
        system: &'a dyn SystemControl,
        config: &'a UiConfig,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            store,
            system,
            config,
            timestamp,
            message: None,
            shutdown: None,
        }
    }

    pub fn show_message(&mut self, top: &str, bottom: Option<&str>, duration_ms: u64) {
        info!("{}", top);
        self.message = Some(Message {
            top: top.to_string(),
            bottom: bottom.map(str::to_string),
            duration: Duration::from_millis(duration_ms),
        });
    }

    pub fn request_shutdown(&mut self, restart: bool) {
        self.shutdown = Some(restart);
    }

    pub fn take_message(&mut self) -> Option<Message> {
        self.message.take()
    }

    pub fn take_shutdown(&mut self) -> Option<bool> {
        self.shutdown.take()
    }
}

impl Page {
    pub fn name_assignment() -> Self {
        Page::NameAssignment {
            target: None,
            name: heapless::String::new(),
            cursor: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Menu { .. } => "Menu",
            Page::NameAssignment { .. } => "NameAssignment",
            Page::PersonSummary { .. } => "PersonSummary",
            Page::MugAttribution { .. } => "MugAttribution",
            Page::Stats { .. } => "Stats",
            Page::Shutdown { .. } => "Shutdown",
            Page::HostnameInfo { .. } => "HostnameInfo",
        }
    }

    pub fn is_home(&self) -> bool {
        matches!(self, Page::Home)
    }

    /// A poured mug waiting for its persons.
    pub fn is_weighed_attribution(&self) -> bool {
        matches!(
            self,
            Page::MugAttribution {
                mug_weight: Some(_),
                ..
            }
        )
    }

    /// Inactivity window before falling back to Home.
    pub fn timeout(&self, config: &UiConfig) -> Duration {
        match self {
            Page::MugAttribution { .. } => Duration::from_millis(config.mug_timeout_ms),
            Page::Stats { .. } | Page::HostnameInfo { .. } => {
                Duration::from_millis(config.info_timeout_ms)
            }
            _ => config.default_timeout(),
        }
    }

    /// Runs once when the page becomes active, before its first draw.
    pub fn enter(&mut self, ctx: &mut PageContext) -> Result<()> {
        match self {
            Page::Stats { totals } => {
                *totals = Some(ctx.store.get_totals()?);
            }
            Page::HostnameInfo { address } => {
                let shown = ctx.system.hostname().unwrap_or_else(|e| {
                    warn!("Hostname lookup failed: {:#}", e);
                    "Erreur".to_string()
                });
                *address = Some(shown);
            }
            Page::Shutdown { restart } => ctx.request_shutdown(*restart),
            _ => {}
        }
        Ok(())
    }

    pub fn rotate(&mut self, clockwise: bool, _ctx: &mut PageContext) -> Result<Transition> {
        match self {
            Page::Home => Ok(Transition::To(Page::Menu { selected: 0 })),
            Page::Menu { selected } => {
                *selected = step(*selected, clockwise, MenuEntry::ALL.len());
                Ok(Transition::Stay)
            }
            Page::NameAssignment { cursor, .. } => {
                *cursor = step(*cursor, clockwise, ALPHABET_LEN);
                Ok(Transition::Stay)
            }
            _ => Ok(Transition::Stay),
        }
    }

    pub fn confirm(&mut self, ctx: &mut PageContext) -> Result<Transition> {
        match self {
            Page::Menu { selected } => {
                let entry = MenuEntry::ALL[*selected % MenuEntry::ALL.len()];
                Ok(Transition::To(entry.page()))
            }
            Page::NameAssignment {
                target,
                name,
                cursor,
            } => {
                let glyph = alphabet(*cursor);
                if glyph != ENTER {
                    if name.push(glyph).is_err() {
                        debug!("Name already {} characters long", NAME_MAX_LEN);
                    }
                    *cursor = 0;
                    return Ok(Transition::Stay);
                }
                let Some(button_id) = *target else {
                    debug!("Enter without a button, ignored");
                    return Ok(Transition::Stay);
                };
                if name.is_empty() {
                    debug!("Enter with an empty name, ignored");
                    return Ok(Transition::Stay);
                }
                ctx.store.add_user(button_id, name.as_str(), ctx.timestamp)?;
                ctx.show_message("Nom enregistre:", Some(name.as_str()), ctx.config.message_ms);
                Ok(Transition::To(Page::Menu { selected: 0 }))
            }
            Page::MugAttribution { .. } => self.commit_mug(ctx),
            _ => Ok(Transition::Stay),
        }
    }

    pub fn cancel(&mut self, ctx: &mut PageContext) -> Result<Transition> {
        match self {
            Page::Home | Page::Stats { .. } | Page::HostnameInfo { .. } | Page::Shutdown { .. } => {
                Ok(Transition::Stay)
            }
            Page::MugAttribution { persons, .. } => {
                if let Some(removed) = persons.pop() {
                    debug!("Removed {} from the mug", removed);
                    return Ok(Transition::Stay);
                }
                ctx.show_message("Annule tasse...", None, ctx.config.message_ms);
                Ok(Transition::To(Page::Home))
            }
            Page::Menu { .. } | Page::NameAssignment { .. } | Page::PersonSummary { .. } => {
                ctx.show_message("Retour ...", None, ctx.config.message_ms);
                Ok(Transition::To(Page::Home))
            }
        }
    }

    pub fn person_pressed(
        &mut self,
        button_id: ButtonId,
        _ctx: &mut PageContext,
    ) -> Result<Transition> {
        match self {
            Page::Home => Ok(Transition::To(Page::PersonSummary { button_id })),
            Page::NameAssignment { target, .. } => {
                *target = Some(button_id);
                Ok(Transition::Stay)
            }
            Page::PersonSummary { button_id: shown } => {
                *shown = button_id;
                Ok(Transition::Stay)
            }
            Page::MugAttribution { persons, .. } => {
                add_person(persons, button_id);
                Ok(Transition::Stay)
            }
            _ => Ok(Transition::Stay),
        }
    }

    /// The pot left the scale: a pour is starting.
    pub fn pot_removed(&mut self, ctx: &mut PageContext) -> Result<Transition> {
        if matches!(self, Page::Shutdown { .. }) {
            return Ok(Transition::Stay);
        }
        let persons = self.take_pending_persons(ctx)?;
        Ok(Transition::To(Page::MugAttribution {
            mug_weight: None,
            persons,
        }))
    }

    /// A mug was weighed. `recent` holds presses from the look-behind window.
    pub fn mug_served(
        &mut self,
        mug_weight: f32,
        recent: &[ButtonId],
        ctx: &mut PageContext,
    ) -> Result<Transition> {
        if matches!(self, Page::Shutdown { .. }) {
            return Ok(Transition::Stay);
        }
        let mut persons = self.take_pending_persons(ctx)?;
        for &button_id in recent {
            add_person(&mut persons, button_id);
        }
        if !persons.is_empty() {
            info!("Including: {:?}", persons);
        }
        Ok(Transition::To(Page::MugAttribution {
            mug_weight: Some(mug_weight),
            persons,
        }))
    }

    /// Called once the page has been idle for its timeout, before returning Home.
    pub fn on_timeout(&mut self, ctx: &mut PageContext) -> Result<()> {
        match self {
            Page::Home => Ok(()),
            Page::MugAttribution { persons, .. } => {
                if !persons.is_empty() {
                    self.commit_mug(ctx)?;
                }
                Ok(())
            }
            _ => self.cancel(ctx).map(|_| ()),
        }
    }

    /// Persons attributed while the pot was away carry over to the new pour.
    /// An open weighed attribution is committed first so it is not lost.
    fn take_pending_persons(&mut self, ctx: &mut PageContext) -> Result<PersonSet> {
        match self {
            Page::MugAttribution {
                mug_weight: None,
                persons,
            } => Ok(std::mem::take(persons)),
            Page::MugAttribution {
                mug_weight: Some(_),
                persons,
            } if !persons.is_empty() => {
                self.commit_mug(ctx)?;
                Ok(PersonSet::new())
            }
            _ => Ok(PersonSet::new()),
        }
    }

    fn commit_mug(&mut self, ctx: &mut PageContext) -> Result<Transition> {
        let Page::MugAttribution {
            mug_weight: Some(mug_weight),
            persons,
        } = self
        else {
            return Ok(Transition::To(Page::Home));
        };

        if !persons.is_empty() {
            let share = f64::from(*mug_weight) / persons.len() as f64;
            let mugs: Vec<(ButtonId, f64)> = persons.iter().map(|&id| (id, share)).collect();
            ctx.store.add_mugs(&mugs, ctx.timestamp)?;
            info!("Mug of {:.0}g split between {:?}", mug_weight, persons);
        }
        ctx.show_message("OK !", None, ctx.config.confirm_message_ms);
        Ok(Transition::To(Page::Home))
    }

    /// What the page shows. Names and statistics come from the store.
    pub fn screen(&self, store: &dyn Store) -> Result<Screen> {
        let screen = match self {
            Page::Home => Screen::text("Bonjour !"),
            Page::Menu { selected } => {
                let entry = MenuEntry::ALL[*selected % MenuEntry::ALL.len()];
                Screen::two_lines("Menu...", entry.label())
            }
            Page::NameAssignment {
                target: None, ..
            } => Screen::text("Quel bouton ?"),
            Page::NameAssignment {
                target: Some(button_id),
                name,
                cursor,
            } => Screen::two_lines(
                format!("{} - Quel nom ?", button_id),
                format!("{}{}", name, alphabet(*cursor)),
            ),
            Page::PersonSummary { button_id } => {
                let name = store.get_name(*button_id)?;
                // Unnamed buttons only have their own mugs
                let owner = if name == button_id.to_string() {
                    MugOwner::Button(*button_id)
                } else {
                    MugOwner::Name(name.clone())
                };
                let mugs = store.get_mugs(&owner, true)?;
                let count = mugs.len();
                let volume_ml: f64 = mugs.iter().map(|m| m.volume_ml).sum();
                let word = if count < 2 { "tasse" } else { "tasses" };
                Screen::Lines {
                    top: Line::Static(format!("{}:", name)),
                    bottom: Line::Scroll(format!(
                        "Ajd: {} {} - {} mL",
                        count, word, volume_ml as i64
                    )),
                }
            }
            Page::MugAttribution {
                mug_weight: None, ..
            } => Screen::Blink("Service...".to_string()),
            Page::MugAttribution {
                mug_weight: Some(mug_weight),
                persons,
            } => {
                let bottom = if persons.is_empty() {
                    Line::Empty
                } else {
                    let names = persons
                        .iter()
                        .map(|&id| store.get_name(id))
                        .collect::<Result<Vec<_>>>()?;
                    Line::Scroll(names.join(" + "))
                };
                Screen::Lines {
                    top: Line::Static(format!("{}mL - Pour ?", *mug_weight as i64)),
                    bottom,
                }
            }
            Page::Stats { totals: Some(totals) } => Screen::two_lines(
                format!("{} tasses", totals.count),
                format!("{:.2} L", totals.volume_ml * 1e-3),
            ),
            Page::Stats { totals: None } => Screen::text("Stats"),
            Page::Shutdown { restart: true } => Screen::text("Restart ..."),
            Page::Shutdown { restart: false } => Screen::text("Shutdown ..."),
            Page::HostnameInfo { address } => {
                Screen::two_lines("Hostname:", address.clone().unwrap_or_default())
            }
        };
        Ok(screen)
    }
}

fn add_person(persons: &mut PersonSet, button_id: ButtonId) {
    if persons.contains(&button_id) {
        return;
    }
    if persons.push(button_id).is_err() {
        warn!("Mug already shared by {} persons", persons.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use crate::system::host::SimulatedSystem;

    struct Fixture {
        store: SqliteStore,
        system: SimulatedSystem,
        config: UiConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: SqliteStore::open_in_memory().unwrap(),
                system: SimulatedSystem::new("192.168.1.20"),
                config: UiConfig::default(),
            }
        }

        fn ctx(&self) -> PageContext<'_> {
            PageContext::new(&self.store, &self.system, &self.config, Local::now())
        }
    }

    fn persons(ids: &[ButtonId]) -> PersonSet {
        PersonSet::from_slice(ids).unwrap()
    }

    #[test]
    fn test_home_routes() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Home;
        assert_eq!(
            page.rotate(true, &mut ctx).unwrap(),
            Transition::To(Page::Menu { selected: 0 })
        );
        assert_eq!(
            page.person_pressed(3, &mut ctx).unwrap(),
            Transition::To(Page::PersonSummary { button_id: 3 })
        );
        assert_eq!(page.confirm(&mut ctx).unwrap(), Transition::Stay);
        assert_eq!(page.cancel(&mut ctx).unwrap(), Transition::Stay);
        assert!(ctx.take_message().is_none());
    }

    #[test]
    fn test_menu_rotation_wraps_both_ways() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Menu { selected: 0 };
        page.rotate(false, &mut ctx).unwrap();
        assert_eq!(page, Page::Menu { selected: 4 });
        page.rotate(true, &mut ctx).unwrap();
        assert_eq!(page, Page::Menu { selected: 0 });

        for _ in 0..MenuEntry::ALL.len() {
            page.rotate(true, &mut ctx).unwrap();
        }
        assert_eq!(page, Page::Menu { selected: 0 });
    }

    #[test]
    fn test_menu_confirm_opens_entry() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Menu { selected: 1 };
        assert_eq!(
            page.confirm(&mut ctx).unwrap(),
            Transition::To(Page::Stats { totals: None })
        );
        let mut page = Page::Menu { selected: 4 };
        assert_eq!(
            page.confirm(&mut ctx).unwrap(),
            Transition::To(Page::Shutdown { restart: true })
        );
    }

    #[test]
    fn test_menu_cancel_returns_home_with_message() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Menu { selected: 2 };
        assert_eq!(page.cancel(&mut ctx).unwrap(), Transition::To(Page::Home));
        assert_eq!(ctx.take_message().unwrap().top, "Retour ...");
    }

    #[test]
    fn test_name_assignment_types_and_saves() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::name_assignment();

        page.person_pressed(5, &mut ctx).unwrap();
        page.confirm(&mut ctx).unwrap(); // A
        page.rotate(true, &mut ctx).unwrap();
        page.confirm(&mut ctx).unwrap(); // B
        page.rotate(false, &mut ctx).unwrap(); // wraps to the enter glyph
        assert_eq!(
            page.screen(&fx.store).unwrap(),
            Screen::two_lines("5 - Quel nom ?", format!("AB{}", ENTER))
        );

        let transition = page.confirm(&mut ctx).unwrap();
        assert_eq!(transition, Transition::To(Page::Menu { selected: 0 }));
        assert_eq!(fx.store.get_name(5).unwrap(), "AB");
        let message = ctx.take_message().unwrap();
        assert_eq!(message.top, "Nom enregistre:");
        assert_eq!(message.bottom.as_deref(), Some("AB"));
    }

    #[test]
    fn test_enter_needs_name_and_target() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::NameAssignment {
            target: Some(2),
            name: heapless::String::new(),
            cursor: ALPHABET_LEN - 1,
        };
        assert_eq!(page.confirm(&mut ctx).unwrap(), Transition::Stay);
        assert_eq!(fx.store.get_name(2).unwrap(), "2");

        let mut zoe = heapless::String::new();
        zoe.push_str("ZOE").unwrap();
        let mut page = Page::NameAssignment {
            target: None,
            name: zoe,
            cursor: ALPHABET_LEN - 1,
        };
        assert_eq!(page.confirm(&mut ctx).unwrap(), Transition::Stay);
        assert_eq!(page.screen(&fx.store).unwrap(), Screen::text("Quel bouton ?"));
    }

    #[test]
    fn test_name_is_capped() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::name_assignment();
        for _ in 0..NAME_MAX_LEN + 3 {
            page.confirm(&mut ctx).unwrap();
        }
        let Page::NameAssignment { name, .. } = &page else {
            panic!("left the page");
        };
        assert_eq!(name.len(), NAME_MAX_LEN);
    }

    #[test]
    fn test_mug_attribution_is_a_set() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(120.0),
            persons: PersonSet::new(),
        };
        page.person_pressed(1, &mut ctx).unwrap();
        page.person_pressed(2, &mut ctx).unwrap();
        page.person_pressed(1, &mut ctx).unwrap();
        assert_eq!(
            page,
            Page::MugAttribution {
                mug_weight: Some(120.0),
                persons: persons(&[1, 2]),
            }
        );
    }

    #[test]
    fn test_mug_confirm_splits_volume() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(120.0),
            persons: persons(&[1, 2]),
        };
        assert_eq!(page.confirm(&mut ctx).unwrap(), Transition::To(Page::Home));
        for id in [1, 2] {
            let mugs = fx.store.get_mugs(&MugOwner::Button(id), true).unwrap();
            assert_eq!(mugs.len(), 1);
            assert_eq!(mugs[0].volume_ml, 60.0);
        }
        assert_eq!(ctx.take_message().unwrap().top, "OK !");
    }

    #[test]
    fn test_mug_confirm_without_persons_saves_nothing() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(200.0),
            persons: PersonSet::new(),
        };
        assert_eq!(page.confirm(&mut ctx).unwrap(), Transition::To(Page::Home));
        assert_eq!(fx.store.get_totals().unwrap().count, 0);
    }

    #[test]
    fn test_mug_cancel_pops_then_leaves() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(90.0),
            persons: persons(&[4, 7]),
        };
        assert_eq!(page.cancel(&mut ctx).unwrap(), Transition::Stay);
        assert_eq!(page.cancel(&mut ctx).unwrap(), Transition::Stay);
        assert!(ctx.take_message().is_none());
        assert_eq!(page.cancel(&mut ctx).unwrap(), Transition::To(Page::Home));
        assert_eq!(ctx.take_message().unwrap().top, "Annule tasse...");
    }

    #[test]
    fn test_mug_timeout_commits_attribution() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(150.0),
            persons: persons(&[3]),
        };
        page.on_timeout(&mut ctx).unwrap();
        let totals = fx.store.get_totals().unwrap();
        assert_eq!(totals.count, 1);
        assert_eq!(totals.volume_ml, 150.0);

        let mut unattended = Page::MugAttribution {
            mug_weight: Some(150.0),
            persons: PersonSet::new(),
        };
        unattended.on_timeout(&mut ctx).unwrap();
        assert_eq!(fx.store.get_totals().unwrap().count, 1);
    }

    #[test]
    fn test_pour_carries_persons_pressed_while_pot_away() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Home;
        let Transition::To(mut pouring) = page.pot_removed(&mut ctx).unwrap() else {
            panic!("expected a transition");
        };
        assert_eq!(pouring.screen(&fx.store).unwrap(), Screen::Blink("Service...".into()));
        pouring.person_pressed(6, &mut ctx).unwrap();

        let transition = pouring.mug_served(180.0, &[2, 6], &mut ctx).unwrap();
        assert_eq!(
            transition,
            Transition::To(Page::MugAttribution {
                mug_weight: Some(180.0),
                persons: persons(&[6, 2]),
            })
        );
    }

    #[test]
    fn test_new_pour_commits_open_attribution() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::MugAttribution {
            mug_weight: Some(100.0),
            persons: persons(&[1]),
        };
        let transition = page.pot_removed(&mut ctx).unwrap();
        assert_eq!(
            transition,
            Transition::To(Page::MugAttribution {
                mug_weight: None,
                persons: PersonSet::new(),
            })
        );
        assert_eq!(fx.store.get_totals().unwrap().count, 1);
    }

    #[test]
    fn test_shutdown_ignores_pours() {
        let fx = Fixture::new();
        let mut ctx = fx.ctx();
        let mut page = Page::Shutdown { restart: false };
        assert_eq!(page.pot_removed(&mut ctx).unwrap(), Transition::Stay);
        assert_eq!(page.mug_served(100.0, &[], &mut ctx).unwrap(), Transition::Stay);
    }

    #[test]
    fn test_enter_hooks() {
        let fx = Fixture::new();
        fx.store.add_mugs(&[(1, 600.0), (2, 900.0)], Local::now()).unwrap();
        let mut ctx = fx.ctx();

        let mut stats = Page::Stats { totals: None };
        stats.enter(&mut ctx).unwrap();
        assert_eq!(
            stats.screen(&fx.store).unwrap(),
            Screen::two_lines("2 tasses", "1.50 L")
        );

        let mut host = Page::HostnameInfo { address: None };
        host.enter(&mut ctx).unwrap();
        assert_eq!(
            host.screen(&fx.store).unwrap(),
            Screen::two_lines("Hostname:", "192.168.1.20")
        );

        let mut shutdown = Page::Shutdown { restart: true };
        shutdown.enter(&mut ctx).unwrap();
        assert_eq!(ctx.take_shutdown(), Some(true));
    }

    #[test]
    fn test_person_summary_screen() {
        let fx = Fixture::new();
        let now = Local::now();
        fx.store.add_user(3, "ALICE", now).unwrap();
        fx.store.add_mugs(&[(3, 120.5), (4, 80.0)], now).unwrap();
        fx.store.add_mug(3, 100.0, now).unwrap();

        let page = Page::PersonSummary { button_id: 3 };
        assert_eq!(
            page.screen(&fx.store).unwrap(),
            Screen::Lines {
                top: Line::Static("ALICE:".into()),
                bottom: Line::Scroll("Ajd: 2 tasses - 220 mL".into()),
            }
        );

        let unnamed = Page::PersonSummary { button_id: 4 };
        assert_eq!(
            unnamed.screen(&fx.store).unwrap(),
            Screen::Lines {
                top: Line::Static("4:".into()),
                bottom: Line::Scroll("Ajd: 1 tasse - 80 mL".into()),
            }
        );

        let unknown = Page::PersonSummary { button_id: 9 };
        assert_eq!(
            unknown.screen(&fx.store).unwrap(),
            Screen::Lines {
                top: Line::Static("9:".into()),
                bottom: Line::Scroll("Ajd: 0 tasse - 0 mL".into()),
            }
        );
    }

    #[test]
    fn test_mug_screen_lists_names() {
        let fx = Fixture::new();
        fx.store.add_user(1, "ANA", Local::now()).unwrap();
        let page = Page::MugAttribution {
            mug_weight: Some(245.7),
            persons: persons(&[1, 8]),
        };
        assert_eq!(
            page.screen(&fx.store).unwrap(),
            Screen::Lines {
                top: Line::Static("245mL - Pour ?".into()),
                bottom: Line::Scroll("ANA + 8".into()),
            }
        );
    }

    #[test]
    fn test_page_timeouts() {
        let config = UiConfig::default();
        assert_eq!(Page::Home.timeout(&config), Duration::from_millis(15_000));
        assert_eq!(
            Page::MugAttribution {
                mug_weight: None,
                persons: PersonSet::new()
            }
            .timeout(&config),
            Duration::from_millis(5_000)
        );
        assert_eq!(
            Page::Stats { totals: None }.timeout(&config),
            Duration::from_millis(10_000)
        );
    }
}
