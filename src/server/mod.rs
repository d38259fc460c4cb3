//! # Server Module - Connections and the Game Loop
//!
//! The server owns the [`Game`] and drives it from a single task:
//!
//! ```text
//!  TcpListener ──accept──► per-connection reader task ──ConnectionEvent──┐
//!                          per-connection writer task ◄──String─────┐    │
//!                                                                   │    ▼
//!                                        ┌──────────────────────────┴──────────┐
//!                                        │ MudServer::run (select!)            │
//!                                        │  - tick interval → Game::tick       │
//!                                        │  - connection events → commands     │
//!                                        │  - autosave interval                │
//!                                        │  - ctrl-c → save all, stop          │
//!                                        └─────────────────────────────────────┘
//! ```
//!
//! Connection tasks never touch the world. They forward complete, cleaned input lines and
//! write whatever text the game loop queues for them. Commands execute immediately on
//! receipt, between ticks, so a command always sees the world as the last tick left it.

pub mod commands;
pub mod session;

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, error, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::engine::act::{act, Audience};
use crate::engine::{Game, GameContext, StdRandom, TickScheduler};
use crate::logutil::{clean_input, escape_log};
use crate::metrics;
use crate::scripting::DslEvaluator;
use crate::storage::{self, PlayerRecord, PlayerRepository, PlayerStore};
use crate::world::templates::load_zones_or_builtin;
use crate::world::{LivingId, World};

use commands::CommandResult;
use session::{validate_player_name, ConnId, Session, SessionState};

const NAME_PROMPT: &str = "By what name do you wish to be known? ";

#[derive(Debug)]
pub enum ConnectionEvent {
    Opened {
        id: ConnId,
        peer: String,
        tx: mpsc::UnboundedSender<String>,
    },
    Line {
        id: ConnId,
        line: String,
    },
    Closed {
        id: ConnId,
    },
}

/// Load zones and build a ready-to-run game from configuration.
pub fn build_game(config: &Config) -> Result<Game> {
    let zones = load_zones_or_builtin(&config.world.zone_dir)
        .with_context(|| format!("loading zones from {}", config.world.zone_dir))?;
    let world = World::from_zones(zones, &config.world.start_room, Utc::now())
        .context("building the world")?;
    // One seed drives both combat rolls and script `chance()`.
    let ctx = match config.world.random_seed {
        Some(seed) => GameContext::new(config.combat.clone())
            .with_rng(StdRandom::seeded(seed))
            .with_scripts(DslEvaluator::seeded(seed)),
        None => GameContext::new(config.combat.clone()).with_rng(StdRandom::new()),
    };
    Ok(Game::new(world, ctx, TickScheduler::new(config.cadence)))
}

pub struct MudServer<R: PlayerRepository = PlayerStore> {
    config: Config,
    game: Game,
    store: R,
    sessions: BTreeMap<ConnId, Session>,
    by_living: HashMap<LivingId, ConnId>,
}

impl MudServer<PlayerStore> {
    pub fn new(config: Config) -> Result<Self> {
        let game = build_game(&config)?;
        let store = PlayerStore::open(&config.storage.data_dir)
            .with_context(|| format!("opening player store at {}", config.storage.data_dir))?;
        Ok(Self::with_parts(config, game, store))
    }
}

impl<R: PlayerRepository> MudServer<R> {
    pub fn with_parts(config: Config, game: Game, store: R) -> Self {
        Self {
            config,
            game,
            store,
            sessions: BTreeMap::new(),
            by_living: HashMap::new(),
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub async fn run(mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind)
            .await
            .with_context(|| format!("binding {}", self.config.server.bind))?;
        info!("listening on {}", self.config.server.bind);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        tokio::spawn(accept_loop(listener, event_tx, self.config.server.max_line_length));

        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.server.tick_millis));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let autosave_secs = self.config.storage.autosave_seconds;
        let mut autosave = tokio::time::interval(Duration::from_secs(autosave_secs.max(1)));
        autosave.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of an interval fires immediately.
        autosave.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.game.tick();
                    self.flush_output();
                }
                _ = autosave.tick(), if autosave_secs > 0 => {
                    self.save_all();
                }
                event = event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        None => {
                            warn!("connection event channel closed");
                            break;
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("received shutdown signal");
                    break;
                }
            }
        }

        self.save_all();
        info!("server stopped; {}", metrics::snapshot());
        Ok(())
    }

    /// Apply one connection event and flush resulting output.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { id, peer, tx } => self.open(id, peer, tx),
            ConnectionEvent::Line { id, line } => self.handle_line(id, &line),
            ConnectionEvent::Closed { id } => self.close(id),
        }
        self.flush_output();
    }

    fn open(&mut self, id: ConnId, peer: String, tx: mpsc::UnboundedSender<String>) {
        let session = Session::new(id, peer, tx);
        if self.sessions.len() >= self.config.server.max_connections {
            warn!("refusing {} from {}: server full", id, session.peer);
            session.send("Sorry, the realm is full. Try again later.");
            return;
        }
        metrics::record_connection();
        info!("{} connected from {}", id, session.peer);
        session.send(&self.config.server.motd);
        session.send_prompt(NAME_PROMPT);
        self.sessions.insert(id, session);
    }

    fn handle_line(&mut self, id: ConnId, line: &str) {
        let state = match self.sessions.get_mut(&id) {
            Some(session) => {
                session.touch();
                session.state.clone()
            }
            None => return,
        };
        match state {
            SessionState::AwaitingName => self.login(id, line),
            SessionState::Playing(living) => {
                match commands::execute(&mut self.game, living, line) {
                    CommandResult::Continue => {}
                    CommandResult::Save => {
                        if let Err(e) = self.save_player(living) {
                            self.tell(living, "Your character could not be saved.");
                            error!("save for {} failed: {}", living, e);
                        }
                    }
                    CommandResult::Quit => match self.save_player(living) {
                        Ok(()) => {
                            self.tell(living, "Goodbye, friend. Come back soon!");
                            self.flush_output();
                            self.depart(living);
                            self.sessions.remove(&id);
                            return;
                        }
                        Err(e) => {
                            error!("save for {} on quit failed: {}", living, e);
                            self.tell(living, "Your character could not be saved.");
                        }
                    },
                }
                self.flush_output();
                self.send_prompt(living);
            }
        }
    }

    fn login(&mut self, id: ConnId, line: &str) {
        let name = match validate_player_name(line) {
            Ok(name) => name,
            Err(e) => {
                if let Some(session) = self.sessions.get(&id) {
                    session.send(&e.to_string());
                    session.send_prompt(NAME_PROMPT);
                }
                return;
            }
        };
        if self.game.world.find_player(&name).is_some() {
            if let Some(session) = self.sessions.get(&id) {
                session.send("That character is already playing.");
                session.send_prompt(NAME_PROMPT);
            }
            return;
        }

        let (record, is_new) = match self.store.find_by_name(&name) {
            Ok(Some(record)) => (record, false),
            Ok(None) => (PlayerRecord::new(&name, &self.config.world.start_room), true),
            Err(e) => {
                error!("loading player '{}' failed: {}", escape_log(&name), e);
                if let Some(session) = self.sessions.get(&id) {
                    session.send("Your character could not be loaded. Try again later.");
                    session.send_prompt(NAME_PROMPT);
                }
                return;
            }
        };
        let living = match storage::restore(&mut self.game.world, &record) {
            Ok(living) => living,
            Err(e) => {
                error!("restoring player '{}' failed: {}", name, e);
                if let Some(session) = self.sessions.get(&id) {
                    session.send("Your character could not be loaded. Try again later.");
                }
                return;
            }
        };
        if let Some(session) = self.sessions.get_mut(&id) {
            session.state = SessionState::Playing(living);
            session.created_at = record.created_at;
        }
        self.by_living.insert(living, id);
        info!("{} logged in as {} ({})", id, name, living);

        if is_new {
            self.tell(living, format!("Welcome to the realm, {}!", name));
            if let Err(e) = self.save_player(living) {
                warn!("initial save for {} failed: {}", name, e);
            }
        } else {
            self.tell(living, format!("Welcome back, {}.", name));
        }
        act(&mut self.game.ctx.out, &self.game.world, "@n has entered the game.", Audience::RoomExceptActor, living, None);
        commands::look(&mut self.game, living, "");
        self.flush_output();
        self.send_prompt(living);
    }

    fn close(&mut self, id: ConnId) {
        let living = match self.sessions.get(&id) {
            Some(session) => session.living(),
            None => return,
        };
        info!("{} disconnected", id);
        if let Some(living) = living {
            self.leave(id, living);
        }
        self.sessions.remove(&id);
    }

    /// Save a player and take it out of the world.
    fn leave(&mut self, id: ConnId, living: LivingId) {
        if let Err(e) = self.save_player_for(id, living) {
            error!("final save for {} failed: {}", living, e);
        }
        self.depart(living);
    }

    fn depart(&mut self, living: LivingId) {
        act(&mut self.game.ctx.out, &self.game.world, "@n has left the game.", Audience::RoomExceptActor, living, None);
        self.game.world.remove_living(living);
        self.by_living.remove(&living);
        self.flush_output();
    }

    fn save_player(&mut self, living: LivingId) -> Result<()> {
        let id = self
            .by_living
            .get(&living)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("{} has no session", living))?;
        self.save_player_for(id, living)
    }

    fn save_player_for(&self, id: ConnId, living: LivingId) -> Result<()> {
        let created_at = self
            .sessions
            .get(&id)
            .map(|s| s.created_at)
            .unwrap_or_else(Utc::now);
        let record = storage::capture(&self.game.world, living, created_at)
            .ok_or_else(|| anyhow::anyhow!("{} is not a player in the world", living))?;
        self.store.store(&record)?;
        debug!("saved {}", record.name);
        Ok(())
    }

    /// Save every connected player.
    pub fn save_all(&mut self) {
        let playing: Vec<(ConnId, LivingId)> = self
            .sessions
            .values()
            .filter_map(|s| s.living().map(|l| (s.id, l)))
            .collect();
        for (id, living) in playing {
            if let Err(e) = self.save_player_for(id, living) {
                error!("autosave for {} failed: {}", living, e);
            }
        }
    }

    fn tell(&mut self, living: LivingId, text: impl Into<String>) {
        use crate::engine::act::ActSink;
        self.game.ctx.out.send(living, text.into());
    }

    fn send_prompt(&self, living: LivingId) {
        let Some(prompt) = commands::prompt(&self.game, living) else {
            return;
        };
        if let Some(session) = self.by_living.get(&living).and_then(|id| self.sessions.get(id)) {
            session.send_prompt(&prompt);
        }
    }

    /// Route queued game output to the owning connections. Output for monsters is dropped.
    pub fn flush_output(&mut self) {
        for (to, text) in self.game.ctx.out.drain() {
            if let Some(session) = self.by_living.get(&to).and_then(|id| self.sessions.get(id)) {
                session.send(&text);
            }
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    max_line_length: usize,
) {
    let mut next_id = 1u64;
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let id = ConnId(next_id);
                next_id += 1;
                tokio::spawn(handle_connection(stream, id, events.clone(), max_line_length));
            }
            Err(e) => {
                warn!("accept failed: {}", e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
        if events.is_closed() {
            break;
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    id: ConnId,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    max_line_length: usize,
) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let (read_half, mut write_half) = stream.into_split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    if events
        .send(ConnectionEvent::Opened { id, peer, tx: out_tx })
        .is_err()
    {
        return;
    }

    // Ends when the game loop drops the session's sender; the reader stops with it.
    let (writer_done_tx, mut writer_done) = oneshot::channel::<()>();
    tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = write_half.write_all(text.as_bytes()).await {
                debug!("{} write failed: {}", id, e);
                break;
            }
        }
        let _ = write_half.shutdown().await;
        drop(writer_done_tx);
    });

    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::with_capacity(max_line_length + 1);
    loop {
        buf.clear();
        let read = tokio::select! {
            read = read_bounded_line(&mut reader, &mut buf, max_line_length) => read,
            _ = &mut writer_done => {
                debug!("{} output closed; dropping connection", id);
                break;
            }
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = clean_input(&buf, max_line_length);
                if events.send(ConnectionEvent::Line { id, line }).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("{} read failed: {}", id, e);
                break;
            }
        }
    }
    let _ = events.send(ConnectionEvent::Closed { id });
}

/// Read one line into `buf`, keeping at most `limit + 1` bytes. The rest of an overlong
/// line is read and thrown away so the next call starts on a fresh line.
async fn read_bounded_line<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let cap = limit as u64 + 1;
    let read = (&mut *reader).take(cap).read_until(b'\n', buf).await?;
    if read == 0 || buf.last() == Some(&b'\n') {
        return Ok(read);
    }
    let mut discard = Vec::new();
    loop {
        discard.clear();
        let n = (&mut *reader).take(cap).read_until(b'\n', &mut discard).await?;
        if n == 0 || discard.last() == Some(&b'\n') {
            break;
        }
    }
    Ok(read)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryStore {
        records: RefCell<HashMap<String, PlayerRecord>>,
    }

    impl PlayerRepository for MemoryStore {
        fn find_by_name(&self, name: &str) -> Result<Option<PlayerRecord>, crate::errors::GameError> {
            Ok(self.records.borrow().get(&name.to_ascii_lowercase()).cloned())
        }
        fn store(&self, record: &PlayerRecord) -> Result<(), crate::errors::GameError> {
            self.records
                .borrow_mut()
                .insert(record.name.to_ascii_lowercase(), record.clone());
            Ok(())
        }
        fn has(&self, name: &str) -> Result<bool, crate::errors::GameError> {
            Ok(self.records.borrow().contains_key(&name.to_ascii_lowercase()))
        }
    }

    /// Loads fine but refuses every write.
    struct ReadOnlyStore;

    impl PlayerRepository for ReadOnlyStore {
        fn find_by_name(&self, _name: &str) -> Result<Option<PlayerRecord>, crate::errors::GameError> {
            Ok(None)
        }
        fn store(&self, _record: &PlayerRecord) -> Result<(), crate::errors::GameError> {
            Err(crate::errors::GameError::InvalidState("store is read-only".into()))
        }
        fn has(&self, _name: &str) -> Result<bool, crate::errors::GameError> {
            Ok(false)
        }
    }

    fn server() -> MudServer<MemoryStore> {
        let config = Config::default();
        let game = build_game(&config).expect("game");
        MudServer::with_parts(config, game, MemoryStore::default())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        let mut out = String::new();
        while let Ok(text) = rx.try_recv() {
            out.push_str(&text);
        }
        out
    }

    #[test]
    fn login_creates_and_saves_a_new_player() {
        let mut server = server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.handle_event(ConnectionEvent::Opened { id: ConnId(1), peer: "test".into(), tx });
        assert!(drain(&mut rx).contains("By what name"));

        server.handle_event(ConnectionEvent::Line { id: ConnId(1), line: "alice".into() });
        let out = drain(&mut rx);
        assert!(out.contains("Welcome to the realm, Alice!"));
        assert!(out.contains("Village Square") || out.contains("[Exits:"));
        assert!(server.game().world.find_player("Alice").is_some());
        assert!(server.store.has("alice").expect("has"));
    }

    #[test]
    fn quitting_removes_the_player() {
        let mut server = server();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.handle_event(ConnectionEvent::Opened { id: ConnId(1), peer: "test".into(), tx });
        server.handle_event(ConnectionEvent::Line { id: ConnId(1), line: "bob".into() });
        server.handle_event(ConnectionEvent::Line { id: ConnId(1), line: "quit".into() });
        assert!(drain(&mut rx).contains("Goodbye"));
        assert!(server.game().world.find_player("Bob").is_none());
        assert_eq!(server.session_count(), 0);
    }

    #[test]
    fn failed_save_on_quit_keeps_the_player_connected() {
        let config = Config::default();
        let game = build_game(&config).expect("game");
        let mut server = MudServer::with_parts(config, game, ReadOnlyStore);
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.handle_event(ConnectionEvent::Opened { id: ConnId(1), peer: "test".into(), tx });
        server.handle_event(ConnectionEvent::Line { id: ConnId(1), line: "carol".into() });
        drain(&mut rx);

        server.handle_event(ConnectionEvent::Line { id: ConnId(1), line: "quit".into() });
        let out = drain(&mut rx);
        assert!(out.contains("Your character could not be saved."));
        assert!(!out.contains("Goodbye"));
        assert!(server.game().world.find_player("Carol").is_some());
        assert_eq!(server.session_count(), 1);
    }

    #[test]
    fn refused_connection_loses_its_output_channel() {
        let mut config = Config::default();
        config.server.max_connections = 0;
        let game = build_game(&config).expect("game");
        let mut server = MudServer::with_parts(config, game, MemoryStore::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.handle_event(ConnectionEvent::Opened { id: ConnId(1), peer: "test".into(), tx });
        assert!(drain(&mut rx).contains("the realm is full"));
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
        assert_eq!(server.session_count(), 0);
    }

    #[tokio::test]
    async fn overlong_lines_are_cut_and_the_rest_discarded() {
        let mut input = vec![b'a'; 50];
        input.extend_from_slice(b"\nlook\n");
        let mut reader = BufReader::new(&input[..]);
        let mut buf = Vec::new();

        let n = read_bounded_line(&mut reader, &mut buf, 10).await.expect("read");
        assert_eq!(n, 11);
        assert_eq!(buf, vec![b'a'; 11]);
        assert_eq!(clean_input(&buf, 10), "a".repeat(10));

        buf.clear();
        read_bounded_line(&mut reader, &mut buf, 10).await.expect("read");
        assert_eq!(buf, b"look\n");

        buf.clear();
        assert_eq!(read_bounded_line(&mut reader, &mut buf, 10).await.expect("read"), 0);
    }

    #[tokio::test]
    async fn reader_stops_when_the_session_is_dropped() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let client = TcpStream::connect(addr).await.expect("connect");
        let (stream, _) = listener.accept().await.expect("accept");

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        tokio::spawn(handle_connection(stream, ConnId(7), events_tx, 64));
        match events_rx.recv().await {
            Some(ConnectionEvent::Opened { tx, .. }) => drop(tx),
            other => panic!("expected Opened, got {:?}", other),
        }

        let closed = tokio::time::timeout(Duration::from_secs(2), events_rx.recv())
            .await
            .expect("reader noticed the dropped session");
        assert!(matches!(closed, Some(ConnectionEvent::Closed { id: ConnId(7) })));
        drop(client);
    }

    #[test]
    fn seeded_worlds_roll_script_chances_alike() {
        use crate::scripting::{
            ScriptContext, ScriptEvaluator, ScriptSubject, ScriptType, SubjectKind,
        };

        let mut config = Config::default();
        config.world.random_seed = Some(42);
        let rolls = |config: &Config| -> Vec<bool> {
            let mut game = build_game(config).expect("game");
            let subject = ScriptSubject { kind: SubjectKind::Room, name: "test".into() };
            (0..32)
                .map(|_| {
                    let mut context = ScriptContext {
                        event: ScriptType::Update,
                        actor: "Tester".into(),
                        level: 1,
                        hp: 10,
                        max_hp: 10,
                        room: "test".into(),
                        target: None,
                        input: None,
                        hour: 12,
                        effects: Vec::new(),
                    };
                    game.ctx
                        .scripts
                        .evaluate("chance(50) && handled()", &mut context, &subject)
                        .expect("script runs")
                        .is_handled()
                })
                .collect()
        };
        let first = rolls(&config);
        assert_eq!(first, rolls(&config));
        assert!(first.contains(&true) && first.contains(&false));
    }
}
