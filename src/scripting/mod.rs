//! Script hooks.
//!
//! Livings (through their monster template), rooms and items can carry scripts bound to an
//! event. Before the engine runs its default behaviour for that event it collects the matching
//! scripts and evaluates them in order: the acting living's own scripts, then the room's, then
//! the items the living carries or wears. The first script that reports itself handled stops
//! the chain and the default behaviour is skipped:
//!
//! | Event     | Handled means                                   |
//! |-----------|-------------------------------------------------|
//! | `Command` | the input line is consumed                      |
//! | `Death`   | the default death message is not sent           |
//! | `Entry`   | the move into the room is refused               |
//! | `Fight`   | the living makes no regular attacks this round  |
//! | `Init`    | nothing; only the script's messages are sent    |
//! | `Update`  | regeneration and monster AI are skipped         |
//!
//! **Limits**
//! - Script length: 512 characters
//! - Execution time: 100ms
//! - Actions per run: 10
//! - Messages per run: 3
//!
//! A script that fails to parse or evaluate is logged and treated as not handled.

pub mod evaluator;
pub mod parser;

use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::act::{send_to_room, ActSink};
use crate::engine::context::GameContext;
use crate::errors::GameError;
use crate::metrics;
use crate::world::templates::ScriptSpec;
use crate::world::{LivingId, RoomId, World};

pub use evaluator::DslEvaluator;

pub const MAX_SCRIPT_LENGTH: usize = 512;
pub const MAX_EXECUTION_TIME: Duration = Duration::from_millis(100);
pub const MAX_ACTIONS_PER_SCRIPT: u8 = 10;
pub const MAX_MESSAGES_PER_SCRIPT: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    Command,
    Death,
    Entry,
    Fight,
    Init,
    Update,
}

impl ScriptType {
    pub fn name(self) -> &'static str {
        match self {
            ScriptType::Command => "command",
            ScriptType::Death => "death",
            ScriptType::Entry => "entry",
            ScriptType::Fight => "fight",
            ScriptType::Init => "init",
            ScriptType::Update => "update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    NotHandled,
    Handled,
    /// Handled, with a value the caller may show (command replies).
    HandledWithValue(String),
}

impl ScriptOutcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, ScriptOutcome::NotHandled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEffect {
    /// Sent to the acting living.
    Message(String),
    /// Sent to everyone else in the room.
    Echo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Living,
    Room,
    Item,
}

/// The entity that owns the script being run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSubject {
    pub kind: SubjectKind,
    pub name: String,
}

/// Read-only snapshot of the acting living plus the effects produced so far.
#[derive(Debug, Clone)]
pub struct ScriptContext {
    pub event: ScriptType,
    pub actor: String,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub room: String,
    pub target: Option<String>,
    pub input: Option<String>,
    pub hour: u8,
    pub effects: Vec<ScriptEffect>,
}

pub trait ScriptEvaluator {
    fn evaluate(
        &mut self,
        script: &str,
        context: &mut ScriptContext,
        subject: &ScriptSubject,
    ) -> Result<ScriptOutcome, GameError>;
}

/// Evaluator that never handles anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvaluator;

impl ScriptEvaluator for NullEvaluator {
    fn evaluate(
        &mut self,
        _script: &str,
        _context: &mut ScriptContext,
        _subject: &ScriptSubject,
    ) -> Result<ScriptOutcome, GameError> {
        Ok(ScriptOutcome::NotHandled)
    }
}

/// Where and on whose behalf an event is dispatched.
#[derive(Debug, Clone, Copy)]
pub struct HookEvent<'a> {
    pub event: ScriptType,
    pub actor: LivingId,
    /// Room whose scripts apply; the destination for `Entry`.
    pub room: RoomId,
    pub target: Option<LivingId>,
    pub input: Option<&'a str>,
}

impl<'a> HookEvent<'a> {
    pub fn new(event: ScriptType, actor: LivingId, room: RoomId) -> Self {
        Self {
            event,
            actor,
            room,
            target: None,
            input: None,
        }
    }

    pub fn with_target(mut self, target: Option<LivingId>) -> Self {
        self.target = target;
        self
    }

    pub fn with_input(mut self, input: &'a str) -> Self {
        self.input = Some(input);
        self
    }
}

fn scripts_for(
    world: &World,
    hook: &HookEvent<'_>,
) -> Vec<(ScriptSubject, String)> {
    let matching = |specs: &[ScriptSpec], kind: SubjectKind, name: &str| -> Vec<(ScriptSubject, String)> {
        specs
            .iter()
            .filter(|s| s.event == hook.event)
            .map(|s| {
                (
                    ScriptSubject {
                        kind,
                        name: name.to_string(),
                    },
                    s.source.clone(),
                )
            })
            .collect()
    };

    let mut scripts = Vec::new();
    let actor = world.living(hook.actor);
    if let Some(template) = actor.and_then(|l| l.template()) {
        scripts.extend(matching(&template.scripts, SubjectKind::Living, &template.name));
    }
    if let Some(room) = world.room(hook.room) {
        scripts.extend(matching(&room.template.scripts, SubjectKind::Room, room.name()));
    }
    if let Some(actor) = actor {
        let carried = actor.equipment.values().chain(actor.inventory.iter());
        for id in carried {
            if let Some(item) = world.item(*id) {
                scripts.extend(matching(&item.template.scripts, SubjectKind::Item, &item.name));
            }
        }
    }
    scripts
}

fn context_for(world: &World, hook: &HookEvent<'_>) -> Option<ScriptContext> {
    let actor = world.living(hook.actor)?;
    Some(ScriptContext {
        event: hook.event,
        actor: actor.name.clone(),
        level: actor.level,
        hp: actor.pools.health,
        max_hp: actor.pools.max_health,
        room: world
            .room(hook.room)
            .map(|r| r.name().to_string())
            .unwrap_or_default(),
        target: hook
            .target
            .and_then(|id| world.living(id))
            .map(|l| l.name.clone()),
        input: hook.input.map(str::to_string),
        hour: world.time.hour,
        effects: Vec::new(),
    })
}

/// Run every script bound to the event. Returns the first handled outcome, or `NotHandled`.
pub fn dispatch(world: &World, ctx: &mut GameContext, hook: HookEvent<'_>) -> ScriptOutcome {
    let scripts = scripts_for(world, &hook);
    if scripts.is_empty() {
        return ScriptOutcome::NotHandled;
    }
    let mut base = match context_for(world, &hook) {
        Some(base) => base,
        None => return ScriptOutcome::NotHandled,
    };

    for (subject, source) in scripts {
        base.effects.clear();
        match ctx.scripts.evaluate(&source, &mut base, &subject) {
            Ok(outcome) => {
                deliver(world, &mut ctx.out, &hook, &base.effects);
                if outcome.is_handled() {
                    return outcome;
                }
            }
            Err(e) => {
                metrics::record_script_failure();
                warn!(
                    "{} script on {} '{}' failed: {}",
                    hook.event.name(),
                    match subject.kind {
                        SubjectKind::Living => "living",
                        SubjectKind::Room => "room",
                        SubjectKind::Item => "item",
                    },
                    subject.name,
                    e
                );
            }
        }
    }
    ScriptOutcome::NotHandled
}

fn deliver(world: &World, sink: &mut dyn ActSink, hook: &HookEvent<'_>, effects: &[ScriptEffect]) {
    for effect in effects {
        match effect {
            ScriptEffect::Message(text) => sink.send(hook.actor, text.clone()),
            ScriptEffect::Echo(text) => send_to_room(sink, world, hook.room, text, Some(hook.actor)),
        }
    }
}
