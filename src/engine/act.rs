//! Message rendering and delivery.
//!
//! Templates use a small token set resolved against the actor and target:
//! `@n` actor name, `@t` target name, `@T` target name capitalised, `@e`/`@E` subject pronoun
//! of actor/target and `@m`/`@M` object pronoun of actor/target. `@@` is a literal `@`.

use crate::world::{living::capitalize, LivingId, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Only the actor.
    Actor,
    /// Only the target.
    Target,
    /// Everyone in the actor's room, actor included.
    Room,
    /// Everyone in the actor's room except the actor.
    RoomExceptActor,
    /// Everyone in the actor's room except the target (the victim).
    RoomExceptTarget,
    /// Bystanders only.
    RoomExceptBoth,
}

/// Receiver of rendered text for a single living. Monsters have no connection, so sinks are
/// free to drop their output.
pub trait ActSink {
    fn send(&mut self, to: LivingId, text: String);
}

/// Render `template` and deliver it to every member of `audience`.
pub fn act(
    sink: &mut dyn ActSink,
    world: &World,
    template: &str,
    audience: Audience,
    actor: LivingId,
    target: Option<LivingId>,
) {
    let text = render(world, template, actor, target);
    for to in recipients(world, audience, actor, target) {
        sink.send(to, text.clone());
    }
}

/// Send `text` to every player in the room except `except`.
pub fn send_to_room(
    sink: &mut dyn ActSink,
    world: &World,
    room: crate::world::RoomId,
    text: &str,
    except: Option<LivingId>,
) {
    for id in world.players_in_room(room) {
        if Some(id) != except {
            sink.send(id, text.to_string());
        }
    }
}

fn recipients(
    world: &World,
    audience: Audience,
    actor: LivingId,
    target: Option<LivingId>,
) -> Vec<LivingId> {
    let room_members = || {
        world
            .living(actor)
            .and_then(|living| world.room(living.room))
            .map(|room| room.occupants.clone())
            .unwrap_or_default()
    };
    match audience {
        Audience::Actor => vec![actor],
        Audience::Target => target.into_iter().collect(),
        Audience::Room => room_members(),
        Audience::RoomExceptActor => room_members()
            .into_iter()
            .filter(|id| *id != actor)
            .collect(),
        Audience::RoomExceptTarget => room_members()
            .into_iter()
            .filter(|id| Some(*id) != target)
            .collect(),
        Audience::RoomExceptBoth => room_members()
            .into_iter()
            .filter(|id| *id != actor && Some(*id) != target)
            .collect(),
    }
}

pub fn render(world: &World, template: &str, actor: LivingId, target: Option<LivingId>) -> String {
    let actor = world.living(actor);
    let target = target.and_then(|id| world.living(id));
    let mut out = String::with_capacity(template.len() + 16);
    let mut chars = template.chars();
    while let Some(ch) = chars.next() {
        if ch != '@' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push_str(actor.map(|l| l.name.as_str()).unwrap_or("someone")),
            Some('t') => out.push_str(target.map(|l| l.name.as_str()).unwrap_or("someone")),
            Some('T') => out.push_str(
                &target
                    .map(|l| capitalize(&l.name))
                    .unwrap_or_else(|| "Someone".to_string()),
            ),
            Some('e') => out.push_str(actor.map(|l| l.sex.subject()).unwrap_or("it")),
            Some('E') => out.push_str(target.map(|l| l.sex.subject()).unwrap_or("it")),
            Some('m') => out.push_str(actor.map(|l| l.sex.object()).unwrap_or("it")),
            Some('M') => out.push_str(target.map(|l| l.sex.object()).unwrap_or("it")),
            Some('@') => out.push('@'),
            Some(other) => {
                out.push('@');
                out.push(other);
            }
            None => out.push('@'),
        }
    }
    capitalize(&out)
}

/// Collects rendered output per recipient until the server drains it.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<(LivingId, String)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<(LivingId, String)> {
        std::mem::take(&mut self.messages)
    }

    pub fn messages_for(&self, id: LivingId) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|(to, _)| *to == id)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn contains(&self, id: LivingId, needle: &str) -> bool {
        self.messages_for(id).iter().any(|text| text.contains(needle))
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl ActSink for Outbox {
    fn send(&mut self, to: LivingId, text: String) {
        self.messages.push((to, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::templates::builtin_zones;
    use chrono::Utc;

    #[test]
    fn tokens_and_audiences() {
        let mut world =
            World::from_zones(builtin_zones().unwrap(), "village:square", Utc::now()).unwrap();
        let room = world.start_room;
        let a = world.add_player("ann", room).unwrap();
        let b = world.add_player("bob", room).unwrap();
        let c = world.add_player("cyd", room).unwrap();

        assert_eq!(
            render(&world, "@n hits @t. @T reels!", a, Some(b)),
            "Ann hits bob. Bob reels!"
        );

        let mut out = Outbox::new();
        act(&mut out, &world, "@n waves at @t.", Audience::RoomExceptTarget, a, Some(b));
        assert!(out.contains(a, "Ann waves at bob."));
        assert!(out.contains(c, "Ann waves at bob."));
        assert!(out.messages_for(b).is_empty());

        out.clear();
        act(&mut out, &world, "@n grins.", Audience::RoomExceptBoth, a, Some(b));
        assert_eq!(out.messages_for(c).len(), 1);
        assert!(out.messages_for(a).is_empty());
    }
}
