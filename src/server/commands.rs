//! Player command processing.
//!
//! Every input line from a logged-in player goes through [`execute`]. Command scripts on the
//! player's room and carried items get the first look at the raw line; if one handles it the
//! built-in command never runs. Otherwise the first word picks the handler. Words match by
//! prefix in table order, so `k rat` is `kill rat` and `i` is `inventory`.
//!
//! Handlers write their replies to the game's outbox and return a [`CommandResult`] telling
//! the server whether the player wants to be saved or to leave.

use log::{debug, info};

use crate::combat::{
    self,
    flee,
    special::{self, SkillOutcome},
    spells::{self, CastOutcome},
    AttackOutcome,
};
use crate::engine::act::{act, ActSink, Audience};
use crate::engine::{updates, Game};
use crate::logutil::escape_log;
use crate::scripting::{self, HookEvent, ScriptOutcome, ScriptType};
use crate::world::{
    AffectionSource, Direction, DoorState, ItemFlag, ItemLocation, LivingId, Modifier, RoomFlag,
    SpellKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    /// Persist the player now.
    Save,
    /// Persist the player and close the connection. The farewell is sent once the save
    /// has gone through.
    Quit,
}

const COMMANDS: &[&str] = &[
    "north", "east", "south", "west", "up", "down", "look", "kill", "flee", "cast", "backstab",
    "disarm", "rescue", "score", "affects", "inventory", "equipment", "get", "drop", "wear",
    "remove", "open", "close", "wimpy", "who", "time", "save", "quit", "help",
];

/// Resolve an abbreviated command word to its full name.
pub fn resolve_command(word: &str) -> Option<&'static str> {
    let word = word.to_ascii_lowercase();
    if word.is_empty() {
        return None;
    }
    COMMANDS.iter().copied().find(|name| name.starts_with(&word))
}

fn tell(game: &mut Game, to: LivingId, text: impl Into<String>) {
    game.ctx.out.send(to, text.into());
}

pub fn execute(game: &mut Game, actor: LivingId, line: &str) -> CommandResult {
    let line = line.trim();
    if line.is_empty() {
        return CommandResult::Continue;
    }
    let room = match game.world.living(actor) {
        Some(living) => living.room,
        None => return CommandResult::Continue,
    };
    debug!("{} > {}", actor, escape_log(line));

    let hook = HookEvent::new(ScriptType::Command, actor, room).with_input(line);
    match scripting::dispatch(&game.world, &mut game.ctx, hook) {
        ScriptOutcome::NotHandled => {}
        ScriptOutcome::Handled => return CommandResult::Continue,
        ScriptOutcome::HandledWithValue(value) => {
            tell(game, actor, value);
            return CommandResult::Continue;
        }
    }

    let (word, args) = match line.split_once(char::is_whitespace) {
        Some((word, args)) => (word, args.trim()),
        None => (line, ""),
    };
    let Some(command) = resolve_command(word) else {
        tell(game, actor, "Huh?");
        return CommandResult::Continue;
    };

    match command {
        "north" | "east" | "south" | "west" | "up" | "down" => {
            if let Some(dir) = Direction::parse(command) {
                move_player(game, actor, dir);
            }
        }
        "look" => look(game, actor, args),
        "kill" => kill(game, actor, args),
        "flee" => do_flee(game, actor),
        "cast" => cast(game, actor, args),
        "backstab" => backstab(game, actor, args),
        "disarm" => {
            let outcome = special::disarm(&mut game.world, &mut game.ctx, actor);
            report_skill(game, actor, outcome, "You aren't fighting anyone armed.");
        }
        "rescue" => rescue(game, actor, args),
        "score" => score(game, actor),
        "affects" => affects(game, actor),
        "inventory" => inventory(game, actor),
        "equipment" => equipment(game, actor),
        "get" => get(game, actor, args),
        "drop" => drop_item(game, actor, args),
        "wear" => wear(game, actor, args),
        "remove" => remove(game, actor, args),
        "open" => door(game, actor, args, DoorState::Open),
        "close" => door(game, actor, args, DoorState::Closed),
        "wimpy" => wimpy(game, actor, args),
        "who" => who(game, actor),
        "time" => {
            let text = format!("It is {}.", game.world.time);
            tell(game, actor, text);
        }
        "save" => {
            tell(game, actor, "Saving.");
            return CommandResult::Save;
        }
        "quit" => {
            if game.world.living(actor).is_some_and(|l| l.is_fighting()) {
                tell(game, actor, "No way! You are fighting for your life!");
                return CommandResult::Continue;
            }
            return CommandResult::Quit;
        }
        _ => help(game, actor),
    }
    CommandResult::Continue
}

fn help(game: &mut Game, actor: LivingId) {
    let text = format!("Commands: {}", COMMANDS.join(" "));
    tell(game, actor, text);
}

/// Walk through an exit. Closed doors, exhaustion, fighting and entry scripts can refuse.
pub fn move_player(game: &mut Game, actor: LivingId, dir: Direction) -> bool {
    let (from, fighting, moves) = match game.world.living(actor) {
        Some(l) => (l.room, l.is_fighting(), l.pools.moves),
        None => return false,
    };
    if fighting {
        tell(game, actor, "You are fighting! Flee if you must.");
        return false;
    }
    let (open, cost) = match (game.world.exit(from, dir), game.world.exit_destination_template(from, dir)) {
        (Some(exit), Some(dest)) => (exit.is_open(), dest.terrain.move_cost()),
        _ => {
            tell(game, actor, "Alas, you cannot go that way...");
            return false;
        }
    };
    if !open {
        tell(game, actor, format!("The door {} is closed.", dir));
        return false;
    }
    if moves < cost {
        tell(game, actor, "You are too exhausted.");
        return false;
    }
    let now = game.ctx.now();
    let to = match game.world.traverse(from, dir, now) {
        Ok(Some(to)) => to,
        Ok(None) => {
            tell(game, actor, "Alas, you cannot go that way...");
            return false;
        }
        Err(e) => {
            info!("{} could not go {} from {}: {}", actor, dir, from, e);
            tell(game, actor, "Something blocks the way.");
            return false;
        }
    };

    let hook = HookEvent::new(ScriptType::Entry, actor, to);
    if scripting::dispatch(&game.world, &mut game.ctx, hook).is_handled() {
        return false;
    }

    act(&mut game.ctx.out, &game.world, &format!("@n leaves {}.", dir), Audience::RoomExceptActor, actor, None);
    if let Err(e) = game.world.move_living(actor, to) {
        info!("{} failed to move into {}: {}", actor, to, e);
        return false;
    }
    if let Some(l) = game.world.living_mut(actor) {
        l.pools.moves -= cost;
    }
    act(&mut game.ctx.out, &game.world, "@n has arrived.", Audience::RoomExceptActor, actor, None);
    // A dynamic zone instance created by this move wakes up around the player.
    updates::run_init_hooks(&mut game.world, &mut game.ctx);
    look(game, actor, "");
    true
}

pub fn look(game: &mut Game, actor: LivingId, args: &str) {
    let room_id = match game.world.living(actor) {
        Some(l) => l.room,
        None => return,
    };
    if !args.is_empty() {
        look_at(game, actor, room_id, args);
        return;
    }
    let world = &game.world;
    let Some(room) = world.room(room_id) else {
        return;
    };
    let mut lines = vec![room.name().to_string()];
    if !room.template.description.is_empty() {
        lines.push(room.template.description.clone());
    }
    let exits: Vec<String> = room
        .exits
        .iter()
        .map(|(dir, exit)| {
            if exit.is_open() {
                dir.name().to_string()
            } else {
                format!("({})", dir.name())
            }
        })
        .collect();
    lines.push(if exits.is_empty() {
        "[Exits: none]".to_string()
    } else {
        format!("[Exits: {}]", exits.join(" "))
    });
    for item in room.items.iter().filter_map(|id| world.item(*id)) {
        lines.push(format!("{} lies here.", crate::world::living::capitalize(&item.name)));
    }
    for other in room.occupants.iter().filter(|id| **id != actor).filter_map(|id| world.living(*id)) {
        let doing = match other.target.and_then(|t| world.living(t)) {
            Some(t) if t.id == actor => " is here, fighting YOU!".to_string(),
            Some(t) => format!(" is here, fighting {}.", t.name),
            None => " is here.".to_string(),
        };
        lines.push(format!("{}{}", other.display_name(), doing));
    }
    let text = lines.join("\n");
    tell(game, actor, text);
}

fn condition(percent: i32) -> &'static str {
    match percent {
        p if p >= 100 => "is in excellent condition.",
        p if p >= 75 => "has a few scratches.",
        p if p >= 50 => "has some nasty wounds.",
        p if p >= 25 => "is bleeding freely.",
        p if p > 0 => "is covered in blood.",
        _ => "is dying.",
    }
}

fn look_at(game: &mut Game, actor: LivingId, room: crate::world::RoomId, keyword: &str) {
    if let Some(target) = game.world.find_living_in_room(room, keyword, None) {
        let text = match game.world.living(target) {
            Some(t) => {
                let description = t
                    .template()
                    .map(|tpl| tpl.description.clone())
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| format!("You see nothing special about {}.", t.name));
                format!("{}\n{} {}", description, t.display_name(), condition(t.pools.health_percent()))
            }
            None => return,
        };
        tell(game, actor, text);
        return;
    }
    let items: Vec<_> = match (game.world.room(room), game.world.living(actor)) {
        (Some(r), Some(l)) => r
            .items
            .iter()
            .chain(l.inventory.iter())
            .chain(l.equipment.values())
            .copied()
            .collect(),
        _ => return,
    };
    let text = match game.world.find_item_in(&items, keyword).and_then(|id| game.world.item(id)) {
        Some(item) if !item.template.description.is_empty() => item.template.description.clone(),
        Some(item) => format!("You see nothing special about {}.", item.name),
        None => "You do not see that here.".to_string(),
    };
    tell(game, actor, text);
}

fn target_in_room(game: &mut Game, actor: LivingId, keyword: &str) -> Option<LivingId> {
    let room = game.world.living(actor)?.room;
    let found = game.world.find_living_in_room(room, keyword, Some(actor));
    if found.is_none() {
        tell(game, actor, "They aren't here.");
    }
    found
}

fn kill(game: &mut Game, actor: LivingId, args: &str) {
    if args.is_empty() {
        tell(game, actor, "Kill whom?");
        return;
    }
    let Some(target) = target_in_room(game, actor, args) else {
        return;
    };
    if game.world.living(actor).is_some_and(|l| l.is_fighting()) {
        tell(game, actor, "You do the best you can!");
        return;
    }
    let room = game.world.living(actor).map(|l| l.room);
    if room
        .and_then(|r| game.world.room(r))
        .is_some_and(|r| r.has_flag(RoomFlag::Safe))
    {
        tell(game, actor, "You feel too peaceful to contemplate violence here.");
        return;
    }
    if let AttackOutcome::Invalid = combat::attack(&mut game.world, &mut game.ctx, actor, target) {
        tell(game, actor, "You can't attack that.");
    }
}

fn do_flee(game: &mut Game, actor: LivingId) {
    if !game.world.living(actor).is_some_and(|l| l.is_fighting()) {
        tell(game, actor, "You aren't fighting anyone.");
        return;
    }
    if flee::flee(&mut game.world, &mut game.ctx, actor).is_some() {
        look(game, actor, "");
    }
}

/// Split `cast` arguments into a spell and an optional target keyword. The spell may be
/// quoted (`'magic missile' rat`) or given as leading words (`magic missile rat`, `mag rat`).
pub fn parse_cast(args: &str) -> Option<(SpellKind, Option<String>)> {
    let args = args.trim();
    if let Some(rest) = args.strip_prefix('\'') {
        let (spell, target) = rest.split_once('\'')?;
        let target = target.trim();
        return Some((
            SpellKind::parse(spell)?,
            (!target.is_empty()).then(|| target.to_string()),
        ));
    }
    if let Some(spell) = SpellKind::parse(args) {
        return Some((spell, None));
    }
    let (spell, target) = args.rsplit_once(char::is_whitespace)?;
    Some((SpellKind::parse(spell)?, Some(target.trim().to_string())))
}

fn cast(game: &mut Game, actor: LivingId, args: &str) {
    let Some((spell, keyword)) = parse_cast(args) else {
        tell(game, actor, "Cast which what where?");
        return;
    };
    let target = match keyword {
        Some(keyword) => match target_in_room(game, actor, &keyword) {
            Some(target) => Some(target),
            None => return,
        },
        None => None,
    };
    let offensive = matches!(
        spells::spell_info(spell).class,
        spells::SpellClass::Attack | spells::SpellClass::Curse
    );
    if offensive && !game.world.living(actor).is_some_and(|l| l.is_fighting()) {
        let safe = game
            .world
            .living(actor)
            .and_then(|l| game.world.room(l.room))
            .is_some_and(|r| r.has_flag(RoomFlag::Safe));
        if safe {
            tell(game, actor, "You feel too peaceful to contemplate violence here.");
            return;
        }
    }
    match spells::cast(&mut game.world, &mut game.ctx, actor, spell, target) {
        CastOutcome::NotEnoughMana { needed } => {
            tell(game, actor, format!("You need {} mana to cast {}.", needed, spell.name()))
        }
        CastOutcome::NoTarget => tell(game, actor, "Cast it on whom?"),
        _ => {}
    }
}

fn backstab(game: &mut Game, actor: LivingId, args: &str) {
    if args.is_empty() {
        tell(game, actor, "Backstab whom?");
        return;
    }
    let Some(target) = target_in_room(game, actor, args) else {
        return;
    };
    let outcome = special::backstab(&mut game.world, &mut game.ctx, actor, target);
    report_skill(game, actor, outcome, "");
}

fn rescue(game: &mut Game, actor: LivingId, args: &str) {
    if args.is_empty() {
        tell(game, actor, "Rescue whom?");
        return;
    }
    let Some(victim) = target_in_room(game, actor, args) else {
        return;
    };
    let outcome = special::rescue(&mut game.world, &mut game.ctx, actor, victim);
    report_skill(game, actor, outcome, "Nobody is fighting them.");
}

fn report_skill(game: &mut Game, actor: LivingId, outcome: SkillOutcome, nothing: &str) {
    let text = match outcome {
        SkillOutcome::NotLearned => "You don't know how.",
        SkillOutcome::InvalidTarget => "They aren't here.",
        SkillOutcome::NeedsWeapon => "You need to wield a weapon to do that.",
        SkillOutcome::AlreadyFighting => "You are too busy fighting.",
        SkillOutcome::TargetAlert => "They are too alert for that.",
        SkillOutcome::NothingToDo => nothing,
        SkillOutcome::Failed | SkillOutcome::Succeeded | SkillOutcome::Struck(_) => return,
    };
    if !text.is_empty() {
        tell(game, actor, text);
    }
}

fn score(game: &mut Game, actor: LivingId) {
    let Some(l) = game.world.living(actor) else {
        return;
    };
    let world = &game.world;
    let next = crate::combat::experience::exp_for_level(l.level + 1);
    let text = format!(
        "{}, level {}.\nHealth {}/{}  Mana {}/{}  Moves {}/{}\nStr {} Dex {} Int {} Con {}\nHitroll {} Damroll {} Armor {} Saves {}\nExperience {} (next level at {})\nWimpy {}",
        l.name,
        l.level,
        l.pools.health,
        l.pools.max_health,
        l.pools.mana,
        l.pools.max_mana,
        l.pools.moves,
        l.pools.max_moves,
        l.attributes.str + world.modifier(actor, Modifier::Str),
        l.attributes.dex + world.modifier(actor, Modifier::Dex),
        l.attributes.int + world.modifier(actor, Modifier::Int),
        l.attributes.con + world.modifier(actor, Modifier::Con),
        world.modifier(actor, Modifier::Hitroll),
        world.modifier(actor, Modifier::Damroll),
        world.modifier(actor, Modifier::Armor),
        world.modifier(actor, Modifier::Saves),
        l.exp,
        next,
        l.wimpy
    );
    tell(game, actor, text);
}

fn affects(game: &mut Game, actor: LivingId) {
    let now = game.ctx.now();
    let Some(l) = game.world.living(actor) else {
        return;
    };
    if l.affections.is_empty() {
        tell(game, actor, "You are not affected by anything.");
        return;
    }
    let mut lines = vec!["You are affected by:".to_string()];
    for affection in l.affections.iter() {
        let name = match affection.source {
            AffectionSource::Spell(spell) => spell.name(),
            AffectionSource::Skill(skill) => skill.name(),
        };
        lines.push(format!("  {:<16} {}s remaining", name, affection.remaining_seconds(now)));
    }
    let text = lines.join("\n");
    tell(game, actor, text);
}

fn inventory(game: &mut Game, actor: LivingId) {
    let Some(l) = game.world.living(actor) else {
        return;
    };
    let names: Vec<String> = l
        .inventory
        .iter()
        .filter_map(|id| game.world.item(*id))
        .map(|i| format!("  {}", i.name))
        .collect();
    let text = if names.is_empty() {
        "You are carrying:\n  Nothing.".to_string()
    } else {
        format!("You are carrying:\n{}", names.join("\n"))
    };
    tell(game, actor, text);
}

fn equipment(game: &mut Game, actor: LivingId) {
    let Some(l) = game.world.living(actor) else {
        return;
    };
    let rows: Vec<String> = l
        .equipment
        .iter()
        .filter_map(|(slot, id)| game.world.item(*id).map(|i| format!("{:<20} {}", slot.label(), i.name)))
        .collect();
    let text = if rows.is_empty() {
        "You are using:\n  Nothing.".to_string()
    } else {
        format!("You are using:\n{}", rows.join("\n"))
    };
    tell(game, actor, text);
}

fn get(game: &mut Game, actor: LivingId, args: &str) {
    if args.is_empty() {
        tell(game, actor, "Get what?");
        return;
    }
    let Some(room) = game.world.living(actor).and_then(|l| game.world.room(l.room)) else {
        return;
    };
    let floor = room.items.clone();
    let Some(item) = game.world.find_item_in(&floor, args) else {
        tell(game, actor, format!("You do not see a {} here.", args));
        return;
    };
    if game.world.item(item).is_some_and(|i| i.has_flag(ItemFlag::NoTake)) {
        tell(game, actor, "You can't take that.");
        return;
    }
    if game.world.move_item(item, ItemLocation::Inventory(actor)).is_ok() {
        if let Some(name) = game.world.item(item).map(|i| i.name.clone()) {
            act(&mut game.ctx.out, &game.world, &format!("You get {}.", name), Audience::Actor, actor, None);
            act(&mut game.ctx.out, &game.world, &format!("@n gets {}.", name), Audience::RoomExceptActor, actor, None);
        }
    }
}

fn drop_item(game: &mut Game, actor: LivingId, args: &str) {
    let Some(l) = game.world.living(actor) else {
        return;
    };
    let (room, carried) = (l.room, l.inventory.clone());
    let Some(item) = game.world.find_item_in(&carried, args) else {
        tell(game, actor, "You do not have that item.");
        return;
    };
    if game.world.move_item(item, ItemLocation::Room(room)).is_ok() {
        if let Some(name) = game.world.item(item).map(|i| i.name.clone()) {
            act(&mut game.ctx.out, &game.world, &format!("You drop {}.", name), Audience::Actor, actor, None);
            act(&mut game.ctx.out, &game.world, &format!("@n drops {}.", name), Audience::RoomExceptActor, actor, None);
        }
    }
}

fn wear(game: &mut Game, actor: LivingId, args: &str) {
    let carried = match game.world.living(actor) {
        Some(l) => l.inventory.clone(),
        None => return,
    };
    let Some(item) = game.world.find_item_in(&carried, args) else {
        tell(game, actor, "You do not have that item.");
        return;
    };
    match game.world.equip(actor, item) {
        Ok(slot) => {
            let name = game.world.item(item).map(|i| i.name.clone()).unwrap_or_default();
            tell(game, actor, format!("You wear {} {}.", name, slot.label()));
            act(&mut game.ctx.out, &game.world, &format!("@n wears {}.", name), Audience::RoomExceptActor, actor, None);
        }
        Err(e) => {
            debug!("{} could not wear {}: {}", actor, item, e);
            tell(game, actor, "You can't wear that right now.");
        }
    }
}

fn remove(game: &mut Game, actor: LivingId, args: &str) {
    let worn: Vec<(crate::world::Slot, crate::world::ItemId)> = match game.world.living(actor) {
        Some(l) => l.equipment.iter().map(|(s, i)| (*s, *i)).collect(),
        None => return,
    };
    let items: Vec<_> = worn.iter().map(|(_, id)| *id).collect();
    let Some(item) = game.world.find_item_in(&items, args) else {
        tell(game, actor, "You are not using that.");
        return;
    };
    let Some(slot) = worn.iter().find(|(_, id)| *id == item).map(|(slot, _)| *slot) else {
        return;
    };
    if game.world.unequip(actor, slot).is_ok() {
        let name = game.world.item(item).map(|i| i.name.clone()).unwrap_or_default();
        tell(game, actor, format!("You stop using {}.", name));
    }
}

fn door(game: &mut Game, actor: LivingId, args: &str, state: DoorState) {
    let Some(dir) = Direction::parse(args) else {
        tell(game, actor, "Which direction?");
        return;
    };
    let Some(room) = game.world.living(actor).map(|l| l.room) else {
        return;
    };
    let current = match game.world.exit(room, dir) {
        Some(exit) => exit.door,
        None => {
            tell(game, actor, "There is no door there.");
            return;
        }
    };
    if current == DoorState::Locked {
        tell(game, actor, "It seems to be locked.");
        return;
    }
    if current == state {
        tell(game, actor, if state == DoorState::Open { "It's already open." } else { "It's already closed." });
        return;
    }
    if game.world.set_door(room, dir, state).is_ok() {
        let verb = if state == DoorState::Open { "opens" } else { "closes" };
        tell(game, actor, "Ok.");
        act(&mut game.ctx.out, &game.world, &format!("@n {} the door {}.", verb, dir), Audience::RoomExceptActor, actor, None);
    }
}

fn wimpy(game: &mut Game, actor: LivingId, args: &str) {
    let Some(max_health) = game.world.living(actor).map(|l| l.pools.max_health) else {
        return;
    };
    let value = if args.is_empty() {
        max_health / 5
    } else {
        match args.parse::<i32>() {
            Ok(v) if (0..=max_health / 2).contains(&v) => v,
            _ => {
                tell(game, actor, format!("Wimpy must be between 0 and {}.", max_health / 2));
                return;
            }
        }
    };
    if let Some(l) = game.world.living_mut(actor) {
        l.wimpy = value;
    }
    tell(game, actor, format!("Wimpy set to {} hit points.", value));
}

fn who(game: &mut Game, actor: LivingId) {
    let mut rows: Vec<String> = game
        .world
        .players()
        .map(|p| format!("[{:>2}] {}", p.level, p.name))
        .collect();
    rows.sort();
    let text = format!("Players online ({}):\n{}", rows.len(), rows.join("\n"));
    tell(game, actor, text);
}

/// Prompt shown after each command.
pub fn prompt(game: &Game, actor: LivingId) -> Option<String> {
    let l = game.world.living(actor)?;
    Some(format!(
        "<{}/{}hp {}/{}m {}/{}mv> ",
        l.pools.health, l.pools.max_health, l.pools.mana, l.pools.max_mana, l.pools.moves, l.pools.max_moves
    ))
}
