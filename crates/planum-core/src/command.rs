//! Undoable command execution.
//!
//! Every structural edit runs through a [`CommandHandler`] registered under
//! a command name. A top-level [`Diagram::execute`] call opens an
//! execution; handlers may call [`Diagram::execute`] again from their
//! `pre_execute` or `post_execute` hooks, and those nested commands are
//! recorded into the same entry. The entry is pushed only if the whole
//! execution succeeds. On failure every action already recorded is
//! reverted, newest first, and nothing is pushed.
//!
//! Within an entry, actions are ordered the way they took effect: actions
//! nested in `pre_execute`, then the command itself, then actions nested in
//! `post_execute`. Undo reverts them in reverse order, redo replays their
//! `execute` step in order. If either stops partway, the steps it already
//! took are undone again and the cursor does not move.
//!
//! Events fired for command `name` (payload [`Payload::Command`]):
//!
//! | event                               | when                                |
//! |-------------------------------------|-------------------------------------|
//! | `commandStack.<name>.canExecute`    | before anything runs; cancellable   |
//! | `commandStack.<name>.preExecute`    | before `pre_execute`                |
//! | `commandStack.<name>.execute`       | before `execute` (also on redo)     |
//! | `commandStack.<name>.executed`      | after `execute` (also on redo)      |
//! | `commandStack.<name>.postExecuted`  | after `post_execute`                |
//! | `commandStack.<name>.revert`        | before `revert`                     |
//! | `commandStack.<name>.reverted`      | after `revert`                      |
//! | `elements.changed` / `element.changed` | after a top-level execute, undo or redo |
//! | `commandStack.changed`              | after the stack itself changed      |

use std::{any::Any, fmt, rc::Rc};

use indexmap::{IndexMap, IndexSet};
use log::{debug, error, trace};

use crate::{
    diagram::Diagram,
    error::CommandError,
    events::{Event, EventBus, Payload},
    identifier::Id,
};

/// A named edit the command stack can execute and revert.
///
/// Contexts are opaque to the stack; handlers downcast them with
/// [`context`] and [`context_mut`]. Everything `revert` needs must be
/// recorded into the context by `execute`, because redo calls `execute`
/// again on the same context.
pub trait CommandHandler {
    /// Returns false to refuse the command.
    fn can_execute(&self, _diagram: &Diagram, _context: &dyn Any) -> bool {
        true
    }

    /// Prepares the context, possibly executing nested commands.
    fn pre_execute(&self, _diagram: &mut Diagram, _context: &mut dyn Any) -> Result<(), CommandError> {
        Ok(())
    }

    /// Applies the edit and returns the ids of the elements it changed.
    fn execute(&self, diagram: &mut Diagram, context: &mut dyn Any) -> Result<Vec<Id>, CommandError>;

    /// Follow-up work, possibly executing nested commands.
    fn post_execute(&self, _diagram: &mut Diagram, _context: &mut dyn Any) -> Result<(), CommandError> {
        Ok(())
    }

    /// Undoes `execute` and returns the ids of the elements it changed.
    fn revert(&self, diagram: &mut Diagram, context: &mut dyn Any) -> Result<Vec<Id>, CommandError>;
}

/// Downcasts a command context.
///
/// # Errors
///
/// Returns [`CommandError::InvalidContext`] if the context is not a `T`.
pub fn context<T: Any>(context: &dyn Any) -> Result<&T, CommandError> {
    context
        .downcast_ref::<T>()
        .ok_or(CommandError::InvalidContext(std::any::type_name::<T>()))
}

/// Mutable variant of [`context`].
pub fn context_mut<T: Any>(context: &mut dyn Any) -> Result<&mut T, CommandError> {
    context
        .downcast_mut::<T>()
        .ok_or(CommandError::InvalidContext(std::any::type_name::<T>()))
}

struct Action {
    command: String,
    context: Box<dyn Any>,
}

#[derive(Default)]
struct Execution {
    /// `None` marks a slot reserved for a command whose post-execution is
    /// still running.
    actions: Vec<Option<Action>>,
    dirty: Vec<Id>,
}

/// Handler registry plus the linear undo history.
pub struct CommandStack {
    handlers: IndexMap<String, Rc<dyn CommandHandler>>,
    entries: Vec<Vec<Action>>,
    cursor: usize,
    current: Option<Execution>,
    replaying: bool,
    max_entries: usize,
}

impl fmt::Debug for CommandStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandStack")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("executing", &self.current.is_some())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStack {
    pub fn new() -> Self {
        Self {
            handlers: IndexMap::new(),
            entries: Vec::new(),
            cursor: 0,
            current: None,
            replaying: false,
            max_entries: 0,
        }
    }

    /// Creates a stack keeping at most `max_entries` entries (0 = unlimited).
    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Self::new()
        }
    }

    /// Registers `handler` under `command`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::DuplicateHandler`] if the name is taken.
    pub fn register_handler(
        &mut self,
        command: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<(), CommandError> {
        if self.handlers.contains_key(command) {
            return Err(CommandError::DuplicateHandler(command.to_string()));
        }
        debug!(command; "Registered command handler");
        self.handlers.insert(command.to_string(), Rc::new(handler));
        Ok(())
    }

    pub fn has_handler(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }

    fn handler(&self, command: &str) -> Result<Rc<dyn CommandHandler>, CommandError> {
        self.handlers
            .get(command)
            .cloned()
            .ok_or_else(|| CommandError::NoHandler(command.to_string()))
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Number of recorded entries, including undone ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the undo/redo boundary.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the command names of the entry at `index`, in execution order.
    pub fn entry_commands(&self, index: usize) -> Option<Vec<&str>> {
        self.entries
            .get(index)
            .map(|actions| actions.iter().map(|a| a.command.as_str()).collect())
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Drops the history. Handlers stay registered.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    fn busy(&self) -> bool {
        self.replaying || self.current.is_some()
    }

    fn reserve(&mut self, dirty: Vec<Id>) -> usize {
        let execution = self.current.get_or_insert_with(Execution::default);
        execution.dirty.extend(dirty);
        execution.actions.push(None);
        execution.actions.len() - 1
    }

    fn fill(&mut self, slot: usize, action: Action) {
        if let Some(reserved) = self
            .current
            .as_mut()
            .and_then(|execution| execution.actions.get_mut(slot))
        {
            *reserved = Some(action);
        }
    }

    fn push(&mut self, actions: Vec<Action>) {
        self.entries.truncate(self.cursor);
        self.entries.push(actions);
        if self.max_entries > 0 && self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }
        self.cursor = self.entries.len();
    }
}

fn fire_command(diagram: &mut Diagram, command: &str, phase: &str) -> bool {
    let mut event = Event::new(Payload::Command {
        command: command.to_string(),
    });
    EventBus::fire(diagram, &format!("commandStack.{command}.{phase}"), &mut event)
}

fn fire_changed(diagram: &mut Diagram, dirty: Vec<Id>) {
    let changed: Vec<Id> = dirty
        .into_iter()
        .collect::<IndexSet<_>>()
        .into_iter()
        .filter(|id| diagram.graph().contains(*id))
        .collect();
    if !changed.is_empty() {
        diagram.fire("elements.changed", Payload::Elements(changed.clone()));
        for id in changed {
            diagram.fire("element.changed", Payload::Element(id));
        }
    }
}

pub(crate) fn execute(
    diagram: &mut Diagram,
    command: &str,
    context: Box<dyn Any>,
) -> Result<bool, CommandError> {
    let handler = diagram.commands.handler(command)?;
    if diagram.commands.replaying {
        return Err(CommandError::Busy);
    }
    let top_level = diagram.commands.current.is_none();

    let allowed = fire_command(diagram, command, "canExecute")
        && handler.can_execute(diagram, &*context);
    if !allowed {
        if top_level {
            debug!(command; "Command refused");
            return Ok(false);
        }
        return Err(CommandError::NotAllowed(command.to_string()));
    }

    if !top_level {
        return run(diagram, handler.as_ref(), command, context).map(|()| true);
    }

    trace!(command; "Executing command");
    diagram.commands.current = Some(Execution::default());
    let result = run(diagram, handler.as_ref(), command, context);
    let execution = diagram.commands.current.take().unwrap_or_default();

    match result {
        Ok(()) => {
            let actions: Vec<Action> = execution.actions.into_iter().flatten().collect();
            debug!(command, actions = actions.len(); "Command executed");
            diagram.commands.push(actions);
            fire_changed(diagram, execution.dirty);
            diagram.fire("commandStack.changed", Payload::Empty);
            Ok(true)
        }
        Err(err) => {
            error!(command, err:%; "Command failed, rolling back");
            let mut dirty = execution.dirty;
            diagram.commands.replaying = true;
            for mut action in execution.actions.into_iter().rev().flatten() {
                match revert_action(diagram, &mut action) {
                    Ok(ids) => dirty.extend(ids),
                    Err(revert_err) => {
                        error!(command = action.command, err:% = revert_err; "Rollback step failed");
                    }
                }
            }
            diagram.commands.replaying = false;
            fire_changed(diagram, dirty);
            Err(err)
        }
    }
}

fn run(
    diagram: &mut Diagram,
    handler: &dyn CommandHandler,
    command: &str,
    mut context: Box<dyn Any>,
) -> Result<(), CommandError> {
    fire_command(diagram, command, "preExecute");
    handler.pre_execute(diagram, &mut *context)?;

    fire_command(diagram, command, "execute");
    let dirty = handler.execute(diagram, &mut *context)?;
    let slot = diagram.commands.reserve(dirty);
    fire_command(diagram, command, "executed");

    let post = handler.post_execute(diagram, &mut *context);
    if post.is_ok() {
        fire_command(diagram, command, "postExecuted");
    }
    diagram.commands.fill(
        slot,
        Action {
            command: command.to_string(),
            context,
        },
    );
    post
}

fn revert_action(diagram: &mut Diagram, action: &mut Action) -> Result<Vec<Id>, CommandError> {
    let handler = diagram.commands.handler(&action.command)?;
    fire_command(diagram, &action.command, "revert");
    let dirty = handler.revert(diagram, &mut *action.context)?;
    fire_command(diagram, &action.command, "reverted");
    Ok(dirty)
}

fn replay_action(diagram: &mut Diagram, action: &mut Action) -> Result<Vec<Id>, CommandError> {
    let handler = diagram.commands.handler(&action.command)?;
    fire_command(diagram, &action.command, "execute");
    let dirty = handler.execute(diagram, &mut *action.context)?;
    fire_command(diagram, &action.command, "executed");
    Ok(dirty)
}

pub(crate) fn undo(diagram: &mut Diagram) -> Result<bool, CommandError> {
    if diagram.commands.busy() {
        return Err(CommandError::Busy);
    }
    let Some(index) = diagram.commands.cursor.checked_sub(1) else {
        return Ok(false);
    };

    let mut actions = std::mem::take(&mut diagram.commands.entries[index]);
    diagram.commands.replaying = true;
    let result = revert_all(diagram, &mut actions);
    diagram.commands.replaying = false;
    diagram.commands.entries[index] = actions;
    let dirty = result?;

    diagram.commands.cursor = index;
    trace!(cursor = index; "Undo");
    fire_changed(diagram, dirty);
    diagram.fire("commandStack.changed", Payload::Empty);
    Ok(true)
}

pub(crate) fn redo(diagram: &mut Diagram) -> Result<bool, CommandError> {
    if diagram.commands.busy() {
        return Err(CommandError::Busy);
    }
    let index = diagram.commands.cursor;
    if index >= diagram.commands.entries.len() {
        return Ok(false);
    }

    let mut actions = std::mem::take(&mut diagram.commands.entries[index]);
    diagram.commands.replaying = true;
    let result = replay_all(diagram, &mut actions);
    diagram.commands.replaying = false;
    diagram.commands.entries[index] = actions;
    let dirty = result?;

    diagram.commands.cursor = index + 1;
    trace!(cursor = index + 1; "Redo");
    fire_changed(diagram, dirty);
    diagram.fire("commandStack.changed", Payload::Empty);
    Ok(true)
}

/// Reverts `actions` newest first. If a step fails, the steps already
/// reverted are replayed so the entry stays fully applied.
fn revert_all(diagram: &mut Diagram, actions: &mut [Action]) -> Result<Vec<Id>, CommandError> {
    let mut dirty = Vec::new();
    for position in (0..actions.len()).rev() {
        match revert_action(diagram, &mut actions[position]) {
            Ok(ids) => dirty.extend(ids),
            Err(err) => {
                error!(command = actions[position].command, err:%; "Undo failed, rolling back");
                for action in &mut actions[position + 1..] {
                    if let Err(replay_err) = replay_action(diagram, action) {
                        error!(command = action.command, err:% = replay_err; "Rollback step failed");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(dirty)
}

/// Replays `actions` in execution order. If a step fails, the steps already
/// replayed are reverted so the entry stays fully undone.
fn replay_all(diagram: &mut Diagram, actions: &mut [Action]) -> Result<Vec<Id>, CommandError> {
    let mut dirty = Vec::new();
    for position in 0..actions.len() {
        match replay_action(diagram, &mut actions[position]) {
            Ok(ids) => dirty.extend(ids),
            Err(err) => {
                error!(command = actions[position].command, err:%; "Redo failed, rolling back");
                for action in actions[..position].iter_mut().rev() {
                    if let Err(revert_err) = revert_action(diagram, action) {
                        error!(command = action.command, err:% = revert_err; "Rollback step failed");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(dirty)
}
