//! Several independent layout surfaces, one of them active.
//!
//! Detaching an area moves it into a new screen of its own. Screens share
//! the config and registry but nothing else; edits on one never reach another.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use ratatui::prelude::Rect;

use crate::config::LayoutConfig;
use crate::editor::{InsertSide, JoinDirection, PlaceSource, Placement};
use crate::error::LayoutError;
use crate::layout::{Axis, LayoutTree, NodeId};
use crate::registry::AreaRegistry;
use crate::session::{CommandOutcome, LayoutSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScreenId(u32);

impl ScreenId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen-{}", self.0)
    }
}

/// A command addressed to whichever screen is active.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutCommand {
    Split {
        leaf: NodeId,
        axis: Axis,
        side: InsertSide,
    },
    Resize {
        row: NodeId,
        sizes: Vec<f64>,
    },
    Join {
        row: NodeId,
        remove_index: usize,
        direction: JoinDirection,
    },
    Place {
        source: PlaceSource,
        target: NodeId,
        placement: Placement,
    },
    Remove(NodeId),
    Undo(Option<NodeId>),
    Redo(Option<NodeId>),
}

#[derive(Debug)]
pub struct ScreenManager {
    screens: BTreeMap<ScreenId, LayoutSession>,
    active: ScreenId,
    next: u32,
    config: LayoutConfig,
    registry: Arc<dyn AreaRegistry>,
}

impl ScreenManager {
    /// Start with a single screen hosting `session`.
    pub fn new(session: LayoutSession, registry: Arc<dyn AreaRegistry>) -> Self {
        let first = ScreenId(1);
        let config = session.config().clone();
        Self {
            screens: BTreeMap::from([(first, session)]),
            active: first,
            next: 2,
            config,
            registry,
        }
    }

    pub fn active(&self) -> ScreenId {
        self.active
    }

    pub fn screen_ids(&self) -> Vec<ScreenId> {
        self.screens.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn session(&self, id: ScreenId) -> Option<&LayoutSession> {
        self.screens.get(&id)
    }

    pub fn session_mut(&mut self, id: ScreenId) -> Option<&mut LayoutSession> {
        self.screens.get_mut(&id)
    }

    pub fn active_session(&self) -> Option<&LayoutSession> {
        self.screens.get(&self.active)
    }

    pub fn active_session_mut(&mut self) -> Option<&mut LayoutSession> {
        self.screens.get_mut(&self.active)
    }

    /// Host `tree` as a new screen. The active screen does not change.
    pub fn add_screen(&mut self, tree: LayoutTree, bounds: Rect) -> Result<ScreenId, LayoutError> {
        let session = LayoutSession::new(tree, bounds, self.config.clone(), self.registry.clone())?;
        let id = ScreenId(self.next);
        self.next += 1;
        self.screens.insert(id, session);
        tracing::debug!(screen = %id, "screen added");
        Ok(id)
    }

    pub fn set_active(&mut self, id: ScreenId) -> Result<(), LayoutError> {
        if !self.screens.contains_key(&id) {
            return Err(LayoutError::UnknownScreen(id));
        }
        self.active = id;
        Ok(())
    }

    /// Close a screen. The last remaining screen cannot be closed.
    pub fn close_screen(&mut self, id: ScreenId) -> Result<LayoutTree, LayoutError> {
        if !self.screens.contains_key(&id) {
            return Err(LayoutError::UnknownScreen(id));
        }
        if self.screens.len() == 1 {
            return Err(LayoutError::invalid("the last screen cannot be closed"));
        }
        let session = self
            .screens
            .remove(&id)
            .ok_or(LayoutError::UnknownScreen(id))?;
        if self.active == id
            && let Some(first) = self.screens.keys().next()
        {
            self.active = *first;
        }
        tracing::debug!(screen = %id, "screen closed");
        Ok(session.into_tree())
    }

    /// Cut `id` out of the active screen and host it as a new screen with
    /// `bounds`.
    pub fn detach_area(&mut self, id: NodeId, bounds: Rect) -> Result<ScreenId, LayoutError> {
        let active = self.active;
        let session = self
            .screens
            .get_mut(&active)
            .ok_or(LayoutError::UnknownScreen(active))?;
        let (tree, _) = session.detach(id)?;
        let screen = self.add_screen(tree, bounds)?;
        tracing::debug!(from = %active, to = %screen, node = %id, "area detached");
        Ok(screen)
    }

    /// Apply `command` to the active screen.
    pub fn route(&mut self, command: LayoutCommand) -> Result<Option<CommandOutcome>, LayoutError> {
        let active = self.active;
        let session = self
            .screens
            .get_mut(&active)
            .ok_or(LayoutError::UnknownScreen(active))?;
        let outcome = match command {
            LayoutCommand::Split { leaf, axis, side } => session.split(leaf, axis, side)?,
            LayoutCommand::Resize { row, sizes } => session.set_row_sizes(row, &sizes)?,
            LayoutCommand::Join {
                row,
                remove_index,
                direction,
            } => session.join(row, remove_index, direction)?,
            LayoutCommand::Place {
                source,
                target,
                placement,
            } => session.place(source, target, placement)?,
            LayoutCommand::Remove(id) => session.remove(id)?,
            LayoutCommand::Undo(scope) => return session.undo(scope),
            LayoutCommand::Redo(scope) => return session.redo(scope),
        };
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Area;
    use crate::registry::PermissiveRegistry;

    fn manager() -> ScreenManager {
        let registry: Arc<dyn AreaRegistry> = Arc::new(PermissiveRegistry);
        let session = LayoutSession::new(
            LayoutTree::new(Area::new("viewer")),
            Rect::new(0, 0, 120, 40),
            LayoutConfig::default(),
            registry.clone(),
        )
        .expect("session");
        ScreenManager::new(session, registry)
    }

    #[test]
    fn detach_moves_area_to_new_screen() {
        let mut screens = manager();
        let leaf = screens.active_session().expect("active").tree().root();
        let created = screens
            .route(LayoutCommand::Split {
                leaf,
                axis: Axis::Horizontal,
                side: InsertSide::After,
            })
            .expect("split")
            .expect("outcome")
            .created[0];
        let screen = screens
            .detach_area(created, Rect::new(0, 0, 60, 20))
            .expect("detach");
        assert_eq!(screens.len(), 2);
        assert_eq!(
            screens.active_session().map(|s| s.tree().root()),
            Some(leaf)
        );
        let hosted = screens.session(screen).expect("new screen");
        assert_eq!(hosted.tree().len(), 1);
        assert_eq!(hosted.viewports().get(hosted.tree().root()), Some(Rect::new(0, 0, 60, 20)));
    }

    #[test]
    fn last_screen_cannot_close() {
        let mut screens = manager();
        let first = screens.active();
        assert!(screens.close_screen(first).is_err());
        let second = screens
            .add_screen(LayoutTree::new(Area::new("console")), Rect::new(0, 0, 10, 10))
            .expect("add");
        screens.set_active(second).expect("activate");
        screens.close_screen(second).expect("close");
        assert_eq!(screens.active(), first);
        assert!(matches!(
            screens.set_active(second),
            Err(LayoutError::UnknownScreen(_))
        ));
    }

    #[test]
    fn routing_reaches_only_the_active_screen() {
        let mut screens = manager();
        let first = screens.active();
        let second = screens
            .add_screen(LayoutTree::new(Area::new("console")), Rect::new(0, 0, 40, 40))
            .expect("add");
        screens.set_active(second).expect("activate");
        let leaf = screens.active_session().expect("active").tree().root();
        screens
            .route(LayoutCommand::Split {
                leaf,
                axis: Axis::Vertical,
                side: InsertSide::Before,
            })
            .expect("split");
        assert_eq!(screens.session(first).map(|s| s.tree().len()), Some(1));
        assert_eq!(screens.session(second).map(|s| s.tree().len()), Some(3));
        assert!(screens.route(LayoutCommand::Undo(None)).expect("undo").is_some());
        assert_eq!(screens.session(second).map(|s| s.tree().len()), Some(1));
    }
}
