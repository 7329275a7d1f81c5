use crossbeam_channel::{Receiver, Sender, unbounded};
use mosaic_core::{EdgeId, NodeData, NodeId, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceChangeType {
    Loaded,
    NodesAdded,
    NodesUpdated,
    NodesDeleted,
    EdgesAdded,
    EdgesDeleted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CanvasEvent {
    // ========================================================================
    // Gestures reported by the rendering layer (canvas coordinates)
    // ========================================================================
    Drop {
        node_type: String,
        position: Vec2,
        data: Option<NodeData>,
    },
    NodeDrag {
        id: NodeId,
        position: Vec2,
    },
    NodeDragStop {
        id: NodeId,
        position: Vec2,
    },
    SelectionChange {
        node_ids: Vec<NodeId>,
    },
    Connect {
        source: NodeId,
        target: NodeId,
        source_handle: Option<String>,
        target_handle: Option<String>,
    },

    // ========================================================================
    // Commands (menu items, key presses)
    // ========================================================================
    DeleteNodes {
        ids: Vec<NodeId>,
    },
    DeleteEdge {
        id: EdgeId,
    },
    GroupSelection,
    Ungroup {
        id: NodeId,
    },
    SetContained {
        id: NodeId,
        contained: bool,
    },
    ResolveCollisions,

    // ========================================================================
    // Notifications published by the engine
    // ========================================================================
    WorkspaceChanged {
        change_type: WorkspaceChangeType,
        node_ids: Vec<NodeId>,
        edge_ids: Vec<EdgeId>,
    },
}

impl CanvasEvent {
    pub fn is_notification(&self) -> bool {
        matches!(self, CanvasEvent::WorkspaceChanged { .. })
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<CanvasEvent>,
    rx: Receiver<CanvasEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<CanvasEvent> {
        self.tx.clone()
    }

    pub fn receiver(&self) -> Receiver<CanvasEvent> {
        self.rx.clone()
    }

    pub fn publish(&self, event: CanvasEvent) {
        let _ = self.tx.send(event);
    }

    /// Drain every pending event without dispatching it.
    pub fn drain(&self) -> Vec<CanvasEvent> {
        self.rx.try_iter().collect()
    }

    /// Hand every queued event to `listener`, oldest first. Call once per frame.
    pub fn dispatch_to<L: EventListener>(&self, listener: &mut L) {
        while let Ok(event) = self.rx.try_recv() {
            listener.handle_event(&event);
        }
    }
}

/// Receives canvas events drained from an [`EventBus`].
pub trait EventListener {
    fn handle_event(&mut self, event: &CanvasEvent);
}
