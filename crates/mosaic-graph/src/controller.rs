use crate::snap::Guide;
use crate::store::CanvasStore;
use mosaic_core::{NodeId, Vec2};
use mosaic_events::{CanvasEvent, EventListener};

/// Translates rendering-layer gestures and commands into store operations.
///
/// Drag positions are previewed, not committed: guides are recomputed on every
/// `NodeDrag` and the move lands in the store on `NodeDragStop`. Dragging a
/// node that is part of a multi-selection moves the whole selection; selected
/// nodes inside a selected group move only through the group.
///
/// Gestures should arrive on a different bus than the one the store publishes
/// change notifications on; notifications reaching the controller are ignored.
pub struct CanvasController {
    store: CanvasStore,
    guides: Vec<Guide>,
}

impl CanvasController {
    pub fn new(store: CanvasStore) -> Self {
        Self {
            store,
            guides: Vec::new(),
        }
    }

    pub fn store(&self) -> &CanvasStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CanvasStore {
        &mut self.store
    }

    pub fn into_store(self) -> CanvasStore {
        self.store
    }

    /// Guides for the drag in progress, empty when nothing is being dragged.
    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    /// Nodes that move with `id`, and the offset from their committed position.
    fn drag_set(&self, id: &NodeId, position: Vec2) -> Option<(Vec<NodeId>, Vec2)> {
        let node = self.store.graph().node(id)?;
        let delta = position - node.position;
        let selected = self.store.graph().selected_ids();
        let moving = if node.selected && selected.len() > 1 {
            self.store.graph().outermost_ids(&selected)
        } else {
            vec![id.clone()]
        };
        Some((moving, delta))
    }

    fn on_drag(&mut self, id: &NodeId, position: Vec2) {
        let Some((moving, delta)) = self.drag_set(id, position) else {
            self.guides.clear();
            return;
        };
        let preview = self.store.preview_translation(&moving, delta);
        self.guides = match preview.as_slice() {
            [single] => self.store.snap_guides(single),
            many => self.store.selection_snap_guides(many),
        };
    }

    fn on_drag_stop(&mut self, id: &NodeId, position: Vec2) {
        self.guides.clear();
        let Some((moving, delta)) = self.drag_set(id, position) else {
            return;
        };
        self.store.translate_nodes(&moving, delta);
        if self.store.settings().resolve_on_drag_stop {
            self.store.resolve_collisions();
        }
    }
}

impl EventListener for CanvasController {
    fn handle_event(&mut self, event: &CanvasEvent) {
        match event {
            CanvasEvent::Drop {
                node_type,
                position,
                data,
            } => {
                self.store.drop_node(node_type, *position, data.clone());
            }
            CanvasEvent::NodeDrag { id, position } => self.on_drag(id, *position),
            CanvasEvent::NodeDragStop { id, position } => self.on_drag_stop(id, *position),
            CanvasEvent::SelectionChange { node_ids } => {
                self.store.set_selection(node_ids);
            }
            CanvasEvent::Connect {
                source,
                target,
                source_handle,
                target_handle,
            } => {
                self.store.create_edge(
                    source,
                    target,
                    None,
                    source_handle.clone(),
                    target_handle.clone(),
                );
            }
            CanvasEvent::DeleteNodes { ids } => {
                self.store.delete_nodes(ids);
            }
            CanvasEvent::DeleteEdge { id } => {
                self.store.delete_edge(id);
            }
            CanvasEvent::GroupSelection => {
                self.store.group_selection();
            }
            CanvasEvent::Ungroup { id } => {
                self.store.ungroup_node(id);
            }
            CanvasEvent::SetContained { id, contained } => {
                self.store.set_node_contained(id, *contained);
            }
            CanvasEvent::ResolveCollisions => {
                self.store.resolve_collisions();
            }
            CanvasEvent::WorkspaceChanged { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LayoutSettings;
    use mosaic_events::EventBus;

    fn controller() -> CanvasController {
        let settings = LayoutSettings {
            resolve_on_drag_stop: false,
            ..LayoutSettings::default()
        };
        CanvasController::new(CanvasStore::new(settings))
    }

    #[test]
    fn test_drop_then_connect() {
        let mut controller = controller();
        let gestures = EventBus::new();
        gestures.publish(CanvasEvent::Drop {
            node_type: "note".to_string(),
            position: Vec2::new(0.0, 0.0),
            data: None,
        });
        gestures.publish(CanvasEvent::Drop {
            node_type: "entity".to_string(),
            position: Vec2::new(600.0, 0.0),
            data: None,
        });
        gestures.dispatch_to(&mut controller);

        let ids: Vec<NodeId> = controller.store().graph().nodes().iter().map(|n| n.id.clone()).collect();
        assert_eq!(ids.len(), 2);

        controller.handle_event(&CanvasEvent::Connect {
            source: ids[0].clone(),
            target: ids[1].clone(),
            source_handle: Some("right".to_string()),
            target_handle: None,
        });
        assert_eq!(controller.store().graph().edge_count(), 1);
    }

    #[test]
    fn test_drag_previews_guides_and_commits_on_stop() {
        let mut controller = controller();
        let a = controller.store_mut().create_node("note", Vec2::new(0.0, 0.0), None);
        controller.store_mut().create_node("note", Vec2::new(104.0, 400.0), None);

        controller.handle_event(&CanvasEvent::NodeDrag {
            id: a.id.clone(),
            position: Vec2::new(100.0, 0.0),
        });
        assert!(controller.guides().iter().any(|g| g.position == 104.0));
        assert_eq!(controller.store().graph().node(&a.id).unwrap().position, Vec2::ZERO);

        controller.handle_event(&CanvasEvent::NodeDragStop {
            id: a.id.clone(),
            position: Vec2::new(100.0, 0.0),
        });
        assert!(controller.guides().is_empty());
        assert_eq!(
            controller.store().graph().node(&a.id).unwrap().position,
            Vec2::new(100.0, 0.0)
        );
    }

    #[test]
    fn test_dragging_selected_node_moves_selection() {
        let mut controller = controller();
        let a = controller.store_mut().create_node("text", Vec2::new(0.0, 0.0), None);
        let b = controller.store_mut().create_node("text", Vec2::new(300.0, 0.0), None);
        controller.handle_event(&CanvasEvent::SelectionChange {
            node_ids: vec![a.id.clone(), b.id.clone()],
        });

        controller.handle_event(&CanvasEvent::NodeDragStop {
            id: a.id.clone(),
            position: Vec2::new(10.0, 20.0),
        });

        let graph = controller.store().graph();
        assert_eq!(graph.node(&a.id).unwrap().position, Vec2::new(10.0, 20.0));
        assert_eq!(graph.node(&b.id).unwrap().position, Vec2::new(310.0, 20.0));
    }

    #[test]
    fn test_dragging_group_with_selected_children_moves_children_once() {
        let mut controller = controller();
        let a = controller.store_mut().create_node("note", Vec2::new(0.0, 0.0), None);
        let b = controller.store_mut().create_node("note", Vec2::new(400.0, 0.0), None);
        let group_id = controller
            .store_mut()
            .group_selected_nodes(&[a.id.clone(), b.id.clone()])
            .expect("grouped");
        controller.handle_event(&CanvasEvent::SelectionChange {
            node_ids: vec![group_id.clone(), a.id.clone(), b.id.clone()],
        });
        let group_at = controller.store().graph().node(&group_id).unwrap().position;

        controller.handle_event(&CanvasEvent::NodeDrag {
            id: group_id.clone(),
            position: group_at + Vec2::new(50.0, 0.0),
        });
        let preview = controller
            .store()
            .preview_translation(&[group_id.clone(), a.id.clone(), b.id.clone()], Vec2::new(50.0, 0.0));
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].id, group_id);

        controller.handle_event(&CanvasEvent::NodeDragStop {
            id: group_id.clone(),
            position: group_at + Vec2::new(50.0, 0.0),
        });

        let graph = controller.store().graph();
        assert_eq!(graph.absolute_position(&a.id), Some(Vec2::new(50.0, 0.0)));
        assert_eq!(graph.absolute_position(&b.id), Some(Vec2::new(450.0, 0.0)));

        // Dragging a selected child carries the whole group by the same offset.
        let a_at = graph.node(&a.id).unwrap().position;
        controller.handle_event(&CanvasEvent::NodeDragStop {
            id: a.id.clone(),
            position: a_at + Vec2::new(0.0, 30.0),
        });
        let graph = controller.store().graph();
        assert_eq!(graph.absolute_position(&a.id), Some(Vec2::new(50.0, 30.0)));
        assert_eq!(graph.absolute_position(&b.id), Some(Vec2::new(450.0, 30.0)));
    }

    #[test]
    fn test_drag_stop_resolves_collisions_when_enabled() {
        let mut controller = CanvasController::new(CanvasStore::default());
        let a = controller.store_mut().create_node("note", Vec2::new(0.0, 0.0), None);
        let b = controller.store_mut().create_node("note", Vec2::new(600.0, 0.0), None);

        controller.handle_event(&CanvasEvent::NodeDragStop {
            id: b.id.clone(),
            position: Vec2::new(20.0, 0.0),
        });

        let graph = controller.store().graph();
        let ra = graph.node_rect(graph.node(&a.id).unwrap());
        let rb = graph.node_rect(graph.node(&b.id).unwrap());
        assert!(!ra.overlaps(&rb));
    }

    #[test]
    fn test_group_commands() {
        let mut controller = controller();
        let a = controller.store_mut().create_node("note", Vec2::new(0.0, 0.0), None);
        let b = controller.store_mut().create_node("note", Vec2::new(400.0, 0.0), None);
        controller.handle_event(&CanvasEvent::SelectionChange {
            node_ids: vec![a.id.clone(), b.id.clone()],
        });
        controller.handle_event(&CanvasEvent::GroupSelection);

        let group_id = controller
            .store()
            .graph()
            .node(&a.id)
            .and_then(|n| n.parent_id.clone())
            .expect("grouped");
        controller.handle_event(&CanvasEvent::SetContained {
            id: a.id.clone(),
            contained: true,
        });
        assert!(controller.store().graph().node(&a.id).unwrap().extent.is_some());

        controller.handle_event(&CanvasEvent::Ungroup { id: group_id.clone() });
        assert!(!controller.store().graph().contains_node(&group_id));

        controller.handle_event(&CanvasEvent::DeleteNodes {
            ids: vec![a.id.clone(), b.id.clone()],
        });
        assert_eq!(controller.store().graph().node_count(), 0);
    }

    #[test]
    fn test_unknown_drag_target_clears_guides() {
        let mut controller = controller();
        controller.handle_event(&CanvasEvent::NodeDrag {
            id: NodeId::from("ghost"),
            position: Vec2::ZERO,
        });
        assert!(controller.guides().is_empty());
        controller.handle_event(&CanvasEvent::ResolveCollisions);
        assert_eq!(controller.store().graph().node_count(), 0);
    }
}
